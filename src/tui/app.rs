//! TUI Application - wiring and terminal lifecycle
//!
//! Builds the relays, spawns the deployment task, and runs the coordinator
//! against an inline terminal viewport. The final frame stays on screen
//! after exit.

use std::io::{self, Stdout};
use std::sync::Arc;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::{
    backend::CrosstermBackend,
    widgets::{Paragraph, Wrap},
    Terminal, TerminalOptions, Viewport,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::coordinator::{Coordinator, ExitReason};
use super::events::key_presses;
use super::render;
use super::spinner;
use super::state::ViewState;
use crate::config::{DeployConfig, EngineKind};
use crate::deploy::DeploymentTask;
use crate::engine::{ApplyMode, Engine, MockEngine, PulumiCli};
use crate::error::DeployError;
use crate::program::Program;
use crate::relay::{self, DeployOutcome};

/// Rows reserved for the frame: status line plus both resource lists
const VIEWPORT_HEIGHT: u16 = 8;

type Term = Terminal<CrosstermBackend<Stdout>>;

/// TUI Application
pub struct TuiApp {
    config: DeployConfig,
    mode: ApplyMode,
    engine: Arc<dyn Engine>,
}

impl TuiApp {
    /// Create the application with the engine named in `config`
    pub fn new(config: DeployConfig, mode: ApplyMode) -> Self {
        let engine: Arc<dyn Engine> = match config.engine {
            EngineKind::Pulumi => Arc::new(PulumiCli::new(&config)),
            EngineKind::Mock => Arc::new(MockEngine::demo()),
        };
        Self::with_engine(config, mode, engine)
    }

    pub fn with_engine(config: DeployConfig, mode: ApplyMode, engine: Arc<dyn Engine>) -> Self {
        Self {
            config,
            mode,
            engine,
        }
    }

    /// Run the deployment with live progress.
    ///
    /// Returns `Err` for fatal setup failures and terminal errors; the caller
    /// decides how to exit.
    pub async fn run(self) -> Result<ExitReason, DeployError> {
        let program = Program::s3_website(&self.config.project_name)?;
        let (relays, receivers) = relay::channels();
        let cancel = CancellationToken::new();

        let mut terminal = setup_terminal()?;

        tracing::info!(mode = %self.mode, stack = %self.config.stack_name, "starting deployment");
        let task = DeploymentTask::new(self.engine, self.config.clone(), program, self.mode);
        let mut handle = tokio::spawn(task.run(relays, cancel.child_token()));

        let spinner = spinner::DOT.with_interval(self.config.tick_interval);
        let state = ViewState::new(self.mode == ApplyMode::Destroy, spinner);
        let mut coordinator = Coordinator::new(state, receivers, key_presses());

        let result = {
            let ui = coordinator.run(|state| draw(&mut terminal, state));
            tokio::pin!(ui);
            supervise(&mut ui, &mut handle).await
        };

        // Stop engine calls still in flight (user interrupt, fatal error)
        cancel.cancel();
        if !handle.is_finished() {
            handle.abort();
        }

        restore_terminal(&mut terminal)?;
        result
    }
}

/// Wait for the UI to finish, bailing out early on a fatal task error
async fn supervise<F>(
    ui: &mut std::pin::Pin<&mut F>,
    handle: &mut JoinHandle<Result<DeployOutcome, DeployError>>,
) -> Result<ExitReason, DeployError>
where
    F: std::future::Future<Output = Result<ExitReason, DeployError>>,
{
    let mut task_done = false;
    loop {
        tokio::select! {
            exit = ui.as_mut() => return exit,
            joined = &mut *handle, if !task_done => {
                task_done = true;
                match joined {
                    Ok(Err(err)) if err.is_fatal() => return Err(err),
                    Ok(_) => {}
                    Err(e) => return Err(DeployError::TaskFailed(e.to_string())),
                }
            }
        }
    }
}

/// Setup terminal for TUI
fn setup_terminal() -> Result<Term, DeployError> {
    enable_raw_mode().map_err(|e| DeployError::Terminal(e.to_string()))?;
    let backend = CrosstermBackend::new(io::stdout());
    Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(VIEWPORT_HEIGHT),
        },
    )
    .map_err(|e| {
        let _ = disable_raw_mode();
        DeployError::Terminal(e.to_string())
    })
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Term) -> Result<(), DeployError> {
    disable_raw_mode().map_err(|e| DeployError::Terminal(e.to_string()))?;
    terminal
        .show_cursor()
        .map_err(|e| DeployError::Terminal(e.to_string()))?;
    println!();
    Ok(())
}

fn draw(terminal: &mut Term, state: &ViewState) -> Result<(), DeployError> {
    terminal
        .draw(|frame| {
            let text = render::to_text(state);
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), frame.area());
        })
        .map(|_| ())
        .map_err(|e| DeployError::Terminal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending_ui() -> impl std::future::Future<Output = Result<ExitReason, DeployError>> {
        std::future::pending()
    }

    #[tokio::test]
    async fn test_fatal_task_error_preempts_ui() {
        let ui = pending_ui();
        tokio::pin!(ui);
        let mut handle = tokio::spawn(async {
            Err(DeployError::Refresh {
                details: "expired credentials".into(),
            })
        });

        let result = supervise(&mut ui, &mut handle).await;
        assert!(matches!(result, Err(DeployError::Refresh { .. })));
    }

    #[tokio::test]
    async fn test_panicked_task_reported() {
        let ui = pending_ui();
        tokio::pin!(ui);
        let mut handle = tokio::spawn(async {
            if true {
                panic!("engine blew up");
            }
            Ok(DeployOutcome::Succeeded)
        });

        let result = supervise(&mut ui, &mut handle).await;
        assert!(matches!(result, Err(DeployError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn test_finished_task_waits_for_ui() {
        let ui = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(ExitReason::Completed(DeployOutcome::Failed("conflict".into())))
        };
        tokio::pin!(ui);
        let mut handle =
            tokio::spawn(async { Ok(DeployOutcome::Failed("conflict".into())) });

        let result = supervise(&mut ui, &mut handle).await;
        assert!(matches!(
            result,
            Ok(ExitReason::Completed(DeployOutcome::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_task_waits_for_ui() {
        let ui = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(ExitReason::Interrupted)
        };
        tokio::pin!(ui);
        let mut handle = tokio::spawn(async { Err(DeployError::Cancelled) });

        let result = supervise(&mut ui, &mut handle).await;
        assert!(matches!(result, Ok(ExitReason::Interrupted)));
    }
}
