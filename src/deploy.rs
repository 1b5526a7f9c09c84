//! Deployment Task
//!
//! Drives the engine through stack selection, plugin install, config, refresh
//! and finally update or destroy. Progress goes out on the log relay and
//! resource changes on the event relay.
//!
//! Contract with the UI:
//! - setup failures return `Err` and send no terminal notice; the driver
//!   tears the process down
//! - once update/destroy has run (whatever its result) exactly one
//!   `LogNotice::Done` is sent and nothing follows it

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::DeployConfig;
use crate::engine::{ApplyMode, Engine, Stack};
use crate::error::DeployError;
use crate::program::{Program, WEBSITE_URL_OUTPUT};
use crate::relay::{DeployOutcome, LogNotice, Relays};

pub struct DeploymentTask {
    engine: Arc<dyn Engine>,
    config: DeployConfig,
    program: Program,
    mode: ApplyMode,
}

impl DeploymentTask {
    pub fn new(
        engine: Arc<dyn Engine>,
        config: DeployConfig,
        program: Program,
        mode: ApplyMode,
    ) -> Self {
        Self {
            engine,
            config,
            program,
            mode,
        }
    }

    /// Run every step; returns how update/destroy ended
    #[instrument(skip_all, fields(stack = %self.config.stack_name, mode = %self.mode))]
    pub async fn run(
        self,
        relays: Relays,
        cancel: CancellationToken,
    ) -> Result<DeployOutcome, DeployError> {
        let stack = self.prepare(&relays, &cancel).await?;

        let outcome = match self.mode {
            ApplyMode::Destroy => self.destroy(&stack, &relays, &cancel).await?,
            ApplyMode::Update => self.update(&stack, &relays, &cancel).await?,
        };

        if let DeployOutcome::Failed(reason) = &outcome {
            tracing::debug!("{}", reason);
            relays.log.status(reason.clone()).await;
        }

        relays.log.send(LogNotice::Done(outcome.clone())).await;
        tracing::info!(?outcome, "deployment finished");
        Ok(outcome)
    }

    /// Steps 1-4: any failure here is fatal
    async fn prepare(
        &self,
        relays: &Relays,
        cancel: &CancellationToken,
    ) -> Result<Stack, DeployError> {
        let log = &relays.log;
        let config = &self.config;

        let stack = self
            .engine
            .acquire_stack(&config.stack_name, &self.program)
            .await?;
        log.status(format!("Created/Selected stack {:?}", stack.name))
            .await;
        ensure_running(cancel)?;

        log.status("Installing the AWS plugin").await;
        self.engine
            .install_plugin(&stack, &config.plugin_name, &config.plugin_version)
            .await?;
        log.status("Successfully installed AWS plugin").await;
        ensure_running(cancel)?;

        self.engine
            .set_config(&stack, "aws:region", &config.region)
            .await?;
        log.status("Successfully set config").await;
        ensure_running(cancel)?;

        log.status("Running refresh...").await;
        self.engine.refresh(&stack).await?;
        log.status("Refresh succeeded!").await;
        ensure_running(cancel)?;

        Ok(stack)
    }

    async fn destroy(
        &self,
        stack: &Stack,
        relays: &Relays,
        cancel: &CancellationToken,
    ) -> Result<DeployOutcome, DeployError> {
        relays.log.status("Running destroy...").await;

        let applied = self
            .engine
            .apply(stack, ApplyMode::Destroy, relays.events.clone(), cancel.clone())
            .await;
        if let Err(e) = applied {
            return apply_failure(e);
        }
        relays.log.status("Stack successfully destroyed").await;

        if self.config.remove_stack_on_destroy {
            relays.log.status("Deleting stack...").await;
            if let Err(e) = self.engine.remove_stack(stack).await {
                return Ok(DeployOutcome::Failed(e.to_string()));
            }
        }

        Ok(DeployOutcome::Succeeded)
    }

    async fn update(
        &self,
        stack: &Stack,
        relays: &Relays,
        cancel: &CancellationToken,
    ) -> Result<DeployOutcome, DeployError> {
        relays.log.status("Running update...").await;

        let applied = self
            .engine
            .apply(stack, ApplyMode::Update, relays.events.clone(), cancel.clone())
            .await;
        let result = match applied {
            Ok(result) => result,
            Err(e) => return apply_failure(e),
        };
        relays.log.status("Update succeeded!").await;

        let url = result.string_output(WEBSITE_URL_OUTPUT)?;
        relays.log.status(format!("URL: {}", url)).await;

        Ok(DeployOutcome::Succeeded)
    }
}

fn ensure_running(cancel: &CancellationToken) -> Result<(), DeployError> {
    if cancel.is_cancelled() {
        Err(DeployError::Cancelled)
    } else {
        Ok(())
    }
}

/// Turn an engine-reported apply failure into a `Failed` outcome.
///
/// Cancellation passes through as an error so no `Done` is sent to a UI that
/// already quit. Unreadable stack outputs stay fatal, same as a missing URL.
fn apply_failure(err: DeployError) -> Result<DeployOutcome, DeployError> {
    match err {
        DeployError::Cancelled | DeployError::MissingOutput { .. } => Err(err),
        other => Ok(DeployOutcome::Failed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, MockStep};
    use crate::relay::{self, LifecycleEvent, RelayReceivers};
    use serde_json::json;

    fn task(engine: Arc<MockEngine>, mode: ApplyMode) -> DeploymentTask {
        let config = DeployConfig::default();
        let program = Program::s3_website(&config.project_name).unwrap();
        DeploymentTask::new(engine, config, program, mode)
    }

    /// Drain both relays until the producer is gone
    async fn collect(mut rx: RelayReceivers) -> (Vec<LogNotice>, Vec<LifecycleEvent>) {
        let mut notices = Vec::new();
        let mut events = Vec::new();
        let (mut log_open, mut events_open) = (true, true);
        while log_open || events_open {
            tokio::select! {
                n = rx.log.recv(), if log_open => match n {
                    Some(n) => notices.push(n),
                    None => log_open = false,
                },
                e = rx.events.recv(), if events_open => match e {
                    Some(e) => events.push(e),
                    None => events_open = false,
                },
            }
        }
        (notices, events)
    }

    fn statuses(notices: &[LogNotice]) -> Vec<String> {
        notices
            .iter()
            .filter_map(|n| match n {
                LogNotice::Status(s) => Some(s.clone()),
                LogNotice::Done(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_update_sends_milestones_then_done() {
        let engine = Arc::new(
            MockEngine::new()
                .with_events(vec![
                    LifecycleEvent::pre("urn:bucket", "aws:s3/bucket:Bucket"),
                    LifecycleEvent::post("urn:bucket", "aws:s3/bucket:Bucket"),
                ])
                .with_output("websiteUrl", json!("example.com")),
        );
        let (relays, rx) = relay::channels();
        let handle = tokio::spawn(task(engine.clone(), ApplyMode::Update).run(relays, CancellationToken::new()));

        let (notices, events) = collect(rx).await;
        let outcome = handle.await.unwrap().unwrap();

        assert_eq!(outcome, DeployOutcome::Succeeded);
        assert_eq!(events.len(), 2);
        assert_eq!(
            statuses(&notices),
            vec![
                "Created/Selected stack \"dev\"",
                "Installing the AWS plugin",
                "Successfully installed AWS plugin",
                "Successfully set config",
                "Running refresh...",
                "Refresh succeeded!",
                "Running update...",
                "Update succeeded!",
                "URL: example.com",
            ]
        );
        assert_eq!(notices.last(), Some(&LogNotice::Done(DeployOutcome::Succeeded)));
        assert_eq!(
            engine.calls(),
            vec![
                "acquire_stack dev",
                "install_plugin aws v3.2.1",
                "set_config aws:region=us-west-2",
                "refresh",
                "apply update",
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_failure_still_sends_done_once() {
        let engine = Arc::new(MockEngine::new().failing_at(MockStep::Apply));
        let (relays, rx) = relay::channels();
        let handle = tokio::spawn(task(engine, ApplyMode::Update).run(relays, CancellationToken::new()));

        let (notices, _) = collect(rx).await;
        let outcome = handle.await.unwrap().unwrap();

        assert!(matches!(outcome, DeployOutcome::Failed(_)));
        let done: Vec<_> = notices.iter().filter(|n| n.is_done()).collect();
        assert_eq!(done.len(), 1);
        assert!(notices.last().unwrap().is_done());
        assert!(!statuses(&notices).contains(&"Update succeeded!".to_string()));
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal_without_done() {
        for step in [
            MockStep::AcquireStack,
            MockStep::InstallPlugin,
            MockStep::SetConfig,
            MockStep::Refresh,
        ] {
            let engine = Arc::new(MockEngine::new().failing_at(step));
            let (relays, rx) = relay::channels();
            let handle = tokio::spawn(task(engine.clone(), ApplyMode::Update).run(relays, CancellationToken::new()));

            let (notices, _) = collect(rx).await;
            let err = handle.await.unwrap().unwrap_err();

            assert!(err.is_fatal(), "{:?} should be fatal", step);
            assert!(notices.iter().all(|n| !n.is_done()));
            assert!(!engine.calls().iter().any(|c| c.starts_with("apply")));
        }
    }

    #[tokio::test]
    async fn test_missing_website_url_is_fatal() {
        let engine = Arc::new(MockEngine::new().with_output("websiteUrl", json!(42)));
        let (relays, rx) = relay::channels();
        let handle = tokio::spawn(task(engine, ApplyMode::Update).run(relays, CancellationToken::new()));

        let (notices, _) = collect(rx).await;
        let err = handle.await.unwrap().unwrap_err();

        assert!(matches!(err, DeployError::MissingOutput { .. }));
        assert!(notices.iter().all(|n| !n.is_done()));
    }

    #[tokio::test]
    async fn test_unreadable_outputs_are_fatal() {
        let engine = Arc::new(
            MockEngine::new()
                .with_output("websiteUrl", json!("example.com"))
                .failing_at(MockStep::Outputs),
        );
        let (relays, rx) = relay::channels();
        let handle = tokio::spawn(task(engine, ApplyMode::Update).run(relays, CancellationToken::new()));

        let (notices, _) = collect(rx).await;
        let err = handle.await.unwrap().unwrap_err();

        assert!(matches!(err, DeployError::MissingOutput { .. }));
        assert!(err.is_fatal());
        assert!(notices.iter().all(|n| !n.is_done()));
        assert!(!statuses(&notices).contains(&"Update succeeded!".to_string()));
    }

    #[test]
    fn test_apply_failure_tiers() {
        let failed = apply_failure(DeployError::Apply {
            operation: "update".into(),
            details: "conflict".into(),
        });
        assert!(matches!(failed, Ok(DeployOutcome::Failed(_))));
        assert!(matches!(apply_failure(DeployError::Cancelled), Err(DeployError::Cancelled)));
        assert!(apply_failure(DeployError::MissingOutput {
            name: "*".into(),
            details: "no stack".into(),
        })
        .is_err());
    }

    /// Log sink for checking what reaches stderr while the UI is up
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_apply_failure_quiet_at_default_level() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = Arc::new(MockEngine::new().failing_at(MockStep::Apply));
        let (relays, rx) = relay::channels();
        let run = task(engine, ApplyMode::Update).run(relays, CancellationToken::new());
        let (outcome, (notices, _)) = tokio::join!(run, collect(rx));

        assert!(matches!(outcome.unwrap(), DeployOutcome::Failed(_)));
        assert!(notices.last().unwrap().is_done());
        let written = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(written.is_empty(), "unexpected log output: {}", written);
    }

    #[tokio::test]
    async fn test_destroy_with_stack_removal() {
        let engine = Arc::new(MockEngine::new());
        let mut config = DeployConfig::default();
        config.remove_stack_on_destroy = true;
        let program = Program::s3_website(&config.project_name).unwrap();
        let task = DeploymentTask::new(engine.clone(), config, program, ApplyMode::Destroy);

        let (relays, rx) = relay::channels();
        let handle = tokio::spawn(task.run(relays, CancellationToken::new()));
        let (notices, _) = collect(rx).await;

        assert_eq!(handle.await.unwrap().unwrap(), DeployOutcome::Succeeded);
        let statuses = statuses(&notices);
        assert!(statuses.contains(&"Running destroy...".to_string()));
        assert!(statuses.contains(&"Stack successfully destroyed".to_string()));
        assert!(statuses.contains(&"Deleting stack...".to_string()));
        assert_eq!(engine.calls().last().map(String::as_str), Some("remove_stack dev"));
    }

    #[tokio::test]
    async fn test_cancelled_before_apply() {
        let engine = Arc::new(MockEngine::new());
        let (relays, rx) = relay::channels();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let handle = tokio::spawn(task(engine.clone(), ApplyMode::Update).run(relays, cancel));
        let (notices, _) = collect(rx).await;

        assert!(matches!(handle.await.unwrap(), Err(DeployError::Cancelled)));
        assert!(notices.iter().all(|n| !n.is_done()));
        assert_eq!(engine.calls(), vec!["acquire_stack dev"]);
    }
}
