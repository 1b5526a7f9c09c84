//! Coordinator - the UI update loop
//!
//! Four sources feed the loop: the spinner timer, the log relay, the event
//! relay and the keyboard. Each source is armed for one message at a time.
//! When a message arrives its source is disarmed, `handle` applies it to the
//! state and answers with the command saying which source to wait on next.
//!
//! ```text
//!   spinner ──┐
//!   log ──────┤  one message   ┌────────┐  Command   ┌─────────┐
//!   events ───┼──────────────► │ handle │ ─────────► │ re-arm  │
//!   keys ─────┘                └────────┘            │ or quit │
//!                                   │                └─────────┘
//!                                   ▼ draw(&ViewState)
//! ```

use futures::{Stream, StreamExt};
use tokio::time::Interval;

use super::state::ViewState;
use crate::error::DeployError;
use crate::relay::{
    DeployOutcome, EventReceiver, LifecycleEvent, LogNotice, LogReceiver, RelayReceivers,
};

/// Text shown once the deployment reports success
pub const SUCCEEDED_MESSAGE: &str = "Succeeded!";

/// A key press; any key interrupts the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress;

/// Input to the update rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Lifecycle(LifecycleEvent),
    Tick,
    Interrupt,
    Log(LogNotice),
}

/// What the loop does after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AwaitEvent,
    AwaitTick,
    AwaitLog,
    Quit,
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Completed(DeployOutcome),
    Interrupted,
}

/// Apply one message to the state. The only place `ViewState` changes.
pub fn handle(state: &mut ViewState, message: Message) -> Command {
    match message {
        Message::Lifecycle(LifecycleEvent::PreUpdate {
            resource_id,
            resource_kind,
        }) => {
            state.in_progress.insert(resource_id, resource_kind);
            Command::AwaitEvent
        }
        Message::Lifecycle(LifecycleEvent::PostUpdate {
            resource_id,
            resource_kind,
        }) => {
            state.in_progress.remove(&resource_id);
            state.completed.insert(resource_id, resource_kind);
            Command::AwaitEvent
        }
        Message::Tick => {
            state.spinner_frame = state.spinner.step(state.spinner_frame);
            Command::AwaitTick
        }
        Message::Interrupt => {
            state.quitting = true;
            Command::Quit
        }
        Message::Log(LogNotice::Done(outcome)) => {
            state.current_message = match outcome {
                DeployOutcome::Succeeded => SUCCEEDED_MESSAGE.to_string(),
                DeployOutcome::Failed(reason) => format!("Failed: {}", reason),
            };
            state.quitting = true;
            Command::Quit
        }
        Message::Log(LogNotice::Status(text)) => {
            state.current_message = text;
            Command::AwaitLog
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    log: bool,
    events: bool,
    tick: bool,
    keys: bool,
}

impl Armed {
    fn all() -> Self {
        Self {
            log: true,
            events: true,
            tick: true,
            keys: true,
        }
    }

    fn rearm(&mut self, command: Command) {
        match command {
            Command::AwaitEvent => self.events = true,
            Command::AwaitTick => self.tick = true,
            Command::AwaitLog => self.log = true,
            Command::Quit => {}
        }
    }
}

/// Owns the view state and the consumer ends of every source
pub struct Coordinator<K> {
    state: ViewState,
    log: LogReceiver,
    events: EventReceiver,
    ticker: Interval,
    keys: K,
}

impl<K> Coordinator<K>
where
    K: Stream<Item = KeyPress> + Unpin,
{
    pub fn new(state: ViewState, relays: RelayReceivers, keys: K) -> Self {
        let ticker = state.spinner.ticker();
        Self {
            state,
            log: relays.log,
            events: relays.events,
            ticker,
            keys,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Run until a terminal message, calling `draw` after every transition
    pub async fn run<F>(&mut self, mut draw: F) -> Result<ExitReason, DeployError>
    where
        F: FnMut(&ViewState) -> Result<(), DeployError>,
    {
        let mut armed = Armed::all();
        draw(&self.state)?;

        // The tick branch is re-armed after every tick, so one branch is
        // always enabled
        loop {
            let message = tokio::select! {
                notice = self.log.recv(), if armed.log => {
                    armed.log = false;
                    match notice {
                        Some(notice) => Message::Log(notice),
                        None => {
                            tracing::debug!("log relay closed");
                            continue;
                        }
                    }
                }
                event = self.events.recv(), if armed.events => {
                    armed.events = false;
                    match event {
                        Some(event) => Message::Lifecycle(event),
                        None => continue,
                    }
                }
                _ = self.ticker.tick(), if armed.tick => {
                    armed.tick = false;
                    Message::Tick
                }
                key = self.keys.next(), if armed.keys => match key {
                    Some(KeyPress) => Message::Interrupt,
                    None => {
                        armed.keys = false;
                        continue;
                    }
                },
            };

            let exit = match &message {
                Message::Interrupt => Some(ExitReason::Interrupted),
                Message::Log(LogNotice::Done(outcome)) => Some(ExitReason::Completed(outcome.clone())),
                _ => None,
            };

            let command = handle(&mut self.state, message);
            draw(&self.state)?;

            match command {
                Command::Quit => return Ok(exit.unwrap_or(ExitReason::Interrupted)),
                other => armed.rearm(other),
            }
        }
    }
}
