//! Relays - single-slot channels between the deployment task and the UI
//!
//! Two independent streams flow from the deployment task to the coordinator:
//! operator notices and resource lifecycle events. Each relay holds at most one
//! undelivered message, so the producer waits until the UI has taken the
//! previous one. Ordering is FIFO per relay; nothing orders the two relays
//! against each other.

use tokio::sync::mpsc;

/// Legacy text that producers used to signal completion
pub const SUCCESS_SENTINEL: &str = "Success";

const RELAY_CAPACITY: usize = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A resource change observed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The resource's change is about to begin
    PreUpdate {
        resource_id: String,
        resource_kind: String,
    },
    /// The resource's change has finished
    PostUpdate {
        resource_id: String,
        resource_kind: String,
    },
}

impl LifecycleEvent {
    pub fn pre(resource_id: impl Into<String>, resource_kind: impl Into<String>) -> Self {
        Self::PreUpdate {
            resource_id: resource_id.into(),
            resource_kind: resource_kind.into(),
        }
    }

    pub fn post(resource_id: impl Into<String>, resource_kind: impl Into<String>) -> Self {
        Self::PostUpdate {
            resource_id: resource_id.into(),
            resource_kind: resource_kind.into(),
        }
    }
}

/// How the final engine operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Succeeded,
    Failed(String),
}

/// An operator-facing notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogNotice {
    /// Free-text progress message
    Status(String),
    /// Terminal signal; nothing follows it on the log relay
    Done(DeployOutcome),
}

impl LogNotice {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    /// Interpret raw text, mapping the legacy `"Success"` sentinel to `Done`
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text == SUCCESS_SENTINEL {
            Self::Done(DeployOutcome::Succeeded)
        } else {
            Self::Status(text)
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Senders
// ─────────────────────────────────────────────────────────────────────────────

/// Producer half of the log relay
#[derive(Debug, Clone)]
pub struct LogSender(mpsc::Sender<LogNotice>);

impl LogSender {
    /// Hand a notice to the UI, waiting for the slot to free up.
    ///
    /// Returns `false` if the UI has gone away.
    pub async fn send(&self, notice: LogNotice) -> bool {
        self.0.send(notice).await.is_ok()
    }

    pub async fn status(&self, text: impl Into<String>) -> bool {
        self.send(LogNotice::status(text)).await
    }
}

/// Producer half of the event relay
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::Sender<LifecycleEvent>);

impl EventSender {
    /// Hand an event to the UI; `false` if the UI has gone away
    pub async fn send(&self, event: LifecycleEvent) -> bool {
        self.0.send(event).await.is_ok()
    }
}

pub type LogReceiver = mpsc::Receiver<LogNotice>;
pub type EventReceiver = mpsc::Receiver<LifecycleEvent>;

/// Producer side of both relays, owned by the deployment task
#[derive(Debug, Clone)]
pub struct Relays {
    pub log: LogSender,
    pub events: EventSender,
}

/// Consumer side of both relays, owned by the coordinator
#[derive(Debug)]
pub struct RelayReceivers {
    pub log: LogReceiver,
    pub events: EventReceiver,
}

/// Create both relays
pub fn channels() -> (Relays, RelayReceivers) {
    let (log_tx, log_rx) = mpsc::channel(RELAY_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(RELAY_CAPACITY);
    (
        Relays {
            log: LogSender(log_tx),
            events: EventSender(event_tx),
        },
        RelayReceivers {
            log: log_rx,
            events: event_rx,
        },
    )
}
