//! Engine Bridge - Connector Layer
//!
//! Abstracts the infrastructure-as-code engine for the deployment task.
//! `PulumiCli` drives the real `pulumi` binary; `MockEngine` replays a script
//! for tests and the demo mode.

pub mod events;
mod mock;
mod pulumi;

pub use mock::{MockEngine, MockStep};
pub use pulumi::PulumiCli;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DeployError;
use crate::program::Program;
use crate::relay::EventSender;

// ─────────────────────────────────────────────────────────────────────────────
// Engine Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Operations the deployment task needs from the engine
#[async_trait]
pub trait Engine: Send + Sync {
    /// Create the stack if needed and select it, with `program` as its source
    async fn acquire_stack(&self, name: &str, program: &Program) -> Result<Stack, DeployError>;

    /// Install a resource provider plugin
    async fn install_plugin(
        &self,
        stack: &Stack,
        name: &str,
        version: &str,
    ) -> Result<(), DeployError>;

    /// Set one stack configuration value
    async fn set_config(&self, stack: &Stack, key: &str, value: &str) -> Result<(), DeployError>;

    /// Reconcile the stack state with the cloud
    async fn refresh(&self, stack: &Stack) -> Result<(), DeployError>;

    /// Run an update or destroy, streaming lifecycle events into `sink`
    async fn apply(
        &self,
        stack: &Stack,
        mode: ApplyMode,
        sink: EventSender,
        cancel: CancellationToken,
    ) -> Result<ApplyResult, DeployError>;

    /// Delete the (empty) stack
    async fn remove_stack(&self, stack: &Stack) -> Result<(), DeployError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Stack + Apply types
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to an engine-tracked stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Update,
    Destroy,
}

impl ApplyMode {
    /// `destroy` (exact, case-sensitive) selects teardown; anything else updates
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("destroy") => Self::Destroy,
            _ => Self::Update,
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// Result of a successful `apply`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyResult {
    pub outputs: HashMap<String, serde_json::Value>,
}

impl ApplyResult {
    /// Read a string-valued stack output
    pub fn string_output(&self, name: &str) -> Result<&str, DeployError> {
        match self.outputs.get(name) {
            Some(serde_json::Value::String(value)) => Ok(value),
            Some(other) => Err(DeployError::MissingOutput {
                name: name.to_string(),
                details: format!("expected a string, got {}", other),
            }),
            None => Err(DeployError::MissingOutput {
                name: name.to_string(),
                details: "not exported by the stack".to_string(),
            }),
        }
    }
}
