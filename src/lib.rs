//! sitedeploy - deploy a static S3 website with live terminal progress

pub mod config;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod program;
pub mod relay;
pub mod tui;

pub use config::{DeployConfig, EngineKind};
pub use deploy::DeploymentTask;
pub use engine::{ApplyMode, ApplyResult, Engine, MockEngine, PulumiCli, Stack};
pub use error::{DeployError, FixSuggestion};
pub use program::Program;
pub use relay::{DeployOutcome, LifecycleEvent, LogNotice, Relays};
pub use tui::{ExitReason, ViewState};
