//! TUI Module - live deployment progress
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RENDER LAYER (render.rs)                       │
//! │  Pure ViewState → text frame. No side effects.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ ViewState
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              COORDINATOR (coordinator.rs, state.rs)                 │
//! │  One message at a time from spinner / log / events / keys.          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ relays (capacity 1)
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                DEPLOYMENT TASK (crate::deploy)                      │
//! │  Engine calls. Pushes notices and lifecycle events.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod events;
mod spinner;
mod state;

pub mod coordinator;
pub mod render;

pub use app::TuiApp;
pub use coordinator::{handle, Command, Coordinator, ExitReason, KeyPress, Message};
pub use spinner::{Spinner, DOT};
pub use state::ViewState;

use crate::config::DeployConfig;
use crate::engine::ApplyMode;
use crate::error::DeployError;

/// Run the deployment TUI
pub async fn run(config: DeployConfig, mode: ApplyMode) -> Result<ExitReason, DeployError> {
    TuiApp::new(config, mode).run().await
}
