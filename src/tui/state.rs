//! ViewState - Domain Layer
//!
//! The single piece of mutable UI state. Only the coordinator writes to it;
//! the renderer reads it.

use std::collections::HashMap;

use super::spinner::Spinner;

/// Main view state
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub spinner: Spinner,
    pub spinner_frame: usize,

    /// Fixed at startup
    pub destroy_requested: bool,
    pub quitting: bool,
    pub current_message: String,

    /// resource id -> resource kind, for changes that have started
    pub in_progress: HashMap<String, String>,
    /// resource id -> resource kind, for changes that have finished
    pub completed: HashMap<String, String>,
}

impl ViewState {
    pub fn new(destroy_requested: bool, spinner: Spinner) -> Self {
        Self {
            spinner,
            spinner_frame: 0,
            destroy_requested,
            quitting: false,
            current_message: String::new(),
            in_progress: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    pub fn has_resources(&self) -> bool {
        !self.in_progress.is_empty() || !self.completed.is_empty()
    }

    /// Kinds of resources being changed, sorted
    pub fn in_progress_kinds(&self) -> Vec<&str> {
        sorted_kinds(&self.in_progress)
    }

    /// Kinds of resources already changed, sorted
    pub fn completed_kinds(&self) -> Vec<&str> {
        sorted_kinds(&self.completed)
    }

    pub fn spinner_text(&self) -> &'static str {
        self.spinner.frame(self.spinner_frame)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(false, Spinner::default())
    }
}

fn sorted_kinds(map: &HashMap<String, String>) -> Vec<&str> {
    let mut kinds: Vec<&str> = map.values().map(String::as_str).collect();
    kinds.sort_unstable();
    kinds
}
