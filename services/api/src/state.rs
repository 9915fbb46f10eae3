//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared quiz
//! workflow. The workflow owns the model clients and the session store.

use examiner_core::QuizWorkflow;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<QuizWorkflow>,
}

impl AppState {
    pub fn new(workflow: QuizWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}
