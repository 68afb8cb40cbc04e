//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the session registry and collaborator clients.

use crate::{config::Config, registry::SessionRegistry};
use parley_core::turn::{Collaborators, TurnOrchestrator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub collaborators: Collaborators,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(collaborators: Collaborators, config: Config) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::default()),
            collaborators,
            config: Arc::new(config),
        }
    }

    /// Builds a fresh conversation with the configured transcript limit and
    /// fallback language.
    pub fn new_conversation(&self) -> TurnOrchestrator {
        TurnOrchestrator::new(&self.collaborators, self.config.transcript_limit)
            .with_default_language(self.config.default_language.clone())
    }
}
