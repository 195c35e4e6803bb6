//! Shared application state.

use crate::config::Config;
use crate::dispatch::Dispatcher;
use std::sync::Arc;

/// Cloned into every handler. Holds nothing mutable: the language table
/// and clients are fixed at startup.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Dispatcher::from_config(config))
    }
}
