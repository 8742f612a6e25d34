//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chess_trainer_core::ports::GameRepository;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<dyn GameRepository>,
    pub config: Arc<Config>,
}
