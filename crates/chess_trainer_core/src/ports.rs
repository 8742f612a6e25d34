//! crates/chess_trainer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Game, NewGame};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for game aggregates.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// All games of `owner_id`, newest date first, later-created first on ties.
    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Game>>;

    async fn get_by_owner(&self, owner_id: Uuid, game_id: &str) -> PortResult<Game>;

    /// Looks a game up by identifier alone, regardless of who owns it.
    async fn get_by_id(&self, game_id: &str) -> PortResult<Game>;

    /// Stores the game and all of its moves as one unit.
    ///
    /// Fails with [`PortError::Conflict`] if `game_id` is already taken; the
    /// existing game is left untouched. On any failure nothing is stored.
    async fn create(&self, game: NewGame) -> PortResult<Game>;
}
