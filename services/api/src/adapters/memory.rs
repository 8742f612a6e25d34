//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `GameRepository` port. Used by the
//! integration tests and by `STORAGE_BACKEND=memory` for local runs.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chess_trainer_core::domain::{Game, NewGame};
use chess_trainer_core::ports::{GameRepository, PortError, PortResult};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    games: HashMap<String, StoredGame>,
    next_seq: u64,
}

struct StoredGame {
    /// Insertion order; breaks ties between equal `created_at` values.
    seq: u64,
    game: Game,
}

/// Keeps every game in a map guarded by a single lock.
#[derive(Default)]
pub struct MemoryAdapter {
    state: RwLock<MemoryState>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for MemoryAdapter {
    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Game>> {
        let state = self.state.read().await;
        let mut owned: Vec<&StoredGame> = state
            .games
            .values()
            .filter(|stored| stored.game.owner_id == owner_id)
            .collect();
        owned.sort_by_key(|stored| {
            (
                Reverse(stored.game.header.date),
                Reverse(stored.game.created_at),
                Reverse(stored.seq),
            )
        });
        Ok(owned.into_iter().map(|stored| stored.game.clone()).collect())
    }

    async fn get_by_owner(&self, owner_id: Uuid, game_id: &str) -> PortResult<Game> {
        let state = self.state.read().await;
        state
            .games
            .get(game_id)
            .filter(|stored| stored.game.owner_id == owner_id)
            .map(|stored| stored.game.clone())
            .ok_or_else(|| PortError::NotFound(format!("Game {} not found", game_id)))
    }

    async fn get_by_id(&self, game_id: &str) -> PortResult<Game> {
        let state = self.state.read().await;
        state
            .games
            .get(game_id)
            .map(|stored| stored.game.clone())
            .ok_or_else(|| PortError::NotFound(format!("Game {} not found", game_id)))
    }

    async fn create(&self, game: NewGame) -> PortResult<Game> {
        let mut state = self.state.write().await;
        if state.games.contains_key(&game.game_id) {
            return Err(PortError::Conflict(format!(
                "Game {} already exists",
                game.game_id
            )));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let game = game.into_game(Utc::now());
        state.games.insert(
            game.game_id.clone(),
            StoredGame {
                seq,
                game: game.clone(),
            },
        );
        info!(game_id = %game.game_id, moves = game.moves.len(), "Stored game in memory");
        Ok(game)
    }
}
