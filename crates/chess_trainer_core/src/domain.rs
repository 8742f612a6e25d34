//! crates/chess_trainer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Tag written to the `Round` header when the client does not send one.
pub const DEFAULT_ROUND: &str = "-";

/// One ply of a recorded game, together with its tip bookkeeping.
///
/// A `Move` only exists inside the [`Game`] that owns it; the owning game is
/// implied by the aggregate rather than stored on the move.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub move_order_number: u32,
    pub move_from: String,
    pub move_to: String,
    pub tip_received: bool,
    /// Always `false` when `tip_received` is `false`.
    pub tip_followed: bool,
    pub best_move: String,
    /// Seconds spent on this move.
    pub move_time_spend: u32,
    // Centipawn values as sent by the analysis engine; blank when unavailable.
    pub cp_diff: String,
    pub first_pos_cp: String,
    pub second_pos_cp: String,
}

/// The PGN seven-tag roster plus the trainer-specific header data.
#[derive(Debug, Clone, PartialEq)]
pub struct GameHeader {
    pub event: String,
    pub site: String,
    pub date: NaiveDate,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub selected_tips: String,
}

/// A validated game that has not been stored yet.
///
/// Built by [`crate::builder`]; the tip statistics are already derived from
/// `moves` and are never recomputed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub game_id: String,
    pub owner_id: Uuid,
    pub header: GameHeader,
    pub tips_found_percent: f64,
    pub tips_received_count: u32,
    pub moves_text: String,
    pub moves_count: String,
    pub game_time: String,
    pub moves: Vec<Move>,
}

/// A stored game: the aggregate root that owns its moves.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub game_id: String,
    pub owner_id: Uuid,
    pub header: GameHeader,
    pub tips_found_percent: f64,
    pub tips_received_count: u32,
    pub moves_text: String,
    pub moves_count: String,
    pub game_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sorted by `move_order_number`.
    pub moves: Vec<Move>,
}

impl NewGame {
    /// Turns a pending game into a stored one using the store's timestamp.
    pub fn into_game(self, stored_at: DateTime<Utc>) -> Game {
        Game {
            game_id: self.game_id,
            owner_id: self.owner_id,
            header: self.header,
            tips_found_percent: self.tips_found_percent,
            tips_received_count: self.tips_received_count,
            moves_text: self.moves_text,
            moves_count: self.moves_count,
            game_time: self.game_time,
            created_at: stored_at,
            updated_at: stored_at,
            moves: self.moves,
        }
    }
}
