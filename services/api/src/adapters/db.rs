//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `GameRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chess_trainer_core::domain::{Game, GameHeader, Move, NewGame};
use chess_trainer_core::ports::{GameRepository, PortError, PortResult};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

/// Column list for the `chess_games` table.
const GAME_COLUMNS: &str = "game_id, owner_id, event, site, game_date, round, white, black, \
    result, selected_tips, tips_found_percent, tips_received_count, moves_text, moves_count, \
    game_time, created_at, updated_at";

/// Column list for the `chess_moves` table.
const MOVE_COLUMNS: &str = "game_id, move_order_number, move_from, move_to, tip_received, \
    tip_followed, best_move, move_time_spend, cp_diff, first_pos_cp, second_pos_cp";

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `GameRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the moves of every listed game in one query, keyed by game.
    async fn moves_for_games(
        &self,
        game_ids: &[String],
    ) -> PortResult<HashMap<String, Vec<Move>>> {
        let query = format!(
            "SELECT {MOVE_COLUMNS} FROM chess_moves \
             WHERE game_id = ANY($1) \
             ORDER BY game_id, move_order_number ASC"
        );
        let records = sqlx::query_as::<_, MoveRecord>(&query)
            .bind(game_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut by_game: HashMap<String, Vec<Move>> = HashMap::new();
        for record in records {
            let game_id = record.game_id.clone();
            by_game.entry(game_id).or_default().push(record.to_domain());
        }
        Ok(by_game)
    }

    async fn with_moves(&self, record: GameRecord) -> PortResult<Game> {
        let mut moves = self.moves_for_games(&[record.game_id.clone()]).await?;
        let game_moves = moves.remove(&record.game_id).unwrap_or_default();
        Ok(record.to_domain(game_moves))
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct GameRecord {
    game_id: String,
    owner_id: Uuid,
    event: String,
    site: String,
    game_date: NaiveDate,
    round: String,
    white: String,
    black: String,
    result: String,
    selected_tips: String,
    tips_found_percent: f64,
    tips_received_count: i32,
    moves_text: String,
    moves_count: String,
    game_time: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl GameRecord {
    fn to_domain(self, moves: Vec<Move>) -> Game {
        Game {
            game_id: self.game_id,
            owner_id: self.owner_id,
            header: GameHeader {
                event: self.event,
                site: self.site,
                date: self.game_date,
                round: self.round,
                white: self.white,
                black: self.black,
                result: self.result,
                selected_tips: self.selected_tips,
            },
            tips_found_percent: self.tips_found_percent,
            tips_received_count: self.tips_received_count as u32,
            moves_text: self.moves_text,
            moves_count: self.moves_count,
            game_time: self.game_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
            moves,
        }
    }
}

#[derive(FromRow)]
struct MoveRecord {
    game_id: String,
    move_order_number: i32,
    move_from: String,
    move_to: String,
    tip_received: bool,
    tip_followed: bool,
    best_move: String,
    move_time_spend: i32,
    cp_diff: String,
    first_pos_cp: String,
    second_pos_cp: String,
}
impl MoveRecord {
    fn to_domain(self) -> Move {
        Move {
            move_order_number: self.move_order_number as u32,
            move_from: self.move_from,
            move_to: self.move_to,
            tip_received: self.tip_received,
            tip_followed: self.tip_followed,
            best_move: self.best_move,
            move_time_spend: self.move_time_spend as u32,
            cp_diff: self.cp_diff,
            first_pos_cp: self.first_pos_cp,
            second_pos_cp: self.second_pos_cp,
        }
    }
}

//=========================================================================================
// `GameRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl GameRepository for DbAdapter {
    async fn list_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Game>> {
        let query = format!(
            "SELECT {GAME_COLUMNS} FROM chess_games \
             WHERE owner_id = $1 \
             ORDER BY game_date DESC, created_at DESC, seq DESC"
        );
        let records = sqlx::query_as::<_, GameRecord>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let game_ids: Vec<String> = records.iter().map(|r| r.game_id.clone()).collect();
        let mut moves = self.moves_for_games(&game_ids).await?;

        let games = records
            .into_iter()
            .map(|r| {
                let game_moves = moves.remove(&r.game_id).unwrap_or_default();
                r.to_domain(game_moves)
            })
            .collect();
        Ok(games)
    }

    async fn get_by_owner(&self, owner_id: Uuid, game_id: &str) -> PortResult<Game> {
        let query =
            format!("SELECT {GAME_COLUMNS} FROM chess_games WHERE game_id = $1 AND owner_id = $2");
        let record = sqlx::query_as::<_, GameRecord>(&query)
            .bind(game_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Game {} not found", game_id)))?;
        self.with_moves(record).await
    }

    async fn get_by_id(&self, game_id: &str) -> PortResult<Game> {
        let query = format!("SELECT {GAME_COLUMNS} FROM chess_games WHERE game_id = $1");
        let record = sqlx::query_as::<_, GameRecord>(&query)
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Game {} not found", game_id)))?;
        self.with_moves(record).await
    }

    async fn create(&self, game: NewGame) -> PortResult<Game> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let insert_game = format!(
            "INSERT INTO chess_games \
                (game_id, owner_id, event, site, game_date, round, white, black, result, \
                 selected_tips, tips_found_percent, tips_received_count, moves_text, \
                 moves_count, game_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {GAME_COLUMNS}"
        );
        let record = sqlx::query_as::<_, GameRecord>(&insert_game)
            .bind(&game.game_id)
            .bind(game.owner_id)
            .bind(&game.header.event)
            .bind(&game.header.site)
            .bind(game.header.date)
            .bind(&game.header.round)
            .bind(&game.header.white)
            .bind(&game.header.black)
            .bind(&game.header.result)
            .bind(&game.header.selected_tips)
            .bind(game.tips_found_percent)
            .bind(to_db_int(game.tips_received_count)?)
            .bind(&game.moves_text)
            .bind(&game.moves_count)
            .bind(&game.game_time)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err)
                    if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
                {
                    PortError::Conflict(format!("Game {} already exists", game.game_id))
                }
                other => unexpected(other),
            })?;

        insert_moves(&mut tx, &game.game_id, &game.moves).await?;

        // Dropping `tx` on any earlier `?` rolls back the game row as well.
        tx.commit().await.map_err(unexpected)?;
        info!(game_id = %game.game_id, moves = game.moves.len(), "Stored game");

        Ok(record.to_domain(game.moves))
    }
}

async fn insert_moves(
    tx: &mut Transaction<'_, Postgres>,
    game_id: &str,
    moves: &[Move],
) -> PortResult<()> {
    let insert_move = format!(
        "INSERT INTO chess_moves ({MOVE_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    );
    for mv in moves {
        sqlx::query(&insert_move)
            .bind(game_id)
            .bind(to_db_int(mv.move_order_number)?)
            .bind(&mv.move_from)
            .bind(&mv.move_to)
            .bind(mv.tip_received)
            .bind(mv.tip_followed)
            .bind(&mv.best_move)
            .bind(to_db_int(mv.move_time_spend)?)
            .bind(&mv.cp_diff)
            .bind(&mv.first_pos_cp)
            .bind(&mv.second_pos_cp)
            .execute(&mut **tx)
            .await
            .map_err(unexpected)?;
    }
    debug!(game_id, count = moves.len(), "Inserted moves");
    Ok(())
}

fn to_db_int(value: u32) -> PortResult<i32> {
    i32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("{} does not fit an integer column", value)))
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}
