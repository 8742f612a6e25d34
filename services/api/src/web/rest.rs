//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiResult;
use crate::web::middleware::OwnerId;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use chess_trainer_core::{
    builder::{create_game, GameSubmission},
    domain::{Game, Move},
    pgn,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_games_handler,
        create_game_handler,
        get_game_handler,
        export_pgn_handler,
    ),
    components(
        schemas(CreateGameRequest, MoveRequest, GameResponse, MoveResponse)
    ),
    tags(
        (name = "Chess Trainer API", description = "Record tip-assisted games and export them as PGN.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The request body for recording a game.
///
/// Only used for documentation; the handler validates the raw JSON so that
/// every problem can be reported at once.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateGameRequest {
    game_id: String,
    event: String,
    site: String,
    /// `YYYY-MM-DD` or `YYYY.MM.DD`.
    date: String,
    round: Option<String>,
    white: String,
    black: String,
    result: String,
    selected_tips: String,
    /// The full movetext, e.g. `1. e4 e5 2. Nf3`.
    moves: String,
    moves_count: String,
    game_time: String,
    moves_details: Vec<MoveRequest>,
}

/// One ply as submitted by the client.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct MoveRequest {
    move_order_number: u32,
    move_from: String,
    move_to: String,
    tip_received: Option<bool>,
    tip_followed: Option<bool>,
    best_move: Option<String>,
    move_time_spend: u32,
    cp_diff: Option<String>,
    first_pos_cp: Option<String>,
    second_pos_cp: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MoveResponse {
    move_order_number: u32,
    move_from: String,
    move_to: String,
    tip_received: bool,
    tip_followed: bool,
    best_move: String,
    move_time_spend: u32,
    cp_diff: String,
    first_pos_cp: String,
    second_pos_cp: String,
}

impl From<Move> for MoveResponse {
    fn from(mv: Move) -> Self {
        Self {
            move_order_number: mv.move_order_number,
            move_from: mv.move_from,
            move_to: mv.move_to,
            tip_received: mv.tip_received,
            tip_followed: mv.tip_followed,
            best_move: mv.best_move,
            move_time_spend: mv.move_time_spend,
            cp_diff: mv.cp_diff,
            first_pos_cp: mv.first_pos_cp,
            second_pos_cp: mv.second_pos_cp,
        }
    }
}

/// A recorded game with its moves.
#[derive(Serialize, ToSchema)]
pub struct GameResponse {
    game_id: String,
    event: String,
    site: String,
    date: NaiveDate,
    round: String,
    white: String,
    black: String,
    result: String,
    selected_tips: String,
    tips_found_percent: f64,
    tips_received_count: u32,
    moves: String,
    moves_count: String,
    game_time: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    moves_details: Vec<MoveResponse>,
}

impl From<Game> for GameResponse {
    fn from(game: Game) -> Self {
        Self {
            game_id: game.game_id,
            event: game.header.event,
            site: game.header.site,
            date: game.header.date,
            round: game.header.round,
            white: game.header.white,
            black: game.header.black,
            result: game.header.result,
            selected_tips: game.header.selected_tips,
            tips_found_percent: game.tips_found_percent,
            tips_received_count: game.tips_received_count,
            moves: game.moves_text,
            moves_count: game.moves_count,
            game_time: game.game_time,
            created_at: game.created_at,
            updated_at: game.updated_at,
            moves_details: game.moves.into_iter().map(MoveResponse::from).collect(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's games, newest first.
#[utoipa::path(
    get,
    path = "/games",
    responses(
        (status = 200, description = "Games of the caller", body = [GameResponse]),
        (status = 401, description = "Missing or invalid x-user-id header")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_games_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<OwnerId>,
) -> ApiResult<Json<Vec<GameResponse>>> {
    let games = app_state.games.list_by_owner(owner.0).await?;
    Ok(Json(games.into_iter().map(GameResponse::from).collect()))
}

/// Record a finished game together with its per-move tip data.
///
/// Header and move errors are all reported in one response.
#[utoipa::path(
    post,
    path = "/games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game recorded", body = GameResponse),
        (status = 400, description = "Body is not a JSON object, or validation errors keyed by header field and move index"),
        (status = 409, description = "A game with this game_id already exists"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_game_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<OwnerId>,
    payload: Result<Json<GameSubmission>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(submission) = payload?;
    let game = create_game(app_state.games.as_ref(), owner.0, &submission).await?;
    info!(
        game_id = %game.game_id,
        owner_id = %owner.0,
        tips_received = game.tips_received_count,
        "Recorded game"
    );
    Ok((StatusCode::CREATED, Json(GameResponse::from(game))))
}

/// Fetch one of the caller's games.
#[utoipa::path(
    get,
    path = "/games/{game_id}",
    responses(
        (status = 200, description = "The game", body = GameResponse),
        (status = 404, description = "No such game for this user")
    ),
    params(
        ("game_id" = String, Path, description = "Identifier assigned when the game was recorded."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_game_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<OwnerId>,
    Path(game_id): Path<String>,
) -> ApiResult<Json<GameResponse>> {
    let game = app_state.games.get_by_owner(owner.0, &game_id).await?;
    Ok(Json(GameResponse::from(game)))
}

/// Download a game as a PGN file.
///
/// With `EXPORT_SCOPE=owner` the `x-user-id` header is required and only the
/// owner's games are served.
#[utoipa::path(
    get,
    path = "/games/{game_id}/pgn",
    responses(
        (status = 200, description = "PGN file", content_type = "application/octet-stream", body = String),
        (status = 404, description = "No such game")
    ),
    params(
        ("game_id" = String, Path, description = "Identifier assigned when the game was recorded.")
    )
)]
pub async fn export_pgn_handler(
    State(app_state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> ApiResult<Response> {
    let game = app_state.games.get_by_id(&game_id).await?;
    Ok(pgn_download(&game))
}

/// Owner-scoped variant of [`export_pgn_handler`].
pub async fn export_owned_pgn_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(owner): Extension<OwnerId>,
    Path(game_id): Path<String>,
) -> ApiResult<Response> {
    let game = app_state.games.get_by_owner(owner.0, &game_id).await?;
    Ok(pgn_download(&game))
}

fn pgn_download(game: &Game) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        pgn::file_name(&game.game_id)
    );
    (
        [
            (header::CONTENT_TYPE, pgn::MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(pgn::render(game)),
    )
        .into_response()
}
