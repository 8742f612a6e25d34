//! services/api/src/web/router.rs
//!
//! Assembles the axum router shared by the binary and the integration tests.

use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{ConfigError, ExportScope};
use crate::error::ApiError;
use crate::web::middleware::{require_owner, OWNER_HEADER};
use crate::web::rest::{
    create_game_handler, export_owned_pgn_handler, export_pgn_handler, get_game_handler,
    list_games_handler,
};
use crate::web::state::AppState;

const PGN_ROUTE: &str = "/games/{game_id}/pgn";

/// Builds the API router for the given state.
///
/// Where the PGN export route lives depends on `config.export_scope`.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static(OWNER_HEADER)]);

    // Owner-scoped routes (x-user-id required)
    let protected_routes = Router::new()
        .route("/games", get(list_games_handler).post(create_game_handler))
        .route("/games/{game_id}", get(get_game_handler));

    let (protected_routes, public_routes) = match app_state.config.export_scope {
        ExportScope::Owner => (
            protected_routes.route(PGN_ROUTE, get(export_owned_pgn_handler)),
            Router::new(),
        ),
        ExportScope::Public => (
            protected_routes,
            Router::new().route(PGN_ROUTE, get(export_pgn_handler)),
        ),
    };

    let protected_routes =
        protected_routes.layer(axum_middleware::from_fn(require_owner));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
