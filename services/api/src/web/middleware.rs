//! services/api/src/web/middleware.rs
//!
//! Owner-identity middleware for protecting routes.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's id, set by the upstream gateway.
pub const OWNER_HEADER: &str = "x-user-id";

/// The user on whose behalf the request is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

/// Middleware that extracts the owner id from the `x-user-id` header.
///
/// If valid, inserts an [`OwnerId`] into request extensions for handlers to use.
/// If missing or malformed, returns 401 Unauthorized.
pub async fn require_owner(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("{} header is required", OWNER_HEADER)))?;

    let owner_id = Uuid::parse_str(header_value.trim()).map_err(|_| {
        debug!(value = header_value, "Rejected malformed owner id");
        ApiError::Unauthorized(format!("Invalid {} format", OWNER_HEADER))
    })?;

    req.extensions_mut().insert(OwnerId(owner_id));

    Ok(next.run(req).await)
}
