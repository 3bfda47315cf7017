//! Route table and per-route authentication declarations.

pub mod auth;
pub mod connections;
pub mod users;

use axum::Router;
use kinship_auth::{AuthType, MetadataRegistry, TokenKind};

use crate::state::AppState;

/// Authentication requirements of every route.
///
/// The auth controller is public except for `refresh`, which takes a
/// refresh token. Everything else falls back to bearer access tokens.
pub fn registry() -> MetadataRegistry {
    MetadataRegistry::builder()
        .controller_auth(auth::CONTROLLER, [AuthType::None])
        .handler_auth(auth::REFRESH, [AuthType::Bearer])
        .handler_token_kind(auth::REFRESH, TokenKind::Refresh)
        .controller_token_kind(connections::CONTROLLER, TokenKind::Access)
        .build()
}

/// All API routes, each wrapped with the guard chain.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::routes(state))
        .merge(users::routes(state))
        .merge(connections::routes(state))
}
