//! # Kinship API
//!
//! REST API layer for Kinship.
//!
//! ## Endpoints
//!
//! - `/v1/auth/*` - health check, email availability, sign-up, sign-in, token refresh
//! - `/v1/users/me` - profile of the caller
//! - `/v1/connections/*` - the caller's connections
//!
//! Every route passes through the guard chain; see [`routes::registry`] for
//! the per-route requirements.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dto;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod guard;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::ApiError;
pub use routes::registry;
pub use state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::routes(&state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
