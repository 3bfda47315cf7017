//! Guard chain middleware.
//!
//! Every route is wrapped with [`guarded`], which names the handler so the
//! chain can resolve its requirements. On success the principal, if any, is
//! stored in the request extensions for [`crate::extract::ActiveUser`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::MethodRouter,
};
use kinship_auth::{GuardChain, HandlerRef};

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware state for one route.
#[derive(Clone)]
pub struct RouteGuard {
    chain: Arc<GuardChain>,
    handler: HandlerRef,
}

/// Wraps `route` with the guard chain under the identity `handler`.
pub fn guarded(
    state: &AppState,
    handler: HandlerRef,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let guard = RouteGuard {
        chain: Arc::clone(&state.chain),
        handler,
    };
    route.route_layer(from_fn_with_state(guard, authorize))
}

async fn authorize(
    State(guard): State<RouteGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // A header that is not visible ASCII is treated as absent.
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if let Some(principal) = guard
        .chain
        .authorize(&guard.handler, authorization.as_deref())
        .await?
    {
        request.extensions_mut().insert(principal);
    }

    Ok(next.run(request).await)
}
