//! `/v1/auth` handlers.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use kinship_auth::{HandlerRef, TokenPair};

use crate::dto::{HealthResponse, SessionResponse, SignInRequest, SignUpRequest, VerifyEmailRequest};
use crate::envelope::Success;
use crate::error::ApiError;
use crate::extract::{ActiveUser, ValidJson};
use crate::guard::guarded;
use crate::state::AppState;

pub(crate) const CONTROLLER: &str = "auth";

/// `GET /v1/auth/health-check`
pub const HEALTH_CHECK: HandlerRef = HandlerRef::new(CONTROLLER, "health_check");
/// `POST /v1/auth/verify-email`
pub const VERIFY_EMAIL: HandlerRef = HandlerRef::new(CONTROLLER, "verify_email");
/// `POST /v1/auth/sign-up`
pub const SIGN_UP: HandlerRef = HandlerRef::new(CONTROLLER, "sign_up");
/// `POST /v1/auth/sign-in`
pub const SIGN_IN: HandlerRef = HandlerRef::new(CONTROLLER, "sign_in");
/// `GET /v1/auth/refresh`
pub const REFRESH: HandlerRef = HandlerRef::new(CONTROLLER, "refresh");

pub(crate) fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/v1/auth/health-check",
            guarded(state, HEALTH_CHECK, get(health_check)),
        )
        .route(
            "/v1/auth/verify-email",
            guarded(state, VERIFY_EMAIL, post(verify_email)),
        )
        .route("/v1/auth/sign-up", guarded(state, SIGN_UP, post(sign_up)))
        .route("/v1/auth/sign-in", guarded(state, SIGN_IN, post(sign_in)))
        .route("/v1/auth/refresh", guarded(state, REFRESH, get(refresh)))
}

async fn health_check() -> Success<HealthResponse> {
    Success::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Returns `true` when the email is free.
async fn verify_email(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<VerifyEmailRequest>,
) -> Result<Success<bool>, ApiError> {
    Ok(Success::ok(state.auth.email_available(&req.email).await?))
}

async fn sign_up(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SignUpRequest>,
) -> Result<Success<SessionResponse>, ApiError> {
    let session = state.auth.register(req.into()).await?;
    Ok(Success::created(session.into()))
}

async fn sign_in(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SignInRequest>,
) -> Result<Success<SessionResponse>, ApiError> {
    let session = state.auth.login(&req.identifier, &req.password).await?;
    Ok(Success::ok(session.into()))
}

async fn refresh(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
) -> Result<Success<TokenPair>, ApiError> {
    Ok(Success::ok(state.auth.refresh(&principal).await?))
}
