//! `/v1/users` handlers. All require an access token.

use axum::{
    extract::State,
    routing::{delete, get, patch},
    Router,
};
use kinship_auth::HandlerRef;

use crate::dto::{UpdateProfileRequest, UserResponse};
use crate::envelope::Success;
use crate::error::ApiError;
use crate::extract::{ActiveUser, ValidJson};
use crate::guard::guarded;
use crate::state::AppState;

const CONTROLLER: &str = "users";

/// `GET /v1/users/me`
pub const GET_ME: HandlerRef = HandlerRef::new(CONTROLLER, "get_me");
/// `PATCH /v1/users/me`
pub const UPDATE_ME: HandlerRef = HandlerRef::new(CONTROLLER, "update_me");
/// `DELETE /v1/users/me`
pub const DELETE_ME: HandlerRef = HandlerRef::new(CONTROLLER, "delete_me");

pub(crate) fn routes(state: &AppState) -> Router<AppState> {
    let me = guarded(state, GET_ME, get(get_me))
        .merge(guarded(state, UPDATE_ME, patch(update_me)))
        .merge(guarded(state, DELETE_ME, delete(delete_me)));

    Router::new().route("/v1/users/me", me)
}

async fn get_me(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
) -> Result<Success<UserResponse>, ApiError> {
    let user = state.auth.current_user(&principal).await?;
    Ok(Success::ok(user.into()))
}

async fn update_me(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<Success<UserResponse>, ApiError> {
    let user = state.auth.update_profile(&principal, req.into()).await?;
    Ok(Success::ok(user.into()))
}

async fn delete_me(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
) -> Result<Success<()>, ApiError> {
    state.auth.delete_account(&principal).await?;
    Ok(Success::ok(()))
}
