//! `/v1/connections` handlers. All require an access token.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};
use kinship_auth::HandlerRef;
use kinship_storage::{Connection, Page, StorageError};

use crate::dto::{
    check_id, ConnectionResponse, CreateConnectionRequest, PageResponse, PaginationQuery,
};
use crate::envelope::Success;
use crate::error::ApiError;
use crate::extract::{ActiveUser, ValidJson, ValidQuery};
use crate::guard::guarded;
use crate::state::AppState;

pub(crate) const CONTROLLER: &str = "connections";

/// `POST /v1/connections`
pub const CREATE: HandlerRef = HandlerRef::new(CONTROLLER, "create");
/// `GET /v1/connections`
pub const LIST: HandlerRef = HandlerRef::new(CONTROLLER, "list");
/// `DELETE /v1/connections/{id}`
pub const REMOVE: HandlerRef = HandlerRef::new(CONTROLLER, "remove");

pub(crate) fn routes(state: &AppState) -> Router<AppState> {
    let collection =
        guarded(state, CREATE, post(create)).merge(guarded(state, LIST, get(list)));

    Router::new()
        .route("/v1/connections", collection)
        .route("/v1/connections/{id}", guarded(state, REMOVE, delete(remove)))
}

fn connection_error(e: StorageError) -> ApiError {
    match e {
        StorageError::AlreadyExists(_) => ApiError::validation("Connection already exists"),
        StorageError::NotFound(_) => ApiError::NotFound("Connection not found".into()),
        e => e.into(),
    }
}

async fn describe(state: &AppState, connection: Connection) -> Result<ConnectionResponse, ApiError> {
    let other = state.users.find_by_id(&connection.connected_user_id).await?;
    Ok(ConnectionResponse::new(connection, other))
}

async fn create(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
    ValidJson(req): ValidJson<CreateConnectionRequest>,
) -> Result<Success<ConnectionResponse>, ApiError> {
    if state.users.find_by_id(&req.connected_user).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let connection = state
        .connections
        .connect(&principal.subject_id, &req.connected_user)
        .await
        .map_err(connection_error)?;

    Ok(Success::created(describe(&state, connection).await?))
}

async fn list(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
    ValidQuery(query): ValidQuery<PaginationQuery>,
) -> Result<Success<PageResponse<ConnectionResponse>>, ApiError> {
    let Page {
        items,
        total,
        page,
        limit,
    } = state
        .connections
        .list(&principal.subject_id, query.into())
        .await?;

    let mut described = Vec::with_capacity(items.len());
    for connection in items {
        described.push(describe(&state, connection).await?);
    }

    let page = Page {
        items: described,
        total,
        page,
        limit,
    };
    Ok(Success::ok(page.into()))
}

async fn remove(
    State(state): State<AppState>,
    ActiveUser(principal): ActiveUser,
    Path(id): Path<String>,
) -> Result<Success<()>, ApiError> {
    check_id("id", &id)?;
    state
        .connections
        .remove(&principal.subject_id, &id)
        .await
        .map_err(connection_error)?;
    Ok(Success::ok(()))
}
