//! Request extractors.
//!
//! ```rust,ignore
//! async fn me(ActiveUser(principal): ActiveUser) -> impl IntoResponse {
//!     // principal was attached by the guard middleware
//! }
//! ```

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use kinship_auth::{AuthError, Principal};
use serde::de::DeserializeOwned;

use crate::dto::Validate;
use crate::error::ApiError;

/// The authenticated caller.
///
/// Only available on routes whose guard chain produced a principal. On any
/// other route the extraction fails with 401.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub Principal);

impl<S> FromRequestParts<S> for ActiveUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(ActiveUser)
            .ok_or(ApiError::Auth(AuthError::Unauthorized))
    }
}

/// JSON body that passed [`Validate`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query string that passed [`Validate`].
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}
