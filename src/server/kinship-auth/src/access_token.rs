//! Bearer token guard.

use std::sync::Arc;

use async_trait::async_trait;
use kinship_storage::UserStore;
use tracing::{debug, error};

use crate::error::AuthError;
use crate::guard::{Guard, GuardOutcome, GuardRequest};
use crate::principal::Principal;
use crate::token::TokenService;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. Anything other than exactly a
/// scheme and a token yields `None`.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Authenticates requests carrying a bearer JWT.
///
/// The token is verified against the route's token kind, then its subject
/// must still exist in the user store. The user is never looked up for a
/// token that failed verification.
pub struct AccessTokenGuard {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
}

impl AccessTokenGuard {
    /// Creates the guard.
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserStore>) -> Self {
        Self { tokens, users }
    }
}

#[async_trait]
impl Guard for AccessTokenGuard {
    async fn evaluate(&self, request: &GuardRequest<'_>) -> GuardOutcome {
        let Some(token) = request.authorization.and_then(extract_bearer) else {
            debug!("Bearer token missing or malformed");
            return GuardOutcome::Deny(AuthError::InvalidToken);
        };

        let kind = request.requirements.token_kind;
        let claims = match self.tokens.verify(token, kind) {
            Ok(claims) => claims,
            Err(e) => return GuardOutcome::Deny(e),
        };

        match self.users.find_by_id(&claims.sub).await {
            Ok(Some(_)) => GuardOutcome::Allow(Some(Principal::from(claims))),
            Ok(None) => {
                debug!(subject = %claims.sub, "Token subject no longer exists");
                GuardOutcome::Deny(AuthError::InvalidToken)
            }
            Err(e) => {
                error!(subject = %claims.sub, error = %e, "User lookup failed during authorization");
                GuardOutcome::Deny(AuthError::Internal(e.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "bearer"
    }
}
