//! Guard trait and the guards that need no backing services.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::metadata::RouteRequirements;
use crate::principal::Principal;

/// Request data a guard may look at.
#[derive(Debug, Clone, Copy)]
pub struct GuardRequest<'a> {
    /// Raw `Authorization` header value, if present.
    pub authorization: Option<&'a str>,
    /// Resolved requirements of the target route.
    pub requirements: &'a RouteRequirements,
}

/// Result of evaluating one guard.
#[derive(Debug)]
pub enum GuardOutcome {
    /// The request may proceed, optionally with an authenticated principal.
    Allow(Option<Principal>),
    /// The guard rejects the request.
    Deny(AuthError),
}

/// A single authentication strategy.
///
/// Guards must not panic or leak failure details to the caller: every
/// failure becomes a [`GuardOutcome::Deny`].
#[async_trait]
pub trait Guard: Send + Sync {
    /// Evaluates the request.
    async fn evaluate(&self, request: &GuardRequest<'_>) -> GuardOutcome;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Guard for public routes. Allows without a principal.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAllow;

#[async_trait]
impl Guard for AlwaysAllow {
    async fn evaluate(&self, _request: &GuardRequest<'_>) -> GuardOutcome {
        GuardOutcome::Allow(None)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
