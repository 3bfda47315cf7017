//! Guard chain evaluation.
//!
//! For each request the chain resolves the route's auth types once, then
//! runs the guards registered for those types in declaration order. The
//! first guard that allows wins. If none allows, the last guard's denial is
//! returned; if no guard ran at all the request is [`AuthError::Unauthorized`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::access_token::AccessTokenGuard;
use crate::error::AuthError;
use crate::guard::{AlwaysAllow, Guard, GuardOutcome, GuardRequest};
use crate::metadata::{AuthType, HandlerRef, MetadataRegistry};
use crate::principal::Principal;

/// Maps auth types to guards and evaluates them per request.
pub struct GuardChain {
    registry: MetadataRegistry,
    guards: HashMap<AuthType, Vec<Arc<dyn Guard>>>,
}

impl GuardChain {
    /// Creates a chain with no guards registered.
    pub fn new(registry: MetadataRegistry) -> Self {
        Self {
            registry,
            guards: HashMap::new(),
        }
    }

    /// Creates the standard chain: `None` maps to [`AlwaysAllow`] and
    /// `Bearer` to the given access token guard.
    pub fn standard(registry: MetadataRegistry, access: AccessTokenGuard) -> Self {
        Self::new(registry)
            .with_guard(AuthType::None, Arc::new(AlwaysAllow))
            .with_guard(AuthType::Bearer, Arc::new(access))
    }

    /// Appends a guard for `auth_type`.
    pub fn with_guard(mut self, auth_type: AuthType, guard: Arc<dyn Guard>) -> Self {
        self.guards.entry(auth_type).or_default().push(guard);
        self
    }

    /// Authorizes a request to `handler`.
    ///
    /// Returns the authenticated principal, or `None` for a public route.
    pub async fn authorize(
        &self,
        handler: &HandlerRef,
        authorization: Option<&str>,
    ) -> Result<Option<Principal>, AuthError> {
        let requirements = self.registry.resolve(handler);
        let request = GuardRequest {
            authorization,
            requirements: &requirements,
        };

        let mut last_denial = None;
        for auth_type in &requirements.auth_types {
            let Some(guards) = self.guards.get(auth_type) else {
                continue;
            };
            for guard in guards {
                match guard.evaluate(&request).await {
                    GuardOutcome::Allow(principal) => {
                        debug!(
                            controller = handler.controller,
                            handler = handler.handler,
                            guard = guard.name(),
                            "Request authorized"
                        );
                        return Ok(principal);
                    }
                    GuardOutcome::Deny(e) => {
                        debug!(
                            controller = handler.controller,
                            handler = handler.handler,
                            guard = guard.name(),
                            reason = %e,
                            "Guard denied request"
                        );
                        last_denial = Some(e);
                    }
                }
            }
        }

        Err(last_denial.unwrap_or(AuthError::Unauthorized))
    }
}
