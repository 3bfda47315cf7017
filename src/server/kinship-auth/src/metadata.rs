//! Per-route authentication requirements.
//!
//! Requirements are declared at startup, either for a whole controller or for
//! a single handler. Lookup order for both the auth types and the token kind
//! is handler, then controller, then the system default (`[Bearer]`,
//! `Access`). The two are resolved independently, so a handler may override
//! the token kind while inheriting its controller's auth types.

use std::collections::HashMap;

use crate::principal::TokenKind;

/// Authentication strategy required by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// Public route.
    None,
    /// `Authorization: Bearer <token>` required.
    Bearer,
}

/// Auth types applied to routes without any declaration.
pub const DEFAULT_AUTH_TYPES: [AuthType; 1] = [AuthType::Bearer];

/// Token kind applied to routes without any declaration.
pub const DEFAULT_TOKEN_KIND: TokenKind = TokenKind::Access;

/// Identity of a route handler: its controller and its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    /// Enclosing controller (route group).
    pub controller: &'static str,
    /// Handler name within the controller.
    pub handler: &'static str,
}

impl HandlerRef {
    /// Creates a handler reference.
    pub const fn new(controller: &'static str, handler: &'static str) -> Self {
        Self {
            controller,
            handler,
        }
    }
}

/// Resolved requirements of one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirements {
    /// Auth types in declaration order.
    pub auth_types: Vec<AuthType>,
    /// Token kind a bearer token must have.
    pub token_kind: TokenKind,
}

#[derive(Debug, Clone, Default)]
struct Declaration {
    auth_types: Option<Vec<AuthType>>,
    token_kind: Option<TokenKind>,
}

/// Read-only table of route declarations.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    controllers: HashMap<&'static str, Declaration>,
    handlers: HashMap<HandlerRef, Declaration>,
}

impl MetadataRegistry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Auth types for `handler`: handler declaration, else controller
    /// declaration, else `[Bearer]`.
    pub fn resolve_auth_types(&self, handler: &HandlerRef) -> Vec<AuthType> {
        self.handlers
            .get(handler)
            .and_then(|d| d.auth_types.clone())
            .or_else(|| {
                self.controllers
                    .get(handler.controller)
                    .and_then(|d| d.auth_types.clone())
            })
            .unwrap_or_else(|| DEFAULT_AUTH_TYPES.to_vec())
    }

    /// Token kind for `handler`: handler declaration, else controller
    /// declaration, else `Access`.
    pub fn resolve_token_kind(&self, handler: &HandlerRef) -> TokenKind {
        self.handlers
            .get(handler)
            .and_then(|d| d.token_kind)
            .or_else(|| {
                self.controllers
                    .get(handler.controller)
                    .and_then(|d| d.token_kind)
            })
            .unwrap_or(DEFAULT_TOKEN_KIND)
    }

    /// Both requirements of `handler`.
    pub fn resolve(&self, handler: &HandlerRef) -> RouteRequirements {
        RouteRequirements {
            auth_types: self.resolve_auth_types(handler),
            token_kind: self.resolve_token_kind(handler),
        }
    }
}

/// Builder for [`MetadataRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: MetadataRegistry,
}

fn dedup(types: impl IntoIterator<Item = AuthType>) -> Vec<AuthType> {
    let mut out = Vec::new();
    for t in types {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

impl RegistryBuilder {
    /// Declares the auth types of every handler in `controller`.
    pub fn controller_auth(
        mut self,
        controller: &'static str,
        types: impl IntoIterator<Item = AuthType>,
    ) -> Self {
        self.registry
            .controllers
            .entry(controller)
            .or_default()
            .auth_types = Some(dedup(types));
        self
    }

    /// Declares the token kind of every handler in `controller`.
    pub fn controller_token_kind(mut self, controller: &'static str, kind: TokenKind) -> Self {
        self.registry
            .controllers
            .entry(controller)
            .or_default()
            .token_kind = Some(kind);
        self
    }

    /// Declares the auth types of a single handler.
    pub fn handler_auth(
        mut self,
        handler: HandlerRef,
        types: impl IntoIterator<Item = AuthType>,
    ) -> Self {
        self.registry.handlers.entry(handler).or_default().auth_types = Some(dedup(types));
        self
    }

    /// Declares the token kind of a single handler.
    pub fn handler_token_kind(mut self, handler: HandlerRef, kind: TokenKind) -> Self {
        self.registry.handlers.entry(handler).or_default().token_kind = Some(kind);
        self
    }

    /// Finishes the registry.
    pub fn build(self) -> MetadataRegistry {
        self.registry
    }
}
