//! Authenticated principal types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::TokenClaims;

/// The two kinds of signed tokens.
///
/// Each kind has its own secret, audience, issuer and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token presented on regular API calls.
    Access,
    /// Long-lived token exchanged for a new token pair.
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// The authenticated caller of a request.
///
/// Only built from a verified token. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id (JWT `sub` claim).
    pub subject_id: String,
    /// Email address at issuance time.
    pub email: String,
    /// Kind of token the request presented.
    pub token_kind: TokenKind,
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            token_kind: claims.token_type,
        }
    }
}
