//! JWT issuance and verification for access and refresh tokens.
//!
//! Tokens are HS256-signed. Each [`TokenKind`] has its own secret, audience,
//! issuer and TTL, and the kind is also embedded in the `tokenType` claim, so
//! a token only verifies against the kind it was issued for.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::{KindConfig, TokenConfig};
use crate::error::AuthError;
use crate::principal::TokenKind;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id).
    pub sub: String,
    /// Email address.
    pub email: String,
    /// Token kind.
    #[serde(rename = "tokenType")]
    pub token_type: TokenKind,
    /// Issued at (Unix timestamp).
    pub iat: u64,
    /// Expiration (Unix timestamp).
    pub exp: u64,
    /// Audience.
    pub aud: String,
    /// Issuer.
    pub iss: String,
}

/// An access token and a refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
}

struct KindKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    audience: String,
    issuer: String,
    ttl_secs: u64,
}

impl KindKeys {
    fn new(config: &KindConfig) -> Self {
        let secret = config.secret.expose().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation.leeway = 0;
        // Expiry is checked against the service clock instead.
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            ttl_secs: config.ttl_secs,
        }
    }
}

/// Issues and verifies signed tokens.
pub struct TokenService {
    access: KindKeys,
    refresh: KindKeys,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Creates a token service using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the configuration is incomplete.
    pub fn new(config: TokenConfig) -> Result<Self, AuthError> {
        config.validate()?;

        Ok(Self {
            access: KindKeys::new(&config.access),
            refresh: KindKeys::new(&config.refresh),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of `kind`, in seconds.
    pub fn ttl(&self, kind: TokenKind) -> u64 {
        self.keys(kind).ttl_secs
    }

    /// Issues a token of `kind` for the given subject.
    pub fn issue(&self, subject_id: &str, email: &str, kind: TokenKind) -> Result<String, AuthError> {
        let keys = self.keys(kind);
        let now = self.clock.now();

        let claims = TokenClaims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            token_type: kind,
            iat: now,
            exp: now.saturating_add(keys.ttl_secs),
            aud: keys.audience.clone(),
            iss: keys.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign {kind} token: {e}")))
    }

    /// Verifies a token against the settings of `kind` and returns its claims.
    ///
    /// Every failure (signature, audience, issuer, kind, expiry, malformed
    /// input) yields the same [`AuthError::InvalidToken`]. The actual cause is
    /// logged at debug level.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let keys = self.keys(kind);

        let claims = decode::<TokenClaims>(token, &keys.decoding_key, &keys.validation)
            .map_err(|e| {
                debug!(%kind, error = %e, "Token rejected");
                AuthError::InvalidToken
            })?
            .claims;

        if claims.token_type != kind {
            debug!(%kind, presented = %claims.token_type, "Token rejected: kind mismatch");
            return Err(AuthError::InvalidToken);
        }

        let now = self.clock.now();
        if now >= claims.exp {
            debug!(%kind, exp = claims.exp, now, "Token rejected: expired");
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Issues an access token and a refresh token concurrently.
    pub async fn issue_pair(
        self: &Arc<Self>,
        subject_id: &str,
        email: &str,
    ) -> Result<TokenPair, AuthError> {
        let (access_token, refresh_token) = tokio::try_join!(
            self.issue_blocking(subject_id, email, TokenKind::Access),
            self.issue_blocking(subject_id, email, TokenKind::Refresh),
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn issue_blocking(
        self: &Arc<Self>,
        subject_id: &str,
        email: &str,
        kind: TokenKind,
    ) -> Result<String, AuthError> {
        let service = Arc::clone(self);
        let subject_id = subject_id.to_string();
        let email = email.to_string();

        tokio::task::spawn_blocking(move || service.issue(&subject_id, &email, kind))
            .await
            .map_err(|e| AuthError::Internal(format!("token signing task failed: {e}")))?
    }
}
