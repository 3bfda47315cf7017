//! Token signing configuration.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AuthError;
use crate::principal::TokenKind;

/// A signing secret, erased from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw secret.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Settings for one token kind.
#[derive(Debug, Clone)]
pub struct KindConfig {
    /// HMAC secret used to sign and verify tokens of this kind.
    pub secret: Secret,
    /// Expected and issued `aud` claim.
    pub audience: String,
    /// Expected and issued `iss` claim.
    pub issuer: String,
    /// Lifetime of issued tokens in seconds.
    pub ttl_secs: u64,
}

/// Settings for both token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token settings.
    pub access: KindConfig,
    /// Refresh token settings.
    pub refresh: KindConfig,
}

impl TokenConfig {
    /// Returns the settings for `kind`.
    pub fn kind(&self, kind: TokenKind) -> &KindConfig {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Checks that every value is present and that the kinds are independently keyed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] naming the first missing value.
    pub fn validate(&self) -> Result<(), AuthError> {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let config = self.kind(kind);
            if config.secret.expose().trim().is_empty() {
                return Err(AuthError::Configuration(format!("{kind} token secret is empty")));
            }
            if config.audience.trim().is_empty() {
                return Err(AuthError::Configuration(format!("{kind} token audience is empty")));
            }
            if config.issuer.trim().is_empty() {
                return Err(AuthError::Configuration(format!("{kind} token issuer is empty")));
            }
            if config.ttl_secs == 0 {
                return Err(AuthError::Configuration(format!("{kind} token TTL must be positive")));
            }
        }

        if self.access.secret == self.refresh.secret {
            return Err(AuthError::Configuration(
                "access and refresh tokens must use different secrets".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(secret: &str, ttl_secs: u64) -> KindConfig {
        KindConfig {
            secret: Secret::new(secret),
            audience: "kinship".into(),
            issuer: "kinship-api".into(),
            ttl_secs,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = TokenConfig {
            access: kind("access-secret", 900),
            refresh: kind("refresh-secret", 604_800),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_values() {
        let config = TokenConfig {
            access: kind("", 900),
            refresh: kind("refresh-secret", 604_800),
        };
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));

        let mut config = TokenConfig {
            access: kind("access-secret", 900),
            refresh: kind("refresh-secret", 0),
        };
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));

        config.refresh.ttl_secs = 60;
        config.access.issuer = " ".into();
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_rejects_shared_secret() {
        let config = TokenConfig {
            access: kind("same-secret", 900),
            refresh: kind("same-secret", 604_800),
        };
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret-value");
        let debug_str = format!("{:?}", kind(secret.expose(), 1));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret-value"));
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> TokenConfig {
    TokenConfig {
        access: KindConfig {
            secret: Secret::new("access-secret-key-minimum-32-chars!"),
            audience: "kinship".to_string(),
            issuer: "https://api.kinship.test".to_string(),
            ttl_secs: 900,
        },
        refresh: KindConfig {
            secret: Secret::new("refresh-secret-key-minimum-32-chars"),
            audience: "kinship".to_string(),
            issuer: "https://api.kinship.test".to_string(),
            ttl_secs: 604_800,
        },
    }
}
