//! Account flows built on the token and hashing services.

use std::sync::Arc;

use kinship_storage::{NewUser, StorageError, User, UserStore, UserUpdate};
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::hashing::HashingService;
use crate::principal::Principal;
use crate::token::{TokenPair, TokenService};

const AVATAR_COUNT: u32 = 70;

/// Argon2id hash checked when the login identifier is unknown. Matches no password.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$T8q2QsexOdH2UU8cggcKmA$NMkS9BOyc3nHpQOD6ZWMkT6v0j65AZUxqJ7UiwKfIcU";

fn random_avatar() -> String {
    let n = rand::thread_rng().gen_range(1..=AVATAR_COUNT);
    format!("https://i.pravatar.cc/150?img={n}")
}

/// Data for a new account. The password is in clear text.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Email address.
    pub email: String,
    /// Clear-text password.
    pub password: String,
    /// Display name.
    pub name: String,
}

/// A signed-in user with a fresh token pair.
#[derive(Debug, Clone)]
pub struct Session {
    /// The user.
    pub user: User,
    /// Tokens issued for the user.
    pub tokens: TokenPair,
}

/// Partial profile change. The password is in clear text.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New clear-text password.
    pub password: Option<String>,
}

/// Registration, login, refresh and profile management.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hashing: Arc<dyn HashingService>,
    tokens: Arc<TokenService>,
}

fn email_conflict(e: StorageError) -> AuthError {
    match e {
        StorageError::AlreadyExists(_) => AuthError::EmailTaken,
        e => AuthError::Storage(e),
    }
}

impl AuthService {
    /// Creates the service.
    pub fn new(
        users: Arc<dyn UserStore>,
        hashing: Arc<dyn HashingService>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            hashing,
            tokens,
        }
    }

    /// Token service used for issuance.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Returns true if no active user has `email`.
    pub async fn email_available(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.users.find_by_email(email).await?.is_none())
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] if the email is already registered.
    pub async fn register(&self, registration: Registration) -> Result<Session, AuthError> {
        if !self.email_available(&registration.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hashing.hash(&registration.password).await?;
        let user = self
            .users
            .create(NewUser {
                email: registration.email,
                name: registration.name,
                password_hash,
                avatar: Some(random_avatar()),
            })
            .await
            .map_err(email_conflict)?;

        info!(user_id = %user.id, "User registered");
        self.session(user).await
    }

    /// Checks a login identifier (email or user id) and password.
    ///
    /// Unknown identifiers and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn verify_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_identifier(identifier).await? else {
            self.hashing.compare(password, UNKNOWN_USER_HASH).await?;
            debug!("Login rejected: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hashing.compare(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Signs a user in.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.verify_credentials(identifier, password).await?;
        debug!(user_id = %user.id, "User signed in");
        self.session(user).await
    }

    /// Issues a new token pair for the caller of a refresh route.
    ///
    /// The pair carries the user's current email, which may differ from the
    /// one in the presented token.
    pub async fn refresh(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let user = self.current_user(principal).await?;
        self.tokens.issue_pair(&user.id, &user.email).await
    }

    /// Loads the caller's user record.
    pub async fn current_user(&self, principal: &Principal) -> Result<User, AuthError> {
        self.users
            .find_by_id(&principal.subject_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Applies a profile change, hashing a new password if present.
    pub async fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let password_hash = match update.password {
            Some(password) => Some(self.hashing.hash(&password).await?),
            None => None,
        };

        let update = UserUpdate {
            name: update.name,
            email: update.email,
            password_hash,
        };

        match self.users.update(&principal.subject_id, update).await {
            Ok(user) => Ok(user),
            Err(StorageError::NotFound(_)) => Err(AuthError::InvalidToken),
            Err(e) => Err(email_conflict(e)),
        }
    }

    /// Soft-deletes the caller's account.
    pub async fn delete_account(&self, principal: &Principal) -> Result<(), AuthError> {
        match self.users.soft_delete(&principal.subject_id).await {
            Ok(()) => {
                info!(user_id = %principal.subject_id, "User deleted");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Err(AuthError::InvalidToken),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces every user with `seed`, hashing passwords concurrently.
    pub async fn load_seed(&self, seed: Vec<Registration>) -> Result<Vec<User>, AuthError> {
        let mut tasks = JoinSet::new();
        for (index, registration) in seed.into_iter().enumerate() {
            let hashing = Arc::clone(&self.hashing);
            tasks.spawn(async move {
                let password_hash = hashing.hash(&registration.password).await?;
                Ok::<_, AuthError>((
                    index,
                    NewUser {
                        email: registration.email,
                        name: registration.name,
                        password_hash,
                        avatar: Some(random_avatar()),
                    },
                ))
            });
        }

        let mut hashed = Vec::with_capacity(tasks.len());
        while let Some(result) = tasks.join_next().await {
            let entry =
                result.map_err(|e| AuthError::Internal(format!("seed hashing task failed: {e}")))??;
            hashed.push(entry);
        }
        hashed.sort_by_key(|(index, _)| *index);

        let users = self
            .users
            .replace_all(hashed.into_iter().map(|(_, user)| user).collect())
            .await
            .map_err(email_conflict)?;

        info!(count = users.len(), "Seed users loaded");
        Ok(users)
    }

    async fn session(&self, user: User) -> Result<Session, AuthError> {
        let tokens = self.tokens.issue_pair(&user.id, &user.email).await?;
        Ok(Session { user, tokens })
    }
}
