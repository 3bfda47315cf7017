//! Store traits implemented by every backend.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::id::is_valid_id;
use crate::models::{Connection, NewUser, Page, PageRequest, User, UserUpdate};

/// User records.
///
/// Soft-deleted users are invisible to every lookup.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds an active user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError>;

    /// Finds an active user by email. The email is normalized before lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Creates a user.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if the email is taken,
    /// including by a soft-deleted user.
    async fn create(&self, user: NewUser) -> Result<User, StorageError>;

    /// Applies a partial update to an active user.
    async fn update(&self, id: &str, update: UserUpdate) -> Result<User, StorageError>;

    /// Soft-deletes a user.
    async fn soft_delete(&self, id: &str) -> Result<(), StorageError>;

    /// Removes every user and inserts `users` instead.
    async fn replace_all(&self, users: Vec<NewUser>) -> Result<Vec<User>, StorageError>;

    /// Finds a user by login identifier: an email address or a user id.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StorageError> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            self.find_by_email(identifier).await
        } else if is_valid_id(identifier) {
            self.find_by_id(identifier).await
        } else {
            Ok(None)
        }
    }
}

/// Bidirectional connections between users.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Connects two users, creating both directions.
    ///
    /// A soft-deleted pair is restored. Fails with
    /// [`StorageError::AlreadyExists`] if the pair is already active and with
    /// [`StorageError::InvalidInput`] when both ids are equal.
    async fn connect(&self, user_id: &str, other_id: &str) -> Result<Connection, StorageError>;

    /// Lists the active connections owned by `user_id`.
    async fn list(&self, user_id: &str, page: PageRequest)
        -> Result<Page<Connection>, StorageError>;

    /// Soft-deletes a connection and its reverse direction.
    ///
    /// Only the owner of `connection_id` may remove it.
    async fn remove(&self, owner_id: &str, connection_id: &str) -> Result<(), StorageError>;

    /// Removes every connection.
    async fn remove_all(&self) -> Result<(), StorageError>;
}
