//! Records shared by every storage backend.

use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque identifier (24 lowercase hex characters).
    pub id: String,
    /// Trimmed, lower-cased email address. Unique across all users.
    pub email: String,
    /// Display name.
    pub name: String,
    /// PHC-formatted password hash. Never leaves the server.
    pub password_hash: String,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Creation timestamp (Unix seconds).
    pub created_at: u64,
    /// Last update timestamp (Unix seconds).
    pub updated_at: u64,
}

/// Data required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address; normalized by the store.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Already-hashed password.
    pub password_hash: String,
    /// Avatar URL.
    pub avatar: Option<String>,
}

/// Partial update of a user. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email address; normalized by the store.
    pub email: Option<String>,
    /// New, already-hashed password.
    pub password_hash: Option<String>,
}

/// One direction of a connection between two users.
///
/// Connections are always stored in pairs: `(a -> b)` and `(b -> a)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Opaque identifier.
    pub id: String,
    /// Owner of this direction.
    pub user_id: String,
    /// The other side.
    pub connected_user_id: String,
    /// Creation timestamp (Unix seconds).
    pub created_at: u64,
}

/// Sort direction on creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// A page request. `page` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Sort direction on creation time.
    pub order: SortOrder,
}

impl PageRequest {
    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            order: SortOrder::Desc,
        }
    }
}

/// A page of results with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page (1-based).
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl<T> Page<T> {
    /// Total number of pages.
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    /// Maps the items of the page, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Trims and lower-cases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the current Unix timestamp.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
