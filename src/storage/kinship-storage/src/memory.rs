//! In-memory storage backend.
//!
//! Used in development mode and by tests. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{ConnectionStore, UserStore};
use crate::error::StorageError;
use crate::id::generate_id;
use crate::models::{
    normalize_email, now, Connection, NewUser, Page, PageRequest, SortOrder, User, UserUpdate,
};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    deleted_at: Option<u64>,
}

#[derive(Debug, Clone)]
struct StoredConnection {
    connection: Connection,
    deleted_at: Option<u64>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, StoredUser>,
    connections: Vec<StoredConnection>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email == email && Some(u.user.id.as_str()) != except)
    }

    fn insert_user(&mut self, user: NewUser) -> Result<User, StorageError> {
        let email = normalize_email(&user.email);
        if self.email_taken(&email, None) {
            return Err(StorageError::AlreadyExists(format!("user with email {email}")));
        }

        let now = now();
        let user = User {
            id: generate_id(),
            email,
            name: user.name.trim().to_string(),
            password_hash: user.password_hash,
            avatar: user.avatar,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(
            user.id.clone(),
            StoredUser {
                user: user.clone(),
                deleted_at: None,
            },
        );
        Ok(user)
    }

    fn find_direction(&self, user_id: &str, other_id: &str) -> Option<usize> {
        self.connections.iter().position(|c| {
            c.connection.user_id == user_id && c.connection.connected_user_id == other_id
        })
    }
}

/// In-memory implementation of [`UserStore`] and [`ConnectionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(id)
            .filter(|u| u.deleted_at.is_none())
            .map(|u| u.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = normalize_email(email);
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        let mut inner = self.inner.write().await;
        let user = inner.insert_user(user)?;
        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn update(&self, id: &str, update: UserUpdate) -> Result<User, StorageError> {
        let mut inner = self.inner.write().await;

        let email = update.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if inner.email_taken(email, Some(id)) {
                return Err(StorageError::AlreadyExists(format!("user with email {email}")));
            }
        }

        let stored = inner
            .users
            .get_mut(id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))?;

        if let Some(name) = update.name {
            stored.user.name = name.trim().to_string();
        }
        if let Some(email) = email {
            stored.user.email = email;
        }
        if let Some(hash) = update.password_hash {
            stored.user.password_hash = hash;
        }
        stored.user.updated_at = now();

        Ok(stored.user.clone())
    }

    async fn soft_delete(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .get_mut(id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))?;
        stored.deleted_at = Some(now());
        debug!(user_id = %id, "User soft-deleted");
        Ok(())
    }

    async fn replace_all(&self, users: Vec<NewUser>) -> Result<Vec<User>, StorageError> {
        let mut inner = self.inner.write().await;
        let mut staged = Inner::default();
        let created = users
            .into_iter()
            .map(|u| staged.insert_user(u))
            .collect::<Result<Vec<_>, _>>()?;
        inner.users = staged.users;
        Ok(created)
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn connect(&self, user_id: &str, other_id: &str) -> Result<Connection, StorageError> {
        if user_id == other_id {
            return Err(StorageError::InvalidInput("cannot connect to yourself".into()));
        }

        let mut inner = self.inner.write().await;
        let forward = inner.find_direction(user_id, other_id);
        let backward = inner.find_direction(other_id, user_id);

        if let (Some(f), Some(b)) = (forward, backward) {
            let active =
                inner.connections[f].deleted_at.is_none() && inner.connections[b].deleted_at.is_none();
            if active {
                return Err(StorageError::AlreadyExists(
                    "connection between these users".into(),
                ));
            }
            inner.connections[f].deleted_at = None;
            inner.connections[b].deleted_at = None;
            debug!(user_id, other_id, "Connection restored");
            return Ok(inner.connections[f].connection.clone());
        }

        let now = now();
        let forward = Connection {
            id: generate_id(),
            user_id: user_id.to_string(),
            connected_user_id: other_id.to_string(),
            created_at: now,
        };
        let backward = Connection {
            id: generate_id(),
            user_id: other_id.to_string(),
            connected_user_id: user_id.to_string(),
            created_at: now,
        };
        inner.connections.retain(|c| {
            !(c.connection.user_id == user_id && c.connection.connected_user_id == other_id)
                && !(c.connection.user_id == other_id && c.connection.connected_user_id == user_id)
        });
        inner.connections.push(StoredConnection {
            connection: forward.clone(),
            deleted_at: None,
        });
        inner.connections.push(StoredConnection {
            connection: backward,
            deleted_at: None,
        });
        debug!(user_id, other_id, "Connection created");

        Ok(forward)
    }

    async fn list(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<Connection>, StorageError> {
        let inner = self.inner.read().await;

        let mut owned: Vec<(usize, &Connection)> = inner
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.deleted_at.is_none() && c.connection.user_id == user_id)
            .map(|(i, c)| (i, &c.connection))
            .collect();

        owned.sort_by_key(|(i, c)| (c.created_at, *i));
        if page.order == SortOrder::Desc {
            owned.reverse();
        }

        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .map(|(_, c)| c.clone())
            .collect();

        Ok(Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn remove(&self, owner_id: &str, connection_id: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;

        let idx = inner
            .connections
            .iter()
            .position(|c| {
                c.connection.id == connection_id
                    && c.connection.user_id == owner_id
                    && c.deleted_at.is_none()
            })
            .ok_or_else(|| StorageError::NotFound(format!("connection {connection_id}")))?;

        let other_id = inner.connections[idx].connection.connected_user_id.clone();
        let reverse = inner
            .find_direction(&other_id, owner_id)
            .ok_or_else(|| StorageError::NotFound("related connection".into()))?;

        let now = now();
        inner.connections[idx].deleted_at = Some(now);
        inner.connections[reverse].deleted_at = Some(now);
        debug!(connection_id, "Connection removed");

        Ok(())
    }

    async fn remove_all(&self) -> Result<(), StorageError> {
        self.inner.write().await.connections.clear();
        Ok(())
    }
}
