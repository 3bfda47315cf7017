//! # Kinship Storage - SQLite Backend
//!
//! SQLite implementation of the user and connection stores.
//! Deletions are soft: rows keep a `deleted_at` timestamp.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use kinship_storage::id::generate_id;
use kinship_storage::{
    normalize_email, Connection, ConnectionStore, NewUser, Page, PageRequest, SortOrder,
    StorageError, User, UserStore, UserUpdate,
};

/// SQL schema for users and connections.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    avatar        TEXT,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL,
    deleted_at    INTEGER
);

CREATE TABLE IF NOT EXISTS connections (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    connected_user_id TEXT NOT NULL,
    created_at        INTEGER NOT NULL,
    deleted_at        INTEGER,
    UNIQUE (user_id, connected_user_id)
);

CREATE INDEX IF NOT EXISTS idx_connections_user ON connections (user_id, created_at)
"#;

const USER_COLUMNS: &str = "id, email, name, password_hash, avatar, created_at, updated_at";

type UserRow = (String, String, String, String, Option<String>, i64, i64);
type ConnectionRow = (String, String, String, i64);

fn user_from_row(row: UserRow) -> User {
    let (id, email, name, password_hash, avatar, created_at, updated_at) = row;
    User {
        id,
        email,
        name,
        password_hash,
        avatar,
        created_at: created_at.max(0) as u64,
        updated_at: updated_at.max(0) as u64,
    }
}

fn connection_from_row(row: ConnectionRow) -> Connection {
    let (id, user_id, connected_user_id, created_at) = row;
    Connection {
        id,
        user_id,
        connected_user_id,
        created_at: created_at.max(0) as u64,
    }
}

fn query_failed(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::AlreadyExists(db.message().to_string())
        }
        _ => StorageError::QueryFailed(e.to_string()),
    }
}

/// SQLite storage backend.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens or creates a SQLite database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// connection fails, or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::ConnectionFailed(format!("failed to create directory: {e}"))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        debug!(path = %path.display(), "Opening SQLite database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;

        info!(path = %path.display(), "SQLite store ready");
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        // Every connection to `:memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        debug!("Running database migrations");
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement.trim())
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::ConnectionFailed(format!("migration failed: {e}")))?;
        }
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    async fn fetch_user(&self, where_clause: &str, value: &str) -> Result<Option<User>, StorageError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {where_clause} = ? AND deleted_at IS NULL"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(row.map(user_from_row))
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        self.fetch_user("id", id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        self.fetch_user("email", &normalize_email(email)).await
    }

    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        let now = Self::now();
        let id = generate_id();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, avatar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(normalize_email(&user.email))
        .bind(user.name.trim())
        .bind(&user.password_hash)
        .bind(user.avatar.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        debug!(user_id = %id, "User created");

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))
    }

    async fn update(&self, id: &str, update: UserUpdate) -> Result<User, StorageError> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))?;

        let name = update
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);
        let email = update
            .email
            .map(|e| normalize_email(&e))
            .unwrap_or(current.email);
        let password_hash = update.password_hash.unwrap_or(current.password_hash);

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, password_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .bind(Self::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))
    }

    async fn soft_delete(&self, id: &str) -> Result<(), StorageError> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Self::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("user {id}")));
        }
        debug!(user_id = %id, "User soft-deleted");
        Ok(())
    }

    async fn replace_all(&self, users: Vec<NewUser>) -> Result<Vec<User>, StorageError> {
        let now = Self::now();
        let mut tx = self.pool.begin().await.map_err(query_failed)?;

        sqlx::query("DELETE FROM users")
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;

        let mut ids = Vec::with_capacity(users.len());
        for user in users {
            let id = generate_id();
            sqlx::query(
                r#"
                INSERT INTO users (id, email, name, password_hash, avatar, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(normalize_email(&user.email))
            .bind(user.name.trim())
            .bind(&user.password_hash)
            .bind(user.avatar.as_deref())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;
            ids.push(id);
        }

        tx.commit().await.map_err(query_failed)?;

        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.find_by_id(&id).await? {
                created.push(user);
            }
        }
        info!(count = created.len(), "User seed loaded");
        Ok(created)
    }
}

#[async_trait]
impl ConnectionStore for SqliteStore {
    async fn connect(&self, user_id: &str, other_id: &str) -> Result<Connection, StorageError> {
        if user_id == other_id {
            return Err(StorageError::InvalidInput("cannot connect to yourself".into()));
        }

        let mut tx = self.pool.begin().await.map_err(query_failed)?;

        let existing: Vec<(Option<i64>,)> = sqlx::query_as(
            r#"
            SELECT deleted_at FROM connections
            WHERE (user_id = ? AND connected_user_id = ?)
               OR (user_id = ? AND connected_user_id = ?)
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(other_id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(query_failed)?;

        if existing.len() == 2 {
            if existing.iter().all(|(deleted_at,)| deleted_at.is_none()) {
                return Err(StorageError::AlreadyExists(
                    "connection between these users".into(),
                ));
            }
            sqlx::query(
                r#"
                UPDATE connections SET deleted_at = NULL
                WHERE (user_id = ? AND connected_user_id = ?)
                   OR (user_id = ? AND connected_user_id = ?)
                "#,
            )
            .bind(user_id)
            .bind(other_id)
            .bind(other_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;
        } else {
            // A half pair is discarded and recreated.
            sqlx::query(
                r#"
                DELETE FROM connections
                WHERE (user_id = ? AND connected_user_id = ?)
                   OR (user_id = ? AND connected_user_id = ?)
                "#,
            )
            .bind(user_id)
            .bind(other_id)
            .bind(other_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(query_failed)?;

            let now = Self::now();
            for (from, to) in [(user_id, other_id), (other_id, user_id)] {
                sqlx::query(
                    "INSERT INTO connections (id, user_id, connected_user_id, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(generate_id())
                .bind(from)
                .bind(to)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(query_failed)?;
            }
        }

        let row: ConnectionRow = sqlx::query_as(
            "SELECT id, user_id, connected_user_id, created_at FROM connections WHERE user_id = ? AND connected_user_id = ?",
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_failed)?;

        tx.commit().await.map_err(query_failed)?;

        debug!(user_id, other_id, "Connection stored");
        Ok(connection_from_row(row))
    }

    async fn list(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<Connection>, StorageError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM connections WHERE user_id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed)?;

        let direction = match page.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            r#"
            SELECT id, user_id, connected_user_id, created_at FROM connections
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY created_at {direction}, rowid {direction}
            LIMIT ? OFFSET ?
            "#
        );

        let rows: Vec<ConnectionRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(Page {
            items: rows.into_iter().map(connection_from_row).collect(),
            total: total.max(0) as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn remove(&self, owner_id: &str, connection_id: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(query_failed)?;

        let connection: Option<(String,)> = sqlx::query_as(
            "SELECT connected_user_id FROM connections WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(connection_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_failed)?;

        let (other_id,) =
            connection.ok_or_else(|| StorageError::NotFound(format!("connection {connection_id}")))?;

        let result = sqlx::query(
            r#"
            UPDATE connections SET deleted_at = ?
            WHERE (user_id = ? AND connected_user_id = ?)
               OR (user_id = ? AND connected_user_id = ?)
            "#,
        )
        .bind(Self::now())
        .bind(owner_id)
        .bind(&other_id)
        .bind(&other_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        if result.rows_affected() < 2 {
            return Err(StorageError::NotFound("related connection".into()));
        }

        tx.commit().await.map_err(query_failed)?;
        debug!(connection_id, "Connection removed");
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM connections")
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(())
    }
}
