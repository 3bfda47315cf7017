//! # Kinship Storage
//!
//! Storage abstraction layer for Kinship.
//!
//! Provides the user and connection store traits, their shared models,
//! and an in-memory backend used in development mode and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod id;
pub mod memory;
pub mod models;

pub use backend::{ConnectionStore, UserStore};
pub use error::StorageError;
pub use memory::MemoryStore;
pub use models::{
    normalize_email, Connection, NewUser, Page, PageRequest, SortOrder, User, UserUpdate,
};
