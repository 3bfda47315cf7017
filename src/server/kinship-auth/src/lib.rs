//! # Kinship Auth
//!
//! Request authorization pipeline for the Kinship API.
//!
//! ## Components
//!
//! - [`TokenService`] - issues and verifies access and refresh JWTs, each
//!   kind with its own secret, audience, issuer and TTL
//! - [`MetadataRegistry`] - per-route authentication requirements with
//!   handler over controller over default precedence
//! - [`GuardChain`] - resolves a route's requirements and evaluates the
//!   matching guards until one allows the request
//! - [`AccessTokenGuard`] / [`AlwaysAllow`] - the concrete guards
//! - [`HashingService`] - password hashing (Argon2id by default)
//! - [`AuthService`] - registration, login and token refresh flows

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access_token;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod hashing;
pub mod metadata;
pub mod principal;
pub mod service;
pub mod token;

pub use access_token::AccessTokenGuard;
pub use chain::GuardChain;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{KindConfig, Secret, TokenConfig};
pub use error::AuthError;
pub use guard::{AlwaysAllow, Guard, GuardOutcome, GuardRequest};
pub use hashing::{Argon2Hashing, HashingService};
pub use metadata::{AuthType, HandlerRef, MetadataRegistry, RegistryBuilder, RouteRequirements};
pub use principal::{Principal, TokenKind};
pub use service::{AuthService, ProfileUpdate, Registration, Session};
pub use token::{TokenClaims, TokenPair, TokenService};
