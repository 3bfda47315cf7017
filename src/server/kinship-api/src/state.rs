//! Shared application state.

use std::sync::Arc;

use kinship_auth::{AuthService, GuardChain};
use kinship_storage::{ConnectionStore, UserStore};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Account flows.
    pub auth: AuthService,
    /// Route guard chain.
    pub chain: Arc<GuardChain>,
    /// User records.
    pub users: Arc<dyn UserStore>,
    /// Connection records.
    pub connections: Arc<dyn ConnectionStore>,
}
