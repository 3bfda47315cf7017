//! Kinship Server - Main entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kinship_api::{registry, router, AppState};
use kinship_auth::{
    AccessTokenGuard, Argon2Hashing, AuthService, GuardChain, KindConfig, Registration, Secret,
    TokenConfig, TokenService,
};
use kinship_storage::{ConnectionStore, MemoryStore, UserStore};
use kinship_storage_sqlite::SqliteStore;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `--database` value selecting the in-memory store.
const MEMORY_DATABASE: &str = "memory";

#[derive(Parser)]
#[command(name = "kinship-server")]
#[command(about = "Kinship - user accounts and connections API")]
#[command(version)]
struct Cli {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:4000", env = "KINSHIP_BIND_ADDRESS")]
    bind: String,

    /// SQLite database path, or "memory" for a non-persistent store
    #[arg(long, default_value = MEMORY_DATABASE, env = "KINSHIP_DATABASE")]
    database: String,

    /// JSON file of users to load at startup, replacing all existing data
    #[arg(long, env = "KINSHIP_SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Secret signing access tokens
    #[arg(long, env = "JWT_ACCESS_SECRET", hide_env_values = true)]
    access_secret: String,

    /// Secret signing refresh tokens
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    refresh_secret: String,

    /// Token audience
    #[arg(long, env = "JWT_TOKEN_AUDIENCE")]
    audience: String,

    /// Token issuer
    #[arg(long, env = "JWT_TOKEN_ISSUER")]
    issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = 900, env = "JWT_ACCESS_TOKEN_TTL")]
    access_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = 604_800, env = "JWT_REFRESH_TOKEN_TTL")]
    refresh_ttl: u64,
}

impl Cli {
    fn token_config(&self) -> TokenConfig {
        let kind = |secret: &str, ttl_secs| KindConfig {
            secret: Secret::new(secret),
            audience: self.audience.clone(),
            issuer: self.issuer.clone(),
            ttl_secs,
        };

        TokenConfig {
            access: kind(&self.access_secret, self.access_ttl),
            refresh: kind(&self.refresh_secret, self.refresh_ttl),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    email: String,
    password: String,
    name: String,
}

fn build_state<S>(store: Arc<S>, tokens: Arc<TokenService>) -> AppState
where
    S: UserStore + ConnectionStore + 'static,
{
    let users: Arc<dyn UserStore> = store.clone();
    let connections: Arc<dyn ConnectionStore> = store;

    let chain = GuardChain::standard(
        registry(),
        AccessTokenGuard::new(Arc::clone(&tokens), Arc::clone(&users)),
    );

    AppState {
        auth: AuthService::new(Arc::clone(&users), Arc::new(Argon2Hashing), tokens),
        chain: Arc::new(chain),
        users,
        connections,
    }
}

async fn load_seed(state: &AppState, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seed: Vec<SeedUser> =
        serde_json::from_str(&raw).with_context(|| format!("invalid seed file {}", path.display()))?;

    let count = apply_seed(state, seed).await?;
    tracing::info!("Seeded {} users from {}", count, path.display());
    Ok(())
}

/// Replaces users with `seed`, then clears connections.
///
/// Existing data is left untouched when the seed is rejected.
async fn apply_seed(state: &AppState, seed: Vec<SeedUser>) -> anyhow::Result<usize> {
    let users = state
        .auth
        .load_seed(
            seed.into_iter()
                .map(|u| Registration {
                    email: u.email,
                    password: u.password,
                    name: u.name,
                })
                .collect(),
        )
        .await
        .context("failed to load seed users")?;

    state
        .connections
        .remove_all()
        .await
        .context("failed to clear connections")?;
    Ok(users.len())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Kinship server...");
    tracing::info!("Bind address: {}", cli.bind);

    let tokens = Arc::new(TokenService::new(cli.token_config()).context("invalid token configuration")?);

    let state = if cli.database == MEMORY_DATABASE {
        tracing::warn!("Using in-memory storage - data is lost on restart");
        build_state(Arc::new(MemoryStore::new()), tokens)
    } else {
        tracing::info!("Using SQLite database at {}", cli.database);
        let store = SqliteStore::open(&cli.database)
            .await
            .context("failed to open database")?;
        build_state(Arc::new(store), tokens)
    };

    if let Some(path) = &cli.seed_file {
        load_seed(&state, path).await?;
    }

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    tracing::info!("Kinship server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
