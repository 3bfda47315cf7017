//! Integration tests for the Kinship server.
//!
//! Each test starts the `kinship-server` binary on its own port and drives
//! it over HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub id: String,
    pub connected_user_id: String,
    pub connected_user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub data: Vec<T>,
    pub total_count: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Outcome of a request: the decoded success payload or the error body.
pub type ApiResult<T> = std::result::Result<T, (StatusCode, ErrorBody)>;

// ============================================================================
// Test Server
// ============================================================================

/// A test server instance that manages its own data directory and process.
pub struct TestServer {
    process: Child,
    pub base_url: String,
    pub port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    /// Start a new test server on the specified port with an in-memory store.
    pub async fn start(port: u16) -> Result<Self> {
        Self::start_with(port, &["--database", "memory"]).await
    }

    /// Start a new test server backed by a SQLite file in a temp directory.
    pub async fn start_sqlite(port: u16) -> Result<Self> {
        let data_dir = TempDir::new().context("Failed to create temp dir")?;
        let db = data_dir.path().join("kinship.db");
        let db = db.to_string_lossy().into_owned();
        Self::spawn(port, &["--database", &db], data_dir).await
    }

    /// Start a new test server that loads `seed` at startup.
    pub async fn start_seeded(port: u16, seed: &[SeedUser]) -> Result<Self> {
        let data_dir = TempDir::new().context("Failed to create temp dir")?;
        let seed_path = data_dir.path().join("seed.json");
        std::fs::write(&seed_path, serde_json::to_vec(seed)?)?;
        let seed_path = seed_path.to_string_lossy().into_owned();
        Self::spawn(
            port,
            &["--database", "memory", "--seed-file", &seed_path],
            data_dir,
        )
        .await
    }

    async fn start_with(port: u16, args: &[&str]) -> Result<Self> {
        let data_dir = TempDir::new().context("Failed to create temp dir")?;
        Self::spawn(port, args, data_dir).await
    }

    async fn spawn(port: u16, args: &[&str], data_dir: TempDir) -> Result<Self> {
        let server_binary = find_server_binary()?;

        let process = Command::new(&server_binary)
            .args(args)
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .env("JWT_ACCESS_SECRET", "integration-access-secret")
            .env("JWT_REFRESH_SECRET", "integration-refresh-secret")
            .env("JWT_TOKEN_AUDIENCE", "kinship")
            .env("JWT_TOKEN_ISSUER", "kinship-integration")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start server: {:?}", server_binary))?;

        let server = Self {
            process,
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            _data_dir: data_dir,
        };

        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/v1/auth/health-check", self.base_url);

        // Seeding hashes every password first, so allow more time than a bare start.
        for _ in 0..200 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 20 seconds")
    }

    /// Get a configured HTTP client for this server.
    pub fn client(&self) -> KinshipClient {
        KinshipClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Find the server binary in the target directory.
fn find_server_binary() -> Result<std::path::PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    let candidates = [
        Path::new(&manifest_dir).join("../../target/debug/kinship-server"),
        Path::new(&manifest_dir).join("../../target/debug/kinship-server.exe"),
        Path::new(&manifest_dir).join("../../target/release/kinship-server"),
        Path::new(&manifest_dir).join("../../target/release/kinship-server.exe"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }

    bail!(
        "Could not find kinship-server binary. Run 'cargo build -p kinship-server' first. Searched in: {:?}",
        candidates
    )
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the Kinship API.
pub struct KinshipClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KinshipClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResult<T>> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            let envelope: Envelope<T> = resp.json().await?;
            if envelope.status_code != status.as_u16() || envelope.message != "Success" {
                bail!("Unexpected envelope for {}: {:?}", path, envelope.status_code);
            }
            Ok(Ok(envelope.data))
        } else {
            Ok(Err((status, resp.json().await?)))
        }
    }

    pub async fn health(&self) -> Result<ApiResult<HealthResponse>> {
        self.call(Method::GET, "/v1/auth/health-check", None).await
    }

    pub async fn verify_email(&self, email: &str) -> Result<ApiResult<bool>> {
        self.call(Method::POST, "/v1/auth/verify-email", Some(json!({ "email": email })))
            .await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<ApiResult<SessionResponse>> {
        let body = json!({ "email": email, "password": password, "name": name });
        self.call(Method::POST, "/v1/auth/sign-up", Some(body)).await
    }

    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<ApiResult<SessionResponse>> {
        let body = json!({ "identifier": identifier, "password": password });
        self.call(Method::POST, "/v1/auth/sign-in", Some(body)).await
    }

    pub async fn refresh(&self) -> Result<ApiResult<TokenPairResponse>> {
        self.call(Method::GET, "/v1/auth/refresh", None).await
    }

    pub async fn me(&self) -> Result<ApiResult<UserResponse>> {
        self.call(Method::GET, "/v1/users/me", None).await
    }

    pub async fn update_me(&self, body: Value) -> Result<ApiResult<UserResponse>> {
        self.call(Method::PATCH, "/v1/users/me", Some(body)).await
    }

    pub async fn delete_me(&self) -> Result<ApiResult<Value>> {
        self.call(Method::DELETE, "/v1/users/me", None).await
    }

    pub async fn connect(&self, user_id: &str) -> Result<ApiResult<ConnectionResponse>> {
        let body = json!({ "connectedUser": user_id });
        self.call(Method::POST, "/v1/connections", Some(body)).await
    }

    pub async fn connections(
        &self,
        query: &str,
    ) -> Result<ApiResult<PageResponse<ConnectionResponse>>> {
        self.call(Method::GET, &format!("/v1/connections{}", query), None)
            .await
    }

    pub async fn remove_connection(&self, id: &str) -> Result<ApiResult<Value>> {
        self.call(Method::DELETE, &format!("/v1/connections/{}", id), None)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};

    // Port counter to avoid conflicts between parallel tests
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(14200);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    const PASSWORD: &str = "Str0ngP@ssw0rd!";

    fn assert_unauthorized<T: std::fmt::Debug>(result: ApiResult<T>) {
        let (status, body) = result.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.status_code, 401);
        assert_eq!(body.message, "Invalid token");
        assert_eq!(body.error, "Unauthorized");
    }

    #[tokio::test]
    async fn test_server_health() {
        let server = TestServer::start(next_port()).await.unwrap();

        let health = server.client().health().await.unwrap().unwrap();
        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_account_lifecycle() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        // 1. Email is free, then registered
        assert!(client.verify_email("alice@example.com").await.unwrap().unwrap());
        let session = client
            .sign_up("alice@example.com", PASSWORD, "Alice Doe")
            .await
            .unwrap()
            .unwrap();
        assert!(session
            .user
            .avatar
            .as_deref()
            .unwrap()
            .starts_with("https://i.pravatar.cc/150?img="));
        assert!(!client.verify_email("alice@example.com").await.unwrap().unwrap());

        // 2. Duplicate registration is rejected
        let (status, body) = client
            .sign_up("Alice@Example.com", PASSWORD, "Alice Again")
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Email already registered");

        // 3. Sign in by email and by id
        let by_email = client
            .sign_in("alice@example.com", PASSWORD)
            .await
            .unwrap()
            .unwrap();
        let by_id = client
            .sign_in(&session.user.id, PASSWORD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.user.id, by_id.user.id);

        // 4. Profile is reachable with the access token only
        let authed = server.client().with_token(&by_email.access_token);
        let me = authed.me().await.unwrap().unwrap();
        assert_eq!(me.email, "alice@example.com");
        assert_unauthorized(
            server
                .client()
                .with_token(&by_email.refresh_token)
                .me()
                .await
                .unwrap(),
        );

        // 5. Profile update
        let updated = authed
            .update_me(json!({ "name": "Alice Cooper" }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Alice Cooper");

        // 6. Refresh requires the refresh token
        assert_unauthorized(authed.refresh().await.unwrap());
        let pair = server
            .client()
            .with_token(&by_email.refresh_token)
            .refresh()
            .await
            .unwrap()
            .unwrap();
        let renewed = server.client().with_token(&pair.access_token);
        assert_eq!(renewed.me().await.unwrap().unwrap().id, session.user.id);
        assert!(!pair.refresh_token.is_empty());

        // 7. Deleting the account invalidates outstanding tokens
        renewed.delete_me().await.unwrap().unwrap();
        assert_unauthorized(authed.me().await.unwrap());
        let (status, body) = client
            .sign_in("alice@example.com", PASSWORD)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_uniform() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();
        client
            .sign_up("bob@example.com", PASSWORD, "Bob Smith")
            .await
            .unwrap()
            .unwrap();

        let wrong_password = client
            .sign_in("bob@example.com", "Wr0ngP@ssword")
            .await
            .unwrap()
            .unwrap_err();
        let unknown_user = client
            .sign_in("nobody@example.com", PASSWORD)
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(wrong_password.0, unknown_user.0);
        assert_eq!(wrong_password.1.message, unknown_user.1.message);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_rejected() {
        let server = TestServer::start(next_port()).await.unwrap();

        assert_unauthorized(server.client().me().await.unwrap());
        assert_unauthorized(server.client().with_token("not.a.jwt").me().await.unwrap());

        let session = server
            .client()
            .sign_up("carol@example.com", PASSWORD, "Carol King")
            .await
            .unwrap()
            .unwrap();
        let mut tampered = session.access_token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert_unauthorized(server.client().with_token(&tampered).me().await.unwrap());
    }

    #[tokio::test]
    async fn test_connections_workflow() {
        let server = TestServer::start(next_port()).await.unwrap();
        let anon = server.client();

        let alice = anon
            .sign_up("alice@example.com", PASSWORD, "Alice Doe")
            .await
            .unwrap()
            .unwrap();
        let bob = anon
            .sign_up("bob@example.com", PASSWORD, "Bob Smith")
            .await
            .unwrap()
            .unwrap();
        let carol = anon
            .sign_up("carol@example.com", PASSWORD, "Carol King")
            .await
            .unwrap()
            .unwrap();

        let alice_client = server.client().with_token(&alice.access_token);
        let bob_client = server.client().with_token(&bob.access_token);

        // Connect alice to bob and carol
        let created = alice_client.connect(&bob.user.id).await.unwrap().unwrap();
        assert_eq!(created.connected_user_id, bob.user.id);
        assert_eq!(created.connected_user.unwrap().name, "Bob Smith");
        alice_client.connect(&carol.user.id).await.unwrap().unwrap();

        // Self and duplicate connections are rejected
        let (status, _) = alice_client
            .connect(&alice.user.id)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = bob_client
            .connect(&alice.user.id)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Connection already exists");

        // Pagination, newest first
        let page = alice_client
            .connections("?page=1&limit=1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.data.len(), 1);

        let (status, _) = alice_client
            .connections("?limit=500")
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Bob sees the reverse direction and removes it
        let bob_page = bob_client.connections("").await.unwrap().unwrap();
        assert_eq!(bob_page.total_count, 1);
        let bob_side = &bob_page.data[0];
        assert_eq!(bob_side.connected_user_id, alice.user.id);

        let (status, _) = alice_client
            .remove_connection(&bob_side.id)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        bob_client.remove_connection(&bob_side.id).await.unwrap().unwrap();
        let page = alice_client.connections("").await.unwrap().unwrap();
        assert_eq!(page.total_count, 1);

        // Reconnecting restores the pair
        bob_client.connect(&alice.user.id).await.unwrap().unwrap();
        let page = alice_client.connections("").await.unwrap().unwrap();
        assert_eq!(page.total_count, 2);
    }

    #[tokio::test]
    async fn test_seeded_server() {
        let seed = vec![
            SeedUser {
                email: "seed.one@example.com".into(),
                password: PASSWORD.into(),
                name: "Seed User One".into(),
            },
            SeedUser {
                email: "seed.two@example.com".into(),
                password: PASSWORD.into(),
                name: "Seed User Two".into(),
            },
        ];
        let server = TestServer::start_seeded(next_port(), &seed).await.unwrap();
        let client = server.client();

        assert!(!client.verify_email("seed.two@example.com").await.unwrap().unwrap());
        let session = client
            .sign_in("seed.one@example.com", PASSWORD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.user.name, "Seed User One");
    }

    #[tokio::test]
    async fn test_sqlite_persistence_across_requests() {
        let server = TestServer::start_sqlite(next_port()).await.unwrap();
        let client = server.client();

        let session = client
            .sign_up("dave@example.com", PASSWORD, "Dave Grohl")
            .await
            .unwrap()
            .unwrap();
        let me = server
            .client()
            .with_token(&session.access_token)
            .me()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(me.id, session.user.id);
        assert!(client.sign_in(&session.user.id, PASSWORD).await.unwrap().is_ok());
    }
}
