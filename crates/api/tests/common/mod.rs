//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use git2::{Repository, RepositoryInitOptions, Signature};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use inkwell_api::auth::jwt::{generate_access_token, JwtConfig};
use inkwell_api::auth::password::hash_password;
use inkwell_api::background::publish::PublishDispatcher;
use inkwell_api::config::ServerConfig;
use inkwell_api::router::build_app_router;
use inkwell_api::state::AppState;
use inkwell_db::models::user::{CreateUser, User};
use inkwell_db::repositories::UserRepo;
use inkwell_publisher::host::{GitHost, HostError, NewPullRequest, PullRequestRef};
use inkwell_publisher::wait::WaitPolicy;
use inkwell_publisher::{Publisher, PublisherConfig};
use inkwell_storage::MemoryImageStore;

pub const TEST_PASSWORD: &str = "test_password_123!";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 1024 * 1024,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

// ---------------------------------------------------------------------------
// Site repository fakes
// ---------------------------------------------------------------------------

/// Bare repository standing in for the site remote, with one commit on `main`.
pub struct SiteRemote {
    dir: TempDir,
}

impl SiteRemote {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();

        let blob = repo.blob(b"# Site\n").unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("README.md", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Seed", "seed@example.com").unwrap();
        repo.commit(Some("refs/heads/main"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Contents of `path` at the tip of `branch`.
    pub fn read(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let repo = Repository::open_bare(self.dir.path()).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{branch}")).ok()?;
        let tree = reference.peel_to_commit().unwrap().tree().unwrap();
        let entry = tree.get_path(Path::new(path)).ok()?;
        let bytes = repo.find_blob(entry.id()).unwrap().content().to_vec();
        Some(bytes)
    }
}

/// [`GitHost`] answering from the local bare repository.
pub struct LocalHost {
    remote: PathBuf,
    opened: std::sync::Mutex<Vec<NewPullRequest>>,
}

impl LocalHost {
    pub fn opened(&self) -> Vec<NewPullRequest> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitHost for LocalHost {
    async fn branch_exists(&self, branch: &str) -> Result<bool, HostError> {
        Ok(Repository::open_bare(&self.remote)
            .and_then(|r| r.find_reference(&format!("refs/heads/{branch}")).map(|_| ()))
            .is_ok())
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, HostError> {
        let mut opened = self.opened.lock().unwrap();
        opened.push(pr.clone());
        let number = opened.len() as u64;
        Ok(PullRequestRef {
            number,
            html_url: format!("https://github.com/acme/site/pull/{number}"),
        })
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A fully wired application over a local site remote.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryImageStore>,
    pub host: Arc<LocalHost>,
    pub remote: SiteRemote,
}

impl TestApp {
    /// A fresh handle to the router (each request consumes one).
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Wait for background publish and update runs to finish.
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(30), self.state.dispatcher.wait_idle())
            .await
            .expect("background tasks did not finish");
    }
}

/// Build the full application with the production middleware stack, using
/// the given database pool, an in-memory image store, and a local site remote.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let host = Arc::new(LocalHost {
        remote: remote.path().to_path_buf(),
        opened: std::sync::Mutex::new(Vec::new()),
    });

    let mut publisher_config =
        PublisherConfig::for_remote(remote.path().to_str().unwrap().to_string());
    publisher_config.wait = WaitPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    let publisher = Publisher::new(pool.clone(), host.clone(), store.clone(), publisher_config);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        store: store.clone(),
        dispatcher: PublishDispatcher::new(publisher),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        store,
        host,
        remote,
    }
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// Create a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, username: &str) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash,
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Create a user and mint an access token for them.
pub async fn auth_token(pool: &PgPool) -> String {
    let user = create_user(pool, "editor").await;
    generate_access_token(user.id, &user.username, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body, None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, Method::POST, uri, body, Some(token)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    json_request(app, Method::PUT, uri, body, Some(token)).await
}

pub async fn put_bytes_auth(
    app: Router,
    uri: &str,
    content_type: &str,
    bytes: Vec<u8>,
    token: &str,
) -> Response<Body> {
    let request = Request::put(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", content_type)
        .body(Body::from(bytes))
        .unwrap();
    send(app, request).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
