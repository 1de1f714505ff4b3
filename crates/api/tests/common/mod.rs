#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use fitcoach_api::auth::jwt::{Claims, JwtConfig};
use fitcoach_api::config::ServerConfig;
use fitcoach_api::router::build_app_router;
use fitcoach_api::state::AppState;
use fitcoach_db::store::{InMemoryJobStore, JobStore, PgJobStore};
use fitcoach_worker::dispatcher::{DispatcherConfig, JobDispatcher};
use fitcoach_worker::processor::JobProcessor;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-that-is-long-enough";
pub const CRON_SECRET: &str = "cron-secret";

/// Trainer id used by the default token.
pub const TRAINER_ID: i64 = 1;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        cron_secret: Some(CRON_SECRET.to_string()),
        scan_storage_dir: std::env::temp_dir().join("fitcoach-test-scans"),
    }
}

/// A pool that never connects until first used.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://fitcoach@localhost:1/unused")
        .unwrap()
}

/// Build the production router over the given pool and job store.
///
/// The dispatcher has no handlers registered, so swept jobs fail with a
/// "no processor" message.
pub fn build_app(pool: PgPool, jobs: Arc<dyn JobStore>, config: ServerConfig) -> Router {
    let processor = JobProcessor::new(jobs.clone());
    build_app_with_processor(pool, jobs, config, processor)
}

/// Like [`build_app`], but the dispatcher runs `processor`.
pub fn build_app_with_processor(
    pool: PgPool,
    jobs: Arc<dyn JobStore>,
    config: ServerConfig,
    processor: JobProcessor,
) -> Router {
    let dispatcher = JobDispatcher::new(Arc::new(processor), DispatcherConfig::default());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        jobs,
        dispatcher: Arc::new(dispatcher),
    };
    build_app_router(state, &config)
}

/// Full app backed by Postgres.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_storage(pool, test_config().scan_storage_dir)
}

pub fn build_test_app_with_storage(pool: PgPool, scan_storage_dir: PathBuf) -> Router {
    let jobs = Arc::new(PgJobStore::new(pool.clone()));
    let config = ServerConfig {
        scan_storage_dir,
        ..test_config()
    };
    build_app(pool, jobs, config)
}

/// App whose jobs live in memory; the database is never touched by job
/// routes.
pub fn memory_app() -> (Router, Arc<InMemoryJobStore>) {
    memory_app_with(test_config())
}

pub fn memory_app_with(config: ServerConfig) -> (Router, Arc<InMemoryJobStore>) {
    let store = Arc::new(InMemoryJobStore::new());
    (build_app(lazy_pool(), store.clone(), config), store)
}

/// A valid access token for `user_id`.
pub fn token_for(user_id: i64, role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + 900,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Token for the default trainer.
pub fn trainer_token() -> String {
    token_for(TRAINER_ID, "trainer")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_as(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_as(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json_as(app, Method::POST, uri, token, body).await
}

pub async fn put_json_as(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json_as(app, Method::PUT, uri, token, body).await
}

async fn send_json_as(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a multipart form with a single `file` part.
pub async fn post_file_as(app: Router, uri: &str, token: &str, file: &[u8]) -> Response<Body> {
    const BOUNDARY: &str = "fitcoach-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"scan.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
