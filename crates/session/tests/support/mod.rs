// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process stand-in for the folio REST backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use folio_session::{ClientConfig, MemoryStorage, SessionContext};

pub const PASSWORD: &str = "secret";

/// Knobs and call counters shared with the handlers.
#[derive(Debug)]
pub struct Backend {
    pub me_status: AtomicU16,
    pub refresh_status: AtomicU16,
    pub logout_status: AtomicU16,
    /// Number of leading `/flaky` calls that answer 503.
    pub flaky_failures: AtomicU32,
    pub refresh_delay_ms: AtomicU64,
    pub login_calls: AtomicU32,
    pub me_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub logout_calls: AtomicU32,
    pub flaky_calls: AtomicU32,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            me_status: AtomicU16::new(200),
            refresh_status: AtomicU16::new(200),
            logout_status: AtomicU16::new(200),
            flaky_failures: AtomicU32::new(0),
            refresh_delay_ms: AtomicU64::new(0),
            login_calls: AtomicU32::new(0),
            me_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            logout_calls: AtomicU32::new(0),
            flaky_calls: AtomicU32::new(0),
        }
    }
}

impl Backend {
    pub fn set_me_status(&self, status: u16) {
        self.me_status.store(status, Ordering::SeqCst);
    }

    pub fn set_refresh_status(&self, status: u16) {
        self.refresh_status.store(status, Ordering::SeqCst);
    }

    pub fn set_logout_status(&self, status: u16) {
        self.logout_status.store(status, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

pub fn user_json(username: &str) -> Value {
    json!({
        "id": 1,
        "username": username,
        "email": format!("{username}@example.com"),
        "role": "user",
        "isActive": true,
        "createdAt": "2026-01-01T00:00:00Z",
    })
}

fn tokens_json() -> Value {
    json!({
        "token": "access-1",
        "expiresIn": 60,
        "refreshToken": "refresh-1",
        "refreshExpiresIn": 604800,
    })
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization")?.to_str().ok()?.strip_prefix("Bearer ")
}

async fn login(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    b.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })));
    }
    let username = body["username"].as_str().unwrap_or_default();
    (StatusCode::OK, Json(json!({ "user": user_json(username), "tokens": tokens_json() })))
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default();
    let data = json!({ "user": user_json(username), "tokens": tokens_json() });
    (StatusCode::CREATED, Json(json!({ "success": true, "data": data })))
}

async fn me(State(b): State<Arc<Backend>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    b.me_calls.fetch_add(1, Ordering::SeqCst);
    let status = b.me_status.load(Ordering::SeqCst);
    if status != 200 {
        return (status_code(status), Json(json!({ "message": "me unavailable" })));
    }
    match bearer(&headers) {
        Some("access-1" | "access-2") => {
            (StatusCode::OK, Json(json!({ "user": user_json("ada") })))
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" }))),
    }
}

async fn refresh(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = b.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = b.refresh_status.load(Ordering::SeqCst);
    if status != 200 {
        return (status_code(status), Json(json!({ "message": "refresh rejected" })));
    }
    if body["grant_type"] != "refresh_token" || bearer(&headers) != Some("refresh-1") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid refresh token" })));
    }
    (StatusCode::OK, Json(json!({ "tokens": { "token": "access-2", "expiresIn": 60 } })))
}

async fn logout(State(b): State<Arc<Backend>>) -> (StatusCode, Json<Value>) {
    b.logout_calls.fetch_add(1, Ordering::SeqCst);
    let status = b.logout_status.load(Ordering::SeqCst);
    (status_code(status), Json(json!({ "success": status == 200 })))
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({
        "authorization": header("authorization"),
        "requestId": header("x-request-id"),
    }))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    status_code(code)
}

async fn status_with_message(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    (status_code(code), Json(json!({ "message": "custom failure" })))
}

async fn upload(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok()).unwrap_or("");
    Json(json!({
        "contentType": content_type,
        "bytes": body.len(),
        "hasFile": String::from_utf8_lossy(&body).contains("filename=\"notes.txt\""),
    }))
}

async fn slow_upload(_body: Bytes) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Json(json!({ "ok": true }))
}

async fn flaky(State(b): State<Arc<Backend>>) -> (StatusCode, Json<Value>) {
    let call = b.flaky_calls.fetch_add(1, Ordering::SeqCst);
    if call < b.flaky_failures.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
    }
    (StatusCode::OK, Json(json!({ "attempt": call + 1 })))
}

async fn data_ok() -> Json<Value> {
    Json(json!({ "success": true, "data": { "name": "notes", "pages": 3 } }))
}

async fn data_fail() -> Json<Value> {
    Json(json!({ "success": false, "error": "document is locked" }))
}

async fn text() -> &'static str {
    "plain text"
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub fn router(backend: Arc<Backend>) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/echo/headers", get(echo_headers))
        .route("/status/{code}", get(status))
        .route("/status/{code}/message", get(status_with_message))
        .route("/upload", post(upload))
        .route("/upload/slow", post(slow_upload))
        .route("/flaky", get(flaky))
        .route("/data/ok", get(data_ok))
        .route("/data/fail", get(data_fail))
        .route("/text", get(text))
        .route("/empty", get(empty).delete(empty))
        .with_state(backend);
    Router::new().nest("/api", api)
}

/// Serve the mock backend on an ephemeral port; returns the API base URL.
pub async fn spawn(backend: Arc<Backend>) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = router(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}/api"))
}

/// Base URL of a port nothing listens on.
pub async fn dead_url() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api"))
}

pub fn context(base_url: &str) -> anyhow::Result<SessionContext> {
    Ok(SessionContext::create(&ClientConfig::new(base_url), Arc::new(MemoryStorage::new()))?)
}

/// A running backend plus a session context pointed at it.
pub async fn harness() -> anyhow::Result<(Arc<Backend>, SessionContext)> {
    let backend = Arc::new(Backend::default());
    let url = spawn(Arc::clone(&backend)).await?;
    let ctx = context(&url)?;
    Ok((backend, ctx))
}
