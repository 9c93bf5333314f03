// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response interceptor seams and the built-in interceptors.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::token_store::TokenStore;

/// Outgoing request as seen by request interceptors.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    pub headers: HeaderMap,
}

/// Received response as seen by response interceptors. The body is the
/// parsed JSON (`null` for an empty body, a string for non-JSON text).
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Runs before a request is sent, in registration order.
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: &mut RequestParts);
}

/// Runs after a response is received and before it is classified, in
/// registration order.
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, response: &mut ResponseParts);
}

/// Notified whenever the backend answers 401, before the error is returned.
pub trait UnauthorizedHook: Send + Sync {
    fn on_unauthorized(&self, path: &str);
}

/// Adds `Authorization: Bearer <access token>` when a live access token
/// exists and the request does not already carry credentials.
pub struct BearerAuth {
    store: Arc<TokenStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }
}

impl RequestInterceptor for BearerAuth {
    fn on_request(&self, request: &mut RequestParts) {
        if request.headers.contains_key(AUTHORIZATION) {
            return;
        }
        let Some(token) = self.store.get_access_token() else {
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("access token is not a valid header value, sending without it"),
        }
    }
}

/// Stamps every request with a fresh `x-request-id` unless one is set.
pub struct RequestId;

impl RequestInterceptor for RequestId {
    fn on_request(&self, request: &mut RequestParts) {
        let name = HeaderName::from_static("x-request-id");
        if request.headers.contains_key(&name) {
            return;
        }
        if let Ok(value) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            request.headers.insert(name, value);
        }
    }
}

/// Debug-mode request/response logging.
pub struct DebugLog;

impl RequestInterceptor for DebugLog {
    fn on_request(&self, request: &mut RequestParts) {
        let request_id = request.headers.get("x-request-id").and_then(|v| v.to_str().ok());
        tracing::debug!(method = %request.method, path = %request.path, request_id, "api request");
    }
}

impl ResponseInterceptor for DebugLog {
    fn on_response(&self, response: &mut ResponseParts) {
        tracing::debug!(
            method = %response.method,
            path = %response.path,
            status = response.status.as_u16(),
            "api response"
        );
    }
}
