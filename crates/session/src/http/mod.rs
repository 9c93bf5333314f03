// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the folio REST backend.
//!
//! Every call threads the request through the request interceptors, sends
//! it, parses the body as JSON, threads the response through the response
//! interceptors and finally classifies it. Classification is pure; a 401
//! additionally notifies the registered [`UnauthorizedHook`]s so session
//! policy can react before the caller sees the error.

pub mod envelope;
pub mod interceptor;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::envelope::Envelope;
use crate::http::interceptor::{
    RequestInterceptor, RequestParts, ResponseInterceptor, ResponseParts, UnauthorizedHook,
};

/// Default timeout for [`HttpClient::upload`].
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A file sent as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field carrying the file.
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
    /// Extra text fields sent alongside the file.
    pub fields: Vec<(String, String)>,
}

impl Upload {
    pub fn file(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: "file".to_owned(),
            file_name: file_name.into(),
            bytes,
            mime: None,
            fields: Vec::new(),
        }
    }

    fn into_form(self) -> Result<Form, ClientError> {
        let mut part = Part::bytes(self.bytes).file_name(self.file_name);
        if let Some(mime) = self.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| ClientError::Config { message: format!("invalid mime type: {e}") })?;
        }
        let mut form = Form::new().part(self.field, part);
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

enum Body {
    Empty,
    Json(Value),
    Multipart(Form),
}

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    unauthorized_hooks: Vec<Arc<dyn UnauthorizedHook>>,
    upload_timeout: Duration,
}

impl HttpClient {
    /// Create a client for `base_url`. `request_timeout` of `None` leaves
    /// ordinary requests without a timeout.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(ClientError::Config { message: "api base url is required".to_owned() });
        }

        // reqwest is built without a default TLS provider; installing one
        // that is already present is a no-op.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("folio-session/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            unauthorized_hooks: Vec::new(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(&config.api_base_url, config.request_timeout())?
            .with_upload_timeout(config.upload_timeout()))
    }

    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    pub fn with_unauthorized_hook(mut self, hook: Arc<dyn UnauthorizedHook>) -> Self {
        self.unauthorized_hooks.push(hook);
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(Method::GET, path, HeaderMap::new(), Body::Empty, None, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body), HeaderMap::new()).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body), HeaderMap::new()).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body), HeaderMap::new()).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(Method::DELETE, path, HeaderMap::new(), Body::Empty, None, None).await
    }

    /// Send a request with an optional JSON body and caller-supplied headers.
    /// Headers set here are visible to (and win over) request interceptors.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: HeaderMap,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = match body {
            Some(b) => Body::Json(serde_json::to_value(b)?),
            None => Body::Empty,
        };
        self.execute(method, path, headers, body, None, None).await
    }

    /// `GET` a resource wrapped in the `{ success, data }` envelope.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let envelope: Envelope<T> = self.get(path).await?;
        envelope.into_result()
    }

    /// `POST` a multipart upload. Bounded by the upload timeout and aborted
    /// early when `cancel` fires.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: Upload,
        cancel: Option<CancellationToken>,
    ) -> Result<T, ClientError> {
        let form = upload.into_form()?;
        self.execute(
            Method::POST,
            path,
            HeaderMap::new(),
            Body::Multipart(form),
            Some(self.upload_timeout),
            cancel,
        )
        .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Body,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
    ) -> Result<T, ClientError> {
        let mut parts = RequestParts { method, path: path.to_owned(), headers };
        for interceptor in &self.request_interceptors {
            interceptor.on_request(&mut parts);
        }

        let mut builder =
            self.http.request(parts.method.clone(), self.url(&parts.path)).headers(parts.headers);
        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form),
        };
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<_, ClientError>((status, headers, bytes))
        };
        let (status, headers, bytes) = match cancel {
            Some(cancel) => tokio::select! {
                result = exchange => result?,
                _ = cancel.cancelled() => {
                    tracing::debug!(path = %parts.path, "request aborted");
                    return Err(ClientError::Network { message: "request aborted".to_owned() });
                }
            },
            None => exchange.await?,
        };

        let mut response =
            ResponseParts { method: parts.method, path: parts.path, status, headers, body: parse_body(&bytes) };
        for interceptor in &self.response_interceptors {
            interceptor.on_response(&mut response);
        }

        if !response.status.is_success() {
            let err = ClientError::from_status(response.status.as_u16(), &response.body);
            if err.is_unauthorized() {
                for hook in &self.unauthorized_hooks {
                    hook.on_unauthorized(&response.path);
                }
            }
            tracing::debug!(path = %response.path, err = %err, "api request failed");
            return Err(err);
        }

        Ok(serde_json::from_value(response.body)?)
    }
}

/// Empty bodies become `null`; non-JSON text is kept as a string.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
