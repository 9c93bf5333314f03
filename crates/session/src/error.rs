// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Error codes surfaced to callers of the backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    RateLimited,
    ServerError,
    BadGateway,
    ServiceUnavailable,
    /// Non-2xx status outside the known table.
    HttpError,
    /// The server could not be reached (connect, DNS, timeout, abort).
    NetworkError,
    /// A 2xx envelope that reported `success: false`.
    ApiError,
    DecodeError,
    SessionError,
    ConfigError,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::ValidationError,
            429 => Self::RateLimited,
            500 => Self::ServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            _ => Self::HttpError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
            Self::BadGateway => "BAD_GATEWAY",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::HttpError => "HTTP_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ApiError => "API_ERROR",
            Self::DecodeError => "DECODE_ERROR",
            Self::SessionError => "SESSION_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// User-facing text used when the server does not supply its own message.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Invalid request parameters",
            Self::Unauthorized => "Not signed in or session expired, please sign in again",
            Self::Forbidden => "You do not have permission to perform this action",
            Self::NotFound => "The requested resource does not exist",
            Self::ValidationError => "The submitted data failed validation",
            Self::RateLimited => "Too many requests, please try again later",
            Self::ServerError => "Internal server error, please try again later",
            Self::BadGateway => "Bad gateway",
            Self::ServiceUnavailable => "Service temporarily unavailable",
            Self::HttpError => "Request failed",
            Self::NetworkError => "Unable to reach the server, check your network connection",
            Self::ApiError => "The request was not successful",
            Self::DecodeError => "Unexpected response from the server",
            Self::SessionError => "Your session has expired, please sign in again",
            Self::ConfigError => "Invalid client configuration",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Failure of a backend call or a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    Network { message: String },
    /// The server answered with a non-2xx status.
    Http { status: u16, code: ErrorCode, message: String },
    /// A 2xx envelope with `success: false`.
    Api { message: String },
    Decode { message: String },
    Session { message: String },
    Config { message: String },
}

impl ClientError {
    /// Classify a non-2xx response. A `message` (or string `error`, or
    /// `error.message`) in the body overrides the default text.
    pub fn from_status(status: u16, body: &Value) -> Self {
        let code = ErrorCode::from_status(status);
        let message = server_message(body).unwrap_or_else(|| match code {
            ErrorCode::HttpError => format!("Request failed with status {status}"),
            _ => code.default_message().to_owned(),
        });
        Self::Http { status, code, message }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session { message: message.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network { .. } => ErrorCode::NetworkError,
            Self::Http { code, .. } => *code,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::Decode { .. } => ErrorCode::DecodeError,
            Self::Session { .. } => ErrorCode::SessionError,
            Self::Config { .. } => ErrorCode::ConfigError,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network { message }
            | Self::Http { message, .. }
            | Self::Api { message }
            | Self::Decode { message }
            | Self::Session { message }
            | Self::Config { message } => message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Whether an identical request could plausibly succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody { code: self.code().as_str().to_owned(), message: self.message().to_owned() }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, code, message } => write!(f, "{code} ({status}): {message}"),
            other => write!(f, "{}: {}", other.code(), other.message()),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Decode { message: e.to_string() };
        }
        if e.is_builder() {
            return Self::Config { message: e.to_string() };
        }
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("could not connect: {e}")
        } else {
            e.to_string()
        };
        Self::Network { message }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode { message: e.to_string() }
    }
}

fn server_message(body: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.trim().is_empty()).map(str::to_owned);
    body.get("message")
        .and_then(non_empty)
        .or_else(|| body.get("error").and_then(non_empty))
        .or_else(|| body.get("error").and_then(|e| e.get("message")).and_then(non_empty))
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
