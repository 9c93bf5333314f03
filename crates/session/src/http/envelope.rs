// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response envelopes used by the backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ErrorCode};

/// `{ success, data | error, message? }` wrapper of the resource endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<Value>,
    pub message: Option<String>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Unwrap `data`, or turn `success: false` into [`ClientError::Api`].
    pub fn into_result(self) -> Result<T, ClientError> {
        if !self.success {
            let message = self
                .error
                .as_ref()
                .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(Value::as_str)))
                .map(str::to_owned)
                .or(self.message)
                .unwrap_or_else(|| ErrorCode::ApiError.default_message().to_owned());
            return Err(ClientError::Api { message });
        }
        match self.data {
            Some(data) => Ok(data),
            // Unit-like payloads are allowed to omit `data`.
            None => serde_json::from_value(Value::Null).map_err(|_| ClientError::Decode {
                message: "successful response is missing `data`".to_owned(),
            }),
        }
    }
}

/// Auth payload that may arrive bare or wrapped as `{ success, data }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
