// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Default backend location.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Configuration for the folio API client, read once at construction.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the folio REST API.
    #[arg(long, default_value = DEFAULT_API_BASE_URL, env = "FOLIO_API_BASE_URL")]
    pub api_base_url: String,

    /// Log every API request and response.
    #[arg(long, env = "FOLIO_DEBUG")]
    pub debug: bool,

    /// Directory holding the persisted session.
    #[arg(long, env = "FOLIO_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Upload timeout in milliseconds.
    #[arg(long, default_value_t = 30000, env = "FOLIO_UPLOAD_TIMEOUT_MS")]
    pub upload_timeout_ms: u64,

    /// Timeout for ordinary requests in milliseconds. Unset means none.
    #[arg(long, env = "FOLIO_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            debug: false,
            state_dir: None,
            upload_timeout_ms: 30000,
            request_timeout_ms: None,
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Resolved state directory (see [`state_dir_with`]).
    pub fn state_dir(&self) -> PathBuf {
        match self.state_dir {
            Some(ref dir) => dir.clone(),
            None => state_dir_with(|name| std::env::var(name).ok()),
        }
    }

    pub fn session_file(&self) -> PathBuf {
        self.state_dir().join("session.json")
    }
}

/// Resolve the state directory: `$XDG_STATE_HOME/folio`, then
/// `$HOME/.local/state/folio`, then `.folio`.
pub fn state_dir_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(xdg) = env("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("folio");
    }
    if let Some(home) = env("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local/state/folio");
    }
    PathBuf::from(".folio")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
