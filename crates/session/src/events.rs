// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle events and the broadcast bus that carries them.
//!
//! Every component publishes onto one [`EventBus`]. Each subscriber sees
//! events in emission order, so a `token_removed` emitted after a
//! `token_expiring` is always observed after it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which records a clear removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearScope {
    /// Only the access token.
    Access,
    /// Access token, refresh token and cached user.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new access token was stored.
    TokenSet { expires_at: u64 },
    /// Tokens were cleared.
    TokenRemoved { scope: ClearScope },
    /// The expiry timer for access token `generation` fired.
    TokenExpiring { generation: u64 },
    /// The backend answered 401 to a request for `path`.
    Unauthorized { path: String },
    /// Refresh failed; the session is gone.
    SessionExpired { reason: String },
    LoggedIn { username: String },
    LoggedOut,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenSet { .. } => "token_set",
            Self::TokenRemoved { .. } => "token_removed",
            Self::TokenExpiring { .. } => "token_expiring",
            Self::Unauthorized { .. } => "unauthorized",
            Self::SessionExpired { .. } => "session_expired",
            Self::LoggedIn { .. } => "logged_in",
            Self::LoggedOut => "logged_out",
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(event = event.name(), "session event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
