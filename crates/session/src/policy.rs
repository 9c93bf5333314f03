// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session policy applied when the backend rejects our credentials.

use std::sync::Arc;

use crate::events::{EventBus, SessionEvent};
use crate::http::interceptor::UnauthorizedHook;
use crate::token_store::TokenStore;

/// Tears the local session down on any 401 and broadcasts `unauthorized`.
pub struct SessionPolicy {
    store: Arc<TokenStore>,
    bus: EventBus,
}

impl SessionPolicy {
    pub fn new(store: Arc<TokenStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }
}

impl UnauthorizedHook for SessionPolicy {
    fn on_unauthorized(&self, path: &str) {
        tracing::warn!(path, "backend rejected credentials, clearing session");
        self.store.clear_all_tokens();
        self.bus.emit(SessionEvent::Unauthorized { path: path.to_owned() });
    }
}
