// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access/refresh token and cached-user persistence.
//!
//! Expiry is checked lazily on every read: an expired access token is purged
//! when read, and an expired refresh token takes the whole session with it.
//! Storage failures never reach the caller; they are logged and reported as
//! `false` (writes) or as absent data (reads).

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::events::{ClearScope, EventBus, SessionEvent};
use crate::model::User;
use crate::scheduler::SessionScheduler;
use crate::storage::Storage;

pub const ACCESS_TOKEN_KEY: &str = "folio.access_token";
pub const ACCESS_EXPIRES_AT_KEY: &str = "folio.access_token_expires_at";
pub const ACCESS_ISSUED_AT_KEY: &str = "folio.access_token_issued_at";
pub const REFRESH_TOKEN_KEY: &str = "folio.refresh_token";
pub const REFRESH_EXPIRES_AT_KEY: &str = "folio.refresh_token_expires_at";
pub const REFRESH_ISSUED_AT_KEY: &str = "folio.refresh_token_issued_at";
pub const USER_KEY: &str = "folio.user";

/// Storage keys backing one token record.
struct Slot {
    name: &'static str,
    token: &'static str,
    expires_at: &'static str,
    issued_at: &'static str,
}

const ACCESS: Slot = Slot {
    name: "access",
    token: ACCESS_TOKEN_KEY,
    expires_at: ACCESS_EXPIRES_AT_KEY,
    issued_at: ACCESS_ISSUED_AT_KEY,
};

const REFRESH: Slot = Slot {
    name: "refresh",
    token: REFRESH_TOKEN_KEY,
    expires_at: REFRESH_EXPIRES_AT_KEY,
    issued_at: REFRESH_ISSUED_AT_KEY,
};

/// A stored token with its issue time and absolute expiry (epoch seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub value: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn remaining_secs(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// Point-in-time summary of the stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_expires_in_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

pub struct TokenStore {
    storage: Arc<dyn Storage>,
    scheduler: Arc<SessionScheduler>,
    bus: EventBus,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn Storage>, scheduler: Arc<SessionScheduler>, bus: EventBus) -> Self {
        Self { storage, scheduler, bus }
    }

    /// Store the access token and arm the expiry timer.
    pub fn set_access_token(&self, value: &str, expires_in_secs: u64) -> bool {
        let now = epoch_secs();
        let expires_at = now.saturating_add(expires_in_secs);
        if let Err(e) = self.write_record(&ACCESS, value, now, expires_at) {
            tracing::warn!(err = %e, "failed to store access token");
            // The previous token's record is gone, so is its timer.
            self.scheduler.cancel();
            return false;
        }
        self.scheduler.arm(SessionScheduler::expiry_delay(expires_in_secs));
        self.bus.emit(SessionEvent::TokenSet { expires_at });
        true
    }

    /// Store the refresh token. Does not touch the expiry timer.
    pub fn set_refresh_token(&self, value: &str, expires_in_secs: u64) -> bool {
        let now = epoch_secs();
        if let Err(e) = self.write_record(&REFRESH, value, now, now.saturating_add(expires_in_secs)) {
            tracing::warn!(err = %e, "failed to store refresh token");
            return false;
        }
        true
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.access_record().map(|r| r.value)
    }

    /// The live access token record; purges it when expired or corrupt.
    pub fn access_record(&self) -> Option<TokenRecord> {
        match self.read_record(&ACCESS) {
            Some(record) if !record.is_expired_at(epoch_secs()) => Some(record),
            Some(_) => {
                tracing::debug!("access token expired");
                self.clear_access_token();
                None
            }
            None => {
                if self.storage.get(ACCESS.token).is_some() {
                    tracing::warn!("access token record is corrupt, discarding");
                    self.clear_access_token();
                }
                None
            }
        }
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.refresh_record().map(|r| r.value)
    }

    /// The live refresh token record. An expired or corrupt refresh token
    /// ends the session: all tokens and the user are purged.
    pub fn refresh_record(&self) -> Option<TokenRecord> {
        match self.read_record(&REFRESH) {
            Some(record) if !record.is_expired_at(epoch_secs()) => Some(record),
            Some(_) => {
                tracing::info!("refresh token expired, clearing session");
                self.clear_all_tokens();
                None
            }
            None => {
                if self.storage.get(REFRESH.token).is_some() {
                    tracing::warn!("refresh token record is corrupt, clearing session");
                    self.clear_all_tokens();
                }
                None
            }
        }
    }

    pub fn clear_access_token(&self) {
        self.scheduler.cancel();
        self.remove_record(&ACCESS);
        self.bus.emit(SessionEvent::TokenRemoved { scope: ClearScope::Access });
    }

    /// Remove both tokens and the cached user.
    pub fn clear_all_tokens(&self) {
        self.scheduler.cancel();
        self.remove_record(&ACCESS);
        self.remove_record(&REFRESH);
        if let Err(e) = self.storage.remove(USER_KEY) {
            tracing::warn!(err = %e, "failed to remove cached user");
        }
        self.bus.emit(SessionEvent::TokenRemoved { scope: ClearScope::All });
    }

    /// Whether a `token_expiring` for `generation` still belongs to the
    /// stored access token.
    pub fn is_current_expiry(&self, generation: u64) -> bool {
        self.scheduler.is_current(generation)
    }

    pub fn set_user(&self, user: &User) -> bool {
        let result = serde_json::to_string(user)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.set(USER_KEY, &json));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(err = %e, "failed to store user");
                false
            }
        }
    }

    pub fn get_user(&self) -> Option<User> {
        let raw = self.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(err = %e, "cached user is corrupt");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_access_token().is_some() && self.get_user().is_some()
    }

    pub fn status(&self) -> TokenStatus {
        let now = epoch_secs();
        let access = self.access_record();
        let refresh = self.refresh_record();
        let user = self.get_user();
        TokenStatus {
            authenticated: access.is_some() && user.is_some(),
            access_expires_in_secs: access.map(|r| r.remaining_secs(now)),
            refresh_expires_in_secs: refresh.map(|r| r.remaining_secs(now)),
            user,
        }
    }

    fn write_record(
        &self,
        slot: &Slot,
        value: &str,
        issued_at: u64,
        expires_at: u64,
    ) -> anyhow::Result<()> {
        let result = self
            .storage
            .set(slot.token, value)
            .and_then(|()| self.storage.set(slot.expires_at, &expires_at.to_string()))
            .and_then(|()| self.storage.set(slot.issued_at, &issued_at.to_string()));
        if result.is_err() {
            // Never leave a half-written record behind.
            self.remove_record(slot);
        }
        result
    }

    fn read_record(&self, slot: &Slot) -> Option<TokenRecord> {
        let value = self.storage.get(slot.token)?;
        let expires_at = self.storage.get(slot.expires_at)?.parse().ok()?;
        let issued_at =
            self.storage.get(slot.issued_at).and_then(|s| s.parse().ok()).unwrap_or_default();
        Some(TokenRecord { value, issued_at, expires_at })
    }

    fn remove_record(&self, slot: &Slot) {
        for key in [slot.token, slot.expires_at, slot.issued_at] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(token = slot.name, err = %e, "failed to remove token record");
            }
        }
    }
}

/// Current wall-clock time in epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "token_store_tests.rs"]
mod tests;
