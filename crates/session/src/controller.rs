// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session controller: login, logout, refresh and the observable view.
//!
//! The controller owns the in-memory [`SessionView`] and reacts to bus
//! events: `token_expiring` triggers a refresh, while `token_removed` and
//! `unauthorized` drop the view to unauthenticated once the store agrees.
//! User actions and timer-driven refreshes are not serialised against each
//! other; a clear always wins because it cancels the scheduler and a refresh
//! that completes after a clear discards its result.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::events::{EventBus, SessionEvent};
use crate::http::envelope::Payload;
use crate::http::HttpClient;
use crate::model::{
    AuthResponse, LoginRequest, MeResponse, RefreshRequest, RefreshResponse, RegisterRequest, User,
};
use crate::token_store::{epoch_secs, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Checking,
    Authenticated,
    Unauthenticated,
}

/// What the UI renders: the session status and, when known, the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl SessionView {
    fn authenticated(user: User) -> Self {
        Self { status: SessionStatus::Authenticated, user: Some(user) }
    }

    fn unauthenticated() -> Self {
        Self { status: SessionStatus::Unauthenticated, user: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

pub struct SessionController {
    http: Arc<HttpClient>,
    store: Arc<TokenStore>,
    bus: EventBus,
    view: watch::Sender<SessionView>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionController {
    pub fn new(http: Arc<HttpClient>, store: Arc<TokenStore>, bus: EventBus) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self { http, store, bus, view, refresh_gate: tokio::sync::Mutex::new(()) }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// True when both the view and the token store consider the user signed in.
    pub fn is_authenticated(&self) -> bool {
        self.view.borrow().is_authenticated() && self.store.is_authenticated()
    }

    /// Restore the session from storage.
    ///
    /// A cached user with a live access token is shown immediately and then
    /// revalidated. Only a 401 ends that session; other failures keep the
    /// cached user. Without an access token, a live refresh token is used to
    /// mint one before resyncing the user.
    pub async fn initialize(&self) -> SessionView {
        self.set_view(SessionView { status: SessionStatus::Checking, user: None });

        let access = self.store.get_access_token();
        match (access, self.store.get_user()) {
            (Some(_), Some(user)) => {
                self.set_view(SessionView::authenticated(user));
                match self.validate().await {
                    Ok(_) => {}
                    Err(e) if e.is_unauthorized() => {
                        tracing::info!("stored session rejected by backend");
                        self.end_locally();
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, "could not revalidate session, keeping cached user");
                    }
                }
            }
            (Some(_), None) => self.resync().await,
            (None, cached) => {
                if self.store.get_refresh_token().is_some() {
                    match self.refresh().await {
                        Ok(()) => self.resync().await,
                        Err(e) => tracing::info!(err = %e, "could not resume session"),
                    }
                } else {
                    if cached.is_some() {
                        self.store.clear_all_tokens();
                    }
                    self.set_view(SessionView::unauthenticated());
                }
            }
        }

        self.view()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let body = LoginRequest { username, password };
        let auth: Payload<AuthResponse> = self.http.post("/auth/login", &body).await?;
        self.establish(auth.into_inner())
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let body = RegisterRequest { username, email, password };
        let auth: Payload<AuthResponse> = self.http.post("/auth/register", &body).await?;
        self.establish(auth.into_inner())
    }

    /// Sign out. The backend call is best effort; the local session is
    /// always cleared.
    pub async fn logout(&self) {
        if self.store.get_access_token().is_some() {
            let result: Result<Value, _> = self.http.post("/auth/logout", &serde_json::json!({})).await;
            if let Err(e) = result {
                tracing::warn!(err = %e, "logout request failed, clearing local session anyway");
            }
        }
        self.end_locally();
        self.bus.emit(SessionEvent::LoggedOut);
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// On failure the session is over: all tokens are cleared and
    /// `session_expired` is emitted. A result that arrives after the session
    /// was cleared or replaced is discarded.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let _gate = self.refresh_gate.lock().await;

        let Some(record) = self.store.refresh_record() else {
            self.expire("no refresh token");
            return Err(ClientError::session("no refresh token available"));
        };

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", record.value))
            .map_err(|_| ClientError::session("refresh token is not a valid header value"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let result: Result<Payload<RefreshResponse>, _> = self
            .http
            .request(Method::POST, "/auth/refresh", Some(&RefreshRequest::default()), headers)
            .await;

        // A 401 has already torn the session down through the unauthorized
        // hook and still counts as an expiry. Anything else that finds the
        // refresh token changed lost a race with logout or a new login.
        let superseded = self.store.get_refresh_token().as_deref() != Some(record.value.as_str());
        let grant = match result {
            Err(e) if e.is_unauthorized() || !superseded => {
                tracing::warn!(err = %e, "token refresh failed");
                self.expire(e.message());
                return Err(e);
            }
            _ if superseded => {
                tracing::info!("session changed during refresh, discarding result");
                return Err(ClientError::session("session changed during refresh"));
            }
            Err(e) => return Err(e),
            Ok(response) => response.into_inner().tokens,
        };

        if !self.store.set_access_token(&grant.token, grant.expires_in) {
            self.expire("failed to store refreshed token");
            return Err(ClientError::session("failed to store refreshed token"));
        }
        if let Some(ref rotated) = grant.refresh_token {
            let expires_in =
                grant.refresh_expires_in.unwrap_or_else(|| record.remaining_secs(epoch_secs()));
            if !self.store.set_refresh_token(rotated, expires_in) {
                tracing::warn!("failed to store rotated refresh token");
            }
        }
        tracing::debug!(expires_in = grant.expires_in, "access token refreshed");
        Ok(())
    }

    /// Fetch the current user from the backend and update the cache.
    pub async fn validate(&self) -> Result<User, ClientError> {
        let me: Payload<MeResponse> = self.http.get("/auth/me").await?;
        let user = me.into_inner().user;
        self.store.set_user(&user);
        if self.view.borrow().is_authenticated() {
            self.set_view(SessionView::authenticated(user.clone()));
        }
        Ok(user)
    }

    async fn resync(&self) {
        match self.validate().await {
            Ok(user) => self.set_view(SessionView::authenticated(user)),
            Err(e) => {
                tracing::info!(err = %e, "could not load user, clearing session");
                self.end_locally();
            }
        }
    }

    /// React to one bus event.
    pub async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::TokenExpiring { generation } => {
                if !self.store.is_current_expiry(generation) {
                    tracing::debug!(generation, "ignoring expiry of a replaced token");
                    return;
                }
                if self.store.get_refresh_token().is_none() {
                    tracing::debug!(generation, "ignoring expiry, no refresh token");
                    return;
                }
                tracing::debug!(generation, "access token expiring, refreshing");
                if let Err(e) = self.refresh().await {
                    tracing::debug!(err = %e, "scheduled refresh did not complete");
                }
            }
            SessionEvent::TokenRemoved { .. } | SessionEvent::Unauthorized { .. } => {
                self.sync_from_store();
            }
            _ => {}
        }
    }

    /// Consume bus events until `shutdown` fires.
    pub fn spawn_event_loop(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = this.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    recv = rx.recv() => match recv {
                        Ok(event) => this.handle_event(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "session event loop lagged");
                            this.sync_from_store();
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("session event loop stopped");
        })
    }

    /// Drop an authenticated view whose tokens are gone. A newer login that
    /// already repopulated the store is left alone.
    fn sync_from_store(&self) {
        if self.view.borrow().is_authenticated() && !self.store.is_authenticated() {
            self.set_view(SessionView::unauthenticated());
        }
    }

    fn establish(&self, auth: AuthResponse) -> Result<User, ClientError> {
        let AuthResponse { user, tokens } = auth;
        let stored = self.store.set_access_token(&tokens.token, tokens.expires_in)
            && self.store.set_refresh_token(&tokens.refresh_token, tokens.refresh_expires_in)
            && self.store.set_user(&user);
        if !stored {
            self.end_locally();
            return Err(ClientError::session("failed to persist session"));
        }
        tracing::info!(username = %user.username, "signed in");
        self.set_view(SessionView::authenticated(user.clone()));
        self.bus.emit(SessionEvent::LoggedIn { username: user.username.clone() });
        Ok(user)
    }

    fn expire(&self, reason: &str) {
        self.end_locally();
        self.bus.emit(SessionEvent::SessionExpired { reason: reason.to_owned() });
    }

    fn end_locally(&self) {
        self.store.clear_all_tokens();
        self.set_view(SessionView::unauthenticated());
    }

    fn set_view(&self, view: SessionView) {
        tracing::trace!(status = ?view.status, "session view");
        self.view.send_replace(view);
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
