// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::controller::SessionController;
use crate::error::ClientError;
use crate::events::{EventBus, SessionEvent};
use crate::http::interceptor::{BearerAuth, DebugLog, RequestId};
use crate::http::HttpClient;
use crate::policy::SessionPolicy;
use crate::scheduler::SessionScheduler;
use crate::storage::Storage;
use crate::token_store::TokenStore;

/// One fully wired session: bus, scheduler, token store, HTTP client and
/// controller. Contexts share nothing, so several can coexist.
pub struct SessionContext {
    pub bus: EventBus,
    pub scheduler: Arc<SessionScheduler>,
    pub store: Arc<TokenStore>,
    pub http: Arc<HttpClient>,
    pub controller: Arc<SessionController>,
    shutdown: CancellationToken,
    event_loop: Option<JoinHandle<()>>,
}

impl SessionContext {
    /// Wire a session over `storage` and start the controller event loop.
    /// Must be called inside a tokio runtime.
    pub fn create(config: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ClientError> {
        let bus = EventBus::default();
        let scheduler = Arc::new(SessionScheduler::new(bus.clone()));
        let store = Arc::new(TokenStore::new(storage, Arc::clone(&scheduler), bus.clone()));

        let mut http = HttpClient::from_config(config)?
            .with_request_interceptor(Arc::new(RequestId))
            .with_request_interceptor(Arc::new(BearerAuth::new(Arc::clone(&store))))
            .with_unauthorized_hook(Arc::new(SessionPolicy::new(Arc::clone(&store), bus.clone())));
        if config.debug {
            http = http
                .with_request_interceptor(Arc::new(DebugLog))
                .with_response_interceptor(Arc::new(DebugLog));
        }
        let http = Arc::new(http);

        let controller =
            Arc::new(SessionController::new(Arc::clone(&http), Arc::clone(&store), bus.clone()));
        let shutdown = CancellationToken::new();
        let event_loop = controller.spawn_event_loop(shutdown.clone());

        tracing::debug!(base_url = http.base_url(), debug = config.debug, "session context created");
        Ok(Self {
            bus,
            scheduler,
            store,
            http,
            controller,
            shutdown,
            event_loop: Some(event_loop),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Stop the event loop and any pending expiry timer, waiting for the
    /// loop to exit.
    pub async fn dispose(mut self) {
        self.shutdown.cancel();
        self.scheduler.cancel();
        if let Some(handle) = self.event_loop.take() {
            if let Err(e) = handle.await {
                tracing::warn!(err = %e, "session event loop ended abnormally");
            }
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.scheduler.cancel();
    }
}
