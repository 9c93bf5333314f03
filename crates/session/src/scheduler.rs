// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shot access-token expiry timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::events::{EventBus, SessionEvent};

/// Seconds before expiry at which `token_expiring` fires.
pub const REFRESH_LEAD_SECS: u64 = 10;

/// Lower bound on the timer delay.
pub const MIN_DELAY_SECS: u64 = 5;

struct Armed {
    generation: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

/// Holds at most one pending expiry timer.
///
/// Arming always replaces the pending timer. A timer fires once, emits
/// [`SessionEvent::TokenExpiring`] and is not re-armed.
pub struct SessionScheduler {
    bus: EventBus,
    pending: Arc<Mutex<Option<Armed>>>,
    generation: AtomicU64,
    /// Generation of the last timer armed and not cancelled since; 0 when none.
    live: AtomicU64,
}

impl SessionScheduler {
    pub fn new(bus: EventBus) -> Self {
        Self { bus, pending: Arc::new(Mutex::new(None)), generation: AtomicU64::new(0), live: AtomicU64::new(0) }
    }

    /// Timer delay for an access token valid for `expires_in_secs`.
    pub fn expiry_delay(expires_in_secs: u64) -> Duration {
        Duration::from_secs(expires_in_secs.saturating_sub(REFRESH_LEAD_SECS).max(MIN_DELAY_SECS))
    }

    /// Cancel any pending timer and arm a new one. Returns its generation.
    pub fn arm(&self, delay: Duration) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.pending.lock();
        if let Some(prev) = pending.take() {
            prev.handle.abort();
            tracing::debug!(generation = prev.generation, "replaced pending expiry timer");
        }
        self.live.store(0, Ordering::SeqCst);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, expiry timer not armed");
            return generation;
        };

        let slot = Arc::clone(&self.pending);
        let bus = self.bus.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Only the timer still registered in the slot may fire.
            let current = {
                let mut pending = slot.lock();
                match pending.as_ref() {
                    Some(armed) if armed.generation == generation => pending.take().is_some(),
                    _ => false,
                }
            };
            if current {
                tracing::debug!(generation, "access token expiring");
                bus.emit(SessionEvent::TokenExpiring { generation });
            }
        });
        *pending = Some(Armed { generation, delay, handle });
        self.live.store(generation, Ordering::SeqCst);
        tracing::debug!(generation, delay_secs = delay.as_secs(), "armed expiry timer");
        generation
    }

    /// Drop the pending timer, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock();
        self.live.store(0, Ordering::SeqCst);
        if let Some(prev) = pending.take() {
            prev.handle.abort();
            tracing::debug!(generation = prev.generation, "cancelled expiry timer");
        }
    }

    /// Whether `generation` is the latest armed timer and has not been
    /// cancelled or replaced. Stays true after that timer fires.
    pub fn is_current(&self, generation: u64) -> bool {
        generation != 0 && self.live.load(Ordering::SeqCst) == generation
    }

    pub fn armed_delay(&self) -> Option<Duration> {
        self.pending.lock().as_ref().map(|a| a.delay)
    }

    pub fn armed_generation(&self) -> Option<u64> {
        self.pending.lock().as_ref().map(|a| a.generation)
    }
}

impl Drop for SessionScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
