//! Orchestrates override, cache, fetch and validation into one
//! `get_rate` call that never surfaces an error to the caller.

use anyhow::{Result, ensure};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::cache::RateCache;
use crate::core::manual::ManualOverride;
use crate::core::rate::RateExtractor;
use crate::core::validator;

/// Outcome published to callers that coalesced onto an in-flight fetch.
#[derive(Debug, Clone, Copy)]
enum FetchState {
    Pending,
    Done(Option<f64>),
}

struct State {
    cache: RateCache,
    manual: ManualOverride,
    /// Slot for the in-flight fetch, if any. Concurrent cache misses
    /// subscribe here instead of launching their own fetch.
    pending: Option<watch::Receiver<FetchState>>,
}

pub struct RateProvider {
    extractor: Arc<dyn RateExtractor>,
    ttl: Duration,
    state: Mutex<State>,
}

impl RateProvider {
    pub fn new(extractor: Arc<dyn RateExtractor>, ttl: Duration) -> Self {
        RateProvider {
            extractor,
            ttl,
            state: Mutex::new(State {
                cache: RateCache::new(),
                manual: ManualOverride::new(),
                pending: None,
            }),
        }
    }

    /// Best available rate: manual override, else fresh cached value,
    /// else a freshly fetched and validated one. Degrades to the stale
    /// cached value (or `None` if nothing was ever cached) on any
    /// fetch or validation failure.
    pub async fn get_rate(&self) -> Option<f64> {
        let mut state = self.state.lock().await;

        if let Some(value) = state.manual.value() {
            debug!(value, "Serving manual override");
            return Some(value);
        }

        if let Some(value) = state.cache.fresh_value(self.ttl, Instant::now()) {
            return Some(value);
        }

        // A closed channel still in Pending means the fetch task was
        // dropped before publishing; reclaim the slot and lead.
        let abandoned = match &state.pending {
            Some(rx) => rx.has_changed().is_err() && matches!(*rx.borrow(), FetchState::Pending),
            None => false,
        };
        if abandoned {
            state.pending = None;
        }

        if let Some(rx) = &state.pending {
            let rx = rx.clone();
            drop(state);
            debug!("Coalescing onto in-flight fetch");
            return self.await_pending(rx).await;
        }

        let (tx, rx) = watch::channel(FetchState::Pending);
        state.pending = Some(rx);
        drop(state);

        let fetched = self.fetch_validated().await;

        let mut state = self.state.lock().await;
        if let Some(value) = fetched {
            state.cache.set(value, Instant::now());
        }
        state.pending = None;
        // An override set while the fetch was in flight still wins.
        let outcome = state.manual.value().or_else(|| state.cache.value());
        drop(state);

        let _ = tx.send(FetchState::Done(outcome));
        outcome
    }

    /// Activates the manual override. Leaves the cache untouched.
    pub async fn set_override(&self, value: f64) -> Result<()> {
        ensure!(value > 0.0, "Override rate must be positive, got {value}");
        let mut state = self.state.lock().await;
        state.manual.set(value);
        Ok(())
    }

    /// Deactivates the manual override and invalidates the cache, so the
    /// next `get_rate` re-fetches instead of surfacing a value that
    /// predates the override period.
    pub async fn clear_override(&self) {
        let mut state = self.state.lock().await;
        state.manual.clear();
        state.cache.invalidate();
    }

    async fn await_pending(&self, mut rx: watch::Receiver<FetchState>) -> Option<f64> {
        loop {
            if let FetchState::Done(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Fetch task dropped without publishing; serve whatever
                // is currently held.
                let state = self.state.lock().await;
                return state.manual.value().or_else(|| state.cache.value());
            }
        }
    }

    async fn fetch_validated(&self) -> Option<f64> {
        match self.extractor.fetch().await {
            Ok(token) => {
                debug!(raw = %token.raw, "Scraper matched rate token");
                match validator::check(&token.raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(raw = %token.raw, error = %e, "Discarding implausible rate");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Rate fetch failed, keeping previous value");
                None
            }
        }
    }
}
