//! Single-entry token cache for one client identity.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{CachedToken, TokenSource};
use crate::CallerError;

type MintOutcome = Result<CachedToken, CallerError>;

/// Reuses one token until it is within `safety_margin` of expiry.
///
/// Reads take the `RwLock` only. A refresh runs under `refresh_gate`, which
/// also keeps the outcome of the last mint. `generation` is bumped after
/// every completed mint: a caller that saw it change while queued on the gate
/// takes that outcome, error included, instead of minting again. The entry is
/// replaced only once a new token is in hand, so a caller dropped mid-refresh
/// leaves the previous entry untouched and the generation unchanged.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    entry: RwLock<Option<CachedToken>>,
    refresh_gate: Mutex<Option<MintOutcome>>,
    generation: AtomicU64,
    safety_margin: Duration,
    mints: AtomicU64,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>, safety_margin: Duration) -> Self {
        Self {
            source,
            entry: RwLock::new(None),
            refresh_gate: Mutex::new(None),
            generation: AtomicU64::new(0),
            safety_margin,
            mints: AtomicU64::new(0),
        }
    }

    pub fn client_id(&self) -> &str {
        self.source.client_id()
    }

    /// Number of tokens minted through this cache.
    pub fn mint_count(&self) -> u64 {
        self.mints.load(Ordering::Relaxed)
    }

    pub async fn get(&self) -> Result<CachedToken, CallerError> {
        self.get_at(Utc::now()).await
    }

    pub async fn get_at(&self, now: DateTime<Utc>) -> Result<CachedToken, CallerError> {
        // Read before the fast path so a mint finishing in between is noticed.
        let observed = self.generation.load(Ordering::Acquire);

        if let Some(token) = self.fresh_entry(now).await {
            return Ok(token);
        }

        let mut last_outcome = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(outcome) = last_outcome.as_ref() {
                tracing::debug!(client_id = %self.client_id(), "Joining refresh completed while queued");
                return outcome.clone();
            }
        }

        tracing::debug!(client_id = %self.client_id(), "Token cache miss, minting");
        let outcome = self.source.fetch_token().await;

        if let Ok(token) = &outcome {
            *self.entry.write().await = Some(token.clone());
            self.mints.fetch_add(1, Ordering::Relaxed);
        }
        *last_outcome = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::Release);

        outcome
    }

    /// Drop the cached entry, but only if it is still `token`. A token that
    /// has already been replaced by a concurrent refresh is left alone.
    pub async fn invalidate(&self, token: &CachedToken) -> bool {
        let mut entry = self.entry.write().await;
        match entry.as_ref() {
            Some(current) if current.access_token == token.access_token => {
                *entry = None;
                tracing::debug!(client_id = %self.client_id(), "Cached token invalidated");
                true
            }
            _ => false,
        }
    }

    async fn fresh_entry(&self, now: DateTime<Utc>) -> Option<CachedToken> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh_at(now, self.safety_margin))
            .cloned()
    }
}
