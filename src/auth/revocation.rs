//! Server-side token revocation
//!
//! Tokens invalidated before their natural expiry (logout) are remembered
//! here until that expiry passes. Entries are keyed by the SHA-256 digest of
//! the raw token so the store never retains bearer credentials.
//!
//! Lookups are correct on their own: an entry whose expiry has passed is
//! reported as not revoked, since the token itself is no longer acceptable.
//! The background reaper only exists to bound memory.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default sweep interval for the reaper
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Concurrent set of revoked tokens with their expiry instants.
#[derive(Default)]
pub struct RevocationStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `token` until `expires_at`. Re-adding a token overwrites its expiry.
    pub fn add(&self, token: &str, expires_at: DateTime<Utc>) {
        self.entries.write().insert(digest(token), expires_at);
    }

    /// True if `token` was revoked and its recorded expiry has not passed.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.is_revoked_at(token, Utc::now())
    }

    pub fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .read()
            .get(&digest(token))
            .is_some_and(|expires_at| now <= *expires_at)
    }

    /// Drop every entry whose expiry has passed. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| now <= *expires_at);
        before - entries.len()
    }

    /// Number of tracked entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Start the background reaper. Only the first call spawns a task; later
    /// calls return false. The task holds a weak reference and exits once the
    /// store is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_reaper(self: &Arc<Self>, interval: Duration) -> bool {
        let mut slot = self.reaper.lock();
        if slot.is_some() {
            return false;
        }

        let store: Weak<Self> = Arc::downgrade(self);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;

                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = store.len(), "revocation sweep");
                }
            }
        }));

        tracing::info!(interval_secs = interval.as_secs(), "revocation reaper started");
        true
    }

    pub fn reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RevocationStore {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.get_mut().take() {
            handle.abort();
        }
    }
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
