use std::sync::atomic::{AtomicU64, Ordering};

use client_sdk::StoreClient;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::state::{PanelEvent, PanelState};

/// Drives the remote store and folds every outcome into one [`PanelState`].
///
/// The lock is held only while applying an event or taking a snapshot, never
/// across a request, so overlapping operations serialize at the state and
/// nowhere else.
pub struct PanelController {
    client: StoreClient,
    state: Mutex<PanelState>,
    refresh_seq: AtomicU64,
}

impl PanelController {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            state: Mutex::new(PanelState::default()),
            refresh_seq: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> PanelState {
        self.state.lock().await.clone()
    }

    /// Puts an arbitrary message on the shared status line.
    pub async fn report(&self, text: impl Into<String>, ok: bool) {
        self.apply(PanelEvent::StatusReported {
            text: text.into(),
            ok,
        })
        .await;
    }

    pub async fn set(&self, key_raw: &str, value_raw: &str, ttl_raw: &str) {
        let key = key_raw.trim().to_string();
        let value = value_raw.trim().to_string();
        let ttl = parse_ttl_field(ttl_raw);

        match self.client.set(key.clone(), value, ttl).await {
            Ok(()) => {
                self.apply(PanelEvent::SetCompleted { key }).await;
                self.refresh_keys().await;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "set rejected");
                self.apply(PanelEvent::SetFailed {
                    detail: err.detail().map(str::to_string),
                })
                .await;
            }
        }
    }

    pub async fn lookup(&self, key_raw: &str) {
        let key = key_raw.trim().to_string();

        match self.client.get(&key).await {
            Ok(record) => {
                self.apply(PanelEvent::LookupCompleted { key, record }).await;
            }
            Err(err) => {
                debug!(key = %key, error = %err, "lookup came back empty");
                self.apply(PanelEvent::LookupFailed).await;
            }
        }
    }

    pub async fn delete(&self, key_raw: &str) {
        let key = key_raw.trim().to_string();

        match self.client.delete(&key).await {
            Ok(()) => {
                self.apply(PanelEvent::DeleteCompleted { key }).await;
                self.refresh_keys().await;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "delete rejected");
                self.apply(PanelEvent::DeleteFailed {
                    detail: err.detail().map(str::to_string),
                })
                .await;
            }
        }
    }

    /// Reloads the key list. The sequence number is taken before the request
    /// goes out, so a refresh that is overtaken while in flight lands stale
    /// and gets dropped by the state.
    pub async fn refresh_keys(&self) {
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        match self.client.list_keys().await {
            Ok(listing) => {
                self.apply(PanelEvent::KeysLoaded {
                    seq,
                    keys: listing.keys,
                    count: listing.count,
                })
                .await;
            }
            Err(err) => {
                warn!(error = %err, "key list refresh failed");
                self.apply(PanelEvent::KeysRefreshFailed { seq }).await;
            }
        }
    }

    pub async fn clear_all(&self) {
        match self.client.clear_all().await {
            Ok(message) => {
                self.apply(PanelEvent::ClearCompleted { message }).await;
                self.refresh_keys().await;
            }
            Err(err) => {
                warn!(error = %err, "clear rejected");
                self.apply(PanelEvent::ClearFailed).await;
            }
        }
    }

    pub async fn compact(&self) {
        match self.client.compact().await {
            Ok(message) => {
                self.apply(PanelEvent::CompactCompleted { message }).await;
                self.refresh_stats().await;
            }
            Err(err) => {
                warn!(error = %err, "compaction rejected");
                self.apply(PanelEvent::CompactFailed).await;
            }
        }
    }

    pub async fn refresh_stats(&self) {
        match self.client.stats().await {
            Ok(snapshot) => {
                self.apply(PanelEvent::StatsLoaded { snapshot }).await;
            }
            Err(err) => {
                warn!(error = %err, "stats refresh failed");
                self.apply(PanelEvent::StatsRefreshFailed).await;
            }
        }
    }

    pub async fn dismiss_ack(&self) {
        self.apply(PanelEvent::AckDismissed).await;
    }

    async fn apply(&self, event: PanelEvent) {
        self.state.lock().await.apply(event);
    }
}

/// Normalizes the free-form TTL field: surrounding whitespace is dropped,
/// and anything that is not a plain non-negative integer means "no TTL".
pub fn parse_ttl_field(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
