//! Per-session time-spent tracking.
//!
//! One heartbeat task per session, started on the session's first page
//! view. Every tick (and every explicit flush from a tab-hidden or
//! page-unload signal) writes elapsed-since-session-start to the
//! aggregate row. Elapsed time is always computed from the fixed start
//! instant, never by summing deltas, so the written value cannot drift;
//! the storage layer additionally refuses to let the column decrease.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;
use tracing::warn;

use crate::models::SessionId;
use crate::storage::Storage;

/// Injectable time source so the tracker can be tested without timers.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct TrackedSession {
    started_at: Instant,
    shutdown_tx: watch::Sender<bool>,
}

/// Registry of active session heartbeats.
pub struct TrackerRegistry {
    sessions: DashMap<String, TrackedSession>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    heartbeat: Duration,
}

impl TrackerRegistry {
    pub fn new(storage: Arc<dyn Storage>, heartbeat: Duration) -> Arc<Self> {
        Self::with_clock(storage, heartbeat, Arc::new(SystemClock))
    }

    pub fn with_clock(
        storage: Arc<dyn Storage>,
        heartbeat: Duration,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            storage,
            clock,
            heartbeat,
        })
    }

    /// Transition a session into tracking on its first page view.
    ///
    /// Subsequent page views for the same session are no-ops: there is
    /// never a second heartbeat per session, and the original start
    /// instant is preserved.
    pub fn observe_page_view(self: &Arc<Self>, session_id: &SessionId) {
        use dashmap::mapref::entry::Entry;

        let id = session_id.as_str().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let started_at = self.clock.now();

        let newly_tracked = match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(TrackedSession {
                    started_at,
                    shutdown_tx,
                });
                true
            }
        };

        if newly_tracked {
            self.spawn_heartbeat(id, started_at, shutdown_rx);
        }
    }

    fn spawn_heartbeat(
        self: &Arc<Self>,
        session_id: String,
        started_at: Instant,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = time::interval(registry.heartbeat);

            // Skip the first tick which fires immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        registry.write_elapsed(&session_id, started_at).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            registry.write_elapsed(&session_id, started_at).await;
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Flush the session's elapsed time immediately (tab hidden,
    /// heartbeat ping from the client). Unknown sessions are ignored.
    pub async fn flush(&self, session_id: &str) {
        let Some(started_at) = self
            .sessions
            .get(session_id)
            .map(|tracked| tracked.started_at)
        else {
            return;
        };

        self.write_elapsed(session_id, started_at).await;
    }

    /// Final flush and heartbeat cancellation (page unload). Best
    /// effort: the heartbeat task performs the closing write.
    pub fn stop(&self, session_id: &str) {
        if let Some((_, tracked)) = self.sessions.remove(session_id) {
            let _ = tracked.shutdown_tx.send(true);
        }
    }

    /// Stop every heartbeat, flushing each once more.
    pub fn shutdown(&self) {
        for entry in self.sessions.iter() {
            let _ = entry.value().shutdown_tx.send(true);
        }
        self.sessions.clear();
    }

    pub fn is_tracking(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    async fn write_elapsed(&self, session_id: &str, started_at: Instant) {
        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(started_at)
            .as_secs() as i64;

        if let Err(err) = self.storage.record_time_spent(session_id, elapsed).await {
            warn!(session_id, error = %err, "failed to write time spent, next tick will retry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Device, EnvSnapshot};
    use crate::storage::SqliteStorage;
    use std::sync::Mutex;

    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            let mut offset = self.offset.lock().unwrap();
            *offset += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    async fn storage_with_session(session_id: &SessionId) -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();

        let snapshot = EnvSnapshot {
            ip_address: "203.0.113.9".into(),
            country: "Unknown".into(),
            device: Device::Desktop,
        };
        storage
            .upsert_page_view(session_id.as_str(), &snapshot, "landing")
            .await
            .unwrap();

        Arc::new(storage)
    }

    #[tokio::test]
    async fn flush_writes_elapsed_since_fixed_start() {
        let session = SessionId::generate();
        let storage = storage_with_session(&session).await;
        let clock = Arc::new(ManualClock::new());
        // Long heartbeat so the timer never fires during the test
        let registry = TrackerRegistry::with_clock(
            Arc::clone(&storage),
            Duration::from_secs(3600),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        registry.observe_page_view(&session);

        clock.advance(Duration::from_secs(5));
        registry.flush(session.as_str()).await;
        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(agg.time_spent, 5);

        clock.advance(Duration::from_secs(7));
        registry.flush(session.as_str()).await;
        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(agg.time_spent, 12);
    }

    #[tokio::test]
    async fn time_spent_never_decreases() {
        let session = SessionId::generate();
        let storage = storage_with_session(&session).await;

        storage
            .record_time_spent(session.as_str(), 30)
            .await
            .unwrap();
        storage
            .record_time_spent(session.as_str(), 10)
            .await
            .unwrap();

        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(agg.time_spent, 30);
    }

    #[tokio::test]
    async fn repeat_page_views_keep_one_tracker_and_start_instant() {
        let session = SessionId::generate();
        let storage = storage_with_session(&session).await;
        let clock = Arc::new(ManualClock::new());
        let registry = TrackerRegistry::with_clock(
            Arc::clone(&storage),
            Duration::from_secs(3600),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        registry.observe_page_view(&session);
        clock.advance(Duration::from_secs(10));
        // Reload within the same session must not reset the start
        registry.observe_page_view(&session);
        assert_eq!(registry.active_sessions(), 1);

        registry.flush(session.as_str()).await;
        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(agg.time_spent, 10);
    }

    #[tokio::test]
    async fn stop_removes_the_session() {
        let session = SessionId::generate();
        let storage = storage_with_session(&session).await;
        let registry = TrackerRegistry::new(Arc::clone(&storage), Duration::from_secs(3600));

        registry.observe_page_view(&session);
        assert!(registry.is_tracking(session.as_str()));

        registry.stop(session.as_str());
        assert!(!registry.is_tracking(session.as_str()));
    }

    #[tokio::test]
    async fn flush_for_unknown_session_is_a_noop() {
        let session = SessionId::generate();
        let storage = storage_with_session(&session).await;
        let registry = TrackerRegistry::new(Arc::clone(&storage), Duration::from_secs(3600));

        registry.flush("session_never_seen").await;
        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(agg.time_spent, 0);
    }
}
