//! Session-scoped analytics recording.
//!
//! All counters live in a single aggregate row per session. The
//! unique-click figure is never maintained as independent state: every
//! click re-reads the session's ledger and overwrites the counter with
//! the ledger-derived value, so the two can never drift apart.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::models::{ClickEvent, ClickKind, EnvSnapshot, NewClickEvent, SessionId};
use crate::storage::Storage;

/// Number of distinct non-empty destination URLs in a click ledger.
pub fn distinct_destinations(events: &[ClickEvent]) -> i64 {
    events
        .iter()
        .filter_map(|event| event.target_url.as_deref())
        .filter(|url| !url.is_empty())
        .collect::<HashSet<_>>()
        .len() as i64
}

pub struct AnalyticsRecorder {
    storage: Arc<dyn Storage>,
}

impl AnalyticsRecorder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Record one page view: creates the aggregate row on the session's
    /// first page view, increments it afterwards.
    pub async fn record_page_view(
        &self,
        session_id: &SessionId,
        snapshot: &EnvSnapshot,
        source: &str,
    ) -> Result<()> {
        self.storage
            .upsert_page_view(session_id.as_str(), snapshot, source)
            .await
    }

    /// Append one click to the ledger, then fold it into the aggregate.
    ///
    /// The aggregate update is a no-op when no page view has been
    /// recorded for the session yet; callers must not assume ordering
    /// between page-view and click recording.
    pub async fn record_click(
        &self,
        session_id: &SessionId,
        snapshot: &EnvSnapshot,
        kind: ClickKind,
        label: Option<&str>,
        target_url: Option<&str>,
    ) -> Result<()> {
        let event = NewClickEvent {
            session_id: session_id.as_str().to_string(),
            kind,
            search_term: label.map(str::to_string),
            target_url: target_url.map(str::to_string),
            ip_address: snapshot.ip_address.clone(),
            country: snapshot.country.clone(),
            device: snapshot.device.as_str().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };

        self.storage.append_click_event(&event).await?;

        let events = self
            .storage
            .click_events_for_session(session_id.as_str())
            .await?;
        let unique_clicks = distinct_destinations(&events);

        let applied = self
            .storage
            .apply_click(session_id.as_str(), kind, unique_clicks)
            .await?;
        if !applied {
            debug!(session_id = %session_id, "click recorded before any page view; aggregate untouched");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, target_url: Option<&str>) -> ClickEvent {
        ClickEvent {
            id,
            session_id: "s1".into(),
            event_type: "result".into(),
            search_term: None,
            target_url: target_url.map(str::to_string),
            ip_address: None,
            country: None,
            device: None,
            created_at: id,
        }
    }

    #[test]
    fn counts_distinct_non_empty_destinations() {
        let events = vec![
            event(1, Some("https://dest.example/a")),
            event(2, Some("https://dest.example/a")),
            event(3, Some("https://dest.example/b")),
            event(4, None),
            event(5, Some("")),
        ];
        assert_eq!(distinct_destinations(&events), 2);
    }

    #[test]
    fn empty_ledger_has_no_destinations() {
        assert_eq!(distinct_destinations(&[]), 0);
    }

    #[test]
    fn recompute_is_idempotent() {
        let events = vec![
            event(1, Some("https://dest.example/a")),
            event(2, Some("https://dest.example/b")),
        ];
        let first = distinct_destinations(&events);
        let second = distinct_destinations(&events);
        assert_eq!(first, second);
    }
}
