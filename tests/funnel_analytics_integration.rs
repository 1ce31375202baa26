//! Integration tests for the session analytics lifecycle: aggregate
//! creation on first page view, click ledger + unique-click derivation,
//! and time-spent monotonicity, all against an in-memory SQLite store.

use funnel::analytics::{distinct_destinations, AnalyticsRecorder};
use funnel::models::{ClickKind, Device, EnvSnapshot, SessionId};
use funnel::storage::{SqliteStorage, Storage};
use std::sync::Arc;

async fn setup_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn snapshot() -> EnvSnapshot {
    EnvSnapshot {
        ip_address: "198.51.100.7".to_string(),
        country: "Germany".to_string(),
        device: Device::Mobile,
    }
}

#[tokio::test]
async fn page_views_accumulate_in_a_single_row() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    for _ in 0..5 {
        recorder
            .record_page_view(&session, &snapshot(), "landing")
            .await
            .unwrap();
    }

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .expect("aggregate created on first page view");
    assert_eq!(agg.page_views, 5);
    assert_eq!(agg.clicks, 0);
    assert_eq!(agg.unique_clicks, 0);
    assert_eq!(agg.country, "Germany");
    assert_eq!(agg.device, "Mobile");

    // Exactly one row: listing all sessions returns this one alone
    let all = storage.list_session_aggregates(100, 0).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].session_id, session.as_str());
}

#[tokio::test]
async fn environment_snapshot_is_captured_at_first_write_only() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    recorder
        .record_page_view(&session, &snapshot(), "landing")
        .await
        .unwrap();

    let later = EnvSnapshot {
        ip_address: "203.0.113.200".to_string(),
        country: "France".to_string(),
        device: Device::Desktop,
    };
    recorder
        .record_page_view(&session, &later, "webresult?wr=1")
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.page_views, 2);
    assert_eq!(agg.ip_address, "198.51.100.7");
    assert_eq!(agg.country, "Germany");
    assert_eq!(agg.source.as_deref(), Some("landing"));
}

#[tokio::test]
async fn click_scenario_keeps_unique_count_consistent_with_ledger() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    recorder
        .record_page_view(&session, &snapshot(), "landing")
        .await
        .unwrap();

    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::Result,
            Some("OfferX"),
            Some("https://dest.example/a"),
        )
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.clicks, 1);
    assert_eq!(agg.unique_clicks, 1);
    assert_eq!(agg.result_clicks, 1);
    assert_eq!(agg.related_searches, 0);

    // Second click to the same destination: no new distinct URL
    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::Result,
            Some("OfferX"),
            Some("https://dest.example/a"),
        )
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.clicks, 2);
    assert_eq!(agg.unique_clicks, 1);
    assert_eq!(agg.result_clicks, 2);

    // A different destination bumps the distinct count
    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::Result,
            Some("OfferY"),
            Some("https://dest.example/b"),
        )
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.clicks, 3);
    assert_eq!(agg.unique_clicks, 2);

    // The counter always equals the ledger-derived value
    let events = storage
        .click_events_for_session(session.as_str())
        .await
        .unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(distinct_destinations(&events), agg.unique_clicks);
}

#[tokio::test]
async fn related_search_clicks_increment_their_own_counter() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    recorder
        .record_page_view(&session, &snapshot(), "landing")
        .await
        .unwrap();

    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::RelatedSearch,
            Some("dating apps"),
            None,
        )
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.clicks, 1);
    assert_eq!(agg.related_searches, 1);
    assert_eq!(agg.result_clicks, 0);
    // No destination URL on a related-search click
    assert_eq!(agg.unique_clicks, 0);
}

#[tokio::test]
async fn click_before_page_view_appends_to_ledger_without_aggregate() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    // No page view yet: the aggregate update is a no-op, not an error
    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::Result,
            None,
            Some("https://dest.example/a"),
        )
        .await
        .unwrap();

    assert!(storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .is_none());

    let events = storage
        .click_events_for_session(session.as_str())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);

    // Once the page view lands, the next click folds the whole ledger in
    recorder
        .record_page_view(&session, &snapshot(), "webresult?wr=1")
        .await
        .unwrap();
    recorder
        .record_click(
            &session,
            &snapshot(),
            ClickKind::Result,
            None,
            Some("https://dest.example/b"),
        )
        .await
        .unwrap();

    let agg = storage
        .session_aggregate(session.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agg.clicks, 1);
    assert_eq!(agg.unique_clicks, 2);
}

#[tokio::test]
async fn sessions_do_not_share_ledgers_or_counters() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let first = SessionId::generate();
    let second = SessionId::generate();

    for session in [&first, &second] {
        recorder
            .record_page_view(session, &snapshot(), "landing")
            .await
            .unwrap();
    }

    recorder
        .record_click(
            &first,
            &snapshot(),
            ClickKind::Result,
            None,
            Some("https://dest.example/a"),
        )
        .await
        .unwrap();

    let first_agg = storage
        .session_aggregate(first.as_str())
        .await
        .unwrap()
        .unwrap();
    let second_agg = storage
        .session_aggregate(second.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first_agg.unique_clicks, 1);
    assert_eq!(second_agg.clicks, 0);
    assert_eq!(second_agg.unique_clicks, 0);
}

#[tokio::test]
async fn traffic_summary_totals_across_sessions() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));

    let empty = storage.traffic_summary().await.unwrap();
    assert_eq!(empty.sessions, 0);
    assert_eq!(empty.page_views, 0);

    let first = SessionId::generate();
    let second = SessionId::generate();

    recorder
        .record_page_view(&first, &snapshot(), "landing")
        .await
        .unwrap();
    recorder
        .record_page_view(&first, &snapshot(), "landing")
        .await
        .unwrap();
    recorder
        .record_page_view(&second, &snapshot(), "landing")
        .await
        .unwrap();
    recorder
        .record_click(
            &first,
            &snapshot(),
            ClickKind::Result,
            None,
            Some("https://dest.example/a"),
        )
        .await
        .unwrap();

    let summary = storage.traffic_summary().await.unwrap();
    assert_eq!(summary.sessions, 2);
    assert_eq!(summary.page_views, 3);
    assert_eq!(summary.clicks, 1);
    assert_eq!(summary.unique_clicks, 1);
    assert_eq!(summary.result_clicks, 1);
}

#[tokio::test]
async fn time_spent_is_monotonic_across_writes() {
    let storage = setup_storage().await;
    let recorder = AnalyticsRecorder::new(Arc::clone(&storage));
    let session = SessionId::generate();

    recorder
        .record_page_view(&session, &snapshot(), "landing")
        .await
        .unwrap();

    let mut last = 0;
    for seconds in [5i64, 12, 12, 9, 30] {
        storage
            .record_time_spent(session.as_str(), seconds)
            .await
            .unwrap();
        let agg = storage
            .session_aggregate(session.as_str())
            .await
            .unwrap()
            .unwrap();
        assert!(agg.time_spent >= last, "time_spent decreased");
        last = agg.time_spent;
    }
    assert_eq!(last, 30);
}
