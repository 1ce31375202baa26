use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::analytics::{
    create_prelander, deactivate_prelander, get_session, get_summary, list_prelanders,
    list_sessions, AdminState,
};
use super::handlers::{
    capture_email, get_landing, get_prelander_by_key, get_prelander_for_offer, get_results,
    health_check, track_click, track_heartbeat, track_leave, track_page_view, FunnelState,
};
use crate::storage::Storage;

/// Visitor-facing router: funnel content, tracking, prelander.
pub fn create_funnel_router(state: Arc<FunnelState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/landing", get(get_landing))
        .route("/api/results", get(get_results))
        .route("/api/track/pageview", post(track_page_view))
        .route("/api/track/click", post(track_click))
        .route("/api/track/heartbeat", post(track_heartbeat))
        .route("/api/track/leave", post(track_leave))
        .route("/api/prelander/key/{page_key}", get(get_prelander_by_key))
        .route("/api/prelander/{offer_id}", get(get_prelander_for_offer))
        .route("/api/prelander/{offer_id}/email", post(capture_email))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Admin router: session analytics reads and prelander management.
pub fn create_admin_router(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(AdminState { storage });

    Router::new()
        .route("/health", get(health_check))
        .route("/api/admin/sessions", get(list_sessions))
        .route("/api/admin/sessions/{session_id}", get(get_session))
        .route("/api/admin/summary", get(get_summary))
        .route("/api/admin/prelanders", post(create_prelander))
        .route("/api/admin/prelanders", get(list_prelanders))
        .route("/api/admin/prelanders/{page_key}", delete(deactivate_prelander))
        .with_state(state)
}
