//! Admin analytics and prelander management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{
    ClickEvent, NewPrelanderPage, PrelanderPage, SessionAggregate, TrafficSummary,
};
use crate::storage::{Storage, StorageError};

pub struct AdminState {
    pub storage: Arc<dyn Storage>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionAggregate>,
    pub total: usize,
}

/// List session aggregates, most recent first.
pub async fn list_sessions(
    State(state): State<Arc<AdminState>>,
    Query(params): Query<ListQuery>,
) -> impl IntoResponse {
    let limit = params.limit.clamp(1, 1000);
    let offset = params.offset.max(0);

    match state.storage.list_session_aggregates(limit, offset).await {
        Ok(sessions) => {
            let total = sessions.len();
            Json(SessionListResponse { sessions, total }).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list sessions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve sessions",
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    pub aggregate: SessionAggregate,
    pub events: Vec<ClickEvent>,
}

/// One session's aggregate plus its full click ledger.
pub async fn get_session(
    State(state): State<Arc<AdminState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let aggregate = match state.storage.session_aggregate(&session_id).await {
        Ok(Some(aggregate)) => aggregate,
        Ok(None) => return (StatusCode::NOT_FOUND, "Session not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to get session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve session",
            )
                .into_response();
        }
    };

    match state.storage.click_events_for_session(&session_id).await {
        Ok(events) => Json(SessionDetailResponse { aggregate, events }).into_response(),
        Err(e) => {
            tracing::error!("Failed to get session events: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve session",
            )
                .into_response()
        }
    }
}

/// Site-wide traffic totals.
pub async fn get_summary(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    match state.storage.traffic_summary().await {
        Ok(summary) => Json::<TrafficSummary>(summary).into_response(),
        Err(e) => {
            tracing::error!("Failed to get traffic summary: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve summary",
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePrelanderRequest {
    pub web_result_id: String,
    pub headline: String,
    pub description: Option<String>,
    pub cta_text: Option<String>,
    pub headline_font_size: Option<String>,
    pub headline_color: Option<String>,
    pub headline_align: Option<String>,
    pub description_font_size: Option<String>,
    pub description_color: Option<String>,
    pub cta_color: Option<String>,
    pub background_color: Option<String>,
    pub background_image_url: Option<String>,
    pub logo_url: Option<String>,
    pub logo_position: Option<String>,
    pub logo_size: Option<String>,
    pub main_image_url: Option<String>,
    pub image_ratio: Option<String>,
    pub target_url: Option<String>,
}

/// Create a prelander page and point the offer's backlink at it.
pub async fn create_prelander(
    State(state): State<Arc<AdminState>>,
    Json(payload): Json<CreatePrelanderRequest>,
) -> impl IntoResponse {
    if payload.headline.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Headline is required").into_response();
    }

    let page_key = format!("prelander_{}", chrono::Utc::now().timestamp_millis());
    let new = NewPrelanderPage {
        page_key,
        headline: payload.headline,
        description: payload.description,
        cta_text: payload.cta_text,
        headline_font_size: payload.headline_font_size,
        headline_color: payload.headline_color,
        headline_align: payload.headline_align,
        description_font_size: payload.description_font_size,
        description_color: payload.description_color,
        cta_color: payload.cta_color,
        background_color: payload.background_color,
        background_image_url: payload.background_image_url,
        logo_url: payload.logo_url,
        logo_position: payload.logo_position,
        logo_size: payload.logo_size,
        main_image_url: payload.main_image_url,
        image_ratio: payload.image_ratio,
        target_url: payload.target_url,
    };

    let page = match state.storage.create_prelander(&new).await {
        Ok(page) => page,
        Err(StorageError::Conflict) => {
            return (StatusCode::CONFLICT, "Page key already exists").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to create prelander: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create prelander",
            )
                .into_response();
        }
    };

    match state
        .storage
        .link_prelander(&payload.web_result_id, &page.page_key)
        .await
    {
        Ok(true) => (StatusCode::CREATED, Json(page)).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Web result not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to link prelander: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to link prelander",
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrelanderListResponse {
    pub pages: Vec<PrelanderPage>,
    pub total: usize,
}

pub async fn list_prelanders(State(state): State<Arc<AdminState>>) -> impl IntoResponse {
    match state.storage.list_prelanders().await {
        Ok(pages) => {
            let total = pages.len();
            Json(PrelanderListResponse { pages, total }).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list prelanders: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve prelanders",
            )
                .into_response()
        }
    }
}

/// Soft delete: the page stops resolving but its row stays.
pub async fn deactivate_prelander(
    State(state): State<Arc<AdminState>>,
    Path(page_key): Path<String>,
) -> impl IntoResponse {
    match state.storage.deactivate_prelander(&page_key).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Prelander not found").into_response(),
        Err(e) => {
            tracing::error!("Failed to deactivate prelander: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to deactivate prelander",
            )
                .into_response()
        }
    }
}
