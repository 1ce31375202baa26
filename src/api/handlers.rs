use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::{extract_client_ip, AnalyticsRecorder, EnvironmentSniffer, TrackerRegistry};
use crate::config::TrackingConfig;
use crate::models::{Category, ClickKind, EnvSnapshot, LandingContent, SessionId, WebResult};
use crate::prelander::{ConfigResolver, ResolveError, ResolveTarget, ResolvedPrelander};
use crate::storage::Storage;

pub struct FunnelState {
    pub storage: Arc<dyn Storage>,
    pub recorder: AnalyticsRecorder,
    pub resolver: ConfigResolver,
    pub sniffer: EnvironmentSniffer,
    pub trackers: Arc<TrackerRegistry>,
    pub tracking: TrackingConfig,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

impl FunnelState {
    /// Resolve the request's environment snapshot, degrading every
    /// lookup failure to sentinel values.
    async fn snapshot(&self, headers: &HeaderMap, addr: SocketAddr) -> EnvSnapshot {
        let client_ip = extract_client_ip(headers, addr.ip(), self.tracking.trusted_proxy_mode);
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        self.sniffer.snapshot(Some(client_ip), user_agent).await
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

// --- Funnel content ---

#[derive(Serialize)]
pub struct LandingResponse {
    pub content: Option<LandingContent>,
    pub categories: Vec<Category>,
}

pub async fn get_landing(
    State(state): State<Arc<FunnelState>>,
) -> Result<Json<LandingResponse>, (StatusCode, Json<ErrorResponse>)> {
    let content = state.storage.landing_content().await.map_err(internal)?;
    let categories = state.storage.categories().await.map_err(internal)?;

    Ok(Json(LandingResponse {
        content,
        categories,
    }))
}

#[derive(Deserialize)]
pub struct ResultsQuery {
    pub page: String,
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub sponsored: Vec<WebResult>,
    pub results: Vec<WebResult>,
}

/// Offers for one results page, filtered by the visitor's country.
pub async fn get_results(
    State(state): State<Arc<FunnelState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ResultsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let client_ip = extract_client_ip(&headers, addr.ip(), state.tracking.trusted_proxy_mode);
    let country = state.sniffer.country_for(&client_ip.to_string()).await;

    let all = state
        .storage
        .web_results_for_page(&query.page)
        .await
        .map_err(internal)?;

    let (sponsored, results) = all
        .into_iter()
        .filter(|r| r.accessible_from(&country))
        .partition(|r| r.is_sponsored);

    Ok(Json(ResultsResponse { sponsored, results }))
}

// --- Tracking ---

#[derive(Deserialize)]
pub struct TrackPageViewRequest {
    pub session_id: Option<String>,
    pub source: Option<String>,
}

#[derive(Serialize)]
pub struct TrackResponse {
    pub session_id: SessionId,
}

/// Record a page view and hand the session id back to the client.
///
/// A failed analytics write is logged and swallowed: the visitor's page
/// must render regardless.
pub async fn track_page_view(
    State(state): State<Arc<FunnelState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<TrackPageViewRequest>,
) -> Json<TrackResponse> {
    let session_id = payload
        .session_id
        .as_deref()
        .and_then(SessionId::parse)
        .unwrap_or_else(SessionId::generate);

    let snapshot = state.snapshot(&headers, addr).await;
    let source = payload.source.as_deref().unwrap_or("landing");

    if let Err(err) = state
        .recorder
        .record_page_view(&session_id, &snapshot, source)
        .await
    {
        tracing::warn!(session_id = %session_id, error = %err, "failed to record page view");
    }

    state.trackers.observe_page_view(&session_id);

    Json(TrackResponse { session_id })
}

#[derive(Deserialize)]
pub struct TrackClickRequest {
    pub session_id: String,
    pub event_type: ClickKind,
    pub label: Option<String>,
    pub target_url: Option<String>,
}

/// Record a click. Always succeeds from the client's perspective; a
/// dropped click event must never delay the navigation it precedes.
pub async fn track_click(
    State(state): State<Arc<FunnelState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<TrackClickRequest>,
) -> StatusCode {
    let Some(session_id) = SessionId::parse(&payload.session_id) else {
        tracing::warn!("discarding click with malformed session id");
        return StatusCode::NO_CONTENT;
    };

    let snapshot = state.snapshot(&headers, addr).await;

    if let Err(err) = state
        .recorder
        .record_click(
            &session_id,
            &snapshot,
            payload.event_type,
            payload.label.as_deref(),
            payload.target_url.as_deref(),
        )
        .await
    {
        tracing::warn!(session_id = %session_id, error = %err, "failed to record click");
    }

    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct TrackSessionRequest {
    pub session_id: String,
}

/// Immediate time-spent flush (tab hidden / visibility change).
pub async fn track_heartbeat(
    State(state): State<Arc<FunnelState>>,
    Json(payload): Json<TrackSessionRequest>,
) -> StatusCode {
    if let Some(session_id) = SessionId::parse(&payload.session_id) {
        state.trackers.flush(session_id.as_str()).await;
    }
    StatusCode::NO_CONTENT
}

/// Final flush on page unload; cancels the session's heartbeat.
pub async fn track_leave(
    State(state): State<Arc<FunnelState>>,
    Json(payload): Json<TrackSessionRequest>,
) -> StatusCode {
    if let Some(session_id) = SessionId::parse(&payload.session_id) {
        state.trackers.stop(session_id.as_str());
    }
    StatusCode::NO_CONTENT
}

// --- Prelander ---

/// Prelander configuration for an offer. Falls back to a default render
/// built from the offer's own copy when no configuration resolves; only
/// a missing offer is a 404.
pub async fn get_prelander_for_offer(
    State(state): State<Arc<FunnelState>>,
    Path(offer_id): Path<String>,
) -> Result<Json<ResolvedPrelander>, (StatusCode, Json<ErrorResponse>)> {
    let offer = state
        .storage
        .web_result(&offer_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Offer not found"))?;

    let config = match state.resolver.resolve(ResolveTarget::Offer(&offer_id)).await {
        Ok(config) => config,
        Err(ResolveError::NotFound) => ResolvedPrelander::default_for_offer(&offer),
    };

    Ok(Json(config))
}

/// Prelander configuration by explicit page key. Not-found here means
/// the caller redirects to the default landing surface.
pub async fn get_prelander_by_key(
    State(state): State<Arc<FunnelState>>,
    Path(page_key): Path<String>,
) -> Result<Json<ResolvedPrelander>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .resolver
        .resolve(ResolveTarget::PageKey(&page_key))
        .await
    {
        Ok(config) => Ok(Json(config)),
        Err(ResolveError::NotFound) => Err(not_found("Prelander not found")),
    }
}

#[derive(Deserialize)]
pub struct EmailCaptureRequest {
    pub email: String,
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct EmailCaptureResponse {
    pub redirect: String,
}

/// Capture the visitor's email and hand back the offer redirect.
///
/// A failed capture write is logged and swallowed: the redirect to the
/// advertiser destination is the primary business outcome and must not
/// be blocked.
pub async fn capture_email(
    State(state): State<Arc<FunnelState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(offer_id): Path<String>,
    Json(payload): Json<EmailCaptureRequest>,
) -> Result<Json<EmailCaptureResponse>, (StatusCode, Json<ErrorResponse>)> {
    let email = payload.email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Please enter a valid email address".to_string(),
            }),
        ));
    }

    let offer = state
        .storage
        .web_result(&offer_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Offer not found"))?;

    let snapshot = state.snapshot(&headers, addr).await;
    let capture = crate::models::NewEmailCapture {
        email,
        web_result_id: offer.id.clone(),
        session_id: payload
            .session_id
            .as_deref()
            .and_then(SessionId::parse)
            .map(|s| s.as_str().to_string()),
        device: snapshot.device.as_str().to_string(),
        country: snapshot.country.clone(),
        ip_address: snapshot.ip_address.clone(),
        redirected_to: offer.original_link.clone(),
        captured_at: chrono::Utc::now().timestamp(),
    };

    if let Err(err) = state.storage.insert_email_capture(&capture).await {
        tracing::warn!(offer_id = %offer.id, error = %err, "failed to store email capture");
    }

    Ok(Json(EmailCaptureResponse {
        redirect: offer.original_link,
    }))
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn internal(err: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %err, "storage failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_plausible_email("user@example.com"));
        assert!(is_plausible_email("first.last@mail.example.org"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(!is_plausible_email("no-at-sign"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("user@nodot"));
        assert!(!is_plausible_email("user@.com"));
        assert!(!is_plausible_email("user name@example.com"));
    }
}
