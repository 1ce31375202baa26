use crate::models::{
    Category, ClickEvent, ClickKind, EnvSnapshot, LandingContent, NewClickEvent, NewEmailCapture,
    NewPrelanderPage, NewWebResult, PrelanderPage, SessionAggregate, TrafficSummary, WebResult,
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes).
    async fn init(&self) -> Result<()>;

    // --- Session aggregates ---

    /// Record one page view for a session: create the aggregate row with
    /// the environment snapshot on first sight, otherwise increment
    /// page_views in place. Must be a single upsert-with-increment so
    /// two near-simultaneous first page views cannot leave two rows.
    async fn upsert_page_view(
        &self,
        session_id: &str,
        snapshot: &EnvSnapshot,
        source: &str,
    ) -> Result<()>;

    /// Apply one click to the aggregate row: clicks += 1, unique_clicks
    /// overwritten with the ledger-derived value, and the kind-specific
    /// counter incremented. Returns false when no aggregate row exists
    /// yet (click observed before any page view): a no-op, not an error.
    async fn apply_click(
        &self,
        session_id: &str,
        kind: ClickKind,
        unique_clicks: i64,
    ) -> Result<bool>;

    /// Write elapsed active seconds. The stored value never decreases.
    async fn record_time_spent(&self, session_id: &str, seconds: i64) -> Result<()>;

    async fn session_aggregate(&self, session_id: &str) -> Result<Option<SessionAggregate>>;

    /// Most recent sessions first.
    async fn list_session_aggregates(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionAggregate>>;

    async fn traffic_summary(&self) -> Result<TrafficSummary>;

    // --- Click ledger (append-only) ---

    async fn append_click_event(&self, event: &NewClickEvent) -> Result<()>;

    async fn click_events_for_session(&self, session_id: &str) -> Result<Vec<ClickEvent>>;

    // --- Funnel content ---

    async fn landing_content(&self) -> Result<Option<LandingContent>>;

    /// Categories ordered by serial number.
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Offers for one results page, ordered by serial number.
    async fn web_results_for_page(&self, page: &str) -> Result<Vec<WebResult>>;

    async fn web_result(&self, id: &str) -> Result<Option<WebResult>>;

    async fn create_web_result(&self, new: &NewWebResult) -> StorageResult<WebResult>;

    // --- Prelander configuration ---

    /// Fetch an *active* configuration by its page key.
    async fn prelander_by_key(&self, page_key: &str) -> Result<Option<PrelanderPage>>;

    async fn create_prelander(&self, new: &NewPrelanderPage) -> StorageResult<PrelanderPage>;

    /// Soft delete: flips is_active off, the row stays.
    async fn deactivate_prelander(&self, page_key: &str) -> Result<bool>;

    /// Active configurations, newest first.
    async fn list_prelanders(&self) -> Result<Vec<PrelanderPage>>;

    /// Point an offer's backlink at a prelander page key.
    async fn link_prelander(&self, web_result_id: &str, page_key: &str) -> Result<bool>;

    // --- Email captures ---

    async fn insert_email_capture(&self, capture: &NewEmailCapture) -> Result<()>;
}
