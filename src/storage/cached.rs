use crate::models::{
    Category, ClickEvent, ClickKind, EnvSnapshot, LandingContent, NewClickEvent, NewEmailCapture,
    NewPrelanderPage, NewWebResult, PrelanderPage, SessionAggregate, TrafficSummary, WebResult,
};
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Read-through TTL cache over the visitor-facing content path.
///
/// Only read-mostly funnel content (offers, prelander configurations,
/// landing copy, categories) is cached; the analytics write path goes
/// straight through so counters are never served stale to writers.
pub struct CachedStorage {
    inner: Arc<dyn Storage>,
    results_cache: Cache<String, Arc<Vec<WebResult>>>,
    offer_cache: Cache<String, Option<WebResult>>,
    prelander_cache: Cache<String, Option<PrelanderPage>>,
    landing_cache: Cache<(), Option<LandingContent>>,
    categories_cache: Cache<(), Arc<Vec<Category>>>,
}

fn build_cache<K, V>(max_entries: u64, ttl_secs: u64) -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(max_entries)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_entries: u64, ttl_secs: u64) -> Self {
        Self {
            inner,
            results_cache: build_cache(max_entries, ttl_secs),
            offer_cache: build_cache(max_entries, ttl_secs),
            prelander_cache: build_cache(max_entries, ttl_secs),
            landing_cache: build_cache(max_entries, ttl_secs),
            categories_cache: build_cache(max_entries, ttl_secs),
        }
    }

    async fn invalidate_offer(&self, id: &str) {
        if let Some(Some(offer)) = self.offer_cache.get(id).await {
            self.results_cache.invalidate(&offer.webresult_page).await;
        }
        self.offer_cache.invalidate(id).await;
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn upsert_page_view(
        &self,
        session_id: &str,
        snapshot: &EnvSnapshot,
        source: &str,
    ) -> Result<()> {
        self.inner.upsert_page_view(session_id, snapshot, source).await
    }

    async fn apply_click(
        &self,
        session_id: &str,
        kind: ClickKind,
        unique_clicks: i64,
    ) -> Result<bool> {
        self.inner.apply_click(session_id, kind, unique_clicks).await
    }

    async fn record_time_spent(&self, session_id: &str, seconds: i64) -> Result<()> {
        self.inner.record_time_spent(session_id, seconds).await
    }

    async fn session_aggregate(&self, session_id: &str) -> Result<Option<SessionAggregate>> {
        self.inner.session_aggregate(session_id).await
    }

    async fn list_session_aggregates(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionAggregate>> {
        self.inner.list_session_aggregates(limit, offset).await
    }

    async fn traffic_summary(&self) -> Result<TrafficSummary> {
        self.inner.traffic_summary().await
    }

    async fn append_click_event(&self, event: &NewClickEvent) -> Result<()> {
        self.inner.append_click_event(event).await
    }

    async fn click_events_for_session(&self, session_id: &str) -> Result<Vec<ClickEvent>> {
        self.inner.click_events_for_session(session_id).await
    }

    async fn landing_content(&self) -> Result<Option<LandingContent>> {
        if let Some(cached) = self.landing_cache.get(&()).await {
            return Ok(cached);
        }

        let content = self.inner.landing_content().await?;
        self.landing_cache.insert((), content.clone()).await;
        Ok(content)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        if let Some(cached) = self.categories_cache.get(&()).await {
            return Ok(cached.as_ref().clone());
        }

        let categories = self.inner.categories().await?;
        self.categories_cache
            .insert((), Arc::new(categories.clone()))
            .await;
        Ok(categories)
    }

    async fn web_results_for_page(&self, page: &str) -> Result<Vec<WebResult>> {
        if let Some(cached) = self.results_cache.get(page).await {
            return Ok(cached.as_ref().clone());
        }

        let results = self.inner.web_results_for_page(page).await?;
        self.results_cache
            .insert(page.to_string(), Arc::new(results.clone()))
            .await;
        Ok(results)
    }

    async fn web_result(&self, id: &str) -> Result<Option<WebResult>> {
        if let Some(cached) = self.offer_cache.get(id).await {
            return Ok(cached);
        }

        let result = self.inner.web_result(id).await?;
        self.offer_cache.insert(id.to_string(), result.clone()).await;
        Ok(result)
    }

    async fn create_web_result(&self, new: &NewWebResult) -> StorageResult<WebResult> {
        let result = self.inner.create_web_result(new).await?;
        self.results_cache.invalidate(&result.webresult_page).await;
        self.offer_cache
            .insert(result.id.clone(), Some(result.clone()))
            .await;
        Ok(result)
    }

    async fn prelander_by_key(&self, page_key: &str) -> Result<Option<PrelanderPage>> {
        if let Some(cached) = self.prelander_cache.get(page_key).await {
            return Ok(cached);
        }

        let page = self.inner.prelander_by_key(page_key).await?;
        self.prelander_cache
            .insert(page_key.to_string(), page.clone())
            .await;
        Ok(page)
    }

    async fn create_prelander(&self, new: &NewPrelanderPage) -> StorageResult<PrelanderPage> {
        let page = self.inner.create_prelander(new).await?;
        self.prelander_cache
            .insert(page.page_key.clone(), Some(page.clone()))
            .await;
        Ok(page)
    }

    async fn deactivate_prelander(&self, page_key: &str) -> Result<bool> {
        let deactivated = self.inner.deactivate_prelander(page_key).await?;
        self.prelander_cache.invalidate(page_key).await;
        Ok(deactivated)
    }

    async fn list_prelanders(&self) -> Result<Vec<PrelanderPage>> {
        self.inner.list_prelanders().await
    }

    async fn link_prelander(&self, web_result_id: &str, page_key: &str) -> Result<bool> {
        let linked = self.inner.link_prelander(web_result_id, page_key).await?;
        self.invalidate_offer(web_result_id).await;
        Ok(linked)
    }

    async fn insert_email_capture(&self, capture: &NewEmailCapture) -> Result<()> {
        self.inner.insert_email_capture(capture).await
    }
}
