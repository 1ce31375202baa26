use crate::models::{
    Category, ClickEvent, ClickKind, EnvSnapshot, LandingContent, NewClickEvent, NewEmailCapture,
    NewPrelanderPage, NewWebResult, PrelanderPage, SessionAggregate, TrafficSummary, WebResult,
};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn now_unix() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        // One aggregate row per session
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL UNIQUE,
                ip_address TEXT NOT NULL,
                country TEXT NOT NULL,
                device TEXT NOT NULL,
                source TEXT,
                page_views INTEGER NOT NULL DEFAULT 0,
                clicks INTEGER NOT NULL DEFAULT 0,
                unique_clicks INTEGER NOT NULL DEFAULT 0,
                related_searches INTEGER NOT NULL DEFAULT 0,
                result_clicks INTEGER NOT NULL DEFAULT 0,
                time_spent INTEGER NOT NULL DEFAULT 0,
                first_seen INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // Append-only click ledger
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS click_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                search_term TEXT,
                target_url TEXT,
                ip_address TEXT,
                country TEXT,
                device TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_click_events_session ON click_events(session_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS landing_page (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                webresult_page TEXT NOT NULL,
                serial_number INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS web_results (
                id TEXT PRIMARY KEY,
                webresult_page TEXT NOT NULL,
                is_sponsored INTEGER NOT NULL DEFAULT 0,
                offer_name TEXT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                original_link TEXT NOT NULL,
                logo_url TEXT,
                serial_number INTEGER NOT NULL,
                access_type TEXT NOT NULL DEFAULT 'worldwide',
                allowed_countries TEXT,
                pre_landing_page_key TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_web_results_page ON web_results(webresult_page)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pre_landing_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_key TEXT NOT NULL UNIQUE,
                headline TEXT NOT NULL,
                description TEXT,
                cta_text TEXT,
                headline_font_size TEXT,
                headline_color TEXT,
                headline_align TEXT,
                description_font_size TEXT,
                description_color TEXT,
                cta_color TEXT,
                background_color TEXT,
                background_image_url TEXT,
                logo_url TEXT,
                logo_position TEXT,
                logo_size TEXT,
                main_image_url TEXT,
                image_ratio TEXT,
                target_url TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS email_captures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                web_result_id TEXT,
                session_id TEXT,
                device TEXT,
                country TEXT,
                ip_address TEXT,
                redirected_to TEXT,
                captured_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn upsert_page_view(
        &self,
        session_id: &str,
        snapshot: &EnvSnapshot,
        source: &str,
    ) -> Result<()> {
        let first_seen = now_unix()?;

        sqlx::query(
            r#"
            INSERT INTO analytics (session_id, ip_address, country, device, source, page_views, first_seen)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(session_id) DO UPDATE SET page_views = page_views + 1
            "#,
        )
        .bind(session_id)
        .bind(&snapshot.ip_address)
        .bind(&snapshot.country)
        .bind(snapshot.device.as_str())
        .bind(source)
        .bind(first_seen)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn apply_click(
        &self,
        session_id: &str,
        kind: ClickKind,
        unique_clicks: i64,
    ) -> Result<bool> {
        let (related, result) = match kind {
            ClickKind::RelatedSearch => (1i64, 0i64),
            ClickKind::Result => (0, 1),
        };

        let outcome = sqlx::query(
            r#"
            UPDATE analytics
            SET clicks = clicks + 1,
                unique_clicks = ?,
                related_searches = related_searches + ?,
                result_clicks = result_clicks + ?
            WHERE session_id = ?
            "#,
        )
        .bind(unique_clicks)
        .bind(related)
        .bind(result)
        .bind(session_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn record_time_spent(&self, session_id: &str, seconds: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE analytics
            SET time_spent = MAX(time_spent, ?)
            WHERE session_id = ?
            "#,
        )
        .bind(seconds)
        .bind(session_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn session_aggregate(&self, session_id: &str) -> Result<Option<SessionAggregate>> {
        let row = sqlx::query_as::<_, SessionAggregate>(
            r#"
            SELECT id, session_id, ip_address, country, device, source,
                   page_views, clicks, unique_clicks, related_searches,
                   result_clicks, time_spent, first_seen
            FROM analytics
            WHERE session_id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn list_session_aggregates(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionAggregate>> {
        let rows = sqlx::query_as::<_, SessionAggregate>(
            r#"
            SELECT id, session_id, ip_address, country, device, source,
                   page_views, clicks, unique_clicks, related_searches,
                   result_clicks, time_spent, first_seen
            FROM analytics
            ORDER BY first_seen DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn traffic_summary(&self) -> Result<TrafficSummary> {
        let summary = sqlx::query_as::<_, TrafficSummary>(
            r#"
            SELECT COUNT(*) AS sessions,
                   COALESCE(SUM(page_views), 0) AS page_views,
                   COALESCE(SUM(clicks), 0) AS clicks,
                   COALESCE(SUM(unique_clicks), 0) AS unique_clicks,
                   COALESCE(SUM(related_searches), 0) AS related_searches,
                   COALESCE(SUM(result_clicks), 0) AS result_clicks,
                   COALESCE(SUM(time_spent), 0) AS time_spent
            FROM analytics
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(summary)
    }

    async fn append_click_event(&self, event: &NewClickEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO click_events
                (session_id, event_type, search_term, target_url, ip_address, country, device, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.session_id)
        .bind(event.kind.as_str())
        .bind(&event.search_term)
        .bind(&event.target_url)
        .bind(&event.ip_address)
        .bind(&event.country)
        .bind(&event.device)
        .bind(event.created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn click_events_for_session(&self, session_id: &str) -> Result<Vec<ClickEvent>> {
        let events = sqlx::query_as::<_, ClickEvent>(
            r#"
            SELECT id, session_id, event_type, search_term, target_url,
                   ip_address, country, device, created_at
            FROM click_events
            WHERE session_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(events)
    }

    async fn landing_content(&self) -> Result<Option<LandingContent>> {
        let content = sqlx::query_as::<_, LandingContent>(
            r#"
            SELECT id, title, description, updated_at
            FROM landing_page
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(content)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, title, webresult_page, serial_number, created_at
            FROM categories
            ORDER BY serial_number ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(categories)
    }

    async fn web_results_for_page(&self, page: &str) -> Result<Vec<WebResult>> {
        let results = sqlx::query_as::<_, WebResult>(
            r#"
            SELECT id, webresult_page, is_sponsored, offer_name, title, description,
                   original_link, logo_url, serial_number, access_type,
                   allowed_countries, pre_landing_page_key, created_at
            FROM web_results
            WHERE webresult_page = ?
            ORDER BY serial_number ASC
            "#,
        )
        .bind(page)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(results)
    }

    async fn web_result(&self, id: &str) -> Result<Option<WebResult>> {
        let result = sqlx::query_as::<_, WebResult>(
            r#"
            SELECT id, webresult_page, is_sponsored, offer_name, title, description,
                   original_link, logo_url, serial_number, access_type,
                   allowed_countries, pre_landing_page_key, created_at
            FROM web_results
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(result)
    }

    async fn create_web_result(&self, new: &NewWebResult) -> StorageResult<WebResult> {
        let created_at = now_unix().map_err(StorageError::Other)?;

        let outcome = sqlx::query(
            r#"
            INSERT INTO web_results
                (id, webresult_page, is_sponsored, offer_name, title, description,
                 original_link, logo_url, serial_number, access_type, allowed_countries, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&new.id)
        .bind(&new.webresult_page)
        .bind(new.is_sponsored)
        .bind(&new.offer_name)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.original_link)
        .bind(&new.logo_url)
        .bind(new.serial_number)
        .bind(&new.access_type)
        .bind(&new.allowed_countries)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if outcome.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let result = self
            .web_result(&new.id)
            .await?
            .ok_or_else(|| StorageError::Other(anyhow::anyhow!("inserted offer not found")))?;

        Ok(result)
    }

    async fn prelander_by_key(&self, page_key: &str) -> Result<Option<PrelanderPage>> {
        let page = sqlx::query_as::<_, PrelanderPage>(
            r#"
            SELECT id, page_key, headline, description, cta_text,
                   headline_font_size, headline_color, headline_align,
                   description_font_size, description_color, cta_color,
                   background_color, background_image_url,
                   logo_url, logo_position, logo_size,
                   main_image_url, image_ratio, target_url, is_active, created_at
            FROM pre_landing_pages
            WHERE page_key = ? AND is_active = 1
            "#,
        )
        .bind(page_key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(page)
    }

    async fn create_prelander(&self, new: &NewPrelanderPage) -> StorageResult<PrelanderPage> {
        let created_at = now_unix().map_err(StorageError::Other)?;

        let outcome = sqlx::query(
            r#"
            INSERT INTO pre_landing_pages
                (page_key, headline, description, cta_text,
                 headline_font_size, headline_color, headline_align,
                 description_font_size, description_color, cta_color,
                 background_color, background_image_url,
                 logo_url, logo_position, logo_size,
                 main_image_url, image_ratio, target_url, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(page_key) DO NOTHING
            "#,
        )
        .bind(&new.page_key)
        .bind(&new.headline)
        .bind(&new.description)
        .bind(&new.cta_text)
        .bind(&new.headline_font_size)
        .bind(&new.headline_color)
        .bind(&new.headline_align)
        .bind(&new.description_font_size)
        .bind(&new.description_color)
        .bind(&new.cta_color)
        .bind(&new.background_color)
        .bind(&new.background_image_url)
        .bind(&new.logo_url)
        .bind(&new.logo_position)
        .bind(&new.logo_size)
        .bind(&new.main_image_url)
        .bind(&new.image_ratio)
        .bind(&new.target_url)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if outcome.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let page = self
            .prelander_by_key(&new.page_key)
            .await?
            .ok_or_else(|| StorageError::Other(anyhow::anyhow!("inserted prelander not found")))?;

        Ok(page)
    }

    async fn deactivate_prelander(&self, page_key: &str) -> Result<bool> {
        let outcome = sqlx::query(
            r#"
            UPDATE pre_landing_pages
            SET is_active = 0
            WHERE page_key = ?
            "#,
        )
        .bind(page_key)
        .execute(self.pool.as_ref())
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn list_prelanders(&self) -> Result<Vec<PrelanderPage>> {
        let pages = sqlx::query_as::<_, PrelanderPage>(
            r#"
            SELECT id, page_key, headline, description, cta_text,
                   headline_font_size, headline_color, headline_align,
                   description_font_size, description_color, cta_color,
                   background_color, background_image_url,
                   logo_url, logo_position, logo_size,
                   main_image_url, image_ratio, target_url, is_active, created_at
            FROM pre_landing_pages
            WHERE is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(pages)
    }

    async fn link_prelander(&self, web_result_id: &str, page_key: &str) -> Result<bool> {
        let outcome = sqlx::query(
            r#"
            UPDATE web_results
            SET pre_landing_page_key = ?
            WHERE id = ?
            "#,
        )
        .bind(page_key)
        .bind(web_result_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn insert_email_capture(&self, capture: &NewEmailCapture) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_captures
                (email, web_result_id, session_id, device, country, ip_address, redirected_to, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&capture.email)
        .bind(&capture.web_result_id)
        .bind(&capture.session_id)
        .bind(&capture.device)
        .bind(&capture.country)
        .bind(&capture.ip_address)
        .bind(&capture.redirected_to)
        .bind(capture.captured_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
