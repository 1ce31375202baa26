//! Funnel content models: landing page, categories, offers, prelander
//! configuration rows and email captures.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Editable landing page copy. At most one row is current.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LandingContent {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub updated_at: i64,
}

/// A related-search tile on the landing page, pointing at a results page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub webresult_page: String,
    pub serial_number: i64,
    pub created_at: i64,
}

/// An advertiser destination listed on a results page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebResult {
    pub id: String,
    pub webresult_page: String,
    pub is_sponsored: bool,
    pub offer_name: Option<String>,
    pub title: String,
    pub description: String,
    pub original_link: String,
    pub logo_url: Option<String>,
    pub serial_number: i64,
    pub access_type: String,
    pub allowed_countries: Option<String>,
    pub pre_landing_page_key: Option<String>,
    pub created_at: i64,
}

impl WebResult {
    /// Countries the offer is restricted to, when `access_type` is
    /// "selected_countries". Stored as a JSON array of country names.
    pub fn allowed_country_list(&self) -> Vec<String> {
        self.allowed_countries
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Whether a visitor from `country` may see this offer. An
    /// unresolved country ("Unknown") passes worldwide offers only.
    pub fn accessible_from(&self, country: &str) -> bool {
        match self.access_type.as_str() {
            "selected_countries" => self
                .allowed_country_list()
                .iter()
                .any(|c| c.eq_ignore_ascii_case(country)),
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWebResult {
    pub id: String,
    pub webresult_page: String,
    pub is_sponsored: bool,
    pub offer_name: Option<String>,
    pub title: String,
    pub description: String,
    pub original_link: String,
    pub logo_url: Option<String>,
    pub serial_number: i64,
    pub access_type: String,
    pub allowed_countries: Option<String>,
}

/// Raw prelander configuration as persisted by the admin builder.
///
/// Numeric and enum-ish fields are stored as loose text (they arrive as
/// form strings); `prelander::ConfigResolver` normalizes them into a
/// fully typed record before anything renders from them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrelanderPage {
    pub id: i64,
    pub page_key: String,
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
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewPrelanderPage {
    pub page_key: String,
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

/// Email captured on a prelander before redirecting to the offer.
#[derive(Debug, Clone)]
pub struct NewEmailCapture {
    pub email: String,
    pub web_result_id: String,
    pub session_id: Option<String>,
    pub device: String,
    pub country: String,
    pub ip_address: String,
    pub redirected_to: String,
    pub captured_at: i64,
}
