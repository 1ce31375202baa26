//! Data models for session analytics

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Device class derived from the User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

impl Device {
    /// Classify a raw User-Agent string.
    ///
    /// Tablet tokens are checked first: Apple tablet UAs also carry a
    /// "Mobile" token, and an iPad must classify as Tablet.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("ipad") || ua.contains("tablet") {
            Device::Tablet
        } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("android") {
            Device::Mobile
        } else {
            Device::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "Mobile",
            Device::Tablet => "Tablet",
            Device::Desktop => "Desktop",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment captured alongside every tracked interaction.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    pub ip_address: String,
    pub country: String,
    pub device: Device,
}

/// Closed set of click event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickKind {
    RelatedSearch,
    Result,
}

impl ClickKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickKind::RelatedSearch => "related_search",
            ClickKind::Result => "result",
        }
    }
}

/// One row of the running per-session counter record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionAggregate {
    pub id: i64,
    pub session_id: String,
    pub ip_address: String,
    pub country: String,
    pub device: String,
    pub source: Option<String>,
    pub page_views: i64,
    pub clicks: i64,
    pub unique_clicks: i64,
    pub related_searches: i64,
    pub result_clicks: i64,
    pub time_spent: i64,
    pub first_seen: i64,
}

/// Immutable click ledger entry as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickEvent {
    pub id: i64,
    pub session_id: String,
    pub event_type: String,
    pub search_term: Option<String>,
    pub target_url: Option<String>,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
    pub created_at: i64,
}

/// Click ledger entry to append.
#[derive(Debug, Clone)]
pub struct NewClickEvent {
    pub session_id: String,
    pub kind: ClickKind,
    pub search_term: Option<String>,
    pub target_url: Option<String>,
    pub ip_address: String,
    pub country: String,
    pub device: String,
    pub created_at: i64,
}

/// Site-wide totals across all session aggregates.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrafficSummary {
    pub sessions: i64,
    pub page_views: i64,
    pub clicks: i64,
    pub unique_clicks: i64,
    pub related_searches: i64,
    pub result_clicks: i64,
    pub time_spent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iphone_is_mobile() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
                  (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        assert_eq!(Device::from_user_agent(ua), Device::Mobile);
    }

    #[test]
    fn ipad_is_tablet_despite_mobile_token() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 \
                  (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
        assert_eq!(Device::from_user_agent(ua), Device::Tablet);
    }

    #[test]
    fn generic_desktop_string_is_desktop() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
        assert_eq!(Device::from_user_agent(ua), Device::Desktop);
    }

    #[test]
    fn android_phone_is_mobile() {
        let ua = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0 Mobile Safari/537.36";
        assert_eq!(Device::from_user_agent(ua), Device::Mobile);
    }

    #[test]
    fn click_kind_wire_names() {
        assert_eq!(ClickKind::RelatedSearch.as_str(), "related_search");
        assert_eq!(ClickKind::Result.as_str(), "result");
    }
}
