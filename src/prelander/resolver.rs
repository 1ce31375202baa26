//! Prelander configuration resolution.
//!
//! Configurations are addressed two ways: directly by page key, or
//! through the backlink key an offer carries. Resolution fails closed:
//! a missing or inactive configuration is `NotFound`, and callers are
//! expected to fall back to a default render built from the offer's own
//! fields (`ResolvedPrelander::default_for_offer`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::models::{PrelanderPage, WebResult};
use crate::storage::Storage;

pub const DEFAULT_HEADLINE_FONT_SIZE: u32 = 48;
pub const DEFAULT_DESCRIPTION_FONT_SIZE: u32 = 18;
pub const DEFAULT_LOGO_SIZE: u32 = 120;
pub const DEFAULT_HEADLINE_COLOR: &str = "#ffffff";
pub const DEFAULT_DESCRIPTION_COLOR: &str = "#e5e5e5";
pub const DEFAULT_CTA_COLOR: &str = "#00ffff";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#0a0a0a";
pub const DEFAULT_CTA_TEXT: &str = "Get Started";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no active prelander configuration for this target")]
    NotFound,
}

/// What to resolve a configuration for.
#[derive(Debug, Clone, Copy)]
pub enum ResolveTarget<'a> {
    /// Explicit prelander page key.
    PageKey(&'a str),
    /// Offer id; resolution goes through the offer's backlink key.
    Offer(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    TopCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRatio {
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
}

/// Background rendering mode: a flat color, or an image over a color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Background {
    Color { color: String },
    Image { url: String, color: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    pub position: LogoPosition,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainImage {
    pub url: String,
    pub ratio: ImageRatio,
}

/// Fully typed configuration, safe to bind straight into a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrelander {
    pub page_key: Option<String>,
    pub headline: String,
    pub description: String,
    pub cta_text: String,
    pub headline_font_size: u32,
    pub headline_color: String,
    pub headline_align: TextAlign,
    pub description_font_size: u32,
    pub description_color: String,
    pub cta_color: String,
    pub background: Background,
    pub logo: Option<Logo>,
    pub main_image: Option<MainImage>,
    pub target_url: Option<String>,
}

impl ResolvedPrelander {
    /// Normalize a raw configuration row into a fully typed record.
    /// Missing or unparseable fields fall back to the builder defaults.
    pub fn from_page(page: &PrelanderPage) -> Self {
        let background_color = page
            .background_color
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string());

        let background = match page.background_image_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Background::Image {
                url: url.to_string(),
                color: background_color,
            },
            None => Background::Color {
                color: background_color,
            },
        };

        let logo = page
            .logo_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|url| Logo {
                url: url.to_string(),
                position: parse_logo_position(page.logo_position.as_deref()),
                size: parse_size(page.logo_size.as_deref(), DEFAULT_LOGO_SIZE),
            });

        let main_image = page
            .main_image_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|url| MainImage {
                url: url.to_string(),
                ratio: parse_image_ratio(page.image_ratio.as_deref()),
            });

        Self {
            page_key: Some(page.page_key.clone()),
            headline: page.headline.clone(),
            description: page.description.clone().unwrap_or_default(),
            cta_text: page
                .cta_text
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_CTA_TEXT.to_string()),
            headline_font_size: parse_size(
                page.headline_font_size.as_deref(),
                DEFAULT_HEADLINE_FONT_SIZE,
            ),
            headline_color: color_or(page.headline_color.as_deref(), DEFAULT_HEADLINE_COLOR),
            headline_align: parse_text_align(page.headline_align.as_deref()),
            description_font_size: parse_size(
                page.description_font_size.as_deref(),
                DEFAULT_DESCRIPTION_FONT_SIZE,
            ),
            description_color: color_or(
                page.description_color.as_deref(),
                DEFAULT_DESCRIPTION_COLOR,
            ),
            cta_color: color_or(page.cta_color.as_deref(), DEFAULT_CTA_COLOR),
            background,
            logo,
            main_image,
            target_url: page.target_url.clone().filter(|u| !u.is_empty()),
        }
    }

    /// Built-in default render for an offer without a usable
    /// configuration: the offer's own copy over the default styling.
    pub fn default_for_offer(offer: &WebResult) -> Self {
        Self {
            page_key: None,
            headline: offer
                .offer_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| offer.title.clone()),
            description: offer.description.clone(),
            cta_text: DEFAULT_CTA_TEXT.to_string(),
            headline_font_size: DEFAULT_HEADLINE_FONT_SIZE,
            headline_color: DEFAULT_HEADLINE_COLOR.to_string(),
            headline_align: TextAlign::Center,
            description_font_size: DEFAULT_DESCRIPTION_FONT_SIZE,
            description_color: DEFAULT_DESCRIPTION_COLOR.to_string(),
            cta_color: DEFAULT_CTA_COLOR.to_string(),
            background: Background::Color {
                color: DEFAULT_BACKGROUND_COLOR.to_string(),
            },
            logo: offer.logo_url.clone().filter(|u| !u.is_empty()).map(|url| {
                Logo {
                    url,
                    position: LogoPosition::TopCenter,
                    size: DEFAULT_LOGO_SIZE,
                }
            }),
            main_image: None,
            target_url: Some(offer.original_link.clone()),
        }
    }
}

fn parse_size(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn color_or(raw: Option<&str>, default: &str) -> String {
    raw.filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn parse_text_align(raw: Option<&str>) -> TextAlign {
    match raw {
        Some("left") => TextAlign::Left,
        Some("right") => TextAlign::Right,
        _ => TextAlign::Center,
    }
}

fn parse_logo_position(raw: Option<&str>) -> LogoPosition {
    match raw {
        Some("top-left") => LogoPosition::TopLeft,
        _ => LogoPosition::TopCenter,
    }
}

fn parse_image_ratio(raw: Option<&str>) -> ImageRatio {
    match raw {
        Some("1:1") => ImageRatio::Square,
        Some("4:3") => ImageRatio::Standard,
        _ => ImageRatio::Widescreen,
    }
}

/// Read-only configuration lookup with fail-closed semantics.
pub struct ConfigResolver {
    storage: Arc<dyn Storage>,
}

impl ConfigResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Resolve the configuration that should render the prelander.
    ///
    /// A single fetch per step, no retries; transient storage failures
    /// surface as `NotFound` so the caller takes its default path.
    pub async fn resolve(&self, target: ResolveTarget<'_>) -> Result<ResolvedPrelander, ResolveError> {
        match target {
            ResolveTarget::PageKey(key) => self.resolve_key(key).await,
            ResolveTarget::Offer(id) => {
                let offer = match self.storage.web_result(id).await {
                    Ok(Some(offer)) => offer,
                    Ok(None) => return Err(ResolveError::NotFound),
                    Err(err) => {
                        warn!(offer_id = id, error = %err, "offer lookup failed during prelander resolution");
                        return Err(ResolveError::NotFound);
                    }
                };

                let Some(page_key) = offer
                    .pre_landing_page_key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                else {
                    return Err(ResolveError::NotFound);
                };

                self.resolve_key(page_key).await
            }
        }
    }

    async fn resolve_key(&self, page_key: &str) -> Result<ResolvedPrelander, ResolveError> {
        match self.storage.prelander_by_key(page_key).await {
            Ok(Some(page)) => Ok(ResolvedPrelander::from_page(&page)),
            Ok(None) => Err(ResolveError::NotFound),
            Err(err) => {
                warn!(page_key, error = %err, "prelander lookup failed");
                Err(ResolveError::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_page() -> PrelanderPage {
        PrelanderPage {
            id: 1,
            page_key: "prelander_1700000000000".into(),
            headline: "Big Deal".into(),
            description: Some("Save now".into()),
            cta_text: Some("Visit Now".into()),
            headline_font_size: Some("36".into()),
            headline_color: Some("#111111".into()),
            headline_align: Some("left".into()),
            description_font_size: Some("16".into()),
            description_color: None,
            cta_color: Some(String::new()),
            background_color: Some("#ffffff".into()),
            background_image_url: None,
            logo_url: Some("https://cdn.example/logo.png".into()),
            logo_position: Some("top-left".into()),
            logo_size: Some("not-a-number".into()),
            main_image_url: Some("https://cdn.example/hero.jpg".into()),
            image_ratio: Some("4:3".into()),
            target_url: Some("https://dest.example/offer".into()),
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn numeric_fields_are_parsed_to_numbers() {
        let resolved = ResolvedPrelander::from_page(&raw_page());
        assert_eq!(resolved.headline_font_size, 36);
        assert_eq!(resolved.description_font_size, 16);
    }

    #[test]
    fn unparseable_and_missing_fields_fall_back_to_defaults() {
        let resolved = ResolvedPrelander::from_page(&raw_page());
        let logo = resolved.logo.expect("logo configured");
        assert_eq!(logo.size, DEFAULT_LOGO_SIZE);
        assert_eq!(logo.position, LogoPosition::TopLeft);
        assert_eq!(resolved.description_color, DEFAULT_DESCRIPTION_COLOR);
        assert_eq!(resolved.cta_color, DEFAULT_CTA_COLOR);
    }

    #[test]
    fn background_mode_follows_image_presence() {
        let mut page = raw_page();
        let resolved = ResolvedPrelander::from_page(&page);
        assert_eq!(
            resolved.background,
            Background::Color {
                color: "#ffffff".into()
            }
        );

        page.background_image_url = Some("https://cdn.example/bg.jpg".into());
        let resolved = ResolvedPrelander::from_page(&page);
        assert_eq!(
            resolved.background,
            Background::Image {
                url: "https://cdn.example/bg.jpg".into(),
                color: "#ffffff".into()
            }
        );
    }

    #[test]
    fn image_ratio_and_align_normalize() {
        let resolved = ResolvedPrelander::from_page(&raw_page());
        assert_eq!(resolved.headline_align, TextAlign::Left);
        assert_eq!(
            resolved.main_image.expect("main image configured").ratio,
            ImageRatio::Standard
        );
    }

    #[test]
    fn default_render_uses_offer_copy() {
        let offer = WebResult {
            id: "wr_1".into(),
            webresult_page: "wr=1".into(),
            is_sponsored: true,
            offer_name: Some("OfferX".into()),
            title: "Fallback Title".into(),
            description: "Offer description".into(),
            original_link: "https://dest.example/a".into(),
            logo_url: None,
            serial_number: 1,
            access_type: "worldwide".into(),
            allowed_countries: None,
            pre_landing_page_key: None,
            created_at: 0,
        };

        let resolved = ResolvedPrelander::default_for_offer(&offer);
        assert_eq!(resolved.headline, "OfferX");
        assert_eq!(resolved.description, "Offer description");
        assert_eq!(resolved.target_url.as_deref(), Some("https://dest.example/a"));
        assert!(resolved.page_key.is_none());
        assert_eq!(resolved.headline_font_size, DEFAULT_HEADLINE_FONT_SIZE);
    }
}
