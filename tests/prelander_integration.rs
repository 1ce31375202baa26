//! Integration tests for prelander configuration resolution: page-key
//! and offer-backlink addressing, fail-closed semantics, and the typed
//! normalization of loose configuration rows.

use funnel::models::{opaque_id, NewPrelanderPage, NewWebResult};
use funnel::prelander::{
    Background, ConfigResolver, ImageRatio, ResolveError, ResolveTarget, ResolvedPrelander,
    TextAlign,
};
use funnel::storage::{SqliteStorage, Storage, StorageError};
use std::sync::Arc;

async fn setup_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn offer(page: &str) -> NewWebResult {
    NewWebResult {
        id: opaque_id("wr"),
        webresult_page: page.to_string(),
        is_sponsored: false,
        offer_name: Some("OfferX".to_string()),
        title: "Offer Title".to_string(),
        description: "Offer description".to_string(),
        original_link: "https://dest.example/a".to_string(),
        logo_url: None,
        serial_number: 1,
        access_type: "worldwide".to_string(),
        allowed_countries: None,
    }
}

fn prelander(page_key: &str) -> NewPrelanderPage {
    NewPrelanderPage {
        page_key: page_key.to_string(),
        headline: "Limited Offer".to_string(),
        description: Some("Act now".to_string()),
        cta_text: Some("Continue to Offer".to_string()),
        headline_font_size: Some("40".to_string()),
        headline_align: Some("right".to_string()),
        description_font_size: Some("20".to_string()),
        image_ratio: Some("1:1".to_string()),
        main_image_url: Some("https://cdn.example/hero.jpg".to_string()),
        background_color: Some("#222222".to_string()),
        target_url: Some("https://dest.example/a".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn missing_page_key_fails_with_not_found() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    let outcome = resolver
        .resolve(ResolveTarget::PageKey("missing-key"))
        .await;
    assert!(matches!(outcome, Err(ResolveError::NotFound)));
}

#[tokio::test]
async fn inactive_configuration_fails_with_not_found() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    storage
        .create_prelander(&prelander("prelander_1"))
        .await
        .unwrap();
    assert!(resolver
        .resolve(ResolveTarget::PageKey("prelander_1"))
        .await
        .is_ok());

    storage.deactivate_prelander("prelander_1").await.unwrap();
    let outcome = resolver
        .resolve(ResolveTarget::PageKey("prelander_1"))
        .await;
    assert!(matches!(outcome, Err(ResolveError::NotFound)));
}

#[tokio::test]
async fn resolved_configuration_is_fully_typed() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    storage
        .create_prelander(&prelander("prelander_2"))
        .await
        .unwrap();

    let resolved = resolver
        .resolve(ResolveTarget::PageKey("prelander_2"))
        .await
        .unwrap();

    assert_eq!(resolved.page_key.as_deref(), Some("prelander_2"));
    assert_eq!(resolved.headline, "Limited Offer");
    assert_eq!(resolved.headline_font_size, 40);
    assert_eq!(resolved.description_font_size, 20);
    assert_eq!(resolved.headline_align, TextAlign::Right);
    assert_eq!(
        resolved.background,
        Background::Color {
            color: "#222222".to_string()
        }
    );
    assert_eq!(
        resolved.main_image.expect("main image configured").ratio,
        ImageRatio::Square
    );
    assert_eq!(
        resolved.target_url.as_deref(),
        Some("https://dest.example/a")
    );
}

#[tokio::test]
async fn offer_backlink_resolves_through_its_page_key() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    let created = storage.create_web_result(&offer("wr=1")).await.unwrap();
    storage
        .create_prelander(&prelander("prelander_3"))
        .await
        .unwrap();
    assert!(storage
        .link_prelander(&created.id, "prelander_3")
        .await
        .unwrap());

    let resolved = resolver
        .resolve(ResolveTarget::Offer(&created.id))
        .await
        .unwrap();
    assert_eq!(resolved.page_key.as_deref(), Some("prelander_3"));
    assert_eq!(resolved.headline, "Limited Offer");
}

#[tokio::test]
async fn offer_without_backlink_fails_closed() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    let created = storage.create_web_result(&offer("wr=1")).await.unwrap();

    let outcome = resolver.resolve(ResolveTarget::Offer(&created.id)).await;
    assert!(matches!(outcome, Err(ResolveError::NotFound)));
}

#[tokio::test]
async fn dangling_backlink_fails_closed_and_default_render_takes_over() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    let created = storage.create_web_result(&offer("wr=1")).await.unwrap();
    storage
        .create_prelander(&prelander("prelander_4"))
        .await
        .unwrap();
    assert!(storage
        .link_prelander(&created.id, "prelander_4")
        .await
        .unwrap());
    storage.deactivate_prelander("prelander_4").await.unwrap();

    let outcome = resolver.resolve(ResolveTarget::Offer(&created.id)).await;
    assert!(matches!(outcome, Err(ResolveError::NotFound)));

    // The caller-level fallback renders from the offer's own fields
    let fallback = ResolvedPrelander::default_for_offer(&created);
    assert_eq!(fallback.headline, "OfferX");
    assert_eq!(fallback.description, "Offer description");
    assert_eq!(
        fallback.target_url.as_deref(),
        Some("https://dest.example/a")
    );
    assert!(fallback.page_key.is_none());
}

#[tokio::test]
async fn unknown_offer_id_fails_with_not_found() {
    let storage = setup_storage().await;
    let resolver = ConfigResolver::new(Arc::clone(&storage));

    let outcome = resolver
        .resolve(ResolveTarget::Offer("wr_missing_offer"))
        .await;
    assert!(matches!(outcome, Err(ResolveError::NotFound)));
}

#[tokio::test]
async fn duplicate_page_keys_are_rejected() {
    let storage = setup_storage().await;

    storage
        .create_prelander(&prelander("prelander_5"))
        .await
        .unwrap();
    let duplicate = storage.create_prelander(&prelander("prelander_5")).await;
    assert!(matches!(duplicate, Err(StorageError::Conflict)));
}

#[tokio::test]
async fn list_prelanders_excludes_deactivated_pages() {
    let storage = setup_storage().await;

    storage
        .create_prelander(&prelander("prelander_6"))
        .await
        .unwrap();
    storage
        .create_prelander(&prelander("prelander_7"))
        .await
        .unwrap();
    storage.deactivate_prelander("prelander_6").await.unwrap();

    let pages = storage.list_prelanders().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_key, "prelander_7");
}
