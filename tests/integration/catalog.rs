//! Integration tests for the model catalog: filtering, caching, retry, fallback

use crate::integration::mock_server::MockServerFixture;
use imagegen_core::EndpointConfig;
use std::time::Duration;

#[tokio::test]
async fn test_models_filtered_and_cached_locally() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json(r"^/models$", r#"["flux", "NanoBanana", "turbo"]"#, 1)
        .await;
    let client = fixture.create_test_client();

    let catalog = client.models().await;
    assert_eq!(catalog.ids(), vec!["flux", "turbo"]);
    assert!(!catalog.cached);
    assert!(!catalog.fallback);
    assert_eq!(catalog.models[0].display_name, "Flux");

    let again = client.models().await;
    assert!(again.cached);
    assert_eq!(again.ids(), vec!["flux", "turbo"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_models_fall_back_after_three_attempts() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_status(r"^/models$", 500, "Internal Server Error", 3)
        .await;
    let client = fixture.create_test_client();

    let catalog = client.models().await;
    assert!(catalog.fallback);
    assert_eq!(catalog.ids(), vec!["flux", "turbo", "kontext"]);
    assert!(catalog.last_error.unwrap().contains("500"));
    assert_eq!(
        fixture.scheduler.sleeps(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_only_disallowed_models_yield_fallback() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json(r"^/models$", r#"["NanoBanana"]"#, 1).await;
    let client = fixture.create_test_client();

    let catalog = client.models().await;
    assert!(catalog.fallback);
    assert_eq!(catalog.ids(), vec!["flux", "turbo", "kontext"]);
    assert!(catalog.last_error.is_none());
}

#[tokio::test]
async fn test_refetch_recovers_after_fallback() {
    let fixture = MockServerFixture::new().await;
    let failing = fixture
        .mock_status(r"^/models$", 502, "Bad Gateway", 3)
        .await;
    let client = fixture.create_test_client();
    assert!(client.models().await.fallback);
    failing.assert_async().await;
    failing.remove_async().await;

    let healthy = fixture
        .mock_json(r"^/models$", r#"["kontext", "flux"]"#, 1)
        .await;
    let catalog = client.refetch_models().await;
    assert!(!catalog.fallback);
    assert_eq!(catalog.ids(), vec!["kontext", "flux"]);
    healthy.assert_async().await;
}

#[tokio::test]
async fn test_remote_aggregator_envelope() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json(
            r"^/api/models$",
            r#"{"success": true, "models": ["flux", 7, null, "turbo"], "cached": true, "timestamp": 1700000000000}"#,
            1,
        )
        .await;
    let client = fixture
        .builder()
        .with_endpoints(
            EndpointConfig::new()
                .with_image_base_url(&fixture.base_url)
                .with_text_base_url(&fixture.base_url)
                .with_aggregator_url(format!("{}/api/models", fixture.base_url)),
        )
        .build()
        .unwrap();

    let catalog = client.models().await;
    assert!(catalog.cached);
    assert_eq!(catalog.ids(), vec!["flux", "turbo"]);
    mock.assert_async().await;
}
