//! Integration tests for history, display slot and resource release

use crate::integration::mock_server::MockServerFixture;
use imagegen_core::RequestParams;
use mockito::Matcher;

#[tokio::test]
async fn test_history_bound_and_deferred_release() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_image(r"^/prompt/", Matcher::Any, 25).await;
    let client = fixture.create_test_client();

    let mut generated = Vec::new();
    for i in 0..25 {
        let image = client
            .generate(&RequestParams::new(format!("prompt {}", i)))
            .await
            .unwrap();
        generated.push(image);
    }
    mock.assert_async().await;

    let history = client.history();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].resource_handle, generated[24].resource_handle);
    assert_eq!(history[19].resource_handle, generated[5].resource_handle);

    // the five oldest fell out of history but the cache still holds them
    let stats = client.resource_stats();
    assert_eq!((stats.live, stats.released), (25, 0));
    for image in &generated[..5] {
        assert!(client.image(image.resource_handle).is_some());
    }

    client.clear_cache();
    let stats = client.resource_stats();
    assert_eq!((stats.live, stats.released), (20, 5));
    for image in &generated[..5] {
        assert!(client.image(image.resource_handle).is_none());
    }

    // the displayed image survives clearing history
    client.clear_history();
    let stats = client.resource_stats();
    assert_eq!((stats.live, stats.released), (1, 24));
    assert_eq!(
        client.display().map(|d| d.resource_handle),
        Some(generated[24].resource_handle)
    );

    client.clear_display();
    let stats = client.resource_stats();
    assert_eq!((stats.live, stats.released), (0, 25));
}

#[tokio::test]
async fn test_cache_hit_appends_to_history_without_new_resource() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_image(r"^/prompt/", Matcher::Any, 1).await;
    let client = fixture.create_test_client();

    let req = RequestParams::new("a cat");
    client.generate(&req).await.unwrap();
    client.generate(&req).await.unwrap();

    let history = client.history();
    assert_eq!(history.len(), 2);
    assert!(history[0].from_cache);
    assert!(!history[1].from_cache);
    assert_eq!(client.resource_stats().live, 1);

    client.clear_history();
    client.clear_display();
    // still cached
    assert_eq!(client.resource_stats().live, 1);
    client.clear_cache();
    assert_eq!(client.resource_stats().live, 0);
}

#[tokio::test]
async fn test_save_image_to_directory_and_file() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_image(r"^/prompt/", Matcher::Any, 1).await;
    let client = fixture.create_test_client();
    let image = client.generate(&RequestParams::new("a cat")).await.unwrap();

    let dir = std::env::temp_dir().join(format!("imagegen-save-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();

    let saved = client.save_image(&image, &dir).await.unwrap();
    assert_eq!(
        saved.file_name().and_then(|n| n.to_str()),
        Some(format!("generated-image-{}.png", image.created_at_ms).as_str())
    );
    let written = tokio::fs::read(&saved).await.unwrap();
    assert_eq!(written, client.image(image.resource_handle).unwrap().bytes.to_vec());

    let explicit = dir.join("cat.png");
    let saved = client.save_image(&image, &explicit).await.unwrap();
    assert_eq!(saved, explicit);

    client.clear_cache();
    client.clear_history();
    client.clear_display();
    assert!(client.save_image(&image, &dir).await.is_err());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
