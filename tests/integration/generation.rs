//! Integration tests for the generation path: cache, enhancement, errors

use crate::integration::mock_server::MockServerFixture;
use async_trait::async_trait;
use imagegen_core::enhance::PromptEnhancer;
use imagegen_core::{EndpointConfig, RequestParams, TimeoutConfig};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn default_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("model".into(), "turbo".into()),
        Matcher::UrlEncoded("width".into(), "1024".into()),
        Matcher::UrlEncoded("height".into(), "1024".into()),
        Matcher::UrlEncoded("nologo".into(), "true".into()),
        Matcher::UrlEncoded("safe".into(), "true".into()),
    ])
}

#[tokio::test]
async fn test_generate_miss_then_hit() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_image(r"^/prompt/a%20cat,%20photo,%20detailed,%204k$", default_query(), 1)
        .await;
    let client = fixture.create_test_client();

    let first = client.generate(&RequestParams::new("a cat")).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.model_id, "turbo");
    assert_eq!(first.final_prompt, "a cat, photo, detailed, 4k");
    assert_eq!(client.cache_stats().size, 1);

    let image = client.image(first.resource_handle).unwrap();
    assert_eq!(image.content_type, "image/png");
    assert_eq!((image.width, image.height), (16, 8));

    // same request modulo case and whitespace
    let second = client.generate(&RequestParams::new("  A CAT ")).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.resource_handle, first.resource_handle);
    assert_eq!(second.created_at_ms, first.created_at_ms);

    let stats = client.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_seed_is_sent_and_keys_the_cache() {
    let fixture = MockServerFixture::new().await;
    let seeded = fixture
        .mock_image(
            r"^/prompt/",
            Matcher::UrlEncoded("seed".into(), "42".into()),
            1,
        )
        .await;
    let client = fixture.create_test_client();

    let a = client
        .generate(&RequestParams::new("a cat").with_seed(42))
        .await
        .unwrap();
    let b = client
        .generate(&RequestParams::new("a cat").with_seed(42))
        .await
        .unwrap();
    assert!(b.from_cache);
    assert_eq!(a.resource_handle, b.resource_handle);
    seeded.assert_async().await;
}

#[tokio::test]
async fn test_upstream_error_surfaces_status() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_status(r"^/prompt/", 503, "Service Unavailable", 1)
        .await;
    let client = fixture.create_test_client();

    let err = client
        .generate(&RequestParams::new("a cat"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), Some(503));
    assert_eq!(client.cache_stats().size, 0);
    assert!(client.history().is_empty());
    assert!(client.display().is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_image_body_is_a_transport_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_status(r"^/prompt/", 200, "<html>queue full</html>", 1)
        .await;
    let client = fixture.create_test_client();

    let err = client
        .generate(&RequestParams::new("a cat"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), None);
    assert_eq!(client.cache_stats().size, 0);
    assert_eq!(client.resource_stats().live, 0);
}

#[tokio::test]
async fn test_validation_error_makes_no_request() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_image(r"^/prompt/", Matcher::Any, 0).await;
    let client = fixture.create_test_client();

    let err = client
        .generate(&RequestParams::new("a cat").with_size(100, 1024))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = client
        .generate(&RequestParams::new("   "))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(client.cache_stats().misses, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_enhanced_prompt_is_used() {
    let fixture = MockServerFixture::new().await;
    let text = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", Matcher::Regex(r"^/Enhance%20this%20image%20prompt".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("model".into(), "openai".into()),
                Matcher::UrlEncoded("json".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "  a fluffy orange cat on a windowsill  "}"#)
            .expect(1)
            .create_async()
            .await
    };
    let image = fixture
        .mock_image(
            r"^/prompt/a%20fluffy%20orange%20cat%20on%20a%20windowsill$",
            Matcher::Any,
            1,
        )
        .await;
    let client = fixture.create_test_client();

    let result = client
        .generate(&RequestParams::new("a cat").with_enhance(true))
        .await
        .unwrap();
    assert_eq!(result.final_prompt, "a fluffy orange cat on a windowsill");

    // cached under the pre-enhancement prompt
    let again = client
        .generate(&RequestParams::new("a cat").with_enhance(true))
        .await
        .unwrap();
    assert!(again.from_cache);
    assert_eq!(again.final_prompt, "a fluffy orange cat on a windowsill");

    text.assert_async().await;
    image.assert_async().await;
}

#[tokio::test]
async fn test_enhancement_body_as_json_string() {
    let fixture = MockServerFixture::new().await;
    let _text = fixture
        .mock_json(
            r"^/Enhance",
            r#""{\"response\": \"a cat drifting through space\"}""#,
            1,
        )
        .await;
    let image = fixture
        .mock_image(r"^/prompt/a%20cat%20drifting%20through%20space$", Matcher::Any, 1)
        .await;
    let client = fixture.create_test_client();

    let result = client
        .generate(&RequestParams::new("a cat").with_enhance(true))
        .await
        .unwrap();
    assert_eq!(result.final_prompt, "a cat drifting through space");
    image.assert_async().await;
}

#[tokio::test]
async fn test_enhancement_failure_keeps_composed_prompt() {
    let fixture = MockServerFixture::new().await;
    let text = fixture
        .mock_status(r"^/Enhance", 500, "Internal Server Error", 1)
        .await;
    let image = fixture
        .mock_image(r"^/prompt/a%20cat,%20photo,%20detailed,%204k$", Matcher::Any, 1)
        .await;
    let client = fixture.create_test_client();

    let result = client
        .generate(&RequestParams::new("a cat").with_enhance(true))
        .await
        .unwrap();
    assert_eq!(result.final_prompt, "a cat, photo, detailed, 4k");
    assert!(!result.from_cache);
    text.assert_async().await;
    image.assert_async().await;
}

/// Enhancer that never answers.
struct Unresponsive;

#[async_trait]
impl PromptEnhancer for Unresponsive {
    async fn enhance(&self, _prompt: &str) -> imagegen_core::Result<String> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_enhancement_timeout_keeps_composed_prompt() {
    let fixture = MockServerFixture::new().await;
    let image = fixture
        .mock_image(r"^/prompt/a%20cat,%20photo,%20detailed,%204k$", Matcher::Any, 1)
        .await;
    let client = fixture
        .builder()
        .with_timeouts(TimeoutConfig::default().with_enhancement(Duration::from_millis(50)))
        .with_enhancer(Arc::new(Unresponsive))
        .build()
        .unwrap();

    let result = client
        .generate(&RequestParams::new("a cat").with_enhance(true))
        .await
        .unwrap();
    assert_eq!(result.final_prompt, "a cat, photo, detailed, 4k");
    assert!(!result.from_cache);
    image.assert_async().await;
}

#[tokio::test]
async fn test_generation_timeout_is_a_transport_error() {
    let fixture = MockServerFixture::new().await;
    // accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = fixture
        .builder()
        .with_endpoints(
            EndpointConfig::new()
                .with_image_base_url(format!("http://{}", addr))
                .with_text_base_url(&fixture.base_url),
        )
        .with_timeouts(TimeoutConfig::default().with_generation(Duration::from_millis(200)))
        .build()
        .unwrap();

    let err = client
        .generate(&RequestParams::new("a cat"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("timed out after 200ms"));

    let stats = client.cache_stats();
    assert_eq!((stats.size, stats.misses), (0, 1));
    assert_eq!(client.resource_stats().live, 0);
    assert!(client.history().is_empty());
    silent.abort();
}

#[tokio::test]
async fn test_cache_hit_returns_original_request() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_image(r"^/prompt/", Matcher::Any, 1).await;
    let client = fixture.create_test_client();

    let original = RequestParams::new("a cat");
    client.generate(&original).await.unwrap();

    // logo and safety flags are not part of the fingerprint
    let hit = client
        .generate(&RequestParams::new("a cat").with_no_logo(false))
        .await
        .unwrap();
    assert!(hit.from_cache);
    assert_eq!(hit.request_snapshot, original);
    mock.assert_async().await;
}
