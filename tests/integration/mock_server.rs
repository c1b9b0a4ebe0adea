//! Mock HTTP server setup for integration tests

use image::{ImageFormat, Rgba, RgbaImage};
use imagegen_core::resilience::ManualScheduler;
use imagegen_core::{ImageClient, ImageClientBuilder};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
    pub scheduler: Arc<ManualScheduler>,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
            scheduler: Arc::new(ManualScheduler::new()),
        }
    }

    /// Builder pointing both services at the mock server, on a manual clock.
    pub fn builder(&self) -> ImageClientBuilder {
        ImageClientBuilder::new()
            .base_url_override(&self.base_url)
            .with_scheduler(self.scheduler.clone())
    }

    pub fn create_test_client(&self) -> ImageClient {
        self.builder().build().expect("client builds")
    }

    /// Serve a PNG for any path matching `path_regex` and `query`.
    pub async fn mock_image(&self, path_regex: &str, query: Matcher, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", Matcher::Regex(path_regex.to_string()))
            .match_query(query)
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png_bytes(16, 8))
            .expect(hits)
            .create_async()
            .await
    }

    /// Respond with a bare status and body.
    pub async fn mock_status(
        &self,
        path_regex: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", Matcher::Regex(path_regex.to_string()))
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Create a mock for a successful JSON response
    pub async fn mock_json(&self, path_regex: &str, body: &str, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", Matcher::Regex(path_regex.to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

/// Encode a solid-colour PNG in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 120, 40, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("png encodes");
    buf.into_inner()
}
