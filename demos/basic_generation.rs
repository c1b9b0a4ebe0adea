//! Basic generation example
//!
//! Generates one image, repeats the request to show the cache hit, and
//! writes the result to the current directory.
//!
//! Usage:
//!   RUST_LOG=imagegen_core=debug cargo run --example basic_generation -- "a red fox in snow"

use imagegen_core::{ImageClientBuilder, RequestParams, StyleTag};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a red fox in snow".to_string());

    let client = ImageClientBuilder::from_env().build()?;

    let request = RequestParams::new(prompt)
        .with_style(StyleTag::Photorealistic)
        .with_size(768, 768)
        .with_enhance(true);

    let first = client.generate(&request).await?;
    println!("generated {} (from cache: {})", first.resource_handle, first.from_cache);
    println!("final prompt: {}", first.final_prompt);

    let second = client.generate(&request).await?;
    println!("repeat served from cache: {}", second.from_cache);

    if let Some(image) = client.image(first.resource_handle) {
        println!("{} {}x{}, {} bytes", image.content_type, image.width, image.height, image.len());
    }

    let path = client.save_image(&first, ".").await?;
    println!("saved to {}", path.display());

    let stats = client.cache_stats();
    println!(
        "cache: {}/{} entries, {} hits, {} misses ({:.0}% hit ratio)",
        stats.size,
        stats.capacity,
        stats.hits,
        stats.misses,
        stats.hit_ratio() * 100.0
    );
    Ok(())
}
