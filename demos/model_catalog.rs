//! Model catalog example
//!
//! Resolves the model catalog twice (the second call is served from the
//! local cache) and then forces a refetch.
//!
//! Usage:
//!   RUST_LOG=imagegen_core=info cargo run --example model_catalog

use imagegen_core::ImageClientBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = ImageClientBuilder::from_env().build()?;

    let catalog = client.models().await;
    for model in &catalog.models {
        println!("{:<10} {}", model.display_name, model.description);
    }
    if let Some(err) = &catalog.last_error {
        println!("using fallback models: {err}");
    }

    let again = client.models().await;
    println!("second lookup cached: {}", again.cached);

    let fresh = client.refetch_models().await;
    println!("refetched {} models (fallback: {})", fresh.models.len(), fresh.fallback);
    Ok(())
}
