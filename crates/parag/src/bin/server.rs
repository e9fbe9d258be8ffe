//! PARAG server binary
//!
//! Run with: cargo run -p parag --bin parag-server

use parag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("PARAG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("parag.toml"));
    let config = RagConfig::load(Some(config_path.as_path()))?;

    tracing::info!("Configuration loaded from {}", config_path.display());
    tracing::info!("  - Embedding model: {} ({:?})", config.embeddings.model, config.embeddings.backend);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {} ({:?})", config.llm.active_model(), config.llm.backend);
    tracing::info!("  - Collection store: {:?}", config.store.backend);
    tracing::info!("  - Default collection: {}", config.collections.default_name);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /upload/            - Upload a PDF");
    println!("  GET    /rag/?query=        - Ask a question");
    println!("  POST   /api/query          - Ask with a custom prompt template");
    println!("  GET    /search/?query=     - Raw chunk search");
    println!("  GET    /dialogue/          - Past answers");
    println!("  GET    /database/files/    - Uploaded files");
    println!("  DELETE /database/clear/    - Drop a collection");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
