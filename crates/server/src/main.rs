//! ShotSpot Server - HTTP REST API for aesthetic photo scoring
//!
//! This binary loads the CLIP model, encodes the prompt bank and serves the
//! scoring API with authentication and rate limiting.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env during development
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;
    server::start_server(config).await?;

    Ok(())
}
