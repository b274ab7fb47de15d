//! `aula serve` command - HTTP server for the browser front end

use anyhow::Result;
use aula_core::server::{self, AppState};
use aula_core::{Assistant, Config};
use std::sync::Arc;

pub async fn run(config: Config) -> Result<()> {
    let assistant = Assistant::from_config(&config).await;

    if !assistant.completion().is_configured() {
        println!("⚠️  PERPLEXITY_API_KEY is not set; questions will fail until it is.");
    }
    if !assistant.scholar().is_configured() {
        println!("⚠️  SERPAPI_KEY is not set; reference searches fall back to the completion API.");
    }
    println!("🚀 Aula listening on {}", config.server_url());

    let state = Arc::new(AppState::new(assistant, config));
    server::start_server(state).await?;
    Ok(())
}
