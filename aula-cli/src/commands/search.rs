//! `aula search` command - Google Scholar lookup

use anyhow::{bail, Result};
use aula_core::{Config, Reply, ScholarClient};
use tracing::info;

pub async fn run(config: Config, topic: String, max: Option<u32>) -> Result<()> {
    let client = ScholarClient::new(config.scholar.clone());
    if !client.is_configured() {
        bail!("SerpApi key is not configured. Set SERPAPI_KEY or scholar.api_key in the config file.");
    }

    let max = max.unwrap_or(config.scholar.max_results).max(1);
    info!("Searching Google Scholar for '{}'", topic);

    match client.recommend_max(&topic, max).await {
        Reply::Answer(markdown) => {
            println!("{}", markdown);
            Ok(())
        }
        Reply::Failure(message) => bail!("{}", message),
    }
}
