pub mod core;
pub mod extractors;
pub mod provider;

pub use crate::core::rate::{ExtractError, ExtractedToken, RateExtractor};
pub use crate::provider::RateProvider;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Gold rate tracker starting...");

    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let extractor = Arc::new(extractors::GoodReturnsExtractor::new(
        &config.source.url,
        config.fetch_timeout(),
        &config.source.user_agent,
    ));
    let provider = RateProvider::new(extractor, config.cache_ttl());

    match provider.get_rate().await {
        Some(rate) => println!("24K gold rate: ₹{rate}/gram"),
        None => println!("No gold rate available right now, try again later."),
    }
    Ok(())
}
