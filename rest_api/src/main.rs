// rest_api/src/main.rs

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rest_api::config::AppConfig;
use rest_api::start_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    start_server(config).await
}
