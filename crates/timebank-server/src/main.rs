//! Timebank Server
//!
//! Standalone binary for the marketplace REST API.

use timebank_core::constants;
use timebank_core::MarketConfig;
use timebank_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let port = match std::env::var("PORT") {
        Ok(value) => value.parse()?,
        Err(_) => constants::server::DEFAULT_PORT,
    };

    start_server(ServerConfig {
        port,
        market: MarketConfig::load()?,
    })
    .await
}
