//! `timebank serve`: run the REST API in the foreground

use anyhow::Result;

use timebank_core::MarketConfig;

/// Run the serve command.
pub async fn run(port: u16, market: MarketConfig) -> Result<()> {
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    print_banner(port, &market);

    let config = timebank_server::ServerConfig { port, market };
    let server = timebank_server::start_server(config);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal => {
            println!("\n  Shutting down...");
        }
    }

    Ok(())
}

fn print_banner(port: u16, market: &MarketConfig) {
    println!();
    println!("  \x1b[1;36mTimebank\x1b[0m server starting");
    println!("  ─────────────────────────────────────");
    println!("  Local:      http://localhost:{}", port);
    println!("  Database:   {}", market.database_path().display());
    println!(
        "  Policy:     {} rate, settle {}",
        market.rate_policy, market.settlement
    );
    println!();
}
