//! bitdash - Bitget market dashboard entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Bitget market dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BITDASH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Instrument selected at startup (overrides config)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Dashboard port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection.
    bitdash_ws::init_crypto();

    let args = Args::parse();

    bitdash_telemetry::init_logging()?;

    info!("Starting bitdash v{}", env!("CARGO_PKG_VERSION"));

    let config = bitdash_app::AppConfig::load(args.config)?.with_overrides(args.symbol, args.port);
    info!(
        symbol = %config.market.default_symbol,
        rest_url = %config.market.rest_url,
        port = config.dashboard.port,
        "Configuration loaded"
    );

    let app = bitdash_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
