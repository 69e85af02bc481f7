mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(about = "Price checker and tracker for Flipkart, Amazon, and Croma product pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the current price for a product URL without tracking it
    Price {
        /// Product page URL
        url: String,

        /// Emit the quote as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Start tracking a product URL, checking its price right away
    Track {
        /// Product page URL
        url: String,

        /// Target price; listed alongside the product and flagged when reached
        #[arg(long)]
        target: Option<String>,
    },
    /// List all tracked products
    List,
    /// Re-check the price of every tracked product
    Refresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Price { url, json } => commands::run_price(&config, &url, json).await,
        Commands::Track { url, target } => {
            commands::run_track(&config, &url, target.as_deref()).await
        }
        Commands::List => commands::run_list(&config).await,
        Commands::Refresh => commands::run_refresh(&config).await,
    }
}
