//! Command handlers for the CLI.
//!
//! These are called from `main` after config is loaded. Handlers that touch
//! the database open the pool themselves, so `price` stays a pure fetch with
//! no database file side effect. Per-product refresh failures are logged and
//! skipped rather than propagated, so a single bad row does not abort the run.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;

use pricewatch_core::{AppConfig, PriceQuote, Retailer};
use pricewatch_db::{
    list_tracked_products, prepare_pool, record_price_check, upsert_tracked_product, PoolConfig,
    TrackedProductRow,
};
use pricewatch_scraper::{FetchPolicy, PageClient, PriceService, ScrapeError};

/// Fetch and print the current price for a URL without tracking it.
///
/// An unreadable price or an unsupported URL is not an error here; both print
/// as absence and exit zero.
///
/// # Errors
///
/// Returns an error only if the HTTP client cannot be constructed.
pub(crate) async fn run_price(config: &AppConfig, url: &str, json: bool) -> anyhow::Result<()> {
    let service = build_service(config)?;
    let quote = service.current_price(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }
    match quote.price {
        Some(price) => println!("{}: {price}", quote.retailer),
        None if quote.retailer.is_supported() => {
            println!("{}: price unavailable", quote.retailer);
        }
        None => println!("no supported retailer matches '{url}'; known domains: {SUPPORTED_DOMAINS}"),
    }
    Ok(())
}

/// Start tracking a URL, checking its price once up front.
///
/// Re-tracking an already-tracked URL refreshes its stored price. A target
/// given here overwrites the stored one; omitting it keeps the old target.
///
/// # Errors
///
/// Returns an error if the URL matches no supported retailer, the target is
/// not a number, or the database cannot be opened or written.
pub(crate) async fn run_track(
    config: &AppConfig,
    url: &str,
    target: Option<&str>,
) -> anyhow::Result<()> {
    ensure_supported(url)?;
    let target = target
        .map(|raw| {
            raw.parse::<Decimal>()
                .map(|t| t.round_dp(2).to_string())
                .map_err(|_| anyhow::anyhow!("target price '{raw}' is not a number"))
        })
        .transpose()?;

    let service = build_service(config)?;
    let quote = service.current_price(url).await;

    let pool = prepare_pool(&config.database_url, PoolConfig::from_env()).await?;
    let id = upsert_tracked_product(&pool, url, &quote, target.as_deref()).await?;

    match quote.price {
        Some(price) => println!("tracking #{id} {url} at {price}"),
        None => println!("tracking #{id} {url}; price not readable right now"),
    }
    if let Some(target) = &target {
        println!("target price set to {target}");
    }
    Ok(())
}

/// Print every tracked product, one line per row.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or read.
pub(crate) async fn run_list(config: &AppConfig) -> anyhow::Result<()> {
    let pool = prepare_pool(&config.database_url, PoolConfig::from_env()).await?;
    let rows = list_tracked_products(&pool).await?;

    if rows.is_empty() {
        println!("no tracked products; add one with `pricewatch track <url>`");
        return Ok(());
    }
    println!("{} tracked product(s):", rows.len());
    for row in &rows {
        println!("{}", format_row(row));
    }
    Ok(())
}

/// Re-check the price of every tracked product and persist the results.
///
/// Fetches run concurrently up to the configured limit; writes stay on this
/// loop so SQLite sees one writer.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the product list
/// cannot be read. Per-row persistence failures are logged and skipped.
pub(crate) async fn run_refresh(config: &AppConfig) -> anyhow::Result<()> {
    let pool = prepare_pool(&config.database_url, PoolConfig::from_env()).await?;
    let rows = list_tracked_products(&pool).await?;

    if rows.is_empty() {
        println!("no tracked products to refresh");
        return Ok(());
    }

    let service = build_service(config)?;
    let total = rows.len();
    let max_concurrent = config.max_concurrent_refresh.max(1);

    let results: Vec<(TrackedProductRow, PriceQuote)> = stream::iter(rows)
        .map(|row| {
            let service = &service;
            async move {
                let quote = service.current_price(&row.url).await;
                (row, quote)
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let with_price = results.iter().filter(|(_, quote)| quote.has_price()).count();
    let mut refreshed: usize = 0;
    let mut failed_writes: usize = 0;

    for (row, quote) in &results {
        if let Err(e) = record_price_check(&pool, row.id, quote).await {
            tracing::warn!(url = %row.url, error = %e, "failed to persist price check");
            failed_writes += 1;
            continue;
        }
        refreshed += 1;
        match quote.price {
            Some(price) => {
                println!("{}: {price}", row.url);
                if let Some(target) = parse_price(row.target_price.as_deref()) {
                    if price <= target {
                        println!("  target reached ({price} <= {target})");
                    }
                }
            }
            None => println!("{}: price unavailable", row.url),
        }
    }

    if failed_writes > 0 {
        tracing::warn!(failed_writes, total, "some price checks could not be persisted");
    }
    println!("refreshed {refreshed} of {total} tracked product(s); {with_price} with a readable price");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SUPPORTED_DOMAINS: &str = "flipkart.com, amazon.in, amazon.com, croma.com";

fn build_service(config: &AppConfig) -> Result<PriceService, ScrapeError> {
    let policy = FetchPolicy::from_config(config);
    let client = PageClient::new(config.fetch_timeout_secs, policy)?;
    Ok(PriceService::new(client))
}

fn ensure_supported(url: &str) -> anyhow::Result<Retailer> {
    let retailer = Retailer::from_url(url);
    if retailer.is_supported() {
        Ok(retailer)
    } else {
        anyhow::bail!("no supported retailer matches '{url}'; known domains: {SUPPORTED_DOMAINS}")
    }
}

fn format_row(row: &TrackedProductRow) -> String {
    // Stored tags go back through the resolver vocabulary, so a tag this
    // build no longer recognizes renders as unknown instead of raw text.
    let platform = Retailer::from_tag(&row.platform);
    let price = row.current_price.as_deref().unwrap_or("-");
    let target = row.target_price.as_deref().unwrap_or("-");
    let checked = row.last_checked.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    let hit = if target_reached(row) {
        " (target reached)"
    } else {
        ""
    };
    format!(
        "#{} [{platform}] {} price={price} target={target} checked={checked}{hit}",
        row.id, row.url
    )
}

fn target_reached(row: &TrackedProductRow) -> bool {
    match (
        parse_price(row.current_price.as_deref()),
        parse_price(row.target_price.as_deref()),
    ) {
        (Some(current), Some(target)) => current <= target,
        _ => false,
    }
}

fn parse_price(text: Option<&str>) -> Option<Decimal> {
    text.and_then(|t| t.parse::<Decimal>().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
