//! Database operations for the `tracked_products` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use pricewatch_core::PriceQuote;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `tracked_products` table.
///
/// Price columns hold decimal strings because SQLite has no exact numeric
/// type; parse with `rust_decimal` when arithmetic is needed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedProductRow {
    pub id: i64,
    pub url: String,
    /// Retailer tag, e.g. `"flipkart"`; unsupported URLs are rejected before
    /// they reach this table.
    pub platform: String,
    /// `NULL` when the most recent check could not read a price.
    pub current_price: Option<String>,
    /// Optional alert threshold supplied when tracking.
    pub target_price: Option<String>,
    /// Nullable in the schema; always populated through the track path, which
    /// stamps the quote's fetch time.
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// tracked_products operations
// ---------------------------------------------------------------------------

/// Upserts a tracked product from a fresh quote.
///
/// Conflicts on `url` update `platform`, `current_price`, and `last_checked`
/// in place. An existing `target_price` survives re-tracking unless a new one
/// is supplied.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_tracked_product(
    pool: &SqlitePool,
    url: &str,
    quote: &PriceQuote,
    target_price: Option<&str>,
) -> Result<i64, DbError> {
    let current_price = quote.price.map(|price| price.to_string());

    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO tracked_products \
             (url, platform, current_price, target_price, last_checked, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (url) DO UPDATE SET \
             platform      = EXCLUDED.platform, \
             current_price = EXCLUDED.current_price, \
             target_price  = COALESCE(EXCLUDED.target_price, tracked_products.target_price), \
             last_checked  = EXCLUDED.last_checked \
         RETURNING id",
    )
    .bind(url)
    .bind(quote.retailer.as_str())
    .bind(current_price)
    .bind(target_price)
    .bind(quote.fetched_at)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Records the outcome of a price check for an already-tracked row.
///
/// Writes the quote's price (or `NULL` when the price was unavailable) and
/// advances `last_checked` to the quote's fetch time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_price_check(
    pool: &SqlitePool,
    id: i64,
    quote: &PriceQuote,
) -> Result<(), DbError> {
    let current_price = quote.price.map(|price| price.to_string());

    sqlx::query(
        "UPDATE tracked_products \
         SET current_price = ?1, last_checked = ?2 \
         WHERE id = ?3",
    )
    .bind(current_price)
    .bind(quote.fetched_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// All tracked products in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_products(pool: &SqlitePool) -> Result<Vec<TrackedProductRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedProductRow>(
        "SELECT id, url, platform, current_price, target_price, last_checked, created_at \
         FROM tracked_products \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Looks up a tracked product by its exact URL.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_tracked_product(
    pool: &SqlitePool,
    url: &str,
) -> Result<Option<TrackedProductRow>, DbError> {
    let row = sqlx::query_as::<_, TrackedProductRow>(
        "SELECT id, url, platform, current_price, target_price, last_checked, created_at \
         FROM tracked_products \
         WHERE url = ?1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
