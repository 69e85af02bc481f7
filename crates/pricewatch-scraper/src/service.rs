//! End-to-end price checks: resolve the retailer, fetch the page, extract
//! the price, stamp a quote.
//!
//! This is the boundary where failures become data. Whatever happens
//! underneath (unsupported domain, rate limiting, transport failure,
//! template drift), the caller receives a well-formed [`PriceQuote`] with an
//! absent price, never an error. The causes are indistinguishable on
//! purpose: to the user the price is simply unknown right now.

use pricewatch_core::{PriceQuote, Retailer};

use crate::extract::PriceRules;
use crate::fetch::{FetchOutcome, PageClient};

pub struct PriceService {
    client: PageClient,
    rules: PriceRules,
}

impl PriceService {
    #[must_use]
    pub fn new(client: PageClient) -> Self {
        Self {
            client,
            rules: PriceRules::new(),
        }
    }

    /// Service with custom extraction rules (e.g. other currency markers).
    #[must_use]
    pub fn with_rules(client: PageClient, rules: PriceRules) -> Self {
        Self { client, rules }
    }

    /// Current price for a product URL.
    ///
    /// Unsupported domains short-circuit before any network traffic. Fetch
    /// and extraction failures are logged here and surface as an absent
    /// price.
    pub async fn current_price(&self, url: &str) -> PriceQuote {
        let retailer = Retailer::from_url(url);
        if !retailer.is_supported() {
            tracing::debug!(url, "unsupported domain; skipping fetch");
            return PriceQuote::unavailable(retailer);
        }

        let html = match self.client.fetch_page(url).await {
            Ok(FetchOutcome::Page { html, .. }) => html,
            Ok(FetchOutcome::Unavailable {
                attempts,
                last_status,
            }) => {
                tracing::warn!(url, %retailer, attempts, last_status, "page unavailable");
                return PriceQuote::unavailable(retailer);
            }
            Err(err) => {
                tracing::error!(url, %retailer, error = %err, "fetch failed");
                return PriceQuote::unavailable(retailer);
            }
        };

        if html.trim().is_empty() {
            tracing::warn!(url, %retailer, "empty page body");
            return PriceQuote::unavailable(retailer);
        }

        let price = self.rules.extract_price(&html, retailer);
        match price {
            Some(price) => tracing::info!(url, %retailer, %price, "extracted price"),
            None => tracing::warn!(url, %retailer, "no selector produced a price"),
        }
        PriceQuote::new(retailer, price)
    }
}
