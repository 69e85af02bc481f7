use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Retailer;

/// Outcome of one price check: the retailer the URL resolved to, the price
/// found on the page (if any), and when the check happened.
///
/// An absent price is a normal outcome. Rate limiting, transport failures,
/// unsupported domains, and template drift all surface here identically as
/// `price: None`; callers never see the distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub retailer: Retailer,
    pub price: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Quote stamped with the current time.
    #[must_use]
    pub fn new(retailer: Retailer, price: Option<Decimal>) -> Self {
        Self {
            retailer,
            price,
            fetched_at: Utc::now(),
        }
    }

    /// Absent-price quote; every failure path ends here.
    #[must_use]
    pub fn unavailable(retailer: Retailer) -> Self {
        Self::new(retailer, None)
    }

    #[must_use]
    pub const fn has_price(&self) -> bool {
        self.price.is_some()
    }
}
