pub mod error;
pub mod extract;
pub mod fetch;
pub mod service;

pub use error::ScrapeError;
pub use extract::{PriceRules, DEFAULT_CURRENCY_MARKERS};
pub use fetch::{DelayRange, FetchOutcome, FetchPolicy, PageClient};
pub use service::PriceService;
