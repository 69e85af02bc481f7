use serde::{Deserialize, Serialize};

/// Storefronts whose product pages the extractor understands.
///
/// `Unknown` is a normal value, not an error: it marks a URL that matched
/// none of the recognized domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    Flipkart,
    Amazon,
    Croma,
    Unknown,
}

/// Domain fragments checked against the raw URL string, in priority order.
/// Adding a retailer means adding a row here plus its selector cascade.
const DOMAIN_FRAGMENTS: &[(&str, Retailer)] = &[
    ("flipkart.com", Retailer::Flipkart),
    ("amazon.in", Retailer::Amazon),
    ("amazon.com", Retailer::Amazon),
    ("croma.com", Retailer::Croma),
];

impl Retailer {
    /// Classify a product URL by case-sensitive substring match against the
    /// known domain fragments. Pure; never fails.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        for &(fragment, retailer) in DOMAIN_FRAGMENTS {
            if url.contains(fragment) {
                return retailer;
            }
        }
        Retailer::Unknown
    }

    /// Stable lowercase tag used for persistence and display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Retailer::Flipkart => "flipkart",
            Retailer::Amazon => "amazon",
            Retailer::Croma => "croma",
            Retailer::Unknown => "unknown",
        }
    }

    /// Parse a stored tag back into a variant.
    ///
    /// Unrecognized tags map to `Unknown`, mirroring [`Retailer::from_url`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "flipkart" => Retailer::Flipkart,
            "amazon" => Retailer::Amazon,
            "croma" => Retailer::Croma,
            _ => Retailer::Unknown,
        }
    }

    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Retailer::Unknown)
    }
}

impl std::fmt::Display for Retailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
