//! Per-retailer price extraction from product-page HTML.
//!
//! Each retailer has an ordered selector cascade; the first selector whose
//! first match yields parseable price text wins. The cascades tolerate
//! template drift: storefront markup varies by page template and A/B test,
//! so superseded selectors stay on as fallbacks.

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

use pricewatch_core::Retailer;

/// Currency markers recognized by the default price pattern.
pub const DEFAULT_CURRENCY_MARKERS: &[&str] = &["₹", "Rs.", "Rs", "INR", "$"];

const FLIPKART_SELECTORS: &[&str] = &[
    "._16Jk6d",
    "._30jeq3 ._16Jk6d",
    ".CEmiEU ._16Jk6d",
    "._1_WHN1",
];

const AMAZON_SELECTORS: &[&str] = &[
    ".a-price-whole",
    "#priceblock_dealprice",
    "#price_inside_buybox",
    ".a-offscreen",
    ".a-price .a-offscreen",
];

const CROMA_SELECTORS: &[&str] = &[".price-final", ".cp-price", ".product-price-value", ".price"];

/// Compiled extraction rules: one selector cascade per retailer plus the
/// currency-aware numeric pattern. Built once at startup, read-only after.
pub struct PriceRules {
    flipkart: Vec<Selector>,
    amazon: Vec<Selector>,
    croma: Vec<Selector>,
    pattern: Regex,
}

impl PriceRules {
    /// Rules with the default currency markers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_currency_markers(DEFAULT_CURRENCY_MARKERS)
    }

    /// Rules recognizing the given currency markers in price text.
    ///
    /// Markers are escaped literally into the compiled pattern, so symbols
    /// (`₹`, `$`) and abbreviations (`Rs.`, `INR`) both work.
    #[must_use]
    pub fn with_currency_markers(markers: &[&str]) -> Self {
        Self {
            flipkart: compile_cascade(FLIPKART_SELECTORS),
            amazon: compile_cascade(AMAZON_SELECTORS),
            croma: compile_cascade(CROMA_SELECTORS),
            pattern: price_pattern(markers),
        }
    }

    /// The retailer's cascade in priority order. `Unknown` has no cascade;
    /// the service never sends it here, but the mapping stays total.
    fn cascade(&self, retailer: Retailer) -> &[Selector] {
        match retailer {
            Retailer::Flipkart => &self.flipkart,
            Retailer::Amazon => &self.amazon,
            Retailer::Croma => &self.croma,
            Retailer::Unknown => &[],
        }
    }

    /// Walks the retailer's cascade over `html` and returns the first price
    /// that parses. Absent is a normal outcome, not an error; blocked pages
    /// and drifted templates both land there.
    ///
    /// Only the first element matched by each selector is considered. If its
    /// text holds no parseable price, the walk moves to the next selector.
    #[must_use]
    pub fn extract_price(&self, html: &str, retailer: Retailer) -> Option<Decimal> {
        let document = Html::parse_document(html);
        for selector in self.cascade(retailer) {
            let Some(element) = document.select(selector).next() else {
                continue;
            };
            let text = element.text().collect::<String>();
            if let Some(price) = self.parse_price_text(text.trim()) {
                return Some(price);
            }
        }
        None
    }

    /// Parses one displayed price fragment: an optional currency marker, then
    /// digits with optional thousands separators and an optional fraction.
    /// Separators are stripped before decimal parsing and the result is
    /// normalized to at most two fractional digits.
    #[must_use]
    pub fn parse_price_text(&self, text: &str) -> Option<Decimal> {
        let captures = self.pattern.captures(text)?;
        let raw = captures.name("amount")?.as_str().replace(',', "");
        let price = raw.parse::<Decimal>().ok()?;
        Some(price.round_dp(2))
    }
}

impl Default for PriceRules {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_cascade(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).expect("static selector must parse"))
        .collect()
}

/// Compiles the price pattern for the given currency markers. The marker is
/// optional in the input; the amount group is what gets parsed.
fn price_pattern(markers: &[&str]) -> Regex {
    let alternatives = markers
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?:{alternatives})?\s*(?P<amount>\d[\d,]*(?:\.\d+)?)"
    ))
    .expect("static price pattern must parse")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn rules() -> PriceRules {
        PriceRules::new()
    }

    // -----------------------------------------------------------------------
    // Cascade walking
    // -----------------------------------------------------------------------

    #[test]
    fn flipkart_primary_selector_matches() {
        let html = r#"<html><body><div class="_16Jk6d">₹999</div></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Flipkart),
            Some(dec("999"))
        );
    }

    #[test]
    fn flipkart_falls_back_to_older_template_selector() {
        let html = r#"<html><body><div class="_1_WHN1">₹2,999</div></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Flipkart),
            Some(dec("2999"))
        );
    }

    #[test]
    fn selector_order_beats_document_order() {
        // The later-cascade selector appears first in the document; the
        // earlier-cascade selector must still win.
        let html = r#"<html><body>
            <div class="_1_WHN1">₹888</div>
            <div class="_16Jk6d">₹999</div>
        </body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Flipkart),
            Some(dec("999"))
        );
    }

    #[test]
    fn unparseable_match_falls_through_to_next_selector() {
        let html = r#"<html><body>
            <div class="_16Jk6d">Out of stock</div>
            <div class="_1_WHN1">₹777</div>
        </body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Flipkart),
            Some(dec("777"))
        );
    }

    #[test]
    fn amazon_price_whole_matches() {
        let html = r#"<html><body><span class="a-price-whole">1,234</span></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Amazon),
            Some(dec("1234"))
        );
    }

    #[test]
    fn amazon_deal_price_id_selector_matches() {
        let html = r#"<html><body><span id="priceblock_dealprice">₹1,499</span></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Amazon),
            Some(dec("1499"))
        );
    }

    #[test]
    fn amazon_offscreen_dollar_price_matches() {
        let html = r#"<html><body><span class="a-offscreen">$13.98</span></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Amazon),
            Some(dec("13.98"))
        );
    }

    #[test]
    fn croma_final_price_matches() {
        let html = r#"<html><body><span class="price-final">₹25,999.00</span></body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Croma),
            Some(dec("25999.00"))
        );
    }

    #[test]
    fn no_matching_selector_returns_none() {
        let html = r#"<html><body><div class="price-final">₹999</div></body></html>"#;
        assert_eq!(rules().extract_price(html, Retailer::Flipkart), None);
    }

    #[test]
    fn unknown_retailer_has_empty_cascade() {
        let html = r#"<html><body><div class="_16Jk6d">₹999</div></body></html>"#;
        assert_eq!(rules().extract_price(html, Retailer::Unknown), None);
    }

    #[test]
    fn empty_document_returns_none() {
        assert_eq!(rules().extract_price("", Retailer::Croma), None);
    }

    #[test]
    fn nested_markup_inside_price_element_is_flattened() {
        let html = r#"<html><body>
            <div class="_16Jk6d"><span>₹</span><span>4,499</span></div>
        </body></html>"#;
        assert_eq!(
            rules().extract_price(html, Retailer::Flipkart),
            Some(dec("4499"))
        );
    }

    // -----------------------------------------------------------------------
    // Price text normalization
    // -----------------------------------------------------------------------

    #[test]
    fn normalizes_lakh_style_separators() {
        assert_eq!(rules().parse_price_text("₹1,23,456"), Some(dec("123456")));
    }

    #[test]
    fn keeps_two_fractional_digits() {
        assert_eq!(rules().parse_price_text("1234.50"), Some(dec("1234.50")));
    }

    #[test]
    fn rounds_excess_fractional_digits() {
        assert_eq!(rules().parse_price_text("₹123.456"), Some(dec("123.46")));
    }

    #[test]
    fn skips_leading_label_text() {
        assert_eq!(rules().parse_price_text("MRP: ₹2,999"), Some(dec("2999")));
    }

    #[test]
    fn accepts_rs_abbreviation_marker() {
        assert_eq!(rules().parse_price_text("Rs. 1,499"), Some(dec("1499")));
    }

    #[test]
    fn returns_none_without_digits() {
        assert_eq!(rules().parse_price_text("Price on request"), None);
        assert_eq!(rules().parse_price_text(""), None);
    }

    #[test]
    fn custom_markers_are_escaped_into_the_pattern() {
        let rules = PriceRules::with_currency_markers(&["C$", "€"]);
        assert_eq!(rules.parse_price_text("C$ 19.99"), Some(dec("19.99")));
        assert_eq!(rules.parse_price_text("€449.95"), Some(dec("449.95")));
    }
}
