//! Browser-mimicking HTTP fetch with a bounded, jittered retry loop.
//!
//! The target storefronts block naive clients, so every attempt sends a
//! desktop-browser header set with a User-Agent drawn at random from a small
//! pool, and attempts are spaced by randomized delays. A 429 gets a
//! materially longer backoff than an ordinary retry; any other non-200
//! status just moves on to the next attempt.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, StatusCode};

use pricewatch_core::AppConfig;

use crate::error::ScrapeError;

/// Desktop browser User-Agent pool; one entry is chosen per attempt.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

/// Inclusive millisecond range for a randomized sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Uniformly random duration within the range. An inverted range is
    /// treated as if its bounds were swapped.
    fn sample(self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

/// Attempt budget and delay ranges for one fetch call.
///
/// The defaults are the live scraping profile. Tests (and interactive
/// callers that must not sleep) use [`FetchPolicy::immediate`].
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Jitter slept before every attempt, including the first.
    pub request_delay: DelayRange,
    /// Extended backoff after a 429; the server asked us to slow down.
    pub rate_limit_delay: DelayRange,
    /// Backoff after a transport error on a non-final attempt.
    pub retry_delay: DelayRange,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            request_delay: DelayRange::new(2_000, 5_000),
            rate_limit_delay: DelayRange::new(10_000, 20_000),
            retry_delay: DelayRange::new(5_000, 10_000),
        }
    }
}

impl FetchPolicy {
    /// Policy with every delay zeroed and the given attempt budget.
    #[must_use]
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            request_delay: DelayRange::new(0, 0),
            rate_limit_delay: DelayRange::new(0, 0),
            retry_delay: DelayRange::new(0, 0),
        }
    }

    /// Policy from the configured knobs.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            attempts: config.fetch_attempts,
            request_delay: DelayRange::new(config.request_delay_min_ms, config.request_delay_max_ms),
            rate_limit_delay: DelayRange::new(
                config.rate_limit_delay_min_ms,
                config.rate_limit_delay_max_ms,
            ),
            retry_delay: DelayRange::new(config.retry_delay_min_ms, config.retry_delay_max_ms),
        }
    }
}

/// Terminal result of one fetch call.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A 200 response and its decoded body.
    Page { html: String, status: u16 },
    /// Every attempt was consumed without a 200.
    Unavailable {
        attempts: u32,
        last_status: Option<u16>,
    },
}

/// What a single attempt produced, before the retry loop decides what to do.
enum AttemptOutcome {
    Page { html: String },
    RateLimited,
    BadStatus(u16),
    Failed(reqwest::Error),
}

/// HTTP fetcher for retailer product pages.
///
/// Owns the pooled `reqwest::Client`, built once with the configured timeout
/// and reused across calls; concurrent fetches share its connection pool.
pub struct PageClient {
    client: Client,
    policy: FetchPolicy,
    user_agents: Vec<String>,
}

impl PageClient {
    /// Creates a `PageClient` with the given total request timeout and policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, policy: FetchPolicy) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            policy,
            user_agents: USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect(),
        })
    }

    /// Replaces the User-Agent pool. A single-entry pool makes the per-attempt
    /// selection deterministic, which is how tests pin the header. An empty
    /// pool is ignored and the builtin pool is kept.
    #[must_use]
    pub fn with_user_agents(mut self, agents: Vec<String>) -> Self {
        if !agents.is_empty() {
            self.user_agents = agents;
        }
        self
    }

    /// Fetches `url`, retrying per the policy.
    ///
    /// Returns [`FetchOutcome::Page`] on the first 200 and
    /// [`FetchOutcome::Unavailable`] once the attempt budget is spent without
    /// one. Non-200 statuses are never errors here.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] only for a transport failure (connect,
    /// timeout, TLS, body decode) on the final attempt; earlier transport
    /// failures are retried.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchOutcome, ScrapeError> {
        let attempts = self.policy.attempts;
        let mut last_status = None;

        for attempt in 1..=attempts {
            // Jitter before every attempt, including the first.
            tokio::time::sleep(self.policy.request_delay.sample()).await;

            match self.attempt(url).await {
                AttemptOutcome::Page { html } => {
                    tracing::debug!(url, attempt, "fetched page");
                    return Ok(FetchOutcome::Page { html, status: 200 });
                }
                AttemptOutcome::RateLimited => {
                    last_status = Some(StatusCode::TOO_MANY_REQUESTS.as_u16());
                    let delay = self.policy.rate_limit_delay.sample();
                    tracing::warn!(
                        url,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis(),
                        "rate limited; backing off before next attempt"
                    );
                    tokio::time::sleep(delay).await;
                }
                AttemptOutcome::BadStatus(status) => {
                    // No extra wait here; the next attempt sleeps its own jitter.
                    last_status = Some(status);
                    tracing::warn!(url, attempt, attempts, status, "unexpected status");
                }
                AttemptOutcome::Failed(err) => {
                    if attempt == attempts {
                        return Err(ScrapeError::Http(err));
                    }
                    let delay = self.policy.retry_delay.sample();
                    tracing::warn!(
                        url,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "transport failure; retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::warn!(url, attempts, last_status, "no 200 within attempt budget");
        Ok(FetchOutcome::Unavailable {
            attempts,
            last_status,
        })
    }

    /// One GET with the full browser header set and a freshly picked
    /// User-Agent.
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, self.pick_user_agent())
            .headers(browser_headers());

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return AttemptOutcome::Failed(err),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return AttemptOutcome::RateLimited;
        }
        if status != StatusCode::OK {
            return AttemptOutcome::BadStatus(status.as_u16());
        }

        match response.text().await {
            Ok(html) => AttemptOutcome::Page { html },
            Err(err) => AttemptOutcome::Failed(err),
        }
    }

    fn pick_user_agent(&self) -> &str {
        let idx = rand::rng().random_range(0..self.user_agents.len());
        &self.user_agents[idx]
    }
}

/// The fixed header set sent with every attempt, User-Agent aside.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_range_samples_within_bounds() {
        let range = DelayRange::new(5, 10);
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
        }
    }

    #[test]
    fn delay_range_handles_inverted_bounds() {
        let range = DelayRange::new(10, 5);
        let d = range.sample();
        assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
    }

    #[test]
    fn default_policy_matches_scraping_profile() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.request_delay, DelayRange::new(2_000, 5_000));
        assert_eq!(policy.rate_limit_delay, DelayRange::new(10_000, 20_000));
        assert_eq!(policy.retry_delay, DelayRange::new(5_000, 10_000));
    }

    #[test]
    fn immediate_policy_zeroes_every_delay() {
        let policy = FetchPolicy::immediate(2);
        assert_eq!(policy.attempts, 2);
        assert_eq!(policy.request_delay, DelayRange::new(0, 0));
        assert_eq!(policy.rate_limit_delay, DelayRange::new(0, 0));
        assert_eq!(policy.retry_delay, DelayRange::new(0, 0));
    }

    #[test]
    fn builtin_user_agent_pool_has_at_least_three_entries() {
        assert!(USER_AGENTS.len() >= 3);
        let client = PageClient::new(5, FetchPolicy::immediate(1)).unwrap();
        assert_eq!(client.user_agents.len(), USER_AGENTS.len());
    }

    #[test]
    fn single_entry_pool_pins_the_user_agent() {
        let client = PageClient::new(5, FetchPolicy::immediate(1))
            .unwrap()
            .with_user_agents(vec!["test-agent/1.0".to_string()]);
        for _ in 0..10 {
            assert_eq!(client.pick_user_agent(), "test-agent/1.0");
        }
    }

    #[test]
    fn empty_pool_keeps_builtin_agents() {
        let client = PageClient::new(5, FetchPolicy::immediate(1))
            .unwrap()
            .with_user_agents(Vec::new());
        assert_eq!(client.user_agents.len(), USER_AGENTS.len());
    }

    #[test]
    fn browser_headers_cover_the_anti_bot_set() {
        let headers = browser_headers();
        assert_eq!(
            headers.get(ACCEPT).unwrap(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        );
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-US,en;q=0.5");
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "gzip, deflate, br");
        assert_eq!(headers.get(CONNECTION).unwrap(), "keep-alive");
        assert_eq!(headers.get(UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=0");
    }
}
