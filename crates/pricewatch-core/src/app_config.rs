/// Runtime configuration, resolved from the environment with defaults for
/// every knob. See `config::load_app_config`.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub fetch_timeout_secs: u64,
    pub fetch_attempts: u32,
    pub request_delay_min_ms: u64,
    pub request_delay_max_ms: u64,
    pub rate_limit_delay_min_ms: u64,
    pub rate_limit_delay_max_ms: u64,
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,
    pub max_concurrent_refresh: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_attempts", &self.fetch_attempts)
            .field("request_delay_min_ms", &self.request_delay_min_ms)
            .field("request_delay_max_ms", &self.request_delay_max_ms)
            .field("rate_limit_delay_min_ms", &self.rate_limit_delay_min_ms)
            .field("rate_limit_delay_max_ms", &self.rate_limit_delay_max_ms)
            .field("retry_delay_min_ms", &self.retry_delay_min_ms)
            .field("retry_delay_max_ms", &self.retry_delay_max_ms)
            .field("max_concurrent_refresh", &self.max_concurrent_refresh)
            .finish()
    }
}
