use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse or a delay range is inverted.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse or a delay range is inverted.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let delay_range = |min_var: &str,
                       min_default: &str,
                       max_var: &str,
                       max_default: &str|
     -> Result<(u64, u64), ConfigError> {
        let min = parse_u64(min_var, min_default)?;
        let max = parse_u64(max_var, max_default)?;
        if min > max {
            return Err(ConfigError::InvalidEnvVar {
                var: min_var.to_string(),
                reason: format!("delay range is inverted ({min}ms > {max}ms)"),
            });
        }
        Ok((min, max))
    };

    let database_url = or_default("DATABASE_URL", "sqlite://pricewatch.db?mode=rwc");
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");

    let fetch_timeout_secs = parse_u64("PRICEWATCH_FETCH_TIMEOUT_SECS", "30")?;
    let fetch_attempts = parse_u32("PRICEWATCH_FETCH_ATTEMPTS", "3")?;
    if fetch_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_FETCH_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let (request_delay_min_ms, request_delay_max_ms) = delay_range(
        "PRICEWATCH_REQUEST_DELAY_MIN_MS",
        "2000",
        "PRICEWATCH_REQUEST_DELAY_MAX_MS",
        "5000",
    )?;
    let (rate_limit_delay_min_ms, rate_limit_delay_max_ms) = delay_range(
        "PRICEWATCH_RATE_LIMIT_DELAY_MIN_MS",
        "10000",
        "PRICEWATCH_RATE_LIMIT_DELAY_MAX_MS",
        "20000",
    )?;
    let (retry_delay_min_ms, retry_delay_max_ms) = delay_range(
        "PRICEWATCH_RETRY_DELAY_MIN_MS",
        "5000",
        "PRICEWATCH_RETRY_DELAY_MAX_MS",
        "10000",
    )?;

    let max_concurrent_refresh = parse_usize("PRICEWATCH_MAX_CONCURRENT_REFRESH", "1")?;

    Ok(AppConfig {
        database_url,
        log_level,
        fetch_timeout_secs,
        fetch_attempts,
        request_delay_min_ms,
        request_delay_max_ms,
        rate_limit_delay_min_ms,
        rate_limit_delay_max_ms,
        retry_delay_min_ms,
        retry_delay_max_ms,
        max_concurrent_refresh,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn build_app_config_succeeds_with_empty_env() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.database_url, "sqlite://pricewatch.db?mode=rwc");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.fetch_timeout_secs, 30);
        assert_eq!(cfg.fetch_attempts, 3);
        assert_eq!(cfg.request_delay_min_ms, 2000);
        assert_eq!(cfg.request_delay_max_ms, 5000);
        assert_eq!(cfg.rate_limit_delay_min_ms, 10_000);
        assert_eq!(cfg.rate_limit_delay_max_ms, 20_000);
        assert_eq!(cfg.retry_delay_min_ms, 5000);
        assert_eq!(cfg.retry_delay_max_ms, 10_000);
        assert_eq!(cfg.max_concurrent_refresh, 1);
    }

    #[test]
    fn database_url_override() {
        let mut map = HashMap::new();
        map.insert("DATABASE_URL", "sqlite::memory:");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.database_url, "sqlite::memory:");
    }

    #[test]
    fn fetch_attempts_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_FETCH_ATTEMPTS", "5");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.fetch_attempts, 5);
    }

    #[test]
    fn fetch_attempts_invalid() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_FETCH_ATTEMPTS", "not-a-number");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_FETCH_ATTEMPTS"),
            "expected InvalidEnvVar(PRICEWATCH_FETCH_ATTEMPTS), got: {result:?}"
        );
    }

    #[test]
    fn fetch_attempts_zero_is_rejected() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_FETCH_ATTEMPTS", "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_FETCH_ATTEMPTS"),
            "expected InvalidEnvVar(PRICEWATCH_FETCH_ATTEMPTS), got: {result:?}"
        );
    }

    #[test]
    fn request_delay_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_REQUEST_DELAY_MIN_MS", "0");
        map.insert("PRICEWATCH_REQUEST_DELAY_MAX_MS", "10");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.request_delay_min_ms, 0);
        assert_eq!(cfg.request_delay_max_ms, 10);
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_RATE_LIMIT_DELAY_MIN_MS", "30000");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_RATE_LIMIT_DELAY_MIN_MS"),
            "expected InvalidEnvVar(PRICEWATCH_RATE_LIMIT_DELAY_MIN_MS), got: {result:?}"
        );
    }

    #[test]
    fn max_concurrent_refresh_override() {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_MAX_CONCURRENT_REFRESH", "4");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.max_concurrent_refresh, 4);
    }
}
