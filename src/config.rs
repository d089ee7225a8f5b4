use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::services::due_window::DEFAULT_DUE_WINDOW_DAYS;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub request_timeout_seconds: u64,
    pub ledger_api_base_url: Option<String>,
    pub ledger_service_token: Option<String>,
    pub upstream_timeout_seconds: u64,
    pub due_window_days: u32,
    pub daily_rate_divisor: i64,
    pub billing_timezone: Tz,
    pub currency_code: String,
    pub gateway_return_url: Option<String>,
    pub seen_set_path: Option<String>,
    pub due_poll_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Stay Billing API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            rate_limit_enabled: env_parse_bool_or("RATE_LIMIT_ENABLED", true),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            request_timeout_seconds: env_parse_or("REQUEST_TIMEOUT_SECONDS", 30),
            ledger_api_base_url: env_opt("LEDGER_API_BASE_URL").map(|url| normalize_base_url(&url)),
            ledger_service_token: env_opt("LEDGER_SERVICE_TOKEN"),
            upstream_timeout_seconds: env_parse_or("UPSTREAM_TIMEOUT_SECONDS", 15),
            due_window_days: env_parse_or("DUE_WINDOW_DAYS", DEFAULT_DUE_WINDOW_DAYS),
            daily_rate_divisor: env_parse_or("DAILY_RATE_DIVISOR", 30_i64).max(1),
            billing_timezone: parse_timezone(env_opt("BILLING_TIMEZONE").as_deref()),
            currency_code: env_or("CURRENCY_CODE", "PHP").to_ascii_uppercase(),
            gateway_return_url: env_opt("GATEWAY_RETURN_URL"),
            seen_set_path: env_opt("SEEN_SET_PATH"),
            due_poll_interval_seconds: env_parse_or("DUE_POLL_INTERVAL_SECONDS", 900_u64).max(60),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    /// Background polling needs both a ledger and a credential to act with.
    pub fn due_poller_enabled(&self) -> bool {
        self.ledger_api_base_url.is_some() && self.ledger_service_token.is_some()
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_timezone(raw: Option<&str>) -> Tz {
    match raw {
        Some(name) => Tz::from_str(name).unwrap_or_else(|_| {
            tracing::warn!(timezone = name, "Unknown BILLING_TIMEZONE, falling back to UTC");
            Tz::UTC
        }),
        None => Tz::UTC,
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            app_name: "Stay Billing API".to_string(),
            environment: "test".to_string(),
            api_prefix: "/v1".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            rate_limit_enabled: false,
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
            request_timeout_seconds: 30,
            ledger_api_base_url: None,
            ledger_service_token: None,
            upstream_timeout_seconds: 15,
            due_window_days: 5,
            daily_rate_divisor: 30,
            billing_timezone: Tz::UTC,
            currency_code: "PHP".to_string(),
            gateway_return_url: None,
            seen_set_path: None,
            due_poll_interval_seconds: 900,
        }
    }
}
