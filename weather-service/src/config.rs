use std::env;

use crate::rate_limit::RateLimitPolicy;

/// Settings for the third-party weather API
#[derive(Debug, Clone)]
pub struct WeatherApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub weather_api: WeatherApiConfig,
    pub default_rate_limit: RateLimitPolicy,
    pub refresh_interval_secs: u64,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            weather_api: WeatherApiConfig {
                base_url: env::var("WEATHER_API_URL")
                    .unwrap_or_else(|_| "https://api.tomorrow.io/v4/weather".to_string()),
                api_key: env::var("WEATHER_API_KEY").unwrap_or_default(),
                timeout_secs: env::var("WEATHER_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                max_retries: env::var("WEATHER_API_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            },
            default_rate_limit: RateLimitPolicy {
                points: env::var("RATE_LIMIT_POINTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0), // disabled; an external cron drives the job
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        }
    }
}
