use serde::Deserialize;

/// Errors found while validating a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("GEOCODER_API_KEY is not set")]
    MissingApiKey,
    #[error("GEOCODER_API_URL is empty")]
    EmptyApiUrl,
    #[error("GEOCODER_REQUEST_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Cache
    pub db_path: String,

    // Geocoding API
    pub api_key: Option<String>,
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub delay_ms: u64,

    // Row files
    pub input_path: String,
    pub output_path: String,
    pub failed_path: String,

    // Batch behaviour
    pub max_consecutive_failures: u32,
    pub skip_prefilled: bool,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "geocoding_cache.db".to_string(),
            api_key: None,
            api_url: crate::adapters::outbound::DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
            delay_ms: 20,
            input_path: "rows.json".to_string(),
            output_path: "geocoded_rows.json".to_string(),
            failed_path: "failed_rows.json".to_string(),
            max_consecutive_failures: 0,
            skip_prefilled: false,
            debug: false,
        }
    }
}

impl Config {
    /// Check the settings a real run cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.api_key {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

pub fn load_config() -> anyhow::Result<Config> {
    let defaults = Config::default();

    let db_path = std::env::var("GEOCODER_DB_PATH").unwrap_or(defaults.db_path);

    let api_key = std::env::var("GEOCODER_API_KEY").ok();

    let api_url = std::env::var("GEOCODER_API_URL").unwrap_or(defaults.api_url);

    let request_timeout_secs = std::env::var("GEOCODER_REQUEST_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(defaults.request_timeout_secs);

    let delay_ms = std::env::var("GEOCODER_DELAY_MS")
        .unwrap_or_else(|_| "20".to_string())
        .parse()
        .unwrap_or(defaults.delay_ms);

    let input_path = std::env::var("GEOCODER_INPUT_PATH").unwrap_or(defaults.input_path);
    let output_path = std::env::var("GEOCODER_OUTPUT_PATH").unwrap_or(defaults.output_path);
    let failed_path = std::env::var("GEOCODER_FAILED_PATH").unwrap_or(defaults.failed_path);

    let max_consecutive_failures = std::env::var("GEOCODER_MAX_CONSECUTIVE_FAILURES")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .unwrap_or(defaults.max_consecutive_failures);

    let skip_prefilled = env_flag("GEOCODER_SKIP_PREFILLED");

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Config {
        db_path,
        api_key,
        api_url,
        request_timeout_secs,
        delay_ms,
        input_path,
        output_path,
        failed_path,
        max_consecutive_failures,
        skip_prefilled,
        debug,
    })
}
