//! Engine configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the engine
//! is built.
//!
//! ## Rate limiting
//!
//! Pick a preset and optionally override its numbers:
//!
//! ```bash
//! export RATE_LIMIT_PRESET="per_caller"   # development | production | per_caller
//! export RATE_LIMIT_WINDOW_MS="60000"
//! export RATE_LIMIT_MAX_REQUESTS="30"
//! ```
//!
//! ## Optional Variables
//!
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `RATE_LIMIT_SWEEP_SECS` - Idle-key sweep interval (default: 300)
//! - `ANALYTICS_CAPACITY` - Analytics log size (default: 10000, min: 100)
//! - `PAYMENT_TIMEOUT_MS` - Gateway call timeout (default: 10000)
//! - `PAYMENT_CURRENCY` - ISO 4217 code sent to the gateway (default: `USD`)

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::application::services::DispatchSettings;
use crate::infrastructure::rate_limit::{RateLimitConfig, RateLimitPreset};

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: String,
    pub rate_limit_preset: RateLimitPreset,
    /// Overrides the preset window when set (`RATE_LIMIT_WINDOW_MS`).
    pub rate_limit_window_ms: Option<u64>,
    /// Overrides the preset quota when set (`RATE_LIMIT_MAX_REQUESTS`).
    pub rate_limit_max_requests: Option<u32>,
    pub rate_limit_sweep_secs: u64,
    pub analytics_capacity: usize,
    pub payment_timeout_ms: u64,
    pub payment_currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            rate_limit_preset: RateLimitPreset::Development,
            rate_limit_window_ms: None,
            rate_limit_max_requests: None,
            rate_limit_sweep_secs: 300,
            analytics_capacity: 10_000,
            payment_timeout_ms: 10_000,
            payment_currency: "USD".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let log_format = env::var("LOG_FORMAT").unwrap_or(defaults.log_format);

        let rate_limit_preset = match env::var("RATE_LIMIT_PRESET") {
            Ok(value) => value
                .parse()
                .context("RATE_LIMIT_PRESET has an invalid value")?,
            Err(_) => defaults.rate_limit_preset,
        };

        Ok(Self {
            log_level,
            log_format,
            rate_limit_preset,
            rate_limit_window_ms: parse_var("RATE_LIMIT_WINDOW_MS")?,
            rate_limit_max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS")?,
            rate_limit_sweep_secs: parse_var("RATE_LIMIT_SWEEP_SECS")?
                .unwrap_or(defaults.rate_limit_sweep_secs),
            analytics_capacity: parse_var("ANALYTICS_CAPACITY")?
                .unwrap_or(defaults.analytics_capacity),
            payment_timeout_ms: parse_var("PAYMENT_TIMEOUT_MS")?
                .unwrap_or(defaults.payment_timeout_ms),
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or(defaults.payment_currency),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the rate-limit window, quota or sweep interval is zero
    /// - `analytics_capacity` is outside 100..=1000000
    /// - `payment_timeout_ms` is zero
    /// - `payment_currency` is not three uppercase letters
    /// - `log_format` is not `text` or `json`
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_window_ms == Some(0) {
            anyhow::bail!("RATE_LIMIT_WINDOW_MS must be greater than 0");
        }

        if self.rate_limit_max_requests == Some(0) {
            anyhow::bail!("RATE_LIMIT_MAX_REQUESTS must be greater than 0");
        }

        if self.rate_limit_sweep_secs == 0 {
            anyhow::bail!("RATE_LIMIT_SWEEP_SECS must be greater than 0");
        }

        if self.analytics_capacity < 100 {
            anyhow::bail!(
                "ANALYTICS_CAPACITY must be at least 100, got {}",
                self.analytics_capacity
            );
        }

        if self.analytics_capacity > 1_000_000 {
            anyhow::bail!(
                "ANALYTICS_CAPACITY is too large (max: 1000000), got {}",
                self.analytics_capacity
            );
        }

        if self.payment_timeout_ms == 0 {
            anyhow::bail!("PAYMENT_TIMEOUT_MS must be greater than 0");
        }

        if self.payment_currency.len() != 3
            || !self.payment_currency.chars().all(|c| c.is_ascii_uppercase())
        {
            anyhow::bail!(
                "PAYMENT_CURRENCY must be a three-letter uppercase code, got '{}'",
                self.payment_currency
            );
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        Ok(())
    }

    /// Preset policy with the window and quota overrides applied.
    pub fn rate_limit(&self) -> RateLimitConfig {
        let mut config = RateLimitConfig::from_preset(self.rate_limit_preset);

        if let Some(window_ms) = self.rate_limit_window_ms {
            config.window = Duration::from_millis(window_ms);
        }
        if let Some(max_requests) = self.rate_limit_max_requests {
            config.max_requests = max_requests;
        }

        config
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            currency: self.payment_currency.clone(),
            payment_timeout: Duration::from_millis(self.payment_timeout_ms),
        }
    }

    /// Logs a configuration summary.
    pub fn print_summary(&self) {
        let rate_limit = self.rate_limit();

        tracing::info!("Configuration loaded:");
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!(
            "  Rate limit: {} ({} requests / {:?})",
            self.rate_limit_preset,
            rate_limit.max_requests,
            rate_limit.window
        );
        tracing::info!("  Rate limit sweep: every {}s", self.rate_limit_sweep_secs);
        tracing::info!("  Analytics capacity: {}", self.analytics_capacity);
        tracing::info!(
            "  Payments: {} with {}ms timeout",
            self.payment_currency,
            self.payment_timeout_ms
        );
    }
}

/// Reads an optional variable, failing only when it is set but unparseable.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has an invalid value '{value}'")),
        Err(_) => Ok(None),
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
