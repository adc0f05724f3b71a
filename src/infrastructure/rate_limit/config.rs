//! Rate-limit policy: window, quota and how a caller key is derived.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::DeepLink;

/// Derives the rate-limit key from a link and the caller identity, if any.
pub type KeyGenerator = Arc<dyn Fn(&DeepLink, Option<&str>) -> String + Send + Sync>;

/// Policy applied by the dispatcher before routing a link.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
    /// Custom key derivation. Defaults to [`RateLimitConfig::default_key`].
    pub key_generator: Option<KeyGenerator>,
    /// Give the unit back once a dispatch succeeds.
    pub skip_successful_requests: bool,
    /// Give the unit back once a dispatch fails after admission.
    pub skip_failed_requests: bool,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            key_generator: None,
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }

    /// Very high limit, action-scoped key. For local development.
    pub fn development() -> Self {
        Self::new(10_000, Duration::from_secs(60))
    }

    /// Strict limit shared by every caller.
    pub fn production() -> Self {
        Self::new(100, Duration::from_secs(15 * 60)).with_key_generator(|_, _| "global".to_string())
    }

    /// Moderate limit per caller identity. Anonymous callers share the
    /// action-scoped key.
    pub fn per_caller() -> Self {
        Self::new(30, Duration::from_secs(60)).with_key_generator(|link, identity| match identity {
            Some(identity) => format!("caller:{identity}"),
            None => link.scope_prefix(),
        })
    }

    pub fn from_preset(preset: RateLimitPreset) -> Self {
        match preset {
            RateLimitPreset::Development => Self::development(),
            RateLimitPreset::Production => Self::production(),
            RateLimitPreset::PerCaller => Self::per_caller(),
        }
    }

    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&DeepLink, Option<&str>) -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    pub fn skip_successful(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    pub fn skip_failed(mut self, skip: bool) -> Self {
        self.skip_failed_requests = skip;
        self
    }

    /// Key under which `link` is counted.
    pub fn key_for(&self, link: &DeepLink, identity: Option<&str>) -> String {
        match &self.key_generator {
            Some(generator) => generator(link, identity),
            None => Self::default_key(link, identity),
        }
    }

    /// `payment:<identity>` when the caller is known, else `freshcuts://payment`.
    pub fn default_key(link: &DeepLink, identity: Option<&str>) -> String {
        match identity {
            Some(identity) => format!("{}:{identity}", link.action()),
            None => link.scope_prefix(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("custom_key", &self.key_generator.is_some())
            .field("skip_successful_requests", &self.skip_successful_requests)
            .field("skip_failed_requests", &self.skip_failed_requests)
            .finish()
    }
}

/// Named presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPreset {
    Development,
    Production,
    PerCaller,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown rate limit preset '{0}', expected development, production or per_caller")]
pub struct UnknownPreset(pub String);

impl FromStr for RateLimitPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "per_caller" | "per-caller" => Ok(Self::PerCaller),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for RateLimitPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::PerCaller => "per_caller",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::deep_link_parser::parse;

    #[test]
    fn test_default_key_is_action_scoped() {
        let link = parse("freshcuts://payment?amount=5").unwrap();
        let config = RateLimitConfig::development();

        assert_eq!(config.key_for(&link, None), "freshcuts://payment");
        assert_eq!(config.key_for(&link, Some("u1")), "payment:u1");
    }

    #[test]
    fn test_production_uses_global_key() {
        let shop = parse("freshcuts://shop?shop=a").unwrap();
        let tip = parse("freshcuts://tip").unwrap();
        let config = RateLimitConfig::production();

        assert_eq!(config.key_for(&shop, Some("u1")), "global");
        assert_eq!(config.key_for(&tip, None), "global");
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window, Duration::from_secs(900));
    }

    #[test]
    fn test_per_caller_key() {
        let link = parse("freshcuts://booking").unwrap();
        let config = RateLimitConfig::per_caller();

        assert_eq!(config.key_for(&link, Some("u1")), "caller:u1");
        assert_eq!(config.key_for(&link, None), "freshcuts://booking");
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("production".parse(), Ok(RateLimitPreset::Production));
        assert_eq!("Per-Caller".parse(), Ok(RateLimitPreset::PerCaller));
        assert!("burst".parse::<RateLimitPreset>().is_err());
    }
}
