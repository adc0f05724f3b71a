#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use freshcuts_deeplinks::application::services::{DeepLinkDispatcher, DispatchSettings};
use freshcuts_deeplinks::config::Config;
use freshcuts_deeplinks::infrastructure::analytics::InMemoryAnalytics;
use freshcuts_deeplinks::infrastructure::payment::SandboxPaymentGateway;
use freshcuts_deeplinks::infrastructure::rate_limit::{RateLimitConfig, SlidingWindowRateLimiter};
use freshcuts_deeplinks::state::EngineState;

pub type TestDispatcher = DeepLinkDispatcher<SandboxPaymentGateway, InMemoryAnalytics>;

/// Dispatcher wired to a fresh sandbox gateway, analytics log and limiter.
pub struct TestEngine {
    pub dispatcher: TestDispatcher,
    pub gateway: Arc<SandboxPaymentGateway>,
    pub analytics: Arc<InMemoryAnalytics>,
    pub limiter: Arc<SlidingWindowRateLimiter>,
}

pub fn create_test_engine(rate_limit: RateLimitConfig) -> TestEngine {
    create_test_engine_with(rate_limit, SandboxPaymentGateway::new(), DispatchSettings::default())
}

pub fn create_test_engine_with(
    rate_limit: RateLimitConfig,
    gateway: SandboxPaymentGateway,
    settings: DispatchSettings,
) -> TestEngine {
    let gateway = Arc::new(gateway);
    let analytics = Arc::new(InMemoryAnalytics::default());
    let limiter = Arc::new(SlidingWindowRateLimiter::from_config(&rate_limit));

    let dispatcher = DeepLinkDispatcher::new(
        Arc::clone(&gateway),
        Arc::clone(&analytics),
        Arc::clone(&limiter),
        rate_limit,
    )
    .with_settings(settings);

    TestEngine {
        dispatcher,
        gateway,
        analytics,
        limiter,
    }
}

pub fn create_engine_state() -> EngineState {
    EngineState::from_config(&Config::default(), Arc::new(SandboxPaymentGateway::new()))
}

pub fn generous_limit() -> RateLimitConfig {
    RateLimitConfig::new(1_000, Duration::from_secs(60))
}
