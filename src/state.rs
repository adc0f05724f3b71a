//! Engine wiring: one limiter, one analytics log and one dispatcher per engine.

use std::sync::Arc;

use crate::application::services::DeepLinkDispatcher;
use crate::config::Config;
use crate::domain::gateways::PaymentGateway;
use crate::infrastructure::analytics::InMemoryAnalytics;
use crate::infrastructure::rate_limit::SlidingWindowRateLimiter;

pub type Dispatcher = DeepLinkDispatcher<dyn PaymentGateway, InMemoryAnalytics>;

/// Explicitly owned engine state.
///
/// Nothing is global: two engines built from the same config share no
/// counters or events. Call [`shutdown`](Self::shutdown) to stop the limiter's
/// background sweep.
#[derive(Clone)]
pub struct EngineState {
    pub dispatcher: Arc<Dispatcher>,
    pub analytics: Arc<InMemoryAnalytics>,
    pub rate_limiter: Arc<SlidingWindowRateLimiter>,
}

impl EngineState {
    /// Builds the engine and starts the limiter sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &Config, payment_gateway: Arc<dyn PaymentGateway>) -> Self {
        let rate_limit = config.rate_limit();

        let rate_limiter = Arc::new(SlidingWindowRateLimiter::from_config(&rate_limit));
        rate_limiter.start_sweeper(config.sweep_interval());

        let analytics = Arc::new(InMemoryAnalytics::new(config.analytics_capacity));

        let dispatcher = DeepLinkDispatcher::new(
            payment_gateway,
            Arc::clone(&analytics),
            Arc::clone(&rate_limiter),
            rate_limit,
        )
        .with_settings(config.dispatch_settings());

        tracing::debug!("Engine state initialized");

        Self {
            dispatcher: Arc::new(dispatcher),
            analytics,
            rate_limiter,
        }
    }

    /// Stops the sweep and clears rate-limit state. The analytics log is kept.
    pub fn shutdown(&self) {
        self.rate_limiter.destroy();
    }
}
