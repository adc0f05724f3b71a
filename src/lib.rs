//! # FreshCuts deep links
//!
//! Parsing, generation, rate limiting and dispatch of `freshcuts://` links.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - links, typed parameters, dispatch results and the
//!   payment and analytics contracts
//! - **Application Layer** ([`application`]) - the dispatcher pipeline
//! - **Infrastructure Layer** ([`infrastructure`]) - sliding-window limiter, in-memory
//!   analytics, sandbox payment gateway
//! - **Utilities** ([`utils`]) - sanitizers, parser, generator
//!
//! ## Pipeline
//!
//! Each link moves through sanitize, parse, rate-check and route, and always
//! ends with exactly one analytics event:
//!
//! ```rust,ignore
//! let engine = EngineState::from_config(&config, Arc::new(SandboxPaymentGateway::new()));
//! let result = engine
//!     .dispatcher
//!     .dispatch("freshcuts://payment?amount=45&shop=nyc_01", &DispatchContext::anonymous())
//!     .await?;
//! ```
//!
//! ## Configuration
//!
//! Engine configuration is loaded from environment variables via [`config::Config`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use error::DeepLinkError;
pub use state::EngineState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{DeepLinkDispatcher, DispatchContext, DispatchSettings};
    pub use crate::config::Config;
    pub use crate::domain::entities::{
        AnalyticsMetrics, DeepLink, DispatchAction, DispatchData, DispatchResult, LinkAction,
    };
    pub use crate::domain::gateways::PaymentGateway;
    pub use crate::domain::params::ActionParams;
    pub use crate::domain::repositories::AnalyticsRepository;
    pub use crate::error::{DeepLinkError, ParseErrorKind};
    pub use crate::infrastructure::analytics::InMemoryAnalytics;
    pub use crate::infrastructure::payment::SandboxPaymentGateway;
    pub use crate::infrastructure::rate_limit::{RateLimitConfig, SlidingWindowRateLimiter};
    pub use crate::state::EngineState;
    pub use crate::utils::deep_link_parser::parse;
    pub use crate::utils::link_generator::generate;
}
