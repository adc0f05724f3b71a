//! Analytics sinks.

mod memory_analytics;

pub use memory_analytics::{DEFAULT_ANALYTICS_CAPACITY, InMemoryAnalytics};
