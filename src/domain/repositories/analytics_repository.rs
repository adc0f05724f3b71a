//! Repository trait for dispatch analytics.

use async_trait::async_trait;

use crate::domain::entities::{AnalyticsEvent, AnalyticsMetrics, TimeRange};

/// Errors raised by an analytics backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Analytics storage error: {0}")]
    Storage(String),
}

/// Repository interface for recording dispatch events and querying metrics.
///
/// The dispatcher treats `track` as fire-and-forget. A failing backend is
/// logged and never changes the dispatch outcome.
///
/// # Implementations
///
/// - [`crate::infrastructure::analytics::InMemoryAnalytics`] - bounded in-memory log
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Appends one event to the log.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Storage`] if the backend cannot persist the event.
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;

    /// Aggregates the log, optionally restricted to `range`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Storage`] if the backend cannot be read.
    async fn get_metrics(&self, range: Option<TimeRange>) -> Result<AnalyticsMetrics, AnalyticsError>;
}
