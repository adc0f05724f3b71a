//! Bounded in-memory analytics log.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::entities::{AnalyticsEvent, AnalyticsMetrics, TimeRange};
use crate::domain::repositories::{AnalyticsError, AnalyticsRepository};

pub const DEFAULT_ANALYTICS_CAPACITY: usize = 10_000;

/// Append-only event log that evicts the oldest events past `capacity`.
///
/// `track` completes once the event is in the log, so metrics read after a
/// dispatch returns always include that dispatch.
pub struct InMemoryAnalytics {
    events: RwLock<VecDeque<AnalyticsEvent>>,
    capacity: usize,
}

impl InMemoryAnalytics {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "Using in-memory analytics");

        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Up to `n` most recent events, newest first.
    pub async fn recent(&self, n: usize) -> Vec<AnalyticsEvent> {
        self.events.read().await.iter().rev().take(n).cloned().collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

impl Default for InMemoryAnalytics {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYTICS_CAPACITY)
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryAnalytics {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        let mut events = self.events.write().await;

        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);

        Ok(())
    }

    async fn get_metrics(&self, range: Option<TimeRange>) -> Result<AnalyticsMetrics, AnalyticsError> {
        let events = self.events.read().await;
        Ok(AnalyticsMetrics::from_events(events.iter(), range))
    }
}
