//! Analytics event and the metrics derived from a set of events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::HashMap;

use super::action::LinkAction;
use super::deep_link::LinkParams;

/// Label used when a link failed before its action was known.
pub const UNKNOWN_ACTION: &str = "unknown";

/// One record per dispatch attempt, successful or not.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub url: String,
    pub action: Option<LinkAction>,
    pub params: LinkParams,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub success: bool,
    pub error: Option<String>,
    pub processing_time_ms: f64,
}

impl AnalyticsEvent {
    /// Action label used for aggregation.
    pub fn action_label(&self) -> &'static str {
        self.action.map_or(UNKNOWN_ACTION, |a| a.as_str())
    }
}

/// Inclusive time window for metric queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCount {
    pub action: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCount {
    pub error: String,
    pub count: usize,
}

/// Aggregate view over the event log. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub total_links: usize,
    pub success_rate: f64,
    pub popular_actions: Vec<ActionCount>,
    pub average_processing_time: f64,
    pub errors: Vec<ErrorCount>,
}

impl AnalyticsMetrics {
    /// Aggregates `events`, keeping only those inside `range` when given.
    ///
    /// Rankings are sorted by count, descending. Equal counts keep the order in
    /// which the label was first seen.
    pub fn from_events<'a, I>(events: I, range: Option<TimeRange>) -> Self
    where
        I: IntoIterator<Item = &'a AnalyticsEvent>,
    {
        let mut total = 0usize;
        let mut successes = 0usize;
        let mut time_sum = 0.0f64;
        let mut actions = Tally::default();
        let mut errors = Tally::default();

        for event in events {
            if range.is_some_and(|r| !r.contains(event.timestamp)) {
                continue;
            }

            total += 1;
            time_sum += event.processing_time_ms;
            actions.add(event.action_label());

            if event.success {
                successes += 1;
            } else if let Some(message) = &event.error {
                errors.add(message);
            }
        }

        let (success_rate, average_processing_time) = if total == 0 {
            (0.0, 0.0)
        } else {
            (successes as f64 / total as f64, time_sum / total as f64)
        };

        Self {
            total_links: total,
            success_rate,
            popular_actions: actions
                .ranked()
                .into_iter()
                .map(|(action, count)| ActionCount { action, count })
                .collect(),
            average_processing_time,
            errors: errors
                .ranked()
                .into_iter()
                .map(|(error, count)| ErrorCount { error, count })
                .collect(),
        }
    }
}

/// Counts labels while remembering first-seen order.
#[derive(Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    fn ranked(mut self) -> Vec<(String, usize)> {
        // stable sort keeps first-seen order among equal counts
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}
