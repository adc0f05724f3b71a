//! Repository trait definitions for the domain layer.
//!
//! Traits define the storage contract. Implementations live in
//! `crate::infrastructure`, and mock implementations are generated via
//! `mockall` for unit tests.

pub mod analytics_repository;

pub use analytics_repository::{AnalyticsError, AnalyticsRepository};

#[cfg(test)]
pub use analytics_repository::MockAnalyticsRepository;
