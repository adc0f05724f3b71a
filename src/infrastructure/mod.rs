//! Infrastructure layer.
//!
//! Concrete implementations of the domain contracts, plus the rate limiter.
//!
//! # Modules
//!
//! - [`analytics`] - bounded in-memory analytics log
//! - [`payment`] - sandbox payment gateway
//! - [`rate_limit`] - sliding-window limiter and its policies

pub mod analytics;
pub mod payment;
pub mod rate_limit;
