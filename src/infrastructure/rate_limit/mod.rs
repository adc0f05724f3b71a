//! Per-key sliding-window rate limiting.

pub mod config;
pub mod sliding_window;

pub use config::{KeyGenerator, RateLimitConfig, RateLimitPreset, UnknownPreset};
pub use sliding_window::{
    AdmissionTicket, DEFAULT_SWEEP_INTERVAL, RateLimitDecision, SlidingWindowRateLimiter,
};
