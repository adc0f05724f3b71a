//! Application layer.
//!
//! [`services::DeepLinkDispatcher`] composes the parser, the rate limiter, the
//! payment gateway and the analytics sink into the dispatch pipeline.

pub mod services;
