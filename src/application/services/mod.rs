//! Services for the application layer.

pub mod dispatch_service;

pub use dispatch_service::{DeepLinkDispatcher, DispatchContext, DispatchSettings};
