//! Core domain entities.
//!
//! - [`DeepLink`] - a parsed `freshcuts://` URI
//! - [`DispatchResult`] - what the dispatcher produced for a link
//! - [`AnalyticsEvent`] / [`AnalyticsMetrics`] - per-dispatch records and their aggregate

pub mod action;
pub mod analytics;
pub mod deep_link;
pub mod dispatch;

pub use action::{LinkAction, UnknownAction};
pub use analytics::{
    ActionCount, AnalyticsEvent, AnalyticsMetrics, ErrorCount, TimeRange, UNKNOWN_ACTION,
};
pub use deep_link::{DeepLink, LinkParams, SCHEME};
pub use dispatch::{
    BookingData, DispatchAction, DispatchData, DispatchResult, NavigationData, PaymentData,
    PromotionData, TipData,
};
