//! Payment gateway capability consumed by the dispatcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Participants sharing a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPayment {
    pub participants: Vec<String>,
}

/// Request sent to the gateway for a payment or a tip.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenmoPaymentRequest {
    /// Amount in minor currency units (cents).
    pub amount_minor_units: i64,
    pub currency: String,
    pub description: String,
    pub merchant_note: Option<String>,
    pub private_transaction: bool,
    pub split_payment: Option<SplitPayment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Payment as created by the gateway.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    /// Where the payer approves the payment, if the gateway requires it.
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Payment request rejected: {0}")]
    InvalidRequest(String),
}

/// Narrow payment capability.
///
/// The dispatcher calls it at most once per link and never retries. Errors
/// are surfaced to the caller as handler errors.
///
/// # Implementations
///
/// - [`crate::infrastructure::payment::SandboxPaymentGateway`] - in-process gateway for
///   development and tests
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] when the backend declines the payment, rejects
    /// the request, or cannot be reached.
    async fn create_payment(
        &self,
        request: VenmoPaymentRequest,
    ) -> Result<PaymentResponse, PaymentError>;
}
