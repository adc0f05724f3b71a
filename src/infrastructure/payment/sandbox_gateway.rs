//! In-process payment gateway for development and tests.

use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::gateways::{
    PaymentError, PaymentGateway, PaymentResponse, PaymentStatus, VenmoPaymentRequest,
};

/// Random bytes behind a payment id, before base64 encoding.
const PAYMENT_ID_BYTES: usize = 9;

/// Gateway that accepts every well-formed request and returns a pending
/// payment. It keeps every request it receives and can be told to fail.
#[derive(Default)]
pub struct SandboxPaymentGateway {
    requests: Mutex<Vec<VenmoPaymentRequest>>,
    failure: Mutex<Option<PaymentError>>,
    latency: Option<Duration>,
}

impl SandboxPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, e.g. to exercise caller-side timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes subsequent calls fail with `error`.
    pub async fn fail_with(&self, error: PaymentError) {
        *self.failure.lock().await = Some(error);
    }

    pub async fn succeed(&self) {
        *self.failure.lock().await = None;
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<VenmoPaymentRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for SandboxPaymentGateway {
    async fn create_payment(
        &self,
        request: VenmoPaymentRequest,
    ) -> Result<PaymentResponse, PaymentError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.requests.lock().await.push(request.clone());

        if let Some(error) = self.failure.lock().await.clone() {
            return Err(error);
        }

        if request.amount_minor_units <= 0 {
            return Err(PaymentError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }

        let payment_id = generate_payment_id()?;
        debug!(%payment_id, amount = request.amount_minor_units, "Sandbox payment created");

        Ok(PaymentResponse {
            payment_id,
            status: PaymentStatus::Pending,
            amount: request.amount_minor_units,
            currency: request.currency,
            created_at: Utc::now(),
            approval_url: None,
        })
    }
}

/// `pay_` followed by 12 URL-safe base64 characters.
fn generate_payment_id() -> Result<String, PaymentError> {
    let mut buffer = [0u8; PAYMENT_ID_BYTES];

    getrandom::fill(&mut buffer)
        .map_err(|e| PaymentError::Unavailable(format!("random source failed: {e}")))?;

    Ok(format!(
        "pay_{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer)
    ))
}
