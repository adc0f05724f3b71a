//! External capabilities the engine consumes.

pub mod payment_gateway;

pub use payment_gateway::{
    PaymentError, PaymentGateway, PaymentResponse, PaymentStatus, SplitPayment,
    VenmoPaymentRequest,
};

#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
