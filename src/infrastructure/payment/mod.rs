//! Payment gateway implementations.

mod sandbox_gateway;

pub use sandbox_gateway::SandboxPaymentGateway;
