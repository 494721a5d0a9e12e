// Checkout pipeline
pub mod cart_snapshot;
pub mod checkout;
pub mod validation;

// Payment gateway and reconciliation
pub mod payment_gateway;
pub mod phone;
pub mod reconciliation;

// Ordering availability
pub mod ordering_gate;

// HTTP transport for the storefront API
pub mod http_backend;
