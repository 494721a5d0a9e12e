//! Storefront checkout core
//!
//! Order assembly, mobile-money payment initiation and payment status
//! reconciliation for the storefront client.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

pub use config::{init_tracing, load_config, CheckoutConfig};
pub use errors::ServiceError;
pub use services::checkout::{CheckoutService, OrderBackend, PendingPayment, SubmitOutcome};
pub use services::http_backend::HttpBackend;
pub use services::payment_gateway::{GatewayTransport, PaymentGatewayClient};
pub use services::reconciliation::{PaymentReconciler, ReconcileOutcome, RetryContext};

use repositories::{AuthRepository, CartRepository};

/// Services wired against one HTTP backend.
#[derive(Clone)]
pub struct CheckoutClient {
    pub config: CheckoutConfig,
    pub gateway: Arc<PaymentGatewayClient>,
    pub checkout: Arc<CheckoutService>,
}

impl CheckoutClient {
    /// Builds the HTTP backend and the services on top of it.
    pub fn connect(
        config: CheckoutConfig,
        cart: Arc<dyn CartRepository>,
        auth: Arc<dyn AuthRepository>,
    ) -> Result<Self, ServiceError> {
        let backend = Arc::new(HttpBackend::new(config.clone())?);
        let gateway = Arc::new(PaymentGatewayClient::new(
            backend.clone(),
            config.status_check_wait(),
        ));
        let checkout = CheckoutService::new(config.clone(), backend.clone(), gateway.clone(), cart, auth)
            .with_settings_source(backend);

        tracing::info!(base = %config.effective_base(), "Checkout client ready");
        Ok(Self {
            config,
            gateway,
            checkout: Arc::new(checkout),
        })
    }

    /// Reconciler for a payment the caller already holds.
    pub fn reconciler(&self, record: models::payment::PaymentRecord) -> PaymentReconciler {
        PaymentReconciler::new(self.gateway.clone(), record)
    }

    /// Reconciler seeded from the server's copy of the payment.
    pub async fn load_reconciler(&self, payment_id: &str) -> Result<PaymentReconciler, ServiceError> {
        PaymentReconciler::load(self.gateway.clone(), payment_id).await
    }
}
