use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::CheckoutConfig;
use crate::errors::{ErrorResponse, ServiceError};
use crate::models::order::{Order, OrderPayload};
use crate::models::payment::{
    FinalizeRequest, FinalizeResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    PaymentRecord, PaymentStatusQuery, PaymentStatusResponse,
};
use crate::models::settings::OrderingFlags;
use crate::services::checkout::OrderBackend;
use crate::services::ordering_gate::SettingsSource;
use crate::services::payment_gateway::GatewayTransport;

pub const INITIATE_PATH: &str = "/api/payments/kpay/initiate";
pub const STATUS_PATH: &str = "/api/payments/kpay/status";
pub const FINALIZE_PATH: &str = "/api/payments/kpay/finalize";
pub const PAYMENTS_PATH: &str = "/api/payments";
pub const ORDERS_PATH: &str = "/api/orders";
pub const ORDERING_SETTINGS_PATH: &str = "/api/admin/settings/orders-enabled";

/// reqwest-backed client for the storefront API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: CheckoutConfig,
}

impl HttpBackend {
    /// Builds a client honouring the configured request timeout.
    pub fn new(config: CheckoutConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            ServiceError::ExternalServiceError(format!("failed to construct HTTP client: {}", e))
        })?;
        Ok(Self::with_client(config, client))
    }

    /// Build a backend from an existing client (useful for testing).
    pub fn with_client(config: CheckoutConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            warn!(status = status.as_u16(), "Backend returned an error status");
            return Err(ServiceError::from_status(status.as_u16(), &text));
        }

        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Backend response did not match the expected shape");
            ServiceError::SerializationError(e.to_string())
        })
    }
}

#[async_trait]
impl GatewayTransport for HttpBackend {
    #[instrument(skip(self, request))]
    async fn initiate(
        &self,
        request: &InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ServiceError> {
        let url = self.config.endpoint(INITIATE_PATH);
        debug!(%url, "POST initiate");
        self.send(self.client.post(url).json(request)).await
    }

    #[instrument(skip(self, query))]
    async fn check_status(
        &self,
        query: &PaymentStatusQuery,
    ) -> Result<PaymentStatusResponse, ServiceError> {
        let url = self.config.endpoint(STATUS_PATH);
        debug!(%url, "POST status");
        self.send(self.client.post(url).json(query)).await
    }

    #[instrument(skip(self))]
    async fn finalize(&self, reference: &str) -> Result<FinalizeResponse, ServiceError> {
        let url = self.config.endpoint(FINALIZE_PATH);
        let body = FinalizeRequest {
            reference: reference.to_string(),
        };
        self.send(self.client.post(url).json(&body)).await
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, ServiceError> {
        let url = self
            .config
            .endpoint(&format!("{}/{}", PAYMENTS_PATH, payment_id.trim()));
        match self.send(self.client.get(url)).await {
            Err(ServiceError::ExternalApiError { status: 404, .. }) => Err(ServiceError::NotFound(
                format!("Payment {} not found", payment_id),
            )),
            other => other,
        }
    }
}

#[async_trait]
impl OrderBackend for HttpBackend {
    #[instrument(skip(self, payload), fields(items = payload.items.len()))]
    async fn create_order(&self, payload: &OrderPayload) -> Result<Order, ServiceError> {
        let url = self.config.endpoint(ORDERS_PATH);
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .ok()
                .and_then(ErrorResponse::into_message)
                .unwrap_or_else(|| {
                    if text.trim().is_empty() {
                        format!("Order could not be created (status {})", status.as_u16())
                    } else {
                        text.trim().to_string()
                    }
                });
            warn!(status = status.as_u16(), %message, "Order creation refused");
            return Err(ServiceError::OrderError(message));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SettingsSource for HttpBackend {
    #[instrument(skip(self))]
    async fn fetch_ordering_flags(&self) -> Result<OrderingFlags, ServiceError> {
        let url = self.config.endpoint(ORDERING_SETTINGS_PATH);
        self.send(self.client.get(url)).await
    }
}
