use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::payment::{
    FinalizeOutcome, FinalizeResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    PaymentMethod, PaymentMethodInfo, PaymentRecord, PaymentStatusQuery, PaymentStatusResponse,
};
use crate::services::phone::{format_phone_number, mask_phone, validate_operator_phone};

/// Raw calls against the payment backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn initiate(
        &self,
        request: &InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ServiceError>;

    async fn check_status(
        &self,
        query: &PaymentStatusQuery,
    ) -> Result<PaymentStatusResponse, ServiceError>;

    async fn finalize(&self, reference: &str) -> Result<FinalizeResponse, ServiceError>;

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, ServiceError>;
}

/// Client-side validation and duplicate-call guards in front of a [`GatewayTransport`].
///
/// At most one initiation is in flight at a time; a second caller is rejected
/// with [`ServiceError::PaymentInProgress`]. Concurrent status checks are
/// serialized, but a waiting caller gives up waiting after `status_wait` and
/// sends its own request.
pub struct PaymentGatewayClient {
    transport: Arc<dyn GatewayTransport>,
    initiate_lock: Mutex<()>,
    status_lock: Mutex<()>,
    status_wait: Duration,
}

impl PaymentGatewayClient {
    pub fn new(transport: Arc<dyn GatewayTransport>, status_wait: Duration) -> Self {
        Self {
            transport,
            initiate_lock: Mutex::new(()),
            status_lock: Mutex::new(()),
            status_wait,
        }
    }

    pub fn payment_methods(&self) -> Vec<PaymentMethodInfo> {
        PaymentMethod::catalog()
    }

    fn validate_request(request: &mut InitiatePaymentRequest) -> Result<(), ServiceError> {
        request.customer_phone = format_phone_number(&request.customer_phone);
        request.validate()?;

        if request.payment_method == PaymentMethod::CashOnDelivery {
            return Err(ServiceError::InvalidInput(
                "Cash on delivery does not go through the payment gateway".to_string(),
            ));
        }
        if request.payment_method.is_mobile_money() {
            validate_operator_phone(request.payment_method, &request.customer_phone)
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }

    /// Validates and sends a payment initiation.
    #[instrument(skip(self, request), fields(method = %request.payment_method))]
    pub async fn initiate_payment(
        &self,
        mut request: InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse, ServiceError> {
        Self::validate_request(&mut request)?;

        let _guard = self.initiate_lock.try_lock().map_err(|_| {
            warn!("Rejected payment initiation while another is in flight");
            ServiceError::PaymentInProgress
        })?;

        info!(
            amount = request.amount,
            phone = %mask_phone(&request.customer_phone),
            order_id = ?request.order_id,
            "Initiating payment"
        );

        let response = self.transport.initiate(&request).await?;
        if !response.success {
            let message = response
                .error
                .or(response.message)
                .unwrap_or_else(|| "Payment initiation failed".to_string());
            warn!(%message, "Gateway declined payment initiation");
            return Err(ServiceError::PaymentFailed(message));
        }
        if response.payment_id.is_none() && response.reference.is_none() {
            return Err(ServiceError::SerializationError(
                "Payment response carried no payment id or reference".to_string(),
            ));
        }

        info!(
            payment_id = ?response.payment_id,
            reference = ?response.reference,
            status = %response.status,
            "Payment initiated"
        );
        Ok(response)
    }

    /// Asks the gateway for the current status of a payment.
    #[instrument(skip(self, query), fields(payment_id = ?query.payment_id, reference = ?query.reference))]
    pub async fn check_payment_status(
        &self,
        query: PaymentStatusQuery,
    ) -> Result<PaymentStatusResponse, ServiceError> {
        if query.is_empty() {
            return Err(ServiceError::InvalidInput(
                "A payment id, transaction id or reference is required".to_string(),
            ));
        }

        let _guard = match self.status_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                debug!("Waiting for in-flight status check");
                match tokio::time::timeout(self.status_wait, self.status_lock.lock()).await {
                    Ok(guard) => Some(guard),
                    Err(_) => {
                        warn!(
                            wait_ms = self.status_wait.as_millis() as u64,
                            "In-flight status check did not finish in time, checking anyway"
                        );
                        None
                    }
                }
            }
        };

        let response = self.transport.check_status(&query).await?;
        if !response.success {
            let message = response
                .error
                .or(response.message)
                .unwrap_or_else(|| "Payment status check failed".to_string());
            warn!(%message, "Gateway could not report payment status");
            return Err(ServiceError::ExternalApiError {
                status: 502,
                message,
            });
        }

        debug!(status = %response.effective_status(), "Payment status received");
        Ok(response)
    }

    /// Asks the server to bind an order to a successful payment.
    #[instrument(skip(self))]
    pub async fn finalize(&self, reference: &str) -> Result<FinalizeOutcome, ServiceError> {
        if reference.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "A payment reference is required to finalize".to_string(),
            ));
        }
        let response = self.transport.finalize(reference).await?;
        let outcome = FinalizeOutcome::from(response);
        info!(?outcome, "Finalize answered");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, ServiceError> {
        if payment_id.trim().is_empty() {
            return Err(ServiceError::InvalidInput("A payment id is required".to_string()));
        }
        self.transport.get_payment(payment_id).await
    }
}
