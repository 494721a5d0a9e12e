use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::payment::{FinalizeOutcome, PaymentMethod, PaymentRecord, PaymentStatus};
use crate::services::payment_gateway::PaymentGatewayClient;

pub const ORDER_LINK_PENDING_MESSAGE: &str =
    "Payment successful, your order is being linked shortly";

/// What a failed payment hands to the retry-payment entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    pub previous_payment_id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub failed_method: Option<PaymentMethod>,
}

/// Result of one user-triggered refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Not terminal yet; the user may refresh again.
    Pending { status: PaymentStatus },
    /// The status check itself failed. The payment stays pending.
    CheckFailed { message: String, transient: bool },
    /// Paid and bound to an order.
    OrderReady(FinalizeOutcome),
    /// Paid, but the server has not linked an order yet.
    AwaitingOrderLink { message: String },
    /// Failed, timed out or cancelled.
    Failed {
        status: PaymentStatus,
        reason: String,
        retry: RetryContext,
    },
}

impl ReconcileOutcome {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            ReconcileOutcome::OrderReady(outcome) => outcome.order_id(),
            _ => None,
        }
    }
}

/// Payment status state machine over a locally held [`PaymentRecord`].
///
/// The server decides whether an order exists for a payment. This type only
/// avoids redundant finalize calls and never creates an order itself.
pub struct PaymentReconciler {
    client: Arc<PaymentGatewayClient>,
    record: PaymentRecord,
}

impl PaymentReconciler {
    pub fn new(client: Arc<PaymentGatewayClient>, record: PaymentRecord) -> Self {
        Self { client, record }
    }

    /// Seeds the reconciler from the server's copy of the payment.
    #[instrument(skip(client))]
    pub async fn load(
        client: Arc<PaymentGatewayClient>,
        payment_id: &str,
    ) -> Result<Self, ServiceError> {
        let record = client.get_payment(payment_id).await?;
        info!(status = %record.status, order_id = ?record.order_id, "Loaded payment record");
        Ok(Self::new(client, record))
    }

    pub fn record(&self) -> &PaymentRecord {
        &self.record
    }

    pub fn into_record(self) -> PaymentRecord {
        self.record
    }

    pub fn retry_context(&self) -> RetryContext {
        RetryContext {
            previous_payment_id: self.record.id.clone(),
            order_id: self.record.linked_order_id().map(str::to_string),
            amount: self.record.amount,
            failed_method: self.record.payment_method,
        }
    }

    /// Checks the gateway once and advances the local record.
    #[instrument(skip(self), fields(payment_id = %self.record.id))]
    pub async fn refresh(&mut self) -> ReconcileOutcome {
        let response = match self
            .client
            .check_payment_status(self.record.status_query())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let transient = e.is_transient();
                warn!(error = %e, transient, "Status check failed, payment left pending");
                return ReconcileOutcome::CheckFailed {
                    message: e.user_message(),
                    transient,
                };
            }
        };

        let status = response.effective_status();
        if accepts_transition(self.record.status, status) {
            info!(from = %self.record.status, to = %status, "Payment status changed");
            self.record.status = status;
        } else if status != self.record.status && status != PaymentStatus::Unknown {
            warn!(current = %self.record.status, reported = %status, "Ignoring status reported after a terminal one");
        }
        if let Some(tx) = response.transaction_id.filter(|t| !t.trim().is_empty()) {
            self.record.gateway_transaction_id = Some(tx);
        }
        if self.record.reference.is_none() {
            self.record.reference = response.reference.filter(|r| !r.trim().is_empty());
        }
        if let Some(order_id) = response.order_id.filter(|id| !id.trim().is_empty()) {
            self.record.order_id = Some(order_id);
        }

        if self.record.status.is_successful() {
            return self.handle_successful_status().await;
        }

        if self.record.status.is_failure() {
            let reason = response
                .error
                .or(response.message)
                .filter(|m| !m.trim().is_empty())
                .or_else(|| self.record.failure_reason.clone())
                .unwrap_or_else(|| default_failure_reason(self.record.status).to_string());
            self.record.failure_reason = Some(reason.clone());
            warn!(status = %self.record.status, %reason, "Payment did not complete");
            return ReconcileOutcome::Failed {
                status: self.record.status,
                reason,
                retry: self.retry_context(),
            };
        }

        ReconcileOutcome::Pending {
            status: self.record.status,
        }
    }

    /// Resolves the order for a successful payment.
    ///
    /// A record that already carries an order id short-circuits without any
    /// network call. Otherwise finalize is asked once; "not yet" and transport
    /// failures both leave the user with a non-blocking pending-link message.
    #[instrument(skip(self), fields(payment_id = %self.record.id))]
    pub async fn handle_successful_status(&mut self) -> ReconcileOutcome {
        if !self.record.status.is_successful() {
            return ReconcileOutcome::Pending {
                status: self.record.status,
            };
        }

        if let Some(order_id) = self.record.linked_order_id() {
            info!(order_id, "Order already linked, skipping finalize");
            return ReconcileOutcome::OrderReady(FinalizeOutcome::AlreadyLinked {
                order_id: order_id.to_string(),
            });
        }

        let Some(reference) = self
            .record
            .reference
            .clone()
            .filter(|r| !r.trim().is_empty())
        else {
            warn!("Successful payment has no reference to finalize");
            return awaiting_link();
        };

        match self.client.finalize(&reference).await {
            Ok(outcome) => match outcome.order_id() {
                Some(order_id) => {
                    info!(order_id, "Payment linked to order");
                    self.record.order_id = Some(order_id.to_string());
                    ReconcileOutcome::OrderReady(outcome)
                }
                None => {
                    info!("Server has not linked an order yet");
                    awaiting_link()
                }
            },
            Err(e) => {
                warn!(error = %e, "Finalize failed, order link left to the server");
                awaiting_link()
            }
        }
    }
}

/// Terminal statuses stick. The one exception is a failure followed by a
/// success, which the gateway reports when a payment settles late.
fn accepts_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    if to == PaymentStatus::Unknown || to == from {
        return false;
    }
    if from.is_successful() {
        return false;
    }
    if from.is_failure() {
        return to.is_successful();
    }
    true
}

fn awaiting_link() -> ReconcileOutcome {
    ReconcileOutcome::AwaitingOrderLink {
        message: ORDER_LINK_PENDING_MESSAGE.to_string(),
    }
}

fn default_failure_reason(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Timeout => "The payment request timed out",
        PaymentStatus::Cancelled => "The payment was cancelled",
        _ => "The payment could not be completed",
    }
}
