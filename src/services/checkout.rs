use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::errors::ServiceError;
use crate::models::cart::{CartLineItem, OrderTotals};
use crate::models::checkout_form::{CheckoutForm, FormField};
use crate::models::order::{NewOrder, NewOrderItem, Order, OrderPayload, OrderStatus};
use crate::models::payment::{
    CartSnapshot, InitiatePaymentRequest, PaymentMethod, PaymentMethodInfo, PaymentRecord,
};
use crate::models::settings::CheckoutAvailability;
use crate::repositories::{AuthRepository, CartRepository};
use crate::services::cart_snapshot::{build_line_items, compute_totals};
use crate::services::ordering_gate::{can_checkout, OrderingGate, SettingsSource};
use crate::services::payment_gateway::PaymentGatewayClient;
use crate::services::phone::format_phone_number;
use crate::services::reconciliation::{ReconcileOutcome, RetryContext};
use crate::services::validation::validate_checkout_form;

/// Order creation endpoint.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn create_order(&self, payload: &OrderPayload) -> Result<Order, ServiceError>;
}

/// A gateway payment waiting for confirmation on the status view.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayment {
    pub payment_id: String,
    pub reference: Option<String>,
    pub checkout_url: Option<String>,
    pub message: Option<String>,
    pub record: PaymentRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Cash on delivery: the order exists and the cart has been cleared.
    OrderPlaced(Order),
    /// Gateway payment started; the order is created once the payment succeeds.
    AwaitingPayment(PendingPayment),
}

/// Order assembly and submission.
///
/// This is the only component that clears the cart, and it does so only
/// after the server has confirmed an order.
pub struct CheckoutService {
    config: CheckoutConfig,
    orders: Arc<dyn OrderBackend>,
    gateway: Arc<PaymentGatewayClient>,
    cart: Arc<dyn CartRepository>,
    auth: Arc<dyn AuthRepository>,
    settings: Option<Arc<dyn SettingsSource>>,
    gate: Option<OrderingGate>,
}

impl CheckoutService {
    pub fn new(
        config: CheckoutConfig,
        orders: Arc<dyn OrderBackend>,
        gateway: Arc<PaymentGatewayClient>,
        cart: Arc<dyn CartRepository>,
        auth: Arc<dyn AuthRepository>,
    ) -> Self {
        Self {
            config,
            orders,
            gateway,
            cart,
            auth,
            settings: None,
            gate: None,
        }
    }

    pub fn with_ordering_gate(mut self, gate: OrderingGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_settings_source(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn payment_methods(&self) -> Vec<PaymentMethodInfo> {
        self.gateway.payment_methods()
    }

    /// Canonical line items for the current cart.
    #[instrument(skip(self))]
    pub async fn snapshot_cart(&self) -> Result<Vec<CartLineItem>, ServiceError> {
        let raw = self.cart.snapshot().await?;
        Ok(build_line_items(&raw))
    }

    pub fn quote(&self, items: &[CartLineItem]) -> Result<OrderTotals, ServiceError> {
        compute_totals(items, self.config.delivery_fee)
    }

    /// Fetches the ordering flags. An unreachable settings endpoint allows checkout.
    #[instrument(skip(self))]
    pub async fn availability(&self) -> CheckoutAvailability {
        if let Some(settings) = &self.settings {
            return match settings.fetch_ordering_flags().await {
                Ok(flags) => flags.decision(),
                Err(e) => {
                    warn!(error = %e, "Could not fetch ordering flags, allowing checkout");
                    can_checkout(None, None)
                }
            };
        }
        match &self.gate {
            Some(gate) => gate.current(),
            None => can_checkout(None, None),
        }
    }

    /// Refuses submission while ordering is blocked. An attached gate is
    /// authoritative; otherwise the settings source is asked.
    async fn ensure_ordering_allowed(&self) -> Result<(), ServiceError> {
        let availability = match &self.gate {
            Some(gate) => gate.current(),
            None => self.availability().await,
        };
        if availability.allowed {
            return Ok(());
        }
        let message = availability
            .message
            .unwrap_or_else(|| "Ordering is currently unavailable".to_string());
        info!(%message, "Checkout blocked by ordering flags");
        Err(ServiceError::OrderingDisabled(message))
    }

    fn validate_submission(
        form: &CheckoutForm,
        items: &[CartLineItem],
        method: PaymentMethod,
    ) -> Result<(), ServiceError> {
        let mut errors = validate_checkout_form(form, method);
        if items.is_empty() {
            errors.add(FormField::Cart, "Your cart is empty");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            info!(fields = errors.len(), "Checkout form rejected");
            Err(ServiceError::InvalidForm(errors))
        }
    }

    /// Builds the `{order, items}` payload for the order endpoint.
    pub fn build_order_payload(
        &self,
        form: &CheckoutForm,
        items: &[CartLineItem],
        method: PaymentMethod,
        user_id: Option<String>,
    ) -> Result<OrderPayload, ServiceError> {
        let totals = self.quote(items)?;
        let order_items = items
            .iter()
            .map(NewOrderItem::from_line_item)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ServiceError::InvalidInput("Order total is too large".to_string()))?;

        Ok(OrderPayload {
            order: NewOrder {
                user_id,
                customer_name: form.customer_name(),
                customer_email: form.email.trim().to_string(),
                customer_phone: format_phone_number(form.phone.trim()),
                delivery_address: form.delivery_address(),
                delivery_notes: non_blank(form.delivery_notes.as_deref()),
                payment_method: method,
                status: OrderStatus::Pending,
                currency: self.config.currency.clone(),
                subtotal: totals.subtotal,
                delivery_fee: totals.delivery_fee,
                total: totals.total,
            },
            items: order_items,
        })
    }

    /// Submits one checkout confirmation.
    ///
    /// Cash on delivery creates the order now and clears the cart on success.
    /// Every other method starts a gateway payment carrying the cart snapshot;
    /// the order is created later, once the payment is confirmed.
    #[instrument(skip(self, form, items), fields(method = %method, items = items.len()))]
    pub async fn submit_order(
        &self,
        form: &CheckoutForm,
        items: &[CartLineItem],
        method: PaymentMethod,
    ) -> Result<SubmitOutcome, ServiceError> {
        self.ensure_ordering_allowed().await?;
        Self::validate_submission(form, items, method)?;

        if method.uses_gateway() {
            return self.start_cart_payment(form, items, method).await;
        }

        let user_id = self.auth.current_user().await?.map(|user| user.id);
        let payload = self.build_order_payload(form, items, method, user_id)?;

        let order = match self.orders.create_order(&payload).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Order creation failed, cart preserved");
                return Err(e);
            }
        };

        info!(order_id = %order.id, order_number = %order.order_number, total = order.total, "Order placed");
        if let Err(e) = self.cart.clear().await {
            error!(order_id = %order.id, error = %e, "Order placed but cart could not be cleared");
        }
        Ok(SubmitOutcome::OrderPlaced(order))
    }

    async fn start_cart_payment(
        &self,
        form: &CheckoutForm,
        items: &[CartLineItem],
        method: PaymentMethod,
    ) -> Result<SubmitOutcome, ServiceError> {
        let totals = self.quote(items)?;
        let snapshot = CartSnapshot {
            items: items.to_vec(),
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            delivery_address: form.delivery_address(),
            delivery_notes: non_blank(form.delivery_notes.as_deref()),
        };
        let mut request = self.payment_request(form, method, totals.total);
        request.cart = Some(snapshot);
        request.client_reference = Some(format!("CHK-{}", Uuid::new_v4()));

        self.initiate(form, request).await
    }

    /// Starts a new payment for a context whose previous payment failed.
    ///
    /// The previous payment is fetched again first. If it succeeded late, the
    /// new attempt is refused with [`ServiceError::Conflict`].
    #[instrument(skip(self, form, items, context), fields(previous = %context.previous_payment_id, method = %method))]
    pub async fn retry_payment(
        &self,
        form: &CheckoutForm,
        items: &[CartLineItem],
        context: &RetryContext,
        method: PaymentMethod,
    ) -> Result<SubmitOutcome, ServiceError> {
        match self.gateway.get_payment(&context.previous_payment_id).await {
            Ok(previous) if previous.status.is_successful() => {
                warn!(
                    order_id = ?previous.order_id,
                    "Previous payment already succeeded, refusing a second payment"
                );
                return Err(ServiceError::Conflict(
                    "This order has already been paid".to_string(),
                ));
            }
            Ok(_) | Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let Some(order_id) = context.order_id.clone() else {
            return self.submit_order(form, items, method).await;
        };

        self.ensure_ordering_allowed().await?;
        if !method.uses_gateway() {
            return Err(ServiceError::InvalidInput(
                "An existing order can only be paid through the payment gateway".to_string(),
            ));
        }
        let errors = validate_checkout_form(form, method);
        if !errors.is_empty() {
            return Err(ServiceError::InvalidForm(errors));
        }

        let mut request = self.payment_request(form, method, context.amount);
        request.order_id = Some(order_id);
        self.initiate(form, request).await
    }

    fn payment_request(
        &self,
        form: &CheckoutForm,
        method: PaymentMethod,
        amount: i64,
    ) -> InitiatePaymentRequest {
        let name = form.customer_name();
        InitiatePaymentRequest {
            order_id: None,
            cart: None,
            amount,
            customer_name: if name.is_empty() {
                form.email.trim().to_string()
            } else {
                name
            },
            customer_email: form.email.trim().to_string(),
            customer_phone: form.phone.trim().to_string(),
            payment_method: method,
            redirect_url: self.config.redirect_url(),
            client_reference: None,
        }
    }

    async fn initiate(
        &self,
        form: &CheckoutForm,
        request: InitiatePaymentRequest,
    ) -> Result<SubmitOutcome, ServiceError> {
        let amount = request.amount;
        let method = request.payment_method;
        let order_id = request.order_id.clone();
        let response = self.gateway.initiate_payment(request).await?;

        let reference = response.reference.clone();
        let payment_id = response
            .payment_id
            .clone()
            .or_else(|| reference.clone())
            .unwrap_or_default();

        let mut record = PaymentRecord::pending(
            payment_id.clone(),
            reference.clone(),
            amount,
            self.config.currency.clone(),
            method,
        );
        record.order_id = order_id;
        record.customer_name = Some(form.customer_name()).filter(|n| !n.is_empty());
        record.customer_email = Some(form.email.trim().to_string());
        record.customer_phone = Some(format_phone_number(form.phone.trim()));

        Ok(SubmitOutcome::AwaitingPayment(PendingPayment {
            payment_id,
            reference,
            checkout_url: response.checkout_url,
            message: response.message,
            record,
        }))
    }

    /// Clears the cart once reconciliation reports an order bound to the payment.
    /// Returns the order id, or `None` when no order is linked yet.
    #[instrument(skip(self, outcome))]
    pub async fn complete_linked_order(
        &self,
        outcome: &ReconcileOutcome,
    ) -> Result<Option<String>, ServiceError> {
        let Some(order_id) = outcome.order_id() else {
            return Ok(None);
        };
        self.cart.clear().await?;
        info!(order_id, "Gateway order confirmed, cart cleared");
        Ok(Some(order_id.to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
