use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use validator::{Validate, ValidationError};

use super::cart::CartLineItem;

pub const MTN_PREFIXES: &[&str] = &["078", "077", "076", "079"];
pub const AIRTEL_PREFIXES: &[&str] = &["073", "072", "070"];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    MtnMomo,
    AirtelMoney,
    VisaCard,
    Mastercard,
    Spenn,
}

/// Entry of the method catalog shown at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfo {
    pub method: PaymentMethod,
    pub display_name: &'static str,
    pub requires_phone: bool,
    pub operator_prefixes: &'static [&'static str],
}

impl PaymentMethod {
    pub fn is_mobile_money(self) -> bool {
        matches!(self, PaymentMethod::MtnMomo | PaymentMethod::AirtelMoney)
    }

    /// Every method except cash goes through the gateway.
    pub fn uses_gateway(self) -> bool {
        self != PaymentMethod::CashOnDelivery
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::MtnMomo => "MTN Mobile Money",
            PaymentMethod::AirtelMoney => "Airtel Money",
            PaymentMethod::VisaCard => "Visa Card",
            PaymentMethod::Mastercard => "Mastercard",
            PaymentMethod::Spenn => "SPENN",
        }
    }

    /// Operator name used in phone validation messages.
    pub fn operator_name(self) -> Option<&'static str> {
        match self {
            PaymentMethod::MtnMomo => Some("MTN"),
            PaymentMethod::AirtelMoney => Some("Airtel"),
            _ => None,
        }
    }

    pub fn operator_prefixes(self) -> &'static [&'static str] {
        match self {
            PaymentMethod::MtnMomo => MTN_PREFIXES,
            PaymentMethod::AirtelMoney => AIRTEL_PREFIXES,
            _ => &[],
        }
    }

    pub fn info(self) -> PaymentMethodInfo {
        PaymentMethodInfo {
            method: self,
            display_name: self.display_name(),
            requires_phone: self.is_mobile_money(),
            operator_prefixes: self.operator_prefixes(),
        }
    }

    pub fn catalog() -> Vec<PaymentMethodInfo> {
        PaymentMethod::iter().map(PaymentMethod::info).collect()
    }
}

/// Canonical payment status. Gateway spellings are folded in by `from_gateway`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Successful,
    Failed,
    Timeout,
    Cancelled,
    #[default]
    Unknown,
}

impl PaymentStatus {
    pub fn from_gateway(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "processing" | "initiated" | "in_progress" | "03" => Self::Pending,
            "completed" | "complete" => Self::Completed,
            "successful" | "success" | "succeeded" | "paid" | "01" => Self::Successful,
            "failed" | "failure" | "declined" | "rejected" | "error" | "02" => Self::Failed,
            "timeout" | "timed_out" | "expired" => Self::Timeout,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn is_successful(self) -> bool {
        matches!(self, Self::Completed | Self::Successful)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout | Self::Cancelled)
    }

    pub fn is_terminal(self) -> bool {
        self.is_successful() || self.is_failure()
    }
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        PaymentStatus::from_gateway(&raw)
    }
}

impl From<Option<String>> for PaymentStatus {
    fn from(raw: Option<String>) -> Self {
        raw.map(PaymentStatus::from).unwrap_or_default()
    }
}

/// Payment as owned by the server and observed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    #[serde(default, alias = "order_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(
        default,
        alias = "gateway_transaction_id",
        alias = "transactionId",
        alias = "transaction_id"
    )]
    pub gateway_transaction_id: Option<String>,
    #[serde(default, alias = "customer_name")]
    pub customer_name: Option<String>,
    #[serde(default, alias = "customer_email")]
    pub customer_email: Option<String>,
    #[serde(default, alias = "customer_phone")]
    pub customer_phone: Option<String>,
    #[serde(default, alias = "failure_reason")]
    pub failure_reason: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Record held locally right after a successful initiate.
    pub fn pending(
        id: impl Into<String>,
        reference: Option<String>,
        amount: i64,
        currency: impl Into<String>,
        method: PaymentMethod,
    ) -> Self {
        Self {
            id: id.into(),
            order_id: None,
            amount,
            currency: currency.into(),
            payment_method: Some(method),
            status: PaymentStatus::Pending,
            reference,
            gateway_transaction_id: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            failure_reason: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn linked_order_id(&self) -> Option<&str> {
        self.order_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// The id is left out when it only echoes the reference, which happens
    /// when the gateway answered initiate without a payment id.
    pub fn status_query(&self) -> PaymentStatusQuery {
        let payment_id = Some(self.id.clone())
            .filter(|id| !id.trim().is_empty() && self.reference.as_deref() != Some(id.as_str()));
        PaymentStatusQuery {
            payment_id,
            transaction_id: self.gateway_transaction_id.clone(),
            reference: self.reference.clone(),
        }
    }
}

/// Cart carried by a payment that precedes order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub total: i64,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_notes: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_local_phone(phone: &str) -> Result<(), ValidationError> {
    if crate::services::phone::is_canonical_local(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must match 07XXXXXXXX".into());
        Err(err)
    }
}

/// A payment is anchored to exactly one of an existing order or a cart snapshot.
fn validate_anchor(request: &InitiatePaymentRequest) -> Result<(), ValidationError> {
    let has_order = request
        .order_id
        .as_deref()
        .map_or(false, |id| !id.trim().is_empty());
    let has_cart = request
        .cart
        .as_ref()
        .map_or(false, |cart| !cart.items.is_empty());

    if has_order == has_cart {
        let mut err = ValidationError::new("anchor");
        err.message = Some("Exactly one of orderId or a non-empty cart is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_anchor"))]
pub struct InitiatePaymentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartSnapshot>,
    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount: i64,
    #[validate(custom = "validate_not_blank")]
    pub customer_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: String,
    #[validate(custom = "validate_local_phone")]
    pub customer_phone: String,
    pub payment_method: PaymentMethod,
    #[validate(custom = "validate_not_blank")]
    pub redirect_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub success: bool,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl PaymentStatusQuery {
    pub fn is_empty(&self) -> bool {
        [&self.payment_id, &self.transaction_id, &self.reference]
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub needs_update: bool,
    #[serde(default)]
    pub kpay_status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PaymentStatusResponse {
    /// The status word wins; the numeric gateway code fills in when the word is unknown.
    pub fn effective_status(&self) -> PaymentStatus {
        match (self.status, self.kpay_status.as_deref()) {
            (PaymentStatus::Unknown, Some(code)) => PaymentStatus::from_gateway(code),
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub already_linked: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Who linked the order, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized { order_id: String },
    NotYetLinked,
    AlreadyLinked { order_id: String },
}

impl FinalizeOutcome {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            FinalizeOutcome::Finalized { order_id } | FinalizeOutcome::AlreadyLinked { order_id } => {
                Some(order_id)
            }
            FinalizeOutcome::NotYetLinked => None,
        }
    }
}

impl From<FinalizeResponse> for FinalizeOutcome {
    fn from(response: FinalizeResponse) -> Self {
        match response.order_id.filter(|id| !id.trim().is_empty()) {
            Some(order_id) if response.already_linked => FinalizeOutcome::AlreadyLinked { order_id },
            Some(order_id) if response.success => FinalizeOutcome::Finalized { order_id },
            Some(order_id) => FinalizeOutcome::AlreadyLinked { order_id },
            None => FinalizeOutcome::NotYetLinked,
        }
    }
}
