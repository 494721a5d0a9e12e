use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::cart::{CartLineItem, OrderTotals};
use super::payment::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Order header sent to the order creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub currency: String,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
}

impl NewOrderItem {
    /// Returns `None` when the line total overflows.
    pub fn from_line_item(item: &CartLineItem) -> Option<Self> {
        Some(Self {
            product_id: item.product_id.clone(),
            product_name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total()?,
            sku: item.sku.clone(),
            variation_id: item.variation_id.clone(),
            variation_name: item.variation_name.clone(),
        })
    }
}

/// Body of the order creation call: `{order, items}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub order: NewOrder,
    pub items: Vec<NewOrderItem>,
}

impl OrderPayload {
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.order.subtotal,
            delivery_fee: self.order.delivery_fee,
            total: self.order.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(alias = "product_id")]
    pub product_id: String,
    #[serde(default, alias = "product_name")]
    pub product_name: String,
    pub quantity: i64,
    #[serde(alias = "unit_price")]
    pub unit_price: i64,
    #[serde(default, alias = "variation_id")]
    pub variation_id: Option<String>,
}

/// Order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(alias = "order_number")]
    pub order_number: String,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    #[serde(default, alias = "delivery_fee")]
    pub delivery_fee: i64,
    pub total: i64,
    #[serde(default, alias = "customer_name")]
    pub customer_name: Option<String>,
    #[serde(default, alias = "customer_email")]
    pub customer_email: Option<String>,
    #[serde(default, alias = "customer_phone")]
    pub customer_phone: Option<String>,
    #[serde(default, alias = "delivery_address")]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, alias = "delivery_notes")]
    pub delivery_notes: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}
