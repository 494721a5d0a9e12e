#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use storefront_checkout::{
    errors::ServiceError,
    models::{
        cart::RawCartEntry,
        checkout_form::CheckoutForm,
        order::{Order, OrderPayload, OrderStatus},
    },
    repositories::{InMemoryAuthRepository, InMemoryCartRepository},
    CheckoutConfig, CheckoutService, HttpBackend, OrderBackend, PaymentGatewayClient,
};
use tokio::sync::Mutex;
use wiremock::MockServer;

/// Harness wiring the real HTTP backend against a wiremock server.
pub struct TestApp {
    pub server: MockServer,
    pub config: CheckoutConfig,
    pub backend: Arc<HttpBackend>,
    pub gateway: Arc<PaymentGatewayClient>,
    pub cart: Arc<InMemoryCartRepository>,
    pub orders: Arc<FakeOrders>,
    pub checkout: CheckoutService,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_status_wait(Duration::from_millis(200)).await
    }

    pub async fn with_status_wait(wait: Duration) -> Self {
        let server = MockServer::start().await;
        let mut config = CheckoutConfig::with_base_url(server.uri());
        config.status_check_wait_ms = wait.as_millis() as u64;

        let backend = Arc::new(HttpBackend::new(config.clone()).expect("http backend"));
        let gateway = Arc::new(PaymentGatewayClient::new(backend.clone(), wait));
        let cart = Arc::new(InMemoryCartRepository::new(sample_cart()));
        let orders = Arc::new(FakeOrders::default());
        let checkout = CheckoutService::new(
            config.clone(),
            orders.clone(),
            gateway.clone(),
            cart.clone(),
            Arc::new(InMemoryAuthRepository::signed_in("user-1")),
        );

        Self {
            server,
            config,
            backend,
            gateway,
            cart,
            orders,
            checkout,
        }
    }
}

/// Order backend that records payloads and can be told to refuse.
#[derive(Default)]
pub struct FakeOrders {
    pub received: Mutex<Vec<OrderPayload>>,
    pub refuse_with: Mutex<Option<String>>,
}

impl FakeOrders {
    pub async fn refuse(&self, message: &str) {
        *self.refuse_with.lock().await = Some(message.to_string());
    }

    pub async fn calls(&self) -> usize {
        self.received.lock().await.len()
    }
}

#[async_trait]
impl OrderBackend for FakeOrders {
    async fn create_order(&self, payload: &OrderPayload) -> Result<Order, ServiceError> {
        self.received.lock().await.push(payload.clone());
        if let Some(message) = self.refuse_with.lock().await.clone() {
            return Err(ServiceError::OrderError(message));
        }
        let count = self.received.lock().await.len();
        Ok(Order {
            id: format!("o{}", count),
            order_number: format!("ORD-{:04}", 1000 + count),
            user_id: payload.order.user_id.clone(),
            items: Vec::new(),
            subtotal: payload.order.subtotal,
            delivery_fee: payload.order.delivery_fee,
            total: payload.order.total,
            customer_name: Some(payload.order.customer_name.clone()),
            customer_email: Some(payload.order.customer_email.clone()),
            customer_phone: Some(payload.order.customer_phone.clone()),
            delivery_address: Some(payload.order.delivery_address.clone()),
            status: OrderStatus::Pending,
            payment_method: Some(payload.order.payment_method),
            delivery_notes: payload.order.delivery_notes.clone(),
            created_at: None,
        })
    }
}

pub fn sample_cart() -> Vec<RawCartEntry> {
    vec![serde_json::from_value(json!({
        "product": { "id": "p1", "name": "Rice 5kg", "price": 5000 },
        "quantity": 2
    }))
    .expect("cart entry")]
}

pub fn valid_form() -> CheckoutForm {
    CheckoutForm {
        email: "aline@example.rw".into(),
        first_name: "Aline".into(),
        last_name: "Uwase".into(),
        address: "KG 11 Ave".into(),
        city: "Kigali".into(),
        phone: "0788123456".into(),
        delivery_notes: Some("Call on arrival".into()),
    }
}

pub fn initiate_ok(payment_id: &str, reference: &str) -> Value {
    json!({
        "success": true,
        "paymentId": payment_id,
        "reference": reference,
        "status": "pending",
        "message": "Confirm the payment on your phone"
    })
}

pub fn status_body(status: &str, order_id: Option<&str>) -> Value {
    json!({
        "success": true,
        "status": status,
        "amount": 11000,
        "currency": "RWF",
        "reference": "R1",
        "orderId": order_id,
        "needsUpdate": false
    })
}
