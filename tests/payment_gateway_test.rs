//! Integration tests for the payment gateway client over real HTTP.
//!
//! Tests cover:
//! - Request shape and phone normalization on initiate
//! - The single in-flight initiation guard
//! - Serialized and bounded-wait status checks
//! - Error mapping for non-2xx, malformed and unreachable backends

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use common::{initiate_ok, status_body, TestApp};
use serde_json::json;
use storefront_checkout::{
    errors::{ServiceError, PAYMENT_IN_PROGRESS_MESSAGE},
    models::payment::{
        FinalizeOutcome, InitiatePaymentRequest, PaymentMethod, PaymentStatus, PaymentStatusQuery,
    },
    CheckoutConfig, HttpBackend, PaymentGatewayClient,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn mtn_request() -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        order_id: Some("o1".into()),
        cart: None,
        amount: 11000,
        customer_name: "Aline Uwase".into(),
        customer_email: "aline@example.rw".into(),
        customer_phone: "+250788123456".into(),
        payment_method: PaymentMethod::MtnMomo,
        redirect_url: "http://localhost:8081/payment/status".into(),
        client_reference: None,
    }
}

fn status_query() -> PaymentStatusQuery {
    PaymentStatusQuery {
        payment_id: Some("pay_1".into()),
        reference: Some("R1".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn initiate_sends_normalized_camel_case_body() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/initiate"))
        .and(body_partial_json(json!({
            "orderId": "o1",
            "customerPhone": "0788123456",
            "paymentMethod": "mtn_momo",
            "amount": 11000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(initiate_ok("pay_1", "R1")))
        .expect(1)
        .mount(&app.server)
        .await;

    let response = app.gateway.initiate_payment(mtn_request()).await.unwrap();
    assert!(response.success);
    assert_eq!(response.payment_id.as_deref(), Some("pay_1"));
    assert_eq!(response.reference.as_deref(), Some("R1"));
    assert_eq!(response.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn second_initiate_while_first_in_flight_is_rejected_without_network_call() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/initiate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(initiate_ok("pay_1", "R1"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let gateway = app.gateway.clone();
    let first = tokio::spawn(async move { gateway.initiate_payment(mtn_request()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let second = app.gateway.initiate_payment(mtn_request()).await;
    assert!(started.elapsed() < Duration::from_millis(200));
    let err = second.unwrap_err();
    assert_matches!(err, ServiceError::PaymentInProgress);
    assert_eq!(err.user_message(), PAYMENT_IN_PROGRESS_MESSAGE);

    assert!(first.await.unwrap().is_ok());
    app.server.verify().await;
}

#[tokio::test]
async fn concurrent_status_checks_are_serialized() {
    let app = TestApp::with_status_wait(Duration::from_secs(2)).await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("pending", None))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(2)
        .mount(&app.server)
        .await;

    let started = Instant::now();
    let (a, b) = tokio::join!(
        app.gateway.check_payment_status(status_query()),
        app.gateway.check_payment_status(status_query())
    );
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn status_check_stops_waiting_after_bound() {
    let app = TestApp::with_status_wait(Duration::from_millis(50)).await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("pending", None))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&app.server)
        .await;

    let started = Instant::now();
    let (a, b) = tokio::join!(
        app.gateway.check_payment_status(status_query()),
        app.gateway.check_payment_status(status_query())
    );
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn non_success_status_maps_to_api_error_with_server_message() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/initiate"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "Amount exceeds wallet limit"
        })))
        .mount(&app.server)
        .await;

    let err = app.gateway.initiate_payment(mtn_request()).await.unwrap_err();
    assert_matches!(err, ServiceError::ExternalApiError { status: 400, .. });
    assert_eq!(err.user_message(), "Amount exceeds wallet limit");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn gateway_reported_status_failure_is_an_error() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "status": "unknown",
            "error": "Gateway unavailable"
        })))
        .mount(&app.server)
        .await;

    let err = app
        .gateway
        .check_payment_status(status_query())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Gateway unavailable");
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_body_is_a_serialization_error() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&app.server)
        .await;

    let err = app
        .gateway
        .check_payment_status(status_query())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::SerializationError(_));
}

#[tokio::test]
async fn unreachable_backend_is_transient_and_distinct_from_busy() {
    let mut config = CheckoutConfig::with_base_url("http://127.0.0.1:9");
    config.request_timeout_secs = Some(2);
    let backend = Arc::new(HttpBackend::new(config).unwrap());
    let gateway = PaymentGatewayClient::new(backend, Duration::from_millis(50));

    let err = gateway.check_payment_status(status_query()).await.unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(_));
    assert!(err.is_transient());
    assert_ne!(err.user_message(), PAYMENT_IN_PROGRESS_MESSAGE);
}

#[tokio::test]
async fn finalize_and_payment_lookup() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/kpay/finalize"))
        .and(body_partial_json(json!({ "reference": "R1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "orderId": "o1",
            "alreadyLinked": true
        })))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/payments/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Payment not found" })))
        .mount(&app.server)
        .await;

    assert_eq!(
        app.gateway.finalize("R1").await.unwrap(),
        FinalizeOutcome::AlreadyLinked {
            order_id: "o1".into()
        }
    );
    assert_matches!(
        app.gateway.get_payment("missing").await,
        Err(ServiceError::NotFound(_))
    );
}
