use actix_web::{http::StatusCode, web};
use chrono::{TimeZone, Utc};
use laundry_engine::{
    db_types::{Money, StkRequest, StkStatus},
    events::EventProducers,
    lms_api::payment_objects::InitiatePaymentRequest,
    traits::{GatewayError, PaymentFlowError, StkQueryOutcome},
    PaymentFlowApi,
};
use mockall::predicate::eq;

use super::{
    helpers::{error_message, get_request, order, post_raw, post_request},
    mocks::{MockBackend, MockDaraja},
};
use crate::routes::{c2b_validation, C2bConfirmationRoute, StkCallbackRoute, StkPushRoute, StkStatusRoute};

const ACK: &str = r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#;

const CANCELLED_CALLBACK: &str = r#"{"Body":{"stkCallback":{"MerchantRequestID":"29115-34620561-1",
    "CheckoutRequestID":"ws_CO_191220191020363925","ResultCode":1032,"ResultDesc":"Request cancelled by user"}}}"#;

fn c2b_payload(amount: &str) -> serde_json::Value {
    serde_json::json!({
        "TransactionType": "Pay Bill",
        "TransID": "RKTQDM7W6S",
        "TransTime": "20240601101530",
        "TransAmount": amount,
        "BusinessShortCode": "600638",
        "BillRefNumber": "LND-240601-0003",
        "MSISDN": "254712345678",
        "FirstName": "ALICE",
        "LastName": "WANJIRU"
    })
}

fn pending_request() -> StkRequest {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();
    StkRequest {
        id: 3,
        checkout_request_id: "ws_CO_010620240905".into(),
        merchant_request_id: "29115-1".into(),
        order_id: 12,
        phone: order().client_phone,
        amount: Money::from_shillings(800),
        status: StkStatus::Pending,
        result_code: None,
        result_desc: None,
        mpesa_receipt: None,
        created_at: ts,
        updated_at: ts,
    }
}

fn mpesa_routes(cfg: &mut web::ServiceConfig, backend: MockBackend, gateway: MockDaraja) {
    let api = PaymentFlowApi::new(backend, gateway, EventProducers::default());
    cfg.service(StkPushRoute::<MockBackend, MockDaraja>::new())
        .service(StkStatusRoute::<MockBackend, MockDaraja>::new())
        .service(StkCallbackRoute::<MockBackend, MockDaraja>::new())
        .service(c2b_validation)
        .service(C2bConfirmationRoute::<MockBackend, MockDaraja>::new())
        .app_data(web::Data::new(api));
}

fn payment_request(amount: Option<i64>) -> InitiatePaymentRequest {
    InitiatePaymentRequest { order_id: 12, phone: None, amount: amount.map(Money::from_shillings) }
}

#[actix_web::test]
async fn stk_push_when_mpesa_is_down() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().with(eq(12)).returning(|_| Ok(Some(order())));
    backend.expect_fetch_pending_stk_request_for_order().returning(|_| Ok(None));
    let mut gateway = MockDaraja::new();
    gateway
        .expect_stk_push()
        .withf(|r| r.amount == 800 && r.account_reference == "LND-240601-0003")
        .returning(|_| Err(GatewayError::Unavailable("Connection timed out".into())));
    let (status, body) =
        post_request("/mpesa/stk_push", &payment_request(None), |cfg| mpesa_routes(cfg, backend, gateway))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("Connection timed out"));
}

#[actix_web::test]
async fn stk_push_for_more_than_the_balance() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order())));
    backend.expect_fetch_pending_stk_request_for_order().returning(|_| Ok(None));
    let (status, body) = post_request("/mpesa/stk_push", &payment_request(Some(900)), |cfg| {
        mpesa_routes(cfg, backend, MockDaraja::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("LND-240601-0003"));
}

#[actix_web::test]
async fn stk_push_while_another_is_pending() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order())));
    backend.expect_fetch_pending_stk_request_for_order().with(eq(12)).returning(|_| Ok(Some(pending_request())));
    let (status, body) = post_request("/mpesa/stk_push", &payment_request(None), |cfg| {
        mpesa_routes(cfg, backend, MockDaraja::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error_message(&body).contains("ws_CO_010620240905"));
}

#[actix_web::test]
async fn stk_status_of_an_unknown_request() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_stk_request().returning(|_| Ok(None));
    let (status, _) = get_request("/mpesa/stk/ws_CO_unknown", |cfg| mpesa_routes(cfg, backend, MockDaraja::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn refreshing_a_pending_request() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_stk_request()
        .withf(|id| id.to_string() == "ws_CO_010620240905")
        .returning(|_| Ok(Some(pending_request())));
    let mut gateway = MockDaraja::new();
    gateway.expect_stk_query().returning(|_| Ok(StkQueryOutcome::Pending));
    let (status, body) =
        get_request("/mpesa/stk/ws_CO_010620240905?refresh=true", |cfg| mpesa_routes(cfg, backend, gateway))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "Pending");
}

#[actix_web::test]
async fn stk_callback_is_acknowledged_when_it_cannot_be_applied() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_resolve_stk_request()
        .withf(|id, r| id.to_string() == "ws_CO_191220191020363925" && r.result_code == 1032)
        .returning(|id, _| Err(PaymentFlowError::StkRequestNotFound(id.to_string())));
    let callback: serde_json::Value = serde_json::from_str(CANCELLED_CALLBACK).unwrap();
    let (status, body) = post_request("/stk_callback", &callback, |cfg| mpesa_routes(cfg, backend, MockDaraja::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn malformed_stk_callback() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_raw("/stk_callback", r#"{"Body": {"stk"#, |cfg| mpesa_routes(cfg, MockBackend::new(), MockDaraja::new()))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"));
}

#[actix_web::test]
async fn c2b_validation_accepts_everything() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/c2b/validation", &c2b_payload("450.00"), |cfg| {
        mpesa_routes(cfg, MockBackend::new(), MockDaraja::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn c2b_confirmation_without_an_amount_is_not_stored() {
    let _ = env_logger::try_init().ok();
    // Nothing may reach storage
    let (status, body) = post_request("/c2b/confirmation", &c2b_payload("0.00"), |cfg| {
        mpesa_routes(cfg, MockBackend::new(), MockDaraja::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn c2b_confirmation_is_acknowledged_when_storage_fails() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_insert_mpesa_transaction()
        .withf(|tx| tx.transaction_id == "RKTQDM7W6S" && tx.amount == Money::from_shillings(450))
        .times(1)
        .returning(|_| Err(PaymentFlowError::DatabaseError("database is locked".into())));
    let (status, body) = post_request("/c2b/confirmation", &c2b_payload("450.00"), |cfg| {
        mpesa_routes(cfg, backend, MockDaraja::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}
