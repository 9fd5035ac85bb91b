use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use laundry_engine::db_types::{Client, DiscountKind, Money, Order, OrderStatus, PaymentStatus, PhoneNumber};
use log::debug;
use serde::Serialize;

use crate::server::extractor_config;

pub async fn get_request<F>(path: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<T, F>(path: &str, body: &T, configure: F) -> Result<(StatusCode, String), String>
where
    T: Serialize,
    F: FnOnce(&mut ServiceConfig),
{
    send_request(TestRequest::post().uri(path).set_json(body), configure).await
}

pub async fn patch_request<T, F>(path: &str, body: &T, configure: F) -> Result<(StatusCode, String), String>
where
    T: Serialize,
    F: FnOnce(&mut ServiceConfig),
{
    send_request(TestRequest::patch().uri(path).set_json(body), configure).await
}

pub async fn delete_request<F>(path: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::delete().uri(path), configure).await
}

/// Posts a raw body, for payloads that are not valid JSON.
pub async fn post_raw<F>(path: &str, body: &'static str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::post().uri(path).insert_header(("content-type", "application/json")).set_payload(body);
    send_request(req, configure).await
}

async fn send_request<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let req = req.to_request();
    let app = App::new().configure(extractor_config).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// The `error` field of a JSON error body.
pub fn error_message(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).expect("Error body was not JSON");
    value["error"].as_str().expect("Error body has no message").to_string()
}

pub fn client() -> Client {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    Client {
        id: 1,
        name: "Alice Wanjiru".into(),
        phone: PhoneNumber::parse("0712345678").unwrap(),
        email: Some("alice@example.com".into()),
        address: None,
        notes: None,
        created_at: ts,
        updated_at: ts,
    }
}

/// A received, unpaid order for 800 shillings.
pub fn order() -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    Order {
        id: 12,
        order_number: "LND-240601-0003".into(),
        client_id: 1,
        client_name: "Alice Wanjiru".into(),
        client_phone: PhoneNumber::parse("0712345678").unwrap(),
        subtotal: Money::from_shillings(800),
        discount_kind: DiscountKind::None,
        discount_value: 0.0,
        discount_amount: Money::default(),
        total: Money::from_shillings(800),
        amount_paid: Money::default(),
        status: OrderStatus::Received,
        payment_status: PaymentStatus::Unpaid,
        payment_method: None,
        notes: None,
        due_date: None,
        created_at: ts,
        updated_at: ts,
        items: vec![],
    }
}
