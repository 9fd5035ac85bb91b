use actix_web::{http::StatusCode, web};
use chrono::Utc;
use laundry_engine::{
    db_types::{SmsRecord, SmsStatus},
    lms_api::sms_objects::SmsRequest,
    traits::{GatewayError, SmsDelivery},
    NotificationApi,
};

use super::{
    helpers::{error_message, post_request},
    mocks::{MockBackend, MockTextMessenger},
};
use crate::routes::SendSmsRoute;

fn sms_routes(cfg: &mut web::ServiceConfig, backend: MockBackend, gateway: MockTextMessenger) {
    let api = NotificationApi::new(backend, gateway, "Sparkle Laundry");
    cfg.service(SendSmsRoute::<MockBackend, MockTextMessenger>::new()).app_data(web::Data::new(api));
}

fn logging_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_insert_sms_record().returning(|r| {
        Ok(SmsRecord {
            id: 1,
            recipient: r.recipient,
            message: r.message,
            status: r.status,
            provider_message_id: r.provider_message_id,
            cost: r.cost,
            error: r.error,
            order_id: r.order_id,
            created_at: Utc::now(),
        })
    });
    backend
}

#[actix_web::test]
async fn empty_messages_are_refused() {
    let _ = env_logger::try_init().ok();
    let request = SmsRequest::new(vec!["0712345678".into()], "   ");
    let (status, body) = post_request("/sms", &request, |cfg| {
        sms_routes(cfg, MockBackend::new(), MockTextMessenger::new())
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Cannot send an empty message");
}

#[actix_web::test]
async fn invalid_numbers_are_skipped() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockTextMessenger::new();
    gateway
        .expect_send_sms()
        .withf(|to, msg| {
            let to = to.iter().map(|p| p.as_str()).collect::<Vec<_>>();
            to == ["254712345678"] && msg.to_string() == "Your order is ready"
        })
        .times(1)
        .returning(|to, _| Ok(vec![SmsDelivery::sent(to[0].as_str(), Some("ATXid_1".into()), None)]));
    let request = SmsRequest::new(vec!["0712345678".into(), "12345".into()], "Your order is ready");
    let (status, body) = post_request("/sms", &request, |cfg| sms_routes(cfg, logging_backend(), gateway))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["sent"], 1);
    assert_eq!(value["skipped"], 1);
    assert_eq!(value["failed"], 0);
}

#[actix_web::test]
async fn gateway_failures_are_logged_per_recipient() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockTextMessenger::new();
    gateway.expect_send_sms().returning(|_, _| Err(GatewayError::Unavailable("HTTP 503".into())));
    let request = SmsRequest::new(vec!["0712345678".into(), "0722000111".into()], "Hello");
    let (status, body) = post_request("/sms", &request, |cfg| sms_routes(cfg, logging_backend(), gateway))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["failed"], 2);
    assert_eq!(value["records"][0]["status"], SmsStatus::Failed.to_string());
}
