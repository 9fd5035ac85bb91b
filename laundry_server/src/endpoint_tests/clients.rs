use actix_web::{http::StatusCode, web};
use laundry_engine::{
    db_types::PhoneNumber,
    lms_api::client_objects::NewClientRequest,
    traits::ClientApiError,
    ClientApi,
};
use mockall::predicate::eq;

use super::{
    helpers::{client, delete_request, error_message, get_request, post_request},
    mocks::MockBackend,
};
use crate::routes::{ClientByIdRoute, CreateClientRoute, DeleteClientRoute};

fn client_routes(cfg: &mut web::ServiceConfig, backend: MockBackend) {
    let api = ClientApi::new(backend);
    cfg.service(ClientByIdRoute::<MockBackend>::new())
        .service(CreateClientRoute::<MockBackend>::new())
        .service(DeleteClientRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn fetch_client() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_client().with(eq(1)).returning(|_| Ok(Some(client())));
    let (status, body) = get_request("/clients/1", |cfg| client_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["name"], "Alice Wanjiru");
    assert_eq!(value["phone"], "254712345678");
}

#[actix_web::test]
async fn fetch_missing_client() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_client().returning(|_| Ok(None));
    let (status, body) = get_request("/clients/99", |cfg| client_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Client 99");
}

#[actix_web::test]
async fn client_id_must_be_a_number() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request("/clients/alice", |cfg| client_routes(cfg, MockBackend::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&body).is_empty());
}

#[actix_web::test]
async fn new_client_with_a_bad_phone_number() {
    let _ = env_logger::try_init().ok();
    // No storage calls are expected. The mock panics if the request reaches it.
    let request = NewClientRequest::new("Alice Wanjiru", "12345");
    let (status, body) =
        post_request("/clients", &request, |cfg| client_routes(cfg, MockBackend::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("12345"));
}

#[actix_web::test]
async fn new_client_with_a_taken_phone_number() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_insert_client()
        .withf(|c| c.name == "Alice Wanjiru" && c.phone.as_str() == "254712345678")
        .returning(|c| Err(ClientApiError::DuplicatePhone(c.phone)));
    let request = NewClientRequest::new(" Alice Wanjiru ", "+254 712 345 678");
    let (status, body) =
        post_request("/clients", &request, |cfg| client_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    let phone = PhoneNumber::parse("0712345678").unwrap();
    assert_eq!(error_message(&body), format!("A client with phone number {phone} already exists"));
}

#[actix_web::test]
async fn new_client() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_client().returning(|_| Ok(client()));
    let request = NewClientRequest::new("Alice Wanjiru", "0712345678");
    let (status, body) =
        post_request("/clients", &request, |cfg| client_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["id"], 1);
}

#[actix_web::test]
async fn clients_with_orders_are_kept() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_delete_client().with(eq(1)).returning(|id| Err(ClientApiError::ClientHasOrders(id)));
    let (status, body) = delete_request("/clients/1", |cfg| client_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error_message(&body).contains("has orders"));
}
