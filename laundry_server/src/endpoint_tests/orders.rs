use actix_web::{http::StatusCode, web};
use laundry_engine::{
    db_types::OrderStatus,
    events::EventProducers,
    lms_api::order_objects::{Cart, StatusUpdateRequest},
    traits::OrderFlowError,
    OrderFlowApi,
};
use mockall::predicate::eq;

use super::{
    helpers::{error_message, get_request, order, patch_request, post_request},
    mocks::MockBackend,
};
use crate::routes::{OrderByIdRoute, OrderByNumberRoute, OrdersRoute, QuoteRoute, UpdateOrderStatusRoute};

fn order_routes(cfg: &mut web::ServiceConfig, backend: MockBackend) {
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(QuoteRoute::<MockBackend>::new())
        .service(OrderByNumberRoute::<MockBackend>::new())
        .service(OrdersRoute::<MockBackend>::new())
        .service(OrderByIdRoute::<MockBackend>::new())
        .service(UpdateOrderStatusRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn search_by_status_list() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_search_orders()
        .withf(|q| q.status == Some(vec![OrderStatus::Received, OrderStatus::Ready]) && q.client_id == Some(1))
        .returning(|_| Ok(vec![order()]));
    let (status, body) = get_request("/orders?status=Received,Ready&client_id=1", |cfg| order_routes(cfg, backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value[0]["order_number"], "LND-240601-0003");
}

#[actix_web::test]
async fn search_with_an_unknown_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders?status=Received,Washing", |cfg| order_routes(cfg, MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("Washing"));
}

#[actix_web::test]
async fn search_with_an_unknown_parameter() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        get_request("/orders?colour=red", |cfg| order_routes(cfg, MockBackend::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_by_number() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_order_by_number()
        .withf(|n| n.to_string() == "LND-240601-0003")
        .returning(|_| Ok(Some(order())));
    let (status, body) =
        get_request("/orders/number/LND-240601-0003", |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["id"], 12);
}

#[actix_web::test]
async fn fetch_missing_order_by_number() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_number().returning(|_| Ok(None));
    let (status, body) =
        get_request("/orders/number/LND-240601-0099", |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Order LND-240601-0099");
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().with(eq(404)).returning(|_| Ok(None));
    let (status, _) = get_request("/orders/404", |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn move_order_to_ready() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_update_order_status().with(eq(12), eq(OrderStatus::Ready)).returning(|_, status| {
        let old = order();
        let mut new = order();
        new.status = status;
        Ok((old, new))
    });
    let request = StatusUpdateRequest { status: OrderStatus::Ready };
    let (status, body) =
        patch_request("/orders/12/status", &request, |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "Ready");
}

#[actix_web::test]
async fn forbidden_status_change() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_update_order_status().returning(|_, to| {
        Err(OrderFlowError::ForbiddenStatusChange { from: OrderStatus::Delivered, to })
    });
    let request = StatusUpdateRequest { status: OrderStatus::Received };
    let (status, body) =
        patch_request("/orders/12/status", &request, |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    let message = error_message(&body);
    assert!(message.contains("Delivered") && message.contains("Received"), "{message}");
}

#[actix_web::test]
async fn quote_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_services_by_id().returning(|_| Ok(vec![]));
    let cart = Cart::new(vec![]);
    let (status, body) =
        post_request("/orders/quote", &cart, |cfg| order_routes(cfg, backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), OrderFlowError::EmptyCart.to_string());
}
