use actix_web::http::StatusCode;

use crate::routes::health;

mod clients;
mod helpers;
mod mocks;
mod mpesa;
mod orders;
mod sms;

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = helpers::get_request("/health", |cfg| {
        cfg.service(health);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
