use laundry_engine::{
    db_types::{Money, PaymentMethod, SmsStatus},
    events::EventProducers,
    lms_api::{
        order_objects::{Cart, CartItem, NewOrderRequest, PaymentRequest},
        sms_objects::{BulkSmsRequest, SmsQueryFilter, SmsRequest},
    },
    NotificationApi,
    NotificationError,
    OrderFlowApi,
    SqliteDatabase,
};
use support::{
    fixtures::{seed_catalog, seed_client, ALICE_PHONE, BOB_PHONE},
    prepare_env::{setup, tear_down},
    stubs::StubSmsGateway,
};

mod support;

const ALICE: &str = "254712345678";
const BOB: &str = "254722000111";

async fn sms_desk() -> (SqliteDatabase, NotificationApi<SqliteDatabase, StubSmsGateway>, StubSmsGateway) {
    let db = setup().await;
    let gateway = StubSmsGateway::default();
    let api = NotificationApi::new(db.clone(), gateway.clone(), "Sparkle Laundry");
    (db, api, gateway)
}

#[tokio::test]
async fn messages_go_to_each_number_once() {
    let (db, api, gateway) = sms_desk().await;
    let recipients = vec![ALICE_PHONE.into(), "+254 712 345 678".into(), BOB_PHONE.into(), "12345".into(), " ".into()];
    let result = api.send_sms(SmsRequest::new(recipients, "  Open on Sunday 9am-1pm ")).await.unwrap();
    assert_eq!(result.sent, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.records.len(), 3);
    let skipped = result.records.iter().find(|r| r.status == SmsStatus::Skipped).unwrap();
    assert_eq!(skipped.recipient, "12345");
    assert!(skipped.error.is_some());
    assert_eq!(gateway.sent(), vec![
        (ALICE.to_string(), "Open on Sunday 9am-1pm".to_string()),
        (BOB.to_string(), "Open on Sunday 9am-1pm".to_string()),
    ]);
    let delivered = result.records.iter().find(|r| r.recipient == ALICE).unwrap();
    assert_eq!(delivered.provider_message_id.as_deref(), Some("ATXid_1"));
    assert_eq!(delivered.cost.as_deref(), Some("KES 0.8000"));

    let err = api.send_sms(SmsRequest::new(vec![ALICE_PHONE.into()], "   ")).await.unwrap_err();
    assert!(matches!(err, NotificationError::EmptyMessage), "{err}");
    let err = api.send_sms(SmsRequest::new(vec![" ".into()], "Hello")).await.unwrap_err();
    assert!(matches!(err, NotificationError::NoRecipients), "{err}");
    tear_down(db).await;
}

#[tokio::test]
async fn delivery_failures_are_logged() {
    let (db, api, gateway) = sms_desk().await;
    gateway.reject_number(BOB_PHONE);
    let result = api.send_sms(SmsRequest::new(vec![ALICE_PHONE.into(), BOB_PHONE.into()], "Hello")).await.unwrap();
    assert_eq!((result.sent, result.failed), (1, 1));
    let failed = result.records.iter().find(|r| r.status == SmsStatus::Failed).unwrap();
    assert_eq!(failed.recipient, BOB);
    assert_eq!(failed.error.as_deref(), Some("UnsupportedNumberType"));

    gateway.set_offline(true);
    let result = api.send_sms(SmsRequest::new(vec![ALICE_PHONE.into(), "0799".into()], "Hello again")).await.unwrap();
    assert_eq!((result.sent, result.failed, result.skipped), (0, 1, 1));
    assert_eq!(gateway.sent().len(), 1);

    let history = api.sms_history(SmsQueryFilter::default()).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].message, "Hello again", "Newest messages come first");
    let failures = api.sms_history(SmsQueryFilter::default().with_status(SmsStatus::Failed)).await.unwrap();
    assert_eq!(failures.len(), 2);
    let to_alice = api.sms_history(SmsQueryFilter::default().with_recipient(ALICE)).await.unwrap();
    assert_eq!(to_alice.len(), 2);
    let latest = api.sms_history(SmsQueryFilter::default().with_limit(1)).await.unwrap();
    assert_eq!(latest.len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn bulk_messages_are_personalised() {
    let (db, api, gateway) = sms_desk().await;
    let alice = seed_client(&db, "Alice Wanjiru", ALICE_PHONE).await;
    let bob = seed_client(&db, "Bob Otieno", BOB_PHONE).await;
    let request = BulkSmsRequest { client_ids: None, message: "Hi {name}, 20% off duvets this week!".into() };
    let result = api.send_bulk(request).await.unwrap();
    assert_eq!(result.sent, 2);
    assert_eq!(gateway.sent(), vec![
        (ALICE.to_string(), "Hi Alice Wanjiru, 20% off duvets this week!".to_string()),
        (BOB.to_string(), "Hi Bob Otieno, 20% off duvets this week!".to_string()),
    ]);

    let request = BulkSmsRequest { client_ids: Some(vec![bob.id]), message: "Thanks {name}".into() };
    let result = api.send_bulk(request).await.unwrap();
    assert_eq!(result.sent, 1);
    assert_eq!(result.records[0].recipient, BOB);

    let request = BulkSmsRequest { client_ids: Some(vec![alice.id, 999]), message: "Hi".into() };
    let err = api.send_bulk(request).await.unwrap_err();
    assert!(matches!(err, NotificationError::ClientNotFound(999)), "{err}");
    let request = BulkSmsRequest { client_ids: Some(vec![alice.id]), message: "".into() };
    let err = api.send_bulk(request).await.unwrap_err();
    assert!(matches!(err, NotificationError::EmptyMessage), "{err}");
    tear_down(db).await;
}

#[tokio::test]
async fn order_notifications() {
    let (db, api, gateway) = sms_desk().await;
    let catalog = seed_catalog(&db).await;
    let alice = seed_client(&db, "Alice Wanjiru", ALICE_PHONE).await;
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = Cart::new(vec![CartItem::new(catalog.duvet.id, 1.0)]);
    let order = orders.create_order(NewOrderRequest::new(alice.id, cart)).await.unwrap().order;

    let result = api.notify_order_created(&order).await.unwrap();
    assert_eq!(result.sent, 1);
    assert_eq!(result.records[0].order_id, Some(order.id));
    let (to, message) = gateway.sent().pop().unwrap();
    assert_eq!(to, ALICE);
    assert!(message.starts_with("Hi Alice, Sparkle Laundry has received your order"), "{message}");
    assert!(message.contains(&order.order_number));
    assert!(message.contains("Balance: KES 800.00."), "{message}");

    let receipt = orders
        .record_payment(order.id, PaymentRequest::new(PaymentMethod::Cash, Money::from_shillings(800)))
        .await
        .unwrap();
    let payment = receipt.payment;
    api.notify_payment_received(&receipt.order, &payment).await.unwrap();
    let (_, message) = gateway.sent().pop().unwrap();
    assert!(message.contains("Your order is fully paid."), "{message}");

    api.notify_order_ready(&receipt.order).await.unwrap();
    let (_, message) = gateway.sent().pop().unwrap();
    assert!(message.contains("is ready for collection at Sparkle Laundry."), "{message}");
    assert!(!message.contains("Please bring"));

    let for_order = api.sms_history(SmsQueryFilter::default().with_order_id(order.id)).await.unwrap();
    assert_eq!(for_order.len(), 3);
    tear_down(db).await;
}
