use laundry_engine::{
    db_types::{CategoryUpdate, Money, NewCategory, NewService, OrderStatus, PaymentMethod, ServiceUnit, ServiceUpdate},
    events::EventProducers,
    lms_api::{
        catalog_objects::ServiceQueryFilter,
        client_objects::{ClientQueryFilter, ClientUpdateRequest, NewClientRequest},
        order_objects::{Cart, CartItem, NewOrderRequest, PaymentRequest},
    },
    CatalogApi,
    CatalogApiError,
    ClientApi,
    ClientApiError,
    OrderFlowApi,
};
use support::{
    fixtures::{seed_catalog, seed_client, ALICE_PHONE, BOB_PHONE},
    prepare_env::{setup, tear_down},
};

mod support;

#[tokio::test]
async fn clients_are_registered_with_normalised_phones() {
    let db = setup().await;
    let api = ClientApi::new(db.clone());
    let mut request = NewClientRequest::new("  Grace  Akinyi ", "+254 712 345 678");
    request.email = Some(" grace@example.com ".into());
    request.address = Some("   ".into());
    let grace = api.create_client(request).await.unwrap();
    assert_eq!(grace.name, "Grace Akinyi");
    assert_eq!(grace.phone.as_str(), "254712345678");
    assert_eq!(grace.email.as_deref(), Some("grace@example.com"));
    assert_eq!(grace.address, None);

    let err = api.create_client(NewClientRequest::new("Someone Else", ALICE_PHONE)).await.unwrap_err();
    assert!(matches!(err, ClientApiError::DuplicatePhone(_)), "{err}");
    let err = api.create_client(NewClientRequest::new("Nobody", "12345")).await.unwrap_err();
    assert!(matches!(err, ClientApiError::InvalidPhone(_)), "{err}");
    let mut bad_email = NewClientRequest::new("Mary", BOB_PHONE);
    bad_email.email = Some("mary at home".into());
    let err = api.create_client(bad_email).await.unwrap_err();
    assert!(matches!(err, ClientApiError::ValidationError(_)), "{err}");
    tear_down(db).await;
}

#[tokio::test]
async fn client_updates_and_search() {
    let db = setup().await;
    let api = ClientApi::new(db.clone());
    let alice = seed_client(&db, "Alice Wanjiru", ALICE_PHONE).await;
    let bob = seed_client(&db, "Bob Otieno", BOB_PHONE).await;

    let update = ClientUpdateRequest { email: Some("alice@example.com".into()), ..Default::default() };
    let alice = api.update_client(alice.id, update).await.unwrap();
    assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
    let err = api.update_client(alice.id, ClientUpdateRequest::default()).await.unwrap_err();
    assert!(matches!(err, ClientApiError::ClientModificationNoOp), "{err}");
    let update = ClientUpdateRequest { phone: Some(BOB_PHONE.into()), ..Default::default() };
    let err = api.update_client(alice.id, update).await.unwrap_err();
    assert!(matches!(err, ClientApiError::DuplicatePhone(_)), "{err}");
    let update = ClientUpdateRequest { name: Some("Ghost".into()), ..Default::default() };
    let err = api.update_client(999, update).await.unwrap_err();
    assert!(matches!(err, ClientApiError::ClientNotFound(999)), "{err}");

    let all = api.search_clients(ClientQueryFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![alice.id, bob.id]);
    let found = api.search_clients(ClientQueryFilter::default().with_search("otieno")).await.unwrap();
    assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![bob.id]);
    let found = api.search_clients(ClientQueryFilter::default().with_search("0712 345")).await.unwrap();
    assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![alice.id]);
    let found = api.search_clients(ClientQueryFilter::default().with_search("example.com")).await.unwrap();
    assert_eq!(found.len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn client_history_and_deletion() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    let clients = ClientApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let alice = seed_client(&db, "Alice Wanjiru", ALICE_PHONE).await;
    let bob = seed_client(&db, "Bob Otieno", BOB_PHONE).await;

    let cart = |n: f64| Cart::new(vec![CartItem::new(catalog.shirt.id, n)]);
    let paid = NewOrderRequest::new(alice.id, cart(2.0))
        .with_payment(PaymentRequest::new(PaymentMethod::Cash, Money::from_shillings(200)));
    orders.create_order(paid).await.unwrap();
    orders.create_order(NewOrderRequest::new(alice.id, cart(3.0))).await.unwrap();
    let cancelled = orders.create_order(NewOrderRequest::new(alice.id, cart(5.0))).await.unwrap().order;
    orders.update_status(cancelled.id, OrderStatus::Cancelled).await.unwrap();

    let history = clients.client_history(alice.id).await.unwrap();
    assert_eq!(history.orders.len(), 3);
    assert_eq!(history.order_count, 2);
    assert_eq!(history.total_spent, Money::from_shillings(500));
    assert_eq!(history.total_paid, Money::from_shillings(200));
    assert_eq!(history.outstanding, Money::from_shillings(300));
    assert!(history.last_order_at.is_some());

    let err = clients.delete_client(alice.id).await.unwrap_err();
    assert!(matches!(err, ClientApiError::ClientHasOrders(_)), "{err}");
    let deleted = clients.delete_client(bob.id).await.unwrap();
    assert_eq!(deleted.id, bob.id);
    assert!(clients.fetch_client(bob.id).await.unwrap().is_none());
    let err = clients.client_history(bob.id).await.unwrap_err();
    assert!(matches!(err, ClientApiError::ClientNotFound(_)), "{err}");
    tear_down(db).await;
}

#[tokio::test]
async fn catalog_management() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    let api = CatalogApi::new(db.clone());

    let summaries = api.categories().await.unwrap();
    let names = summaries.iter().map(|s| (s.category.name.as_str(), s.service_count)).collect::<Vec<_>>();
    assert_eq!(names, vec![("Dry cleaning", 1), ("Laundry", 3)]);

    let err = api.create_category(NewCategory { name: "Laundry".into(), description: None }).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::DuplicateCategory(_)), "{err}");
    let err = api.create_category(NewCategory { name: "   ".into(), description: None }).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::ValidationError(_)), "{err}");

    let shirt = NewService::new(catalog.laundry.id, "Shirt".into(), ServiceUnit::PerItem, Money::from_shillings(90));
    let err = api.create_service(shirt).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::DuplicateService(_)), "{err}");
    let free = NewService::new(catalog.laundry.id, "Socks".into(), ServiceUnit::PerPair, Money::default());
    let err = api.create_service(free).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::ValidationError(_)), "{err}");
    let orphan = NewService::new(999, "Rugs".into(), ServiceUnit::PerItem, Money::from_shillings(1500));
    let err = api.create_service(orphan).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::CategoryNotFound(999)), "{err}");

    let update = ServiceUpdate { price: Some(Money::from_shillings(120)), ..Default::default() };
    let shirt = api.update_service(catalog.shirt.id, update).await.unwrap();
    assert_eq!(shirt.price, Money::from_shillings(120));
    let err = api.update_service(catalog.shirt.id, ServiceUpdate::default()).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::CatalogModificationNoOp), "{err}");

    let active = api.services(ServiceQueryFilter::default().active_only()).await.unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|s| s.active));
    let dry = api.services(ServiceQueryFilter::default().with_category(catalog.dry_cleaning.id)).await.unwrap();
    assert_eq!(dry.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["Suit"]);
    let found = api.services(ServiceQueryFilter::default().with_search("duv")).await.unwrap();
    assert_eq!(found.iter().map(|s| s.id).collect::<Vec<_>>(), vec![catalog.duvet.id]);

    let err = api.delete_category(catalog.dry_cleaning.id).await.unwrap_err();
    assert!(matches!(err, CatalogApiError::CategoryInUse(_, 1)), "{err}");
    api.delete_service(catalog.suit.id).await.unwrap();
    api.delete_category(catalog.dry_cleaning.id).await.unwrap();
    assert!(api.fetch_category(catalog.dry_cleaning.id).await.unwrap().is_none());
    let update = CategoryUpdate { description: Some("Wash, dry and fold".into()), ..Default::default() };
    let laundry = api.update_category(catalog.laundry.id, update).await.unwrap();
    assert_eq!(laundry.description.as_deref(), Some("Wash, dry and fold"));
    tear_down(db).await;
}

#[tokio::test]
async fn deleting_a_service_keeps_old_orders_intact() {
    let db = setup().await;
    let catalog = seed_catalog(&db).await;
    let alice = seed_client(&db, "Alice Wanjiru", ALICE_PHONE).await;
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = Cart::new(vec![CartItem::new(catalog.duvet.id, 1.0)]);
    let order = orders.create_order(NewOrderRequest::new(alice.id, cart)).await.unwrap().order;
    CatalogApi::new(db.clone()).delete_service(catalog.duvet.id).await.unwrap();
    let order = orders.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.items[0].service_id, None);
    assert_eq!(order.items[0].service_name, "Duvet");
    assert_eq!(order.total, Money::from_shillings(800));
    tear_down(db).await;
}

#[tokio::test]
async fn writes_are_visible_on_every_pooled_connection() {
    let db = setup().await;
    let api = CatalogApi::new(db.clone());
    let ironing = api.create_category(NewCategory { name: "Ironing".into(), description: None }).await.unwrap();
    let service = NewService::new(ironing.id, "Shirt press".into(), ServiceUnit::PerItem, Money::from_shillings(60));
    let press = api.create_service(service).await.expect("New category was not visible to the next write");
    assert_eq!(press.category_name, "Ironing");

    let clients = ClientApi::new(db.clone());
    let phones = ["0711000001", "0711000002", "0711000003", "0711000004"];
    for (i, phone) in phones.iter().enumerate() {
        let request = NewClientRequest::new(format!("Client {i}"), phone.to_string());
        let client = clients.create_client(request).await.unwrap();
        let email = format!("client{}@example.com", client.id);
        let update = ClientUpdateRequest { email: Some(email.clone()), ..Default::default() };
        clients.update_client(client.id, update).await.unwrap();
        let fetched = clients.fetch_client(client.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, Some(email));
    }
    let all = clients.search_clients(ClientQueryFilter::default()).await.unwrap();
    assert_eq!(all.len(), phones.len());
    tear_down(db).await;
}
