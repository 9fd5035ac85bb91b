use laundry_engine::{
    db_types::{Category, Client, Money, NewCategory, NewService, Service, ServiceUnit},
    lms_api::client_objects::NewClientRequest,
    CatalogApi,
    ClientApi,
    SqliteDatabase,
};

pub const ALICE_PHONE: &str = "0712345678";
pub const BOB_PHONE: &str = "0722000111";

/// A small catalog: two categories, three services on sale and one retired service.
#[derive(Debug, Clone)]
pub struct TestCatalog {
    pub laundry: Category,
    pub dry_cleaning: Category,
    /// KES 150 per kg
    pub wash_and_fold: Service,
    /// KES 100 per shirt
    pub shirt: Service,
    /// KES 800 per duvet
    pub duvet: Service,
    /// KES 500, no longer offered
    pub suit: Service,
}

pub async fn seed_catalog(db: &SqliteDatabase) -> TestCatalog {
    let api = CatalogApi::new(db.clone());
    let laundry = api.create_category(category("Laundry")).await.expect("Error creating category");
    let dry_cleaning = api.create_category(category("Dry cleaning")).await.expect("Error creating category");
    let service = |category_id: i64, name: &str, unit: ServiceUnit, price: i64| {
        NewService::new(category_id, name.to_string(), unit, Money::from_shillings(price))
    };
    let wash_and_fold = api
        .create_service(service(laundry.id, "Wash & fold", ServiceUnit::PerKg, 150))
        .await
        .expect("Error creating service");
    let shirt = api
        .create_service(service(laundry.id, "Shirt", ServiceUnit::PerItem, 100))
        .await
        .expect("Error creating service");
    let duvet = api
        .create_service(service(laundry.id, "Duvet", ServiceUnit::PerItem, 800))
        .await
        .expect("Error creating service");
    let mut retired = service(dry_cleaning.id, "Suit", ServiceUnit::PerItem, 500);
    retired.active = false;
    let suit = api.create_service(retired).await.expect("Error creating service");
    TestCatalog { laundry, dry_cleaning, wash_and_fold, shirt, duvet, suit }
}

fn category(name: &str) -> NewCategory {
    NewCategory { name: name.to_string(), description: None }
}

pub async fn seed_client(db: &SqliteDatabase, name: &str, phone: &str) -> Client {
    ClientApi::new(db.clone()).create_client(NewClientRequest::new(name, phone)).await.expect("Error creating client")
}
