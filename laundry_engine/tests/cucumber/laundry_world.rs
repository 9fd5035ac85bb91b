use std::{collections::HashMap, fmt::Debug};

use cucumber::World;
use laundry_engine::{
    db_types::{MpesaTransaction, Order},
    events::EventProducers,
    lms_api::payment_objects::MpesaTransactionFilter,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};

use crate::support::{
    fixtures::{seed_catalog, TestCatalog},
    prepare_env::setup,
    stubs::StubMpesaGateway,
};

#[derive(Default, Debug, World)]
pub struct LaundryWorld {
    pub system: Option<LaundrySystem>,
}

pub struct LaundrySystem {
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentFlowApi<SqliteDatabase, StubMpesaGateway>,
    pub catalog: Option<TestCatalog>,
    /// Client ids by first name
    pub clients: HashMap<String, i64>,
    /// Orders in the order they were taken during the scenario
    pub order_ids: Vec<i64>,
    /// The latest payment prompt sent for each order
    pub prompts: HashMap<i64, String>,
}

impl Debug for LaundrySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LaundrySystem ({})", self.db.url())
    }
}

impl LaundryWorld {
    pub fn system(&mut self) -> &mut LaundrySystem {
        self.system.as_mut().expect("Laundry system not initialised")
    }
}

impl LaundrySystem {
    pub async fn new() -> Self {
        let db = setup().await;
        let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
        let payments = PaymentFlowApi::new(db.clone(), StubMpesaGateway::default(), EventProducers::default());
        Self {
            db,
            orders,
            payments,
            catalog: None,
            clients: HashMap::new(),
            order_ids: Vec::new(),
            prompts: HashMap::new(),
        }
    }

    pub async fn seed_catalog(&mut self) {
        self.catalog = Some(seed_catalog(&self.db).await);
    }

    pub fn catalog(&self) -> &TestCatalog {
        self.catalog.as_ref().expect("The service catalog has not been set up")
    }

    pub fn client_id(&self, name: &str) -> i64 {
        *self.clients.get(name).unwrap_or_else(|| panic!("No client called {name}"))
    }

    /// Orders are numbered from 1 in the order they were taken
    pub fn order_id(&self, n: usize) -> i64 {
        *self.order_ids.get(n - 1).unwrap_or_else(|| panic!("Order {n} has not been taken"))
    }

    pub async fn order(&self, n: usize) -> Order {
        let id = self.order_id(n);
        self.orders.fetch_order(id).await.expect("Error fetching order").expect("Order does not exist")
    }

    pub fn prompt(&self, n: usize) -> String {
        let id = self.order_id(n);
        self.prompts.get(&id).cloned().unwrap_or_else(|| panic!("No payment prompt was sent for order {n}"))
    }

    pub async fn transaction(&self, receipt: &str) -> MpesaTransaction {
        let txs = self
            .payments
            .search_transactions(MpesaTransactionFilter::default())
            .await
            .expect("Error fetching transactions");
        txs.into_iter().find(|t| t.transaction_id == receipt).unwrap_or_else(|| panic!("No transaction {receipt}"))
    }
}
