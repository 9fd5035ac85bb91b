//! `SqliteDatabase` is the SQLite backend for the laundry engine.
//!
//! It implements every storage trait in [`crate::traits`]. Operations that touch more than one table run inside a
//! single transaction, so a failure part way through leaves the database as it was.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, clients, db_url, mpesa, new_pool, orders, payments, sms};
use crate::{
    db_types::{
        Category,
        CategorySummary,
        CategoryUpdate,
        Client,
        ClientUpdate,
        MpesaTransaction,
        NewCategory,
        NewClient,
        NewMpesaTransaction,
        NewOrder,
        NewPayment,
        NewService,
        NewSmsRecord,
        NewStkRequest,
        Order,
        OrderStatus,
        Payment,
        PhoneNumber,
        Service,
        ServiceUpdate,
        SmsRecord,
        StkRequest,
        StkResolution,
        TransactionStatus,
    },
    helpers::payment_state::check_status_change,
    lms_api::{
        catalog_objects::ServiceQueryFilter,
        client_objects::ClientQueryFilter,
        order_objects::{OrderQueryFilter, PaymentQueryFilter},
        payment_objects::{ConnectedTransaction, MpesaTransactionFilter, StkOutcome},
        sms_objects::SmsQueryFilter,
    },
    traits::{
        CatalogApiError,
        CatalogManagement,
        ClientApiError,
        ClientManagement,
        MpesaManagement,
        NotificationError,
        OrderFlowError,
        OrderManagement,
        PaymentApplied,
        PaymentFlowError,
        SmsLog,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `LMS_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ClientManagement for SqliteDatabase {
    async fn insert_client(&self, client: NewClient) -> Result<Client, ClientApiError> {
        let mut tx = self.pool.begin().await?;
        let client = clients::insert_client(client, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Client #{} ({}) saved", client.id, client.name);
        Ok(client)
    }

    async fn update_client(&self, id: i64, update: ClientUpdate) -> Result<Client, ClientApiError> {
        let mut tx = self.pool.begin().await?;
        let client = clients::update_client(id, update, &mut tx).await?.ok_or(ClientApiError::ClientNotFound(id))?;
        tx.commit().await?;
        Ok(client)
    }

    async fn delete_client(&self, id: i64) -> Result<Client, ClientApiError> {
        let mut tx = self.pool.begin().await?;
        let orders = clients::count_orders_for_client(id, &mut tx).await?;
        if orders > 0 {
            return Err(ClientApiError::ClientHasOrders(id));
        }
        let client = clients::delete_client(id, &mut tx).await?.ok_or(ClientApiError::ClientNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Client #{id} ({}) deleted", client.name);
        Ok(client)
    }

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientApiError> {
        let mut conn = self.pool.acquire().await?;
        let client = clients::fetch_client(id, &mut conn).await?;
        Ok(client)
    }

    async fn fetch_client_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Client>, ClientApiError> {
        let mut conn = self.pool.acquire().await?;
        let client = clients::fetch_client_by_phone(phone, &mut conn).await?;
        Ok(client)
    }

    async fn search_clients(&self, query: ClientQueryFilter) -> Result<Vec<Client>, ClientApiError> {
        let mut conn = self.pool.acquire().await?;
        let clients = clients::search_clients(query, &mut conn).await?;
        Ok(clients)
    }

    async fn fetch_clients_by_id(&self, ids: &[i64]) -> Result<Vec<Client>, ClientApiError> {
        let mut conn = self.pool.acquire().await?;
        let clients = clients::fetch_clients_by_id(ids, &mut conn).await?;
        Ok(clients)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_category(&self, category: NewCategory) -> Result<Category, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let category = catalog::insert_category(category, &mut tx).await?;
        tx.commit().await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, update: CategoryUpdate) -> Result<Category, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let category =
            catalog::update_category(id, update, &mut tx).await?.ok_or(CatalogApiError::CategoryNotFound(id))?;
        tx.commit().await?;
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> Result<Category, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let services = catalog::count_services_in_category(id, &mut tx).await?;
        if services > 0 {
            return Err(CatalogApiError::CategoryInUse(id, services));
        }
        let category = catalog::delete_category(id, &mut tx).await?.ok_or(CatalogApiError::CategoryNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Category #{id} ({}) deleted", category.name);
        Ok(category)
    }

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let category = catalog::fetch_category(id, &mut conn).await?;
        Ok(category)
    }

    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let categories = catalog::fetch_categories(&mut conn).await?;
        Ok(categories)
    }

    async fn insert_service(&self, service: NewService) -> Result<Service, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let category_id = service.category_id;
        catalog::fetch_category(category_id, &mut tx).await?.ok_or(CatalogApiError::CategoryNotFound(category_id))?;
        let service = catalog::insert_service(service, &mut tx).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn update_service(&self, id: i64, update: ServiceUpdate) -> Result<Service, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        if let Some(category_id) = update.category_id {
            catalog::fetch_category(category_id, &mut tx)
                .await?
                .ok_or(CatalogApiError::CategoryNotFound(category_id))?;
        }
        let service = catalog::update_service(id, update, &mut tx).await?.ok_or(CatalogApiError::ServiceNotFound(id))?;
        tx.commit().await?;
        Ok(service)
    }

    async fn delete_service(&self, id: i64) -> Result<Service, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let service = catalog::delete_service(id, &mut tx).await?.ok_or(CatalogApiError::ServiceNotFound(id))?;
        tx.commit().await?;
        Ok(service)
    }

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let service = catalog::fetch_service(id, &mut conn).await?;
        Ok(service)
    }

    async fn fetch_services(&self, query: ServiceQueryFilter) -> Result<Vec<Service>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let services = catalog::fetch_services(query, &mut conn).await?;
        Ok(services)
    }

    async fn fetch_services_by_id(&self, ids: &[i64]) -> Result<Vec<Service>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let services = catalog::fetch_services_by_id(ids, &mut conn).await?;
        Ok(services)
    }
}

impl OrderManagement for SqliteDatabase {
    /// Stores the order and, if given, applies the initial payment, in a single atomic transaction.
    async fn insert_order(
        &self,
        order: NewOrder,
        payment: Option<NewPayment>,
    ) -> Result<(Order, Option<Payment>), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let client_id = order.client_id;
        clients::fetch_client(client_id, &mut tx).await?.ok_or(OrderFlowError::ClientNotFound(client_id))?;
        let order = orders::insert_order(order, &mut tx).await?;
        let result = match payment {
            Some(payment) => {
                let applied = payments::apply_payment(order.id, payment, &mut tx).await?;
                (applied.order, Some(applied.payment))
            },
            None => (order, None),
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(Order, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let old = orders::fetch_order(id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        check_status_change(&old, status)?;
        let new = orders::update_order_status(id, status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} moved from {} to {}", new.order_number, old.status, new.status);
        Ok((old, new))
    }

    async fn apply_payment(&self, order_id: i64, payment: NewPayment) -> Result<PaymentApplied, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let applied = payments::apply_payment(order_id, payment, &mut tx).await?;
        tx.commit().await?;
        Ok(applied)
    }

    async fn fetch_payments(&self, query: PaymentQueryFilter) -> Result<Vec<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments(query, &mut conn).await?;
        Ok(payments)
    }
}

impl MpesaManagement for SqliteDatabase {
    async fn insert_stk_request(&self, request: NewStkRequest) -> Result<(StkRequest, Order), PaymentFlowError> {
        let mut tx = self.pool.begin().await?;
        let result = mpesa::insert_stk_request(request, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_stk_request(&self, checkout_request_id: &str) -> Result<Option<StkRequest>, PaymentFlowError> {
        let mut conn = self.pool.acquire().await?;
        let request = mpesa::fetch_stk_request(checkout_request_id, &mut conn).await?;
        Ok(request)
    }

    async fn fetch_pending_stk_request_for_order(
        &self,
        order_id: i64,
    ) -> Result<Option<StkRequest>, PaymentFlowError> {
        let mut conn = self.pool.acquire().await?;
        let request = mpesa::fetch_pending_stk_request_for_order(order_id, &mut conn).await?;
        Ok(request)
    }

    async fn fetch_pending_stk_requests(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<StkRequest>, PaymentFlowError> {
        let mut conn = self.pool.acquire().await?;
        let requests = mpesa::fetch_pending_stk_requests(created_before, &mut conn).await?;
        Ok(requests)
    }

    async fn resolve_stk_request(
        &self,
        checkout_request_id: &str,
        resolution: StkResolution,
    ) -> Result<StkOutcome, PaymentFlowError> {
        let mut tx = self.pool.begin().await?;
        let outcome = mpesa::resolve_stk_request(checkout_request_id, resolution, &mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn insert_mpesa_transaction(
        &self,
        transaction: NewMpesaTransaction,
    ) -> Result<(MpesaTransaction, bool), PaymentFlowError> {
        let mut tx = self.pool.begin().await?;
        let result = mpesa::insert_mpesa_transaction(transaction, TransactionStatus::Unmatched, None, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_mpesa_transaction(&self, id: i64) -> Result<Option<MpesaTransaction>, PaymentFlowError> {
        let mut conn = self.pool.acquire().await?;
        let tx = mpesa::fetch_mpesa_transaction(id, &mut conn).await?;
        Ok(tx)
    }

    async fn search_mpesa_transactions(
        &self,
        query: MpesaTransactionFilter,
    ) -> Result<Vec<MpesaTransaction>, PaymentFlowError> {
        let mut conn = self.pool.acquire().await?;
        let txs = mpesa::search_mpesa_transactions(query, &mut conn).await?;
        Ok(txs)
    }

    async fn connect_transaction(
        &self,
        transaction_id: i64,
        order_id: i64,
    ) -> Result<ConnectedTransaction, PaymentFlowError> {
        let mut tx = self.pool.begin().await?;
        let connected = mpesa::connect_transaction(transaction_id, order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(connected)
    }

    async fn ignore_transaction(&self, transaction_id: i64) -> Result<MpesaTransaction, PaymentFlowError> {
        let mut tx = self.pool.begin().await?;
        let ignored = mpesa::ignore_transaction(transaction_id, &mut tx).await?;
        tx.commit().await?;
        Ok(ignored)
    }
}

impl SmsLog for SqliteDatabase {
    async fn insert_sms_record(&self, record: NewSmsRecord) -> Result<SmsRecord, NotificationError> {
        let mut tx = self.pool.begin().await?;
        let record = sms::insert_sms_record(record, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn search_sms_records(&self, query: SmsQueryFilter) -> Result<Vec<SmsRecord>, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        let records = sms::search_sms_records(query, &mut conn).await?;
        Ok(records)
    }
}
