use chrono::{DateTime, Utc};
use laundry_engine::{
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
    },
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
        GatewayError,
        MpesaGateway,
        MpesaManagement,
        NotificationError,
        OrderFlowError,
        OrderManagement,
        PaymentApplied,
        PaymentFlowError,
        SmsDelivery,
        SmsGateway,
        SmsLog,
        StkPushAck,
        StkPushRequest,
        StkQueryOutcome,
    },
};
use mockall::mock;

mock! {
    pub Backend {}
    impl ClientManagement for Backend {
        async fn insert_client(&self, client: NewClient) -> Result<Client, ClientApiError>;
        async fn update_client(&self, id: i64, update: ClientUpdate) -> Result<Client, ClientApiError>;
        async fn delete_client(&self, id: i64) -> Result<Client, ClientApiError>;
        async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientApiError>;
        async fn fetch_client_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Client>, ClientApiError>;
        async fn search_clients(&self, query: ClientQueryFilter) -> Result<Vec<Client>, ClientApiError>;
        async fn fetch_clients_by_id(&self, ids: &[i64]) -> Result<Vec<Client>, ClientApiError>;
    }
    impl CatalogManagement for Backend {
        async fn insert_category(&self, category: NewCategory) -> Result<Category, CatalogApiError>;
        async fn update_category(&self, id: i64, update: CategoryUpdate) -> Result<Category, CatalogApiError>;
        async fn delete_category(&self, id: i64) -> Result<Category, CatalogApiError>;
        async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogApiError>;
        async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, CatalogApiError>;
        async fn insert_service(&self, service: NewService) -> Result<Service, CatalogApiError>;
        async fn update_service(&self, id: i64, update: ServiceUpdate) -> Result<Service, CatalogApiError>;
        async fn delete_service(&self, id: i64) -> Result<Service, CatalogApiError>;
        async fn fetch_service(&self, id: i64) -> Result<Option<Service>, CatalogApiError>;
        async fn fetch_services(&self, query: ServiceQueryFilter) -> Result<Vec<Service>, CatalogApiError>;
        async fn fetch_services_by_id(&self, ids: &[i64]) -> Result<Vec<Service>, CatalogApiError>;
    }
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder, payment: Option<NewPayment>) -> Result<(Order, Option<Payment>), OrderFlowError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(Order, Order), OrderFlowError>;
        async fn apply_payment(&self, order_id: i64, payment: NewPayment) -> Result<PaymentApplied, OrderFlowError>;
        async fn fetch_payments(&self, query: PaymentQueryFilter) -> Result<Vec<Payment>, OrderFlowError>;
    }
    impl MpesaManagement for Backend {
        async fn insert_stk_request(&self, request: NewStkRequest) -> Result<(StkRequest, Order), PaymentFlowError>;
        async fn fetch_stk_request(&self, checkout_request_id: &str) -> Result<Option<StkRequest>, PaymentFlowError>;
        async fn fetch_pending_stk_request_for_order(&self, order_id: i64) -> Result<Option<StkRequest>, PaymentFlowError>;
        async fn fetch_pending_stk_requests(&self, created_before: DateTime<Utc>) -> Result<Vec<StkRequest>, PaymentFlowError>;
        async fn resolve_stk_request(&self, checkout_request_id: &str, resolution: StkResolution) -> Result<StkOutcome, PaymentFlowError>;
        async fn insert_mpesa_transaction(&self, transaction: NewMpesaTransaction) -> Result<(MpesaTransaction, bool), PaymentFlowError>;
        async fn fetch_mpesa_transaction(&self, id: i64) -> Result<Option<MpesaTransaction>, PaymentFlowError>;
        async fn search_mpesa_transactions(&self, query: MpesaTransactionFilter) -> Result<Vec<MpesaTransaction>, PaymentFlowError>;
        async fn connect_transaction(&self, transaction_id: i64, order_id: i64) -> Result<ConnectedTransaction, PaymentFlowError>;
        async fn ignore_transaction(&self, transaction_id: i64) -> Result<MpesaTransaction, PaymentFlowError>;
    }
    impl SmsLog for Backend {
        async fn insert_sms_record(&self, record: NewSmsRecord) -> Result<SmsRecord, NotificationError>;
        async fn search_sms_records(&self, query: SmsQueryFilter) -> Result<Vec<SmsRecord>, NotificationError>;
    }
}

mock! {
    pub Daraja {}
    impl MpesaGateway for Daraja {
        async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, GatewayError>;
        async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, GatewayError>;
    }
}

mock! {
    pub TextMessenger {}
    impl SmsGateway for TextMessenger {
        async fn send_sms(&self, recipients: &[PhoneNumber], message: &str) -> Result<Vec<SmsDelivery>, GatewayError>;
    }
}
