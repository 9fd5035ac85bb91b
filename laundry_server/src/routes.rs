//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, post, web, HttpResponse, Responder};
use gateway_tools::mpesa_objects::{C2bPayload, MpesaAck, StkCallbackEnvelope};
use laundry_engine::{
    db_types::{CategoryUpdate, NewCategory, NewService, ServiceUpdate},
    lms_api::{
        catalog_objects::ServiceQueryFilter,
        client_objects::{ClientQueryFilter, ClientUpdateRequest, NewClientRequest},
        order_objects::{Cart, NewOrderRequest, OrderQueryFilter, PaymentRequest, StatusUpdateRequest},
        payment_objects::{ConnectTransactionRequest, InitiatePaymentRequest, MpesaTransactionFilter},
        report_objects::ReportQuery,
        sms_objects::{BulkSmsRequest, SmsQueryFilter, SmsRequest},
    },
    CatalogApi,
    CatalogManagement,
    ClientApi,
    ClientManagement,
    MpesaGateway,
    MpesaManagement,
    NotificationApi,
    OrderFlowApi,
    OrderManagement,
    PaymentFlowApi,
    ReportsApi,
    SmsGateway,
    SmsLog,
};
use log::*;

use crate::{
    data_objects::{OrderSearchParams, StkStatusParams},
    errors::ServerError,
    integrations::mpesa::{new_transaction_from_c2b, stk_resolution_from_callback},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where gateway $gateway:ty) => {
        paste::paste! { pub struct [<$name:camel Route>]<B, G>(core::marker::PhantomData<fn() -> (B, G)>);}
        paste::paste! { impl<B, G> [<$name:camel Route>]<B, G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (B, G)>)
            }
        }}
        paste::paste! { impl<B, G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B, G>
        where
            B: $($bounds +)+ 'static,
            G: $gateway + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B, G>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Clients  ----------------------------------------------------
route!(clients => Get "/clients" impl ClientManagement);
/// Lists clients. `?search=` matches any part of the name, phone number or email address.
pub async fn clients<B: ClientManagement>(
    query: web::Query<ClientQueryFilter>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    debug!("💻️ GET clients for [{query}]");
    let clients = api.search_clients(query).await?;
    Ok(HttpResponse::Ok().json(clients))
}

route!(create_client => Post "/clients" impl ClientManagement);
pub async fn create_client<B: ClientManagement>(
    body: web::Json<NewClientRequest>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new client");
    let client = api.create_client(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(client))
}

route!(client_by_id => Get "/clients/{id}" impl ClientManagement);
pub async fn client_by_id<B: ClientManagement>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET client {id}");
    let client = api.fetch_client(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Client {id}")))?;
    Ok(HttpResponse::Ok().json(client))
}

route!(update_client => Put "/clients/{id}" impl ClientManagement);
pub async fn update_client<B: ClientManagement>(
    path: web::Path<i64>,
    body: web::Json<ClientUpdateRequest>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT client {id}");
    let client = api.update_client(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(client))
}

route!(delete_client => Delete "/clients/{id}" impl ClientManagement);
/// Removes a client. Clients with orders cannot be removed.
pub async fn delete_client<B: ClientManagement>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE client {id}");
    let client = api.delete_client(id).await?;
    Ok(HttpResponse::Ok().json(client))
}

route!(client_history => Get "/clients/{id}/history" impl ClientManagement, OrderManagement);
pub async fn client_history<B: ClientManagement + OrderManagement>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET history for client {id}");
    let history = api.client_history(id).await?;
    Ok(HttpResponse::Ok().json(history))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(categories => Get "/categories" impl CatalogManagement);
/// Lists categories with the number of services in each.
pub async fn categories<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET categories");
    let categories = api.categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

route!(create_category => Post "/categories" impl CatalogManagement);
pub async fn create_category<B: CatalogManagement>(
    body: web::Json<NewCategory>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new category");
    let category = api.create_category(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

route!(update_category => Put "/categories/{id}" impl CatalogManagement);
pub async fn update_category<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<CategoryUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT category {id}");
    let category = api.update_category(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(category))
}

route!(delete_category => Delete "/categories/{id}" impl CatalogManagement);
pub async fn delete_category<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE category {id}");
    let category = api.delete_category(id).await?;
    Ok(HttpResponse::Ok().json(category))
}

route!(services => Get "/services" impl CatalogManagement);
pub async fn services<B: CatalogManagement>(
    query: web::Query<ServiceQueryFilter>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    debug!("💻️ GET services for [{query}]");
    let services = api.services(query).await?;
    Ok(HttpResponse::Ok().json(services))
}

route!(create_service => Post "/services" impl CatalogManagement);
pub async fn create_service<B: CatalogManagement>(
    body: web::Json<NewService>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new service");
    let service = api.create_service(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(service))
}

route!(service_by_id => Get "/services/{id}" impl CatalogManagement);
pub async fn service_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET service {id}");
    let service = api.fetch_service(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Service {id}")))?;
    Ok(HttpResponse::Ok().json(service))
}

route!(update_service => Put "/services/{id}" impl CatalogManagement);
pub async fn update_service<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<ServiceUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT service {id}");
    let service = api.update_service(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(service))
}

route!(delete_service => Delete "/services/{id}" impl CatalogManagement);
pub async fn delete_service<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE service {id}");
    let service = api.delete_service(id).await?;
    Ok(HttpResponse::Ok().json(service))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(orders => Get "/orders" impl OrderManagement, CatalogManagement, ClientManagement);
/// Order search. Status lists are comma separated, e.g. `?status=Received,InProgress&payment_status=Unpaid`.
pub async fn orders<B>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let query = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET orders search for [{query}]");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(create_order => Post "/orders" impl OrderManagement, CatalogManagement, ClientManagement);
/// Takes an order at the counter. An optional initial payment may be included. The response carries the order and
/// the change due to the customer.
pub async fn create_order<B>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let request = body.into_inner();
    debug!("💻️ POST new order for client {}", request.client_id);
    let receipt = api.create_order(request).await?;
    Ok(HttpResponse::Created().json(receipt))
}

route!(quote => Post "/orders/quote" impl OrderManagement, CatalogManagement, ClientManagement);
/// Prices a cart without creating an order.
pub async fn quote<B>(body: web::Json<Cart>, api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CatalogManagement + ClientManagement {
    debug!("💻️ POST quote for {} items", body.items.len());
    let quote = api.quote(&body).await?;
    Ok(HttpResponse::Ok().json(quote))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement, CatalogManagement, ClientManagement);
pub async fn order_by_id<B>(path: web::Path<i64>, api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CatalogManagement + ClientManagement {
    let id = path.into_inner();
    debug!("💻️ GET order {id}");
    let order = api.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_by_number => Get "/orders/number/{number}" impl OrderManagement, CatalogManagement, ClientManagement);
pub async fn order_by_number<B>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let number = path.into_inner();
    debug!("💻️ GET order {number}");
    let order = api
        .fetch_order_by_number(&number)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {number}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderManagement, CatalogManagement, ClientManagement);
/// Moves an order along `Received → InProgress → Ready → Delivered`. Unpaid orders may also be cancelled.
pub async fn update_order_status<B>(
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ PATCH status of order {id} to {status}");
    let order = api.update_status(id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_payments => Get "/orders/{id}/payments" impl OrderManagement, CatalogManagement, ClientManagement);
pub async fn order_payments<B>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let id = path.into_inner();
    debug!("💻️ GET payments for order {id}");
    let payments = api.payments_for_order(id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(record_payment => Post "/orders/{id}/payments" impl OrderManagement, CatalogManagement, ClientManagement);
/// Records a counter payment: cash, card, bank transfer, or M-Pesa confirmed outside the STK flow.
pub async fn record_payment<B>(
    path: web::Path<i64>,
    body: web::Json<PaymentRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement + ClientManagement,
{
    let id = path.into_inner();
    let request = body.into_inner();
    info!("💻️ POST {} payment of {} for order {id}", request.method, request.amount);
    let receipt = api.record_payment(id, request).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

route!(order_mpesa_candidates => Get "/orders/{id}/mpesa_candidates"
    impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// Unmatched M-Pesa transactions that could belong to this order, best match first.
pub async fn order_mpesa_candidates<B, G>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let id = path.into_inner();
    debug!("💻️ GET M-Pesa candidates for order {id}");
    let candidates = api.candidates_for_order(id).await?;
    Ok(HttpResponse::Ok().json(candidates))
}

//----------------------------------------------   M-Pesa (admin)  ----------------------------------------------
route!(stk_push => Post "/mpesa/stk_push" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// Prompts the customer's phone to pay for an order. Phone and amount default to the client's number and the
/// outstanding balance.
pub async fn stk_push<B, G>(
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let request = body.into_inner();
    info!("💻️ POST STK push for order {}", request.order_id);
    let result = api.initiate_stk_push(request).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(stk_status => Get "/mpesa/stk/{checkout_id}" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// The state of an STK prompt. With `?refresh=true`, M-Pesa is asked for the result first.
pub async fn stk_status<B, G>(
    path: web::Path<String>,
    query: web::Query<StkStatusParams>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let checkout_id = path.into_inner();
    debug!("💻️ GET STK request {checkout_id} (refresh: {})", query.refresh);
    let request = if query.refresh {
        api.refresh_stk_status(&checkout_id).await?.request().clone()
    } else {
        api.fetch_stk_request(&checkout_id)
            .await?
            .ok_or_else(|| ServerError::NoRecordFound(format!("STK request {checkout_id}")))?
    };
    Ok(HttpResponse::Ok().json(request))
}

route!(transactions => Get "/mpesa/transactions" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
pub async fn transactions<B, G>(
    query: web::Query<MpesaTransactionFilter>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let query = query.into_inner();
    debug!("💻️ GET M-Pesa transactions for [{query}]");
    let transactions = api.search_transactions(query).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

route!(transaction_candidates => Get "/mpesa/transactions/{id}/candidates"
    impl MpesaManagement, OrderManagement where gateway MpesaGateway);
pub async fn transaction_candidates<B, G>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let id = path.into_inner();
    debug!("💻️ GET order candidates for transaction {id}");
    let candidates = api.candidates_for_transaction(id).await?;
    Ok(HttpResponse::Ok().json(candidates))
}

route!(connect_transaction => Post "/mpesa/transactions/{id}/connect"
    impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// Applies an unmatched transaction to the order an administrator picked.
pub async fn connect_transaction<B, G>(
    path: web::Path<i64>,
    body: web::Json<ConnectTransactionRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let id = path.into_inner();
    let order_id = body.order_id;
    info!("💻️ POST connect transaction {id} to order {order_id}");
    let result = api.connect_transaction(id, order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(ignore_transaction => Post "/mpesa/transactions/{id}/ignore"
    impl MpesaManagement, OrderManagement where gateway MpesaGateway);
pub async fn ignore_transaction<B, G>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let id = path.into_inner();
    info!("💻️ POST ignore transaction {id}");
    let transaction = api.ignore_transaction(id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

route!(reconcile => Post "/mpesa/reconcile" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// Tries to match every unmatched transaction with an order.
pub async fn reconcile<B, G>(api: web::Data<PaymentFlowApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    info!("💻️ POST reconcile unmatched transactions");
    let summary = api.reconcile_unmatched().await?;
    info!("💻️ Reconciliation complete. {summary}");
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------   SMS  ----------------------------------------------------
route!(send_sms => Post "/sms" impl SmsLog, ClientManagement where gateway SmsGateway);
pub async fn send_sms<B, G>(
    body: web::Json<SmsRequest>,
    api: web::Data<NotificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SmsLog + ClientManagement,
    G: SmsGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST message to {} recipients", request.recipients.len());
    let result = api.send_sms(request).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(send_bulk_sms => Post "/sms/bulk" impl SmsLog, ClientManagement where gateway SmsGateway);
/// Sends a personalised message to the given clients, or to every client when `client_ids` is omitted.
pub async fn send_bulk_sms<B, G>(
    body: web::Json<BulkSmsRequest>,
    api: web::Data<NotificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SmsLog + ClientManagement,
    G: SmsGateway,
{
    info!("💻️ POST bulk message");
    let result = api.send_bulk(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(sms_history => Get "/sms" impl SmsLog, ClientManagement where gateway SmsGateway);
pub async fn sms_history<B, G>(
    query: web::Query<SmsQueryFilter>,
    api: web::Data<NotificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SmsLog + ClientManagement,
    G: SmsGateway,
{
    debug!("💻️ GET SMS history");
    let records = api.sms_history(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(records))
}

//----------------------------------------------   Reports  ----------------------------------------------------
route!(report => Get "/reports" impl OrderManagement, ClientManagement);
/// The business report. Use `?preset=today|week|month|year`, or `from` and `to`. Defaults to the current month.
pub async fn report<B>(
    query: web::Query<ReportQuery>,
    api: web::Data<ReportsApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + ClientManagement,
{
    debug!("💻️ GET report for {:?}", query.preset);
    let report = api.generate_report(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

//----------------------------------------------   M-Pesa callbacks  ---------------------------------------------
// Safaricom retries callbacks that are not acknowledged, so once a payload has been read these handlers always
// accept it. Processing failures are logged for an administrator.

route!(stk_callback => Post "/stk_callback" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
pub async fn stk_callback<B, G>(
    body: web::Json<StkCallbackEnvelope>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> HttpResponse
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let callback = body.into_inner().body.stk_callback;
    let checkout_id = callback.checkout_request_id.clone();
    info!("💰️ STK callback for {checkout_id}: [{}] {}", callback.result_code, callback.result_desc);
    let resolution = stk_resolution_from_callback(&callback);
    match api.handle_stk_callback(&checkout_id, resolution).await {
        Ok(outcome) => {
            debug!("💰️ STK callback for {checkout_id} applied. Request is {}", outcome.request().status)
        },
        Err(e) => error!("💰️ Could not apply the STK callback for {checkout_id}. {e}"),
    }
    HttpResponse::Ok().json(MpesaAck::accepted())
}

#[post("/c2b/validation")]
pub async fn c2b_validation(body: web::Json<C2bPayload>) -> impl Responder {
    info!("💰️ C2B validation for {} of {} from {}", body.trans_id, body.trans_amount, body.msisdn);
    HttpResponse::Ok().json(MpesaAck::accepted())
}

route!(c2b_confirmation => Post "/c2b/confirmation" impl MpesaManagement, OrderManagement where gateway MpesaGateway);
/// A paybill payment. It is stored and, where possible, matched with an order straight away.
pub async fn c2b_confirmation<B, G>(
    body: web::Json<C2bPayload>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> HttpResponse
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    let payload = body.into_inner();
    let (receipt, amount) = (&payload.trans_id, &payload.trans_amount);
    info!("💰️ C2B confirmation {receipt} of {amount} for '{}'", payload.bill_ref_number);
    match new_transaction_from_c2b(&payload) {
        Ok(transaction) => match api.process_c2b_transaction(transaction).await {
            Ok(outcome) => debug!("💰️ C2B payment {} processed: {outcome:?}", payload.trans_id),
            Err(e) => error!("💰️ Could not process C2B payment {}. {e}", payload.trans_id),
        },
        Err(e) => error!("💰️ Could not read C2B payment {}. {e}", payload.trans_id),
    }
    HttpResponse::Ok().json(MpesaAck::accepted())
}
