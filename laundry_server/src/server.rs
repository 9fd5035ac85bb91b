use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use gateway_tools::{MpesaApi, SmsApi};
use laundry_engine::{
    events::{EventHandlers, EventProducers},
    CatalogApi,
    ClientApi,
    NotificationApi,
    OrderFlowApi,
    PaymentFlowApi,
    ReportsApi,
    SqliteDatabase,
};
use log::{info, warn};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::{get_remote_ip, is_whitelisted},
    integrations::{
        mpesa::DarajaGateway,
        sms::{notification_hooks, SmsGatewayAdapter, NOTIFICATION_EVENT_BUFFER_SIZE},
    },
    payment_poller::start_payment_poller,
    routes::*,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let mpesa = MpesaApi::new(config.mpesa.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let sms = SmsApi::new(config.sms.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateways = Gateways { mpesa: DarajaGateway::new(mpesa), sms: SmsGatewayAdapter::new(sms) };
    let producers = start_event_handlers(&config, db.clone(), gateways.sms.clone()).await;
    let poller_api = PaymentFlowApi::new(db.clone(), gateways.mpesa.clone(), producers.clone());
    let _poller = start_payment_poller(poller_api, config.payment_poll_interval, config.stk_timeout);
    let srv = create_server_instance(config, db, gateways, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The provider clients, already adapted to the engine's gateway traits.
#[derive(Clone)]
pub struct Gateways {
    pub mpesa: DarajaGateway,
    pub sms: SmsGatewayAdapter,
}

async fn start_event_handlers(
    config: &ServerConfig,
    db: SqliteDatabase,
    gateway: SmsGatewayAdapter,
) -> EventProducers {
    if !config.notifications.any() {
        info!("📬️ All order notifications are switched off");
        return EventProducers::default();
    }
    let api = Arc::new(NotificationApi::new(db, gateway, config.business_name.clone()));
    let hooks = notification_hooks(api, config.notifications);
    let handlers = EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateways: Gateways,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let clients_api = ClientApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), gateways.mpesa.clone(), producers.clone());
        let sms_api = NotificationApi::new(db.clone(), gateways.sms.clone(), config.business_name.clone());
        let reports_api = ReportsApi::new(db.clone(), config.report_options());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lms::access_log"))
            .configure(extractor_config)
            .app_data(web::Data::new(clients_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(sms_api))
            .app_data(web::Data::new(reports_api));
        let admin_scope =
            web::scope("/api/admin").configure(admin_routes::<SqliteDatabase, DarajaGateway, SmsGatewayAdapter>);
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let mpesa_whitelist = config.mpesa_whitelist.clone();
        let mpesa_scope = web::scope("/mpesa")
            .wrap_fn(move |req, srv| {
                // Collect peer IP from x-forwarded-for, or forwarded headers _if_ `use_nnn` has been set to true
                // in the configuration. Otherwise, use the peer address from the connection info.
                let peer_ip = get_remote_ip(&req, use_x_forwarded_for, use_forwarded);
                if mpesa_whitelist.is_some() && peer_ip.is_none() {
                    warn!("No IP address found in M-Pesa callback request, denying access.");
                }
                if is_whitelisted(peer_ip, mpesa_whitelist.as_deref()) {
                    srv.call(req)
                } else {
                    warn!("💰️ Rejected an M-Pesa callback from {peer_ip:?}");
                    let err = ServerError::Forbidden(format!("{peer_ip:?} may not call the M-Pesa callbacks"));
                    ok(req.error_response(err)).boxed_local()
                }
            })
            .configure(mpesa_callback_routes::<SqliteDatabase, DarajaGateway>);
        app.service(health).service(admin_scope).service(mpesa_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Every admin route, generic over the storage backend and the two gateways.
pub fn admin_routes<B, M, S>(cfg: &mut web::ServiceConfig)
where
    B: laundry_engine::ClientManagement
        + laundry_engine::CatalogManagement
        + laundry_engine::OrderManagement
        + laundry_engine::MpesaManagement
        + laundry_engine::SmsLog
        + 'static,
    M: laundry_engine::MpesaGateway + 'static,
    S: laundry_engine::SmsGateway + 'static,
{
    cfg.service(ClientsRoute::<B>::new())
        .service(CreateClientRoute::<B>::new())
        .service(ClientHistoryRoute::<B>::new())
        .service(ClientByIdRoute::<B>::new())
        .service(UpdateClientRoute::<B>::new())
        .service(DeleteClientRoute::<B>::new())
        .service(CategoriesRoute::<B>::new())
        .service(CreateCategoryRoute::<B>::new())
        .service(UpdateCategoryRoute::<B>::new())
        .service(DeleteCategoryRoute::<B>::new())
        .service(ServicesRoute::<B>::new())
        .service(CreateServiceRoute::<B>::new())
        .service(ServiceByIdRoute::<B>::new())
        .service(UpdateServiceRoute::<B>::new())
        .service(DeleteServiceRoute::<B>::new())
        .service(QuoteRoute::<B>::new())
        .service(OrderByNumberRoute::<B>::new())
        .service(OrdersRoute::<B>::new())
        .service(CreateOrderRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(OrderPaymentsRoute::<B>::new())
        .service(RecordPaymentRoute::<B>::new())
        .service(OrderMpesaCandidatesRoute::<B, M>::new())
        .service(StkPushRoute::<B, M>::new())
        .service(StkStatusRoute::<B, M>::new())
        .service(TransactionsRoute::<B, M>::new())
        .service(TransactionCandidatesRoute::<B, M>::new())
        .service(ConnectTransactionRoute::<B, M>::new())
        .service(IgnoreTransactionRoute::<B, M>::new())
        .service(ReconcileRoute::<B, M>::new())
        .service(SendSmsRoute::<B, S>::new())
        .service(SendBulkSmsRoute::<B, S>::new())
        .service(SmsHistoryRoute::<B, S>::new())
        .service(ReportRoute::<B>::new());
}

pub fn mpesa_callback_routes<B, M>(cfg: &mut web::ServiceConfig)
where
    B: laundry_engine::MpesaManagement + laundry_engine::OrderManagement + 'static,
    M: laundry_engine::MpesaGateway + 'static,
{
    cfg.service(StkCallbackRoute::<B, M>::new())
        .service(c2b_validation)
        .service(C2bConfirmationRoute::<B, M>::new());
}

/// Malformed bodies, query strings and paths are answered with the same JSON error body as every other failure.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|e: JsonPayloadError, _: &HttpRequest| {
        ServerError::InvalidRequestBody(e.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|e: QueryPayloadError, _: &HttpRequest| {
        ServerError::ValidationError(e.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|e: PathError, _: &HttpRequest| {
        ServerError::InvalidRequestPath(e.to_string()).into()
    }));
}
