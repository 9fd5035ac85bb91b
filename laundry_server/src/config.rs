//! Server configuration
//!
//! Every setting is read from an `LMS_*` environment variable. Missing or invalid values are logged and replaced
//! with a default, so the server always starts. Run the server binary with any argument to print the full list.
use std::{env, net::IpAddr};

use chrono::Duration;
use gateway_tools::{MpesaConfig, SmsConfig};
use laundry_engine::{
    db_types::Money,
    lms_api::report_objects::{ReportOptions, MAX_INACTIVE_DAYS},
};
use lms_common::helpers::{env_flag, env_or_default};
use log::*;

const DEFAULT_LMS_HOST: &str = "127.0.0.1";
const DEFAULT_LMS_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/laundry.db";
const DEFAULT_POLL_INTERVAL_SECONDS: i64 = 15;
const DEFAULT_STK_TIMEOUT_SECONDS: i64 = 180;
const DEFAULT_BUSINESS_NAME: &str = "Our laundry";
const DEFAULT_VIP_THRESHOLD_SHILLINGS: i64 = 10_000;
const DEFAULT_INACTIVE_DAYS: i64 = 60;
const MAX_INTERVAL_SECONDS: i64 = 86_400;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Addresses allowed to call the M-Pesa callbacks. `None` accepts callbacks from anywhere.
    pub mpesa_whitelist: Option<Vec<IpAddr>>,
    pub payment_poll_interval: Duration,
    pub stk_timeout: Duration,
    pub business_name: String,
    pub vip_threshold: Money,
    pub inactive_days: i64,
    pub notifications: NotificationConfig,
    pub mpesa: MpesaConfig,
    pub sms: SmsConfig,
}

/// Which events send a text message to the client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationConfig {
    pub order_created: bool,
    pub order_ready: bool,
    pub payment_received: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { order_created: true, order_ready: true, payment_received: true }
    }
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        Self {
            order_created: env_flag("LMS_SMS_NOTIFY_ORDER_CREATED", true),
            order_ready: env_flag("LMS_SMS_NOTIFY_ORDER_READY", true),
            payment_received: env_flag("LMS_SMS_NOTIFY_PAYMENT", true),
        }
    }

    pub fn any(&self) -> bool {
        self.order_created || self.order_ready || self.payment_received
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LMS_HOST.into(),
            port: DEFAULT_LMS_PORT,
            database_url: DEFAULT_DATABASE_URL.into(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            mpesa_whitelist: None,
            payment_poll_interval: Duration::seconds(DEFAULT_POLL_INTERVAL_SECONDS),
            stk_timeout: Duration::seconds(DEFAULT_STK_TIMEOUT_SECONDS),
            business_name: DEFAULT_BUSINESS_NAME.into(),
            vip_threshold: Money::from_shillings(DEFAULT_VIP_THRESHOLD_SHILLINGS),
            inactive_days: DEFAULT_INACTIVE_DAYS,
            notifications: NotificationConfig::default(),
            mpesa: MpesaConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LMS_HOST").ok().unwrap_or_else(|| DEFAULT_LMS_HOST.into());
        let port = env_or_default("LMS_PORT", DEFAULT_LMS_PORT);
        let database_url = env::var("LMS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LMS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let use_x_forwarded_for = env_flag("LMS_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("LMS_USE_FORWARDED", false);
        let mpesa_whitelist = configure_mpesa_whitelist(env::var("LMS_MPESA_IP_WHITELIST").ok());
        let payment_poll_interval = positive_seconds("LMS_PAYMENT_POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECONDS);
        let stk_timeout = positive_seconds("LMS_STK_TIMEOUT", DEFAULT_STK_TIMEOUT_SECONDS);
        let business_name = env::var("LMS_BUSINESS_NAME").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!("🪛️ LMS_BUSINESS_NAME is not set. Text messages will be signed '{DEFAULT_BUSINESS_NAME}'.");
            DEFAULT_BUSINESS_NAME.into()
        });
        let vip_threshold = env_or_default("LMS_VIP_THRESHOLD", DEFAULT_VIP_THRESHOLD_SHILLINGS);
        let vip_threshold = Money::try_from_shillings(vip_threshold).filter(|m| !m.is_negative()).unwrap_or_else(|| {
            warn!("🪛️ LMS_VIP_THRESHOLD of {vip_threshold} is out of range. Using {DEFAULT_VIP_THRESHOLD_SHILLINGS}.");
            Money::from_shillings(DEFAULT_VIP_THRESHOLD_SHILLINGS)
        });
        let mut inactive_days = env_or_default("LMS_INACTIVE_DAYS", DEFAULT_INACTIVE_DAYS);
        if !(1..=MAX_INACTIVE_DAYS).contains(&inactive_days) {
            warn!("🪛️ LMS_INACTIVE_DAYS of {inactive_days} is out of range. Using {DEFAULT_INACTIVE_DAYS}.");
            inactive_days = DEFAULT_INACTIVE_DAYS;
        }
        let notifications = NotificationConfig::from_env_or_default();
        let mpesa = MpesaConfig::new_from_env_or_default();
        let sms = SmsConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            mpesa_whitelist,
            payment_poll_interval,
            stk_timeout,
            business_name,
            vip_threshold,
            inactive_days,
            notifications,
            mpesa,
            sms,
        }
    }

    /// The default report options, as configured
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions::default().with_vip_threshold(self.vip_threshold).with_inactive_days(self.inactive_days)
    }
}

fn positive_seconds(name: &str, default: i64) -> Duration {
    let seconds = env_or_default(name, default);
    if seconds <= 0 || seconds > MAX_INTERVAL_SECONDS {
        warn!("🪛️ {name} must be between 1 and {MAX_INTERVAL_SECONDS} seconds. Using {default}s instead.");
        return Duration::seconds(default);
    }
    Duration::seconds(seconds)
}

/// Parses the M-Pesa callback whitelist. `none`, `false` or `0` disable it. Invalid addresses are dropped.
pub fn configure_mpesa_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
            return None;
        }
        let ip_addrs = s
            .split(',')
            .map(|s| s.trim())
            .filter_map(|s| {
                s.parse()
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in LMS_MPESA_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The M-Pesa IP whitelist was configured, but is empty. The server will run, but will reject every \
                 M-Pesa callback."
            );
        },
        None => {
            info!(
                "🪛️ M-Pesa IP whitelist is disabled. If this is not what you want, set LMS_MPESA_IP_WHITELIST to a \
                 comma-separated list of Safaricom's IP addresses."
            );
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ M-Pesa IP whitelist: {addrs}");
        },
    }
    whitelist
}
