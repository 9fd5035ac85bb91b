//! Business reports for the admin dashboard.
//!
//! Reports are computed on demand by scanning every order, client and payment in the database.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use thiserror::Error;

use crate::{
    db_types::Money,
    helpers::reporting::build_report,
    lms_api::{
        client_objects::ClientQueryFilter,
        order_objects::{OrderQueryFilter, PaymentQueryFilter},
        report_objects::{
            BusinessReport,
            ReportOptions,
            ReportPeriod,
            ReportPreset,
            ReportQuery,
            MAX_INACTIVE_DAYS,
            MAX_REPORT_DAYS,
        },
    },
    traits::{ClientApiError, ClientManagement, OrderFlowError, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The report period is invalid: {from} is after {to}")]
    InvalidRange { from: DateTime<Utc>, to: DateTime<Utc> },
    #[error("Unknown report period '{0}'. Use today, week, month or year")]
    InvalidPreset(String),
    #[error("Invalid report option: {0}")]
    InvalidOption(String),
    #[error("The report period covers {0} days. Reports cover at most {MAX_REPORT_DAYS} days")]
    PeriodTooLong(i64),
}

impl From<OrderFlowError> for ReportError {
    fn from(e: OrderFlowError) -> Self {
        ReportError::DatabaseError(e.to_string())
    }
}

impl From<ClientApiError> for ReportError {
    fn from(e: ClientApiError) -> Self {
        ReportError::DatabaseError(e.to_string())
    }
}

pub struct ReportsApi<B> {
    db: B,
    defaults: ReportOptions,
}

impl<B: Debug> Debug for ReportsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReportsApi ({:?})", self.db)
    }
}

impl<B> ReportsApi<B> {
    pub fn new(db: B, defaults: ReportOptions) -> Self {
        Self { db, defaults }
    }

    /// Works out the report period from a query. A preset takes precedence over explicit dates. A missing `to`
    /// means now, and a query with neither a preset nor a `from` date covers the current month.
    pub fn period_for(&self, query: &ReportQuery, now: DateTime<Utc>) -> Result<ReportPeriod, ReportError> {
        let offset = self.defaults.utc_offset_minutes;
        if let Some(preset) = query.preset.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let preset = preset.parse::<ReportPreset>()?;
            return Ok(ReportPeriod::from_preset(preset, now, offset));
        }
        match (query.from, query.to) {
            (Some(from), to) => ReportPeriod::new(from, to.unwrap_or(now)),
            (None, Some(to)) => {
                let month = ReportPeriod::from_preset(ReportPreset::Month, to, offset);
                ReportPeriod::new(month.from, to)
            },
            (None, None) => Ok(ReportPeriod::from_preset(ReportPreset::Month, now, offset)),
        }
    }

    /// The configured report options, with any overrides from the query applied.
    pub fn options_for(&self, query: &ReportQuery) -> Result<ReportOptions, ReportError> {
        let mut options = self.defaults;
        if let Some(threshold) = query.vip_threshold {
            if threshold < 0 {
                return Err(ReportError::InvalidOption(format!("VIP threshold {threshold} is negative")));
            }
            let threshold = Money::try_from_shillings(threshold)
                .ok_or_else(|| ReportError::InvalidOption(format!("VIP threshold {threshold} is too large")))?;
            options = options.with_vip_threshold(threshold);
        }
        if let Some(days) = query.inactive_days {
            if days <= 0 || days > MAX_INACTIVE_DAYS {
                return Err(ReportError::InvalidOption(format!(
                    "Inactivity window of {days} days is not between 1 and {MAX_INACTIVE_DAYS}"
                )));
            }
            options = options.with_inactive_days(days);
        }
        Ok(options)
    }
}

impl<B> ReportsApi<B>
where B: OrderManagement + ClientManagement
{
    pub async fn generate_report(&self, query: ReportQuery) -> Result<BusinessReport, ReportError> {
        let now = Utc::now();
        let period = self.period_for(&query, now)?;
        let options = self.options_for(&query)?;
        self.report_for_period(period, &options).await
    }

    pub async fn report_for_period(
        &self,
        period: ReportPeriod,
        options: &ReportOptions,
    ) -> Result<BusinessReport, ReportError> {
        let orders = self.db.search_orders(OrderQueryFilter::default()).await?;
        let clients = self.db.search_clients(ClientQueryFilter::default()).await?;
        let payments = self.db.fetch_payments(PaymentQueryFilter::default().since(period.from).until(period.to)).await?;
        trace!(
            "📊️ Building report for {period} from {} orders, {} clients and {} payments",
            orders.len(),
            clients.len(),
            payments.len()
        );
        let report = build_report(period, options, &orders, &clients, &payments, Utc::now());
        debug!(
            "📊️ Report for {period}: {} orders, {} sales, {} collected",
            report.orders.total, report.revenue.gross_sales, report.revenue.collected
        );
        Ok(report)
    }
}
