use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Money, OrderStatus, PaymentMethod, PaymentStatus, PhoneNumber},
    lms_api::reports_api::ReportError,
};

/// East Africa Time. Business days are counted in local time.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 180;

/// Longest period a report may cover, in days. The daily revenue series has one point per day.
pub const MAX_REPORT_DAYS: i64 = 3_660;

/// Longest inactivity window, in days.
pub const MAX_INACTIVE_DAYS: i64 = 3_650;

//--------------------------------------       Period          --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPreset {
    Today,
    /// The last seven days, including today
    Week,
    /// Since the first of the current month
    Month,
    /// Since the first of January
    Year,
}

impl FromStr for ReportPreset {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ReportError::InvalidPreset(s.to_string())),
        }
    }
}

/// A closed interval of time to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ReportError> {
        if from > to {
            return Err(ReportError::InvalidRange { from, to });
        }
        let days = (to - from).num_days();
        if days > MAX_REPORT_DAYS {
            return Err(ReportError::PeriodTooLong(days));
        }
        Ok(Self { from, to })
    }

    /// The period for `preset`, ending at `now`. Day boundaries are midnight at `utc_offset_minutes` from UTC.
    pub fn from_preset(preset: ReportPreset, now: DateTime<Utc>, utc_offset_minutes: i32) -> Self {
        let tz = local_offset(utc_offset_minutes);
        let today = now.with_timezone(&tz).date_naive();
        let start_date = match preset {
            ReportPreset::Today => today,
            ReportPreset::Week => today - Duration::days(6),
            ReportPreset::Month => today.with_day(1).unwrap_or(today),
            ReportPreset::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        let from = local_midnight(start_date, &tz).unwrap_or(now);
        Self { from, to: now }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.from && *ts <= self.to
    }

    /// Every local calendar day touched by the period, in order. At most `MAX_REPORT_DAYS + 1` days are returned.
    pub fn days(&self, utc_offset_minutes: i32) -> Vec<NaiveDate> {
        let tz = local_offset(utc_offset_minutes);
        let first = self.from.with_timezone(&tz).date_naive();
        let last = self.to.with_timezone(&tz).date_naive();
        first.iter_days().take_while(|d| *d <= last).take(MAX_REPORT_DAYS as usize + 1).collect()
    }
}

impl Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from.format("%Y-%m-%d %H:%M"), self.to.format("%Y-%m-%d %H:%M"))
    }
}

pub fn local_offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}

pub fn local_date(ts: &DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    ts.with_timezone(&local_offset(utc_offset_minutes)).date_naive()
}

fn local_midnight(date: NaiveDate, tz: &FixedOffset) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight).single().map(|t| t.with_timezone(&Utc))
}

//--------------------------------------       Options         --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Clients whose lifetime spend reaches this amount are VIPs
    pub vip_threshold: Money,
    /// Clients with no orders in this many days are inactive
    pub inactive_days: i64,
    pub utc_offset_minutes: i32,
    /// Length of the top services and top customers lists
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            vip_threshold: Money::from_shillings(10_000),
            inactive_days: 60,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            top_n: 10,
        }
    }
}

impl ReportOptions {
    pub fn with_vip_threshold(mut self, threshold: Money) -> Self {
        self.vip_threshold = threshold;
        self
    }

    pub fn with_inactive_days(mut self, days: i64) -> Self {
        self.inactive_days = days;
        self
    }
}

/// Report parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub preset: Option<String>,
    /// Shillings
    pub vip_threshold: Option<i64>,
    pub inactive_days: Option<i64>,
}

//--------------------------------------       Report          --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessReport {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub revenue: RevenueSummary,
    pub orders: OrderDistribution,
    pub daily: Vec<DailyPoint>,
    pub top_services: Vec<ServiceSales>,
    pub categories: Vec<CategorySales>,
    pub customers: CustomerSegments,
    pub top_customers: Vec<CustomerSpend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Sum of the totals of orders placed in the period, excluding cancelled orders
    pub gross_sales: Money,
    pub discounts: Money,
    /// Payments received in the period, whichever order they were for
    pub collected: Money,
    pub collected_by_method: BTreeMap<PaymentMethod, Money>,
    /// Balances still owed on the orders placed in the period
    pub outstanding: Money,
    pub average_order_value: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDistribution {
    pub total: usize,
    pub cancelled: usize,
    pub by_status: BTreeMap<OrderStatus, usize>,
    pub by_payment_status: BTreeMap<PaymentStatus, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub orders: usize,
    pub sales: Money,
    pub collected: Money,
}

impl DailyPoint {
    pub fn empty(date: NaiveDate) -> Self {
        Self { date, orders: 0, sales: Money::default(), collected: Money::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSales {
    pub service_name: String,
    pub category_name: String,
    pub quantity: f64,
    pub revenue: Money,
    /// Number of orders that included the service
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySales {
    pub category_name: String,
    pub revenue: Money,
    pub items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSegments {
    pub total_clients: usize,
    /// Registered during the period
    pub new_clients: usize,
    /// Placed at least one order during the period
    pub active_clients: usize,
    /// Active, and had also ordered before the period
    pub returning_clients: usize,
    /// Lifetime spend at or above the VIP threshold
    pub vip_clients: usize,
    /// No orders in the inactivity window, including clients who never ordered
    pub inactive_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSpend {
    pub client_id: i64,
    pub name: String,
    pub phone: PhoneNumber,
    pub orders: usize,
    pub spent: Money,
}
