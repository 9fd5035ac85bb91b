//! Business report aggregation.
//!
//! Everything here is a pure function over orders, clients and payments that have already been loaded, so reports
//! can be tested without a database.
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    db_types::{Client, Money, Order, OrderStatus, Payment, PaymentMethod, PaymentStatus},
    lms_api::report_objects::{
        local_date,
        BusinessReport,
        CategorySales,
        CustomerSegments,
        CustomerSpend,
        DailyPoint,
        OrderDistribution,
        ReportOptions,
        ReportPeriod,
        RevenueSummary,
        ServiceSales,
        MAX_INACTIVE_DAYS,
    },
};

/// Builds a report for `period`. `orders` must hold every order (with items), not just those in the period, since
/// customer segments look at order history.
pub fn build_report(
    period: ReportPeriod,
    options: &ReportOptions,
    orders: &[Order],
    clients: &[Client],
    payments: &[Payment],
    generated_at: DateTime<Utc>,
) -> BusinessReport {
    let in_period = orders.iter().filter(|o| period.contains(&o.created_at)).collect::<Vec<_>>();
    let live = in_period.iter().copied().filter(|o| o.status != OrderStatus::Cancelled).collect::<Vec<_>>();
    let collected = payments.iter().filter(|p| period.contains(&p.created_at)).collect::<Vec<_>>();
    BusinessReport {
        period,
        generated_at,
        revenue: revenue_summary(&live, &collected),
        orders: order_distribution(&in_period),
        daily: daily_series(&period, options.utc_offset_minutes, &live, &collected),
        top_services: service_sales(&live, options.top_n),
        categories: category_sales(&live),
        customers: customer_segments(&period, options, orders, clients),
        top_customers: top_customers(&live, clients, options.top_n),
    }
}

pub fn revenue_summary(orders: &[&Order], payments: &[&Payment]) -> RevenueSummary {
    let gross_sales = orders.iter().map(|o| o.total).sum::<Money>();
    let discounts = orders.iter().map(|o| o.discount_amount).sum::<Money>();
    let outstanding = orders.iter().map(|o| o.balance()).sum::<Money>();
    let average_order_value = match orders.len() as i64 {
        0 => Money::default(),
        n => Money::from(gross_sales.value() / n),
    };
    let mut collected_by_method = PaymentMethod::ALL.iter().map(|m| (*m, Money::default())).collect::<BTreeMap<_, _>>();
    for p in payments {
        *collected_by_method.entry(p.method).or_default() += p.amount;
    }
    let collected = payments.iter().map(|p| p.amount).sum::<Money>();
    RevenueSummary { gross_sales, discounts, collected, collected_by_method, outstanding, average_order_value }
}

pub fn order_distribution(orders: &[&Order]) -> OrderDistribution {
    let mut by_status = OrderStatus::ALL.iter().map(|s| (*s, 0usize)).collect::<BTreeMap<_, _>>();
    let mut by_payment_status = PaymentStatus::ALL.iter().map(|s| (*s, 0usize)).collect::<BTreeMap<_, _>>();
    for o in orders {
        *by_status.entry(o.status).or_default() += 1;
        *by_payment_status.entry(o.payment_status).or_default() += 1;
    }
    let cancelled = by_status.get(&OrderStatus::Cancelled).copied().unwrap_or_default();
    OrderDistribution { total: orders.len(), cancelled, by_status, by_payment_status }
}

/// One point per local calendar day in the period, including days with no activity.
pub fn daily_series(
    period: &ReportPeriod,
    utc_offset: i32,
    orders: &[&Order],
    payments: &[&Payment],
) -> Vec<DailyPoint> {
    let mut days =
        period.days(utc_offset).into_iter().map(|d| (d, DailyPoint::empty(d))).collect::<BTreeMap<NaiveDate, _>>();
    for o in orders {
        if let Some(point) = days.get_mut(&local_date(&o.created_at, utc_offset)) {
            point.orders += 1;
            point.sales += o.total;
        }
    }
    for p in payments {
        if let Some(point) = days.get_mut(&local_date(&p.created_at, utc_offset)) {
            point.collected += p.amount;
        }
    }
    days.into_values().collect()
}

/// Best selling services by revenue. Line totals are before any order discount.
pub fn service_sales(orders: &[&Order], top_n: usize) -> Vec<ServiceSales> {
    let mut sales = HashMap::<(String, String), ServiceSales>::new();
    for o in orders {
        let mut seen = HashSet::new();
        for item in &o.items {
            let key = (item.service_name.clone(), item.category_name.clone());
            let entry = sales.entry(key.clone()).or_insert_with(|| ServiceSales {
                service_name: item.service_name.clone(),
                category_name: item.category_name.clone(),
                quantity: 0.0,
                revenue: Money::default(),
                orders: 0,
            });
            entry.quantity += item.quantity;
            entry.revenue += item.line_total;
            if seen.insert(key) {
                entry.orders += 1;
            }
        }
    }
    let mut sales = sales.into_values().collect::<Vec<_>>();
    sales.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.service_name.cmp(&b.service_name)));
    sales.truncate(top_n);
    sales
}

pub fn category_sales(orders: &[&Order]) -> Vec<CategorySales> {
    let mut sales = HashMap::<&str, CategorySales>::new();
    for item in orders.iter().flat_map(|o| o.items.iter()) {
        let entry = sales.entry(item.category_name.as_str()).or_insert_with(|| CategorySales {
            category_name: item.category_name.clone(),
            revenue: Money::default(),
            items: 0,
        });
        entry.revenue += item.line_total;
        entry.items += 1;
    }
    let mut sales = sales.into_values().collect::<Vec<_>>();
    sales.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.category_name.cmp(&b.category_name)));
    sales
}

/// Segments the client base. Cancelled orders do not count as activity or spend.
///
/// Inactivity is measured back from the end of the period.
pub fn customer_segments(
    period: &ReportPeriod,
    options: &ReportOptions,
    orders: &[Order],
    clients: &[Client],
) -> CustomerSegments {
    let live = orders.iter().filter(|o| o.status != OrderStatus::Cancelled).collect::<Vec<_>>();
    let mut lifetime_spend = HashMap::<i64, Money>::new();
    let mut last_order = HashMap::<i64, DateTime<Utc>>::new();
    let mut active = HashSet::new();
    let mut ordered_before = HashSet::new();
    for o in &live {
        if o.created_at > period.to {
            continue;
        }
        *lifetime_spend.entry(o.client_id).or_default() += o.total;
        let last = last_order.entry(o.client_id).or_insert(o.created_at);
        if o.created_at > *last {
            *last = o.created_at;
        }
        if period.contains(&o.created_at) {
            active.insert(o.client_id);
        } else if o.created_at < period.from {
            ordered_before.insert(o.client_id);
        }
    }
    let window = Duration::days(options.inactive_days.clamp(0, MAX_INACTIVE_DAYS));
    let inactive_since = period.to.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let vip_clients = clients
        .iter()
        .filter(|c| lifetime_spend.get(&c.id).map(|s| *s >= options.vip_threshold).unwrap_or(false))
        .count();
    let inactive_clients =
        clients.iter().filter(|c| last_order.get(&c.id).map(|t| *t < inactive_since).unwrap_or(true)).count();
    CustomerSegments {
        total_clients: clients.len(),
        new_clients: clients.iter().filter(|c| period.contains(&c.created_at)).count(),
        active_clients: active.len(),
        returning_clients: active.intersection(&ordered_before).count(),
        vip_clients,
        inactive_clients,
    }
}

/// Clients ranked by what they spent in the period.
pub fn top_customers(orders: &[&Order], clients: &[Client], top_n: usize) -> Vec<CustomerSpend> {
    let mut spend = HashMap::<i64, CustomerSpend>::new();
    for o in orders {
        let entry = spend.entry(o.client_id).or_insert_with(|| {
            let client = clients.iter().find(|c| c.id == o.client_id);
            CustomerSpend {
                client_id: o.client_id,
                name: client.map(|c| c.name.clone()).unwrap_or_else(|| o.client_name.clone()),
                phone: client.map(|c| c.phone.clone()).unwrap_or_else(|| o.client_phone.clone()),
                orders: 0,
                spent: Money::default(),
            }
        });
        entry.orders += 1;
        entry.spent += o.total;
    }
    let mut spend = spend.into_values().collect::<Vec<_>>();
    spend.sort_by(|a, b| b.spent.cmp(&a.spent).then_with(|| a.client_id.cmp(&b.client_id)));
    spend.truncate(top_n);
    spend
}
