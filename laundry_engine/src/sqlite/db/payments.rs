use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment},
    helpers::payment_state::{add_payment, check_payable, check_payment_amount, status_after_payment},
    lms_api::order_objects::PaymentQueryFilter,
    sqlite::db::orders,
    traits::{is_unique_violation, OrderFlowError, PaymentApplied},
};

async fn insert_payment(
    order_id: i64,
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderFlowError> {
    let reference = payment.reference.clone();
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, method, reference, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(payment.amount)
    .bind(payment.method)
    .bind(payment.reference)
    .bind(payment.notes)
    .bind(payment.created_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match reference {
        Some(r) if is_unique_violation(&e) => OrderFlowError::DuplicatePaymentReference(r),
        _ => e.into(),
    })?;
    Ok(payment)
}

/// Applies a payment to an order. Run this inside a transaction: the order is read, checked and updated in separate
/// statements.
pub async fn apply_payment(
    order_id: i64,
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<PaymentApplied, OrderFlowError> {
    let order = orders::fetch_order(order_id, &mut *conn).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    check_payable(&order)?;
    check_payment_amount(payment.amount)?;
    let amount_paid = add_payment(order.amount_paid, payment.amount)?;
    let payment = insert_payment(order_id, payment, &mut *conn).await?;
    let payment_status = status_after_payment(order.total, amount_paid);
    orders::update_payment_totals(order_id, amount_paid, payment_status, Some(payment.method), Utc::now(), &mut *conn)
        .await?;
    debug!(
        "🗃️ {} payment of {} applied to order {}. Paid {amount_paid} of {}. Status is now {payment_status}",
        payment.method, payment.amount, order.order_number, order.total
    );
    let order = orders::fetch_order(order_id, conn).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    Ok(PaymentApplied::new(order, payment))
}

/// Payments matching the filter, oldest first.
pub async fn fetch_payments(
    query: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM payments");
    if !query.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(method) = query.method {
        where_clause.push("method = ");
        where_clause.push_bind_unseparated(method);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at, id");
    trace!("🗃️ Executing query: {}", builder.sql());
    let payments = builder.build_query_as::<Payment>().fetch_all(conn).await?;
    Ok(payments)
}
