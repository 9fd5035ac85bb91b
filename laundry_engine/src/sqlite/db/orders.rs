use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Money, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    helpers::payment_state::status_after_payment,
    lms_api::order_objects::OrderQueryFilter,
    sqlite::db::MAX_IN_CLAUSE,
    traits::OrderFlowError,
};

pub const ORDER_NUMBER_PREFIX: &str = "LND";

const ORDER_SELECT: &str = r#"
    SELECT orders.*, clients.name AS client_name, clients.phone AS client_phone
    FROM orders JOIN clients ON clients.id = orders.client_id
"#;

/// Order numbers look like `LND-240601-0007`: the seventh order taken on 1 June 2024 (UTC).
pub fn order_number_stem(date: NaiveDate) -> String {
    format!("{ORDER_NUMBER_PREFIX}-{}-", date.format("%y%m%d"))
}

pub async fn next_order_number(date: NaiveDate, conn: &mut SqliteConnection) -> Result<String, sqlx::Error> {
    let stem = order_number_stem(date);
    let last: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(CAST(substr(order_number, $1) AS INTEGER)) FROM orders WHERE order_number LIKE $2",
    )
    .bind(stem.len() as i64 + 1)
    .bind(format!("{stem}%"))
    .fetch_one(conn)
    .await?;
    Ok(format!("{stem}{:04}", last.unwrap_or(0) + 1))
}

/// Inserts the order and its items. This is not atomic on its own: run it inside a transaction.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let order_number = next_order_number(order.created_at.date_naive(), &mut *conn).await?;
    let (discount_kind, discount_value) = order.discount.kind_and_value();
    let payment_status = if order.total.is_positive() {
        PaymentStatus::Unpaid
    } else {
        status_after_payment(order.total, Money::default())
    };
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO orders (
                order_number,
                client_id,
                subtotal,
                discount_kind,
                discount_value,
                discount_amount,
                total,
                payment_status,
                notes,
                due_date,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id;
        "#,
    )
    .bind(&order_number)
    .bind(order.client_id)
    .bind(order.subtotal)
    .bind(discount_kind)
    .bind(discount_value)
    .bind(order.discount_amount)
    .bind(order.total)
    .bind(payment_status)
    .bind(order.notes)
    .bind(order.due_date)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        insert_order_item(id, item, &mut *conn).await?;
    }
    debug!("🗃️ Order {order_number} saved with id {id} ({payment_status})");
    fetch_order(id, conn).await?.ok_or(OrderFlowError::OrderNotFound(id))
}

async fn insert_order_item(order_id: i64, item: NewOrderItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_items (
                order_id,
                service_id,
                service_name,
                category_name,
                unit,
                quantity,
                unit_price,
                line_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(order_id)
    .bind(item.service_id)
    .bind(item.service_name)
    .bind(item.category_name)
    .bind(item.unit)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches an order, including its items
pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(&format!("{ORDER_SELECT} WHERE orders.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_number(number: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(&format!("{ORDER_SELECT} WHERE orders.order_number = $1"))
        .bind(number.trim().to_ascii_uppercase())
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(order) => {
            let mut orders = [order];
            load_items(&mut orders, conn).await?;
            let [order] = orders;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Fetches orders matching the filter, newest first, with their items.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(ORDER_SELECT);
    let has_conditions = query.client_id.is_some() ||
        query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) ||
        query.payment_status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) ||
        query.since.is_some() ||
        query.until.is_some() ||
        query.search.as_ref().map(|s| !s.trim().is_empty()).unwrap_or(false);
    if has_conditions {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(client_id) = query.client_id {
        where_clause.push("orders.client_id = ");
        where_clause.push_bind_unseparated(client_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("orders.status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.payment_status.filter(|s| !s.is_empty()) {
        where_clause.push("orders.payment_status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("orders.created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("orders.created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(search) = query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        where_clause.push("(orders.order_number LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR clients.name LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR clients.phone LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY orders.created_at DESC, orders.id DESC");
    builder.push(" LIMIT ").push_bind(query.limit.unwrap_or(-1));
    builder.push(" OFFSET ").push_bind(query.offset.unwrap_or(0));
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    load_items(&mut orders, conn).await?;
    trace!("🗃️ Order search returned {} orders", orders.len());
    Ok(orders)
}

/// Loads the items for every order in `orders`, in as few queries as possible.
pub async fn load_items(orders: &mut [Order], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let ids = orders.iter().map(|o| o.id).collect::<Vec<_>>();
    let mut items_by_order = HashMap::<i64, Vec<OrderItem>>::new();
    for chunk in ids.chunks(MAX_IN_CLAUSE) {
        let mut builder = QueryBuilder::new("SELECT * FROM order_items WHERE order_id IN (");
        let mut list = builder.separated(", ");
        for id in chunk {
            list.push_bind(*id);
        }
        builder.push(") ORDER BY id");
        let items = builder.build_query_as::<OrderItem>().fetch_all(&mut *conn).await?;
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
    }
    for order in orders.iter_mut() {
        order.items = items_by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

pub async fn update_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result = sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(OrderFlowError::OrderNotFound(id));
    }
    fetch_order(id, conn).await?.ok_or(OrderFlowError::OrderNotFound(id))
}

/// Overwrites the payment totals of an order.
pub async fn update_payment_totals(
    id: i64,
    amount_paid: Money,
    payment_status: PaymentStatus,
    method: Option<PaymentMethod>,
    timestamp: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE orders SET
            amount_paid = $1,
            payment_status = $2,
            payment_method = COALESCE($3, payment_method),
            updated_at = $4
        WHERE id = $5
        "#,
    )
    .bind(amount_paid)
    .bind(payment_status)
    .bind(method)
    .bind(timestamp)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_payment_status(
    id: i64,
    payment_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_status = $1, updated_at = $2 WHERE id = $3")
        .bind(payment_status)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
