use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        MpesaTransaction,
        NewMpesaTransaction,
        NewPayment,
        NewStkRequest,
        Order,
        PaymentMethod,
        PaymentStatus,
        StkRequest,
        StkResolution,
        StkStatus,
        TransactionSource,
        TransactionStatus,
    },
    helpers::payment_state::{check_payable, status_after_failed_prompt},
    lms_api::payment_objects::{ConnectedTransaction, MpesaTransactionFilter, StkOutcome},
    sqlite::db::{orders, payments},
    traits::{OrderFlowError, PaymentFlowError},
};

//--------------------------------------     STK requests      --------------------------------------------------------

/// Stores a new STK request and marks the order as awaiting payment. Run this inside a transaction.
pub async fn insert_stk_request(
    request: NewStkRequest,
    conn: &mut SqliteConnection,
) -> Result<(StkRequest, Order), PaymentFlowError> {
    let order_id = request.order_id;
    let order = fetch_order(order_id, &mut *conn).await?;
    check_payable(&order)?;
    if let Some(pending) = fetch_pending_stk_request_for_order(order_id, &mut *conn).await? {
        return Err(PaymentFlowError::StkAlreadyPending {
            order_number: order.order_number,
            checkout_request_id: pending.checkout_request_id,
        });
    }
    let stk: StkRequest = sqlx::query_as(
        r#"
            INSERT INTO stk_requests (
                checkout_request_id,
                merchant_request_id,
                order_id,
                phone,
                amount,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(request.checkout_request_id)
    .bind(request.merchant_request_id)
    .bind(order_id)
    .bind(request.phone)
    .bind(request.amount)
    .bind(request.created_at)
    .bind(request.created_at)
    .fetch_one(&mut *conn)
    .await?;
    orders::set_payment_status(order_id, PaymentStatus::Pending, &mut *conn).await?;
    let order = fetch_order(order_id, conn).await?;
    debug!("🗃️ STK request {} saved for order {}", stk.checkout_request_id, order.order_number);
    Ok((stk, order))
}

async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Order, PaymentFlowError> {
    let order = orders::fetch_order(order_id, conn).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
    Ok(order)
}

pub async fn fetch_stk_request(
    checkout_request_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StkRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stk_requests WHERE checkout_request_id = $1")
        .bind(checkout_request_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_pending_stk_request_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StkRequest>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM stk_requests WHERE order_id = $1 AND status = $2 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(order_id)
    .bind(StkStatus::Pending)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_pending_stk_requests(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<StkRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stk_requests WHERE status = $1 AND created_at < $2 ORDER BY created_at, id")
        .bind(StkStatus::Pending)
        .bind(created_before)
        .fetch_all(conn)
        .await
}

async fn update_stk_request(
    id: i64,
    status: StkStatus,
    resolution: &StkResolution,
    conn: &mut SqliteConnection,
) -> Result<StkRequest, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE stk_requests SET
            status = $1,
            result_code = $2,
            result_desc = $3,
            mpesa_receipt = $4,
            updated_at = $5
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(resolution.result_code)
    .bind(&resolution.result_desc)
    .bind(&resolution.receipt)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(conn)
    .await
}

/// Applies the final result of an STK prompt. Run this inside a transaction.
pub async fn resolve_stk_request(
    checkout_request_id: &str,
    resolution: StkResolution,
    conn: &mut SqliteConnection,
) -> Result<StkOutcome, PaymentFlowError> {
    let request = fetch_stk_request(checkout_request_id, &mut *conn)
        .await?
        .ok_or_else(|| PaymentFlowError::StkRequestNotFound(checkout_request_id.to_string()))?;
    if request.status.is_final() {
        let request = backfill_receipt(request, &resolution, conn).await?;
        return Ok(StkOutcome::AlreadyResolved { request });
    }
    match resolution.status() {
        StkStatus::Success => apply_stk_payment(request, resolution, conn).await,
        StkStatus::Pending => Ok(StkOutcome::StillPending { request }),
        status => {
            let request = update_stk_request(request.id, status, &resolution, &mut *conn).await?;
            let order = fetch_order(request.order_id, &mut *conn).await?;
            if order.payment_status == PaymentStatus::Pending {
                let new_status = status_after_failed_prompt(order.amount_paid);
                orders::set_payment_status(order.id, new_status, &mut *conn).await?;
            }
            let order = fetch_order(request.order_id, conn).await?;
            info!(
                "🗃️ STK request {} for order {} ended with {status}: {}",
                request.checkout_request_id, order.order_number, resolution.result_desc
            );
            Ok(StkOutcome::Failed { request, order })
        },
    }
}

async fn apply_stk_payment(
    request: StkRequest,
    resolution: StkResolution,
    conn: &mut SqliteConnection,
) -> Result<StkOutcome, PaymentFlowError> {
    // Status queries do not report the receipt number. The checkout id stands in until the callback arrives.
    let receipt = resolution.receipt.clone().unwrap_or_else(|| request.checkout_request_id.clone());
    let request = update_stk_request(request.id, StkStatus::Success, &resolution, &mut *conn).await?;
    if let Some(existing) = fetch_mpesa_transaction_by_receipt(&receipt, &mut *conn).await? {
        warn!(
            "🗃️ M-Pesa receipt {receipt} for STK request {} was already recorded as transaction #{}",
            request.checkout_request_id, existing.id
        );
        return Ok(StkOutcome::AlreadyResolved { request });
    }
    let order = fetch_order(request.order_id, &mut *conn).await?;
    let amount = resolution.amount.unwrap_or(request.amount);
    let transaction_time = resolution.transaction_time.unwrap_or_else(Utc::now);
    let transaction = NewMpesaTransaction::new(receipt.clone(), amount, TransactionSource::Stk)
        .with_phone(resolution.phone.clone().unwrap_or_else(|| request.phone.clone()))
        .with_account_reference(order.order_number.clone())
        .with_transaction_time(transaction_time);
    if order.is_payable() {
        let payment =
            NewPayment::new(amount, PaymentMethod::Mpesa).with_reference(receipt).created_at(transaction_time);
        let applied = payments::apply_payment(order.id, payment, &mut *conn).await?;
        insert_mpesa_transaction(transaction, TransactionStatus::Matched, Some(order.id), conn).await?;
        Ok(StkOutcome::Paid { request, order: applied.order, payment: applied.payment })
    } else {
        warn!(
            "🗃️ Order {} was paid through STK, but can no longer take payments. The payment is left unmatched.",
            order.order_number
        );
        let (transaction, _) = insert_mpesa_transaction(transaction, TransactionStatus::Unmatched, None, conn).await?;
        Ok(StkOutcome::Unapplied { request, transaction })
    }
}

/// When a status query resolved a request before the callback arrived, the checkout id was used in place of the
/// receipt number. Swap in the real receipt everywhere it was used.
async fn backfill_receipt(
    request: StkRequest,
    resolution: &StkResolution,
    conn: &mut SqliteConnection,
) -> Result<StkRequest, sqlx::Error> {
    let receipt = match (&request.status, &request.mpesa_receipt, &resolution.receipt) {
        (StkStatus::Success, None, Some(receipt)) => receipt.clone(),
        _ => return Ok(request),
    };
    let checkout_id = request.checkout_request_id.as_str();
    debug!("🗃️ Filling in receipt {receipt} for STK request {checkout_id}");
    sqlx::query("UPDATE payments SET reference = $1 WHERE method = $2 AND reference = $3")
        .bind(&receipt)
        .bind(PaymentMethod::Mpesa)
        .bind(checkout_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE mpesa_transactions SET transaction_id = $1, updated_at = $2 WHERE transaction_id = $3")
        .bind(&receipt)
        .bind(Utc::now())
        .bind(checkout_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query_as("UPDATE stk_requests SET mpesa_receipt = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(&receipt)
        .bind(Utc::now())
        .bind(request.id)
        .fetch_one(conn)
        .await
}

//--------------------------------------  M-Pesa transactions  --------------------------------------------------------

/// Stores a transaction, unless its receipt number has been seen before. Returns the stored transaction and whether
/// it was inserted by this call.
pub async fn insert_mpesa_transaction(
    transaction: NewMpesaTransaction,
    status: TransactionStatus,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<(MpesaTransaction, bool), sqlx::Error> {
    let receipt = transaction.transaction_id.clone();
    let now = Utc::now();
    let inserted: Option<MpesaTransaction> = sqlx::query_as(
        r#"
            INSERT INTO mpesa_transactions (
                transaction_id,
                phone,
                amount,
                account_reference,
                payer_name,
                transaction_time,
                source,
                status,
                order_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (transaction_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(transaction.transaction_id)
    .bind(transaction.phone)
    .bind(transaction.amount)
    .bind(transaction.account_reference)
    .bind(transaction.payer_name)
    .bind(transaction.transaction_time)
    .bind(transaction.source)
    .bind(status)
    .bind(order_id)
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(tx) => {
            debug!("🗃️ M-Pesa transaction {receipt} saved as #{} ({status})", tx.id);
            Ok((tx, true))
        },
        None => {
            debug!("🗃️ M-Pesa transaction {receipt} has been seen before");
            let existing = fetch_mpesa_transaction_by_receipt(&receipt, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_mpesa_transaction(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<MpesaTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM mpesa_transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_mpesa_transaction_by_receipt(
    receipt: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<MpesaTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM mpesa_transactions WHERE transaction_id = $1")
        .bind(receipt)
        .fetch_optional(conn)
        .await
}

pub async fn search_mpesa_transactions(
    query: MpesaTransactionFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<MpesaTransaction>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM mpesa_transactions");
    if !query.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(source) = query.source {
        where_clause.push("source = ");
        where_clause.push_bind_unseparated(source);
    }
    if let Some(phone) = query.phone {
        where_clause.push("phone = ");
        where_clause.push_bind_unseparated(phone);
    }
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(since) = query.since {
        where_clause.push("transaction_time >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("transaction_time <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY transaction_time, id");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<MpesaTransaction>().fetch_all(conn).await
}

async fn set_transaction_status(
    id: i64,
    status: TransactionStatus,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<MpesaTransaction, sqlx::Error> {
    sqlx::query_as(
        "UPDATE mpesa_transactions SET status = $1, order_id = $2, updated_at = $3 WHERE id = $4 RETURNING *",
    )
    .bind(status)
    .bind(order_id)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(conn)
    .await
}

async fn fetch_unmatched(id: i64, conn: &mut SqliteConnection) -> Result<MpesaTransaction, PaymentFlowError> {
    let tx = fetch_mpesa_transaction(id, conn).await?.ok_or(PaymentFlowError::TransactionNotFound(id))?;
    if tx.status != TransactionStatus::Unmatched {
        let (transaction_id, status) = (tx.transaction_id, tx.status);
        return Err(PaymentFlowError::TransactionAlreadyProcessed { transaction_id, status });
    }
    Ok(tx)
}

/// Applies an unmatched transaction to an order. Run this inside a transaction.
pub async fn connect_transaction(
    id: i64,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<ConnectedTransaction, PaymentFlowError> {
    let tx = fetch_unmatched(id, &mut *conn).await?;
    let payment = NewPayment::new(tx.amount, PaymentMethod::Mpesa)
        .with_reference(tx.transaction_id.clone())
        .created_at(tx.transaction_time);
    let applied = payments::apply_payment(order_id, payment, &mut *conn).await?;
    let transaction = set_transaction_status(id, TransactionStatus::Matched, Some(order_id), conn).await?;
    debug!("🗃️ M-Pesa transaction {} connected to order {}", transaction.transaction_id, applied.order.order_number);
    Ok(ConnectedTransaction { transaction, order: applied.order, payment: applied.payment })
}

pub async fn ignore_transaction(id: i64, conn: &mut SqliteConnection) -> Result<MpesaTransaction, PaymentFlowError> {
    fetch_unmatched(id, &mut *conn).await?;
    let tx = set_transaction_status(id, TransactionStatus::Ignored, None, conn).await?;
    debug!("🗃️ M-Pesa transaction {} marked as ignored", tx.transaction_id);
    Ok(tx)
}
