use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewSmsRecord, SmsRecord},
    lms_api::sms_objects::SmsQueryFilter,
};

pub async fn insert_sms_record(record: NewSmsRecord, conn: &mut SqliteConnection) -> Result<SmsRecord, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO sms_messages (recipient, message, status, provider_message_id, cost, error, order_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(record.recipient)
    .bind(record.message)
    .bind(record.status)
    .bind(record.provider_message_id)
    .bind(record.cost)
    .bind(record.error)
    .bind(record.order_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// Message history, newest first.
pub async fn search_sms_records(
    query: SmsQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<SmsRecord>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM sms_messages");
    let has_conditions = query.recipient.is_some() ||
        query.status.is_some() ||
        query.order_id.is_some() ||
        query.since.is_some() ||
        query.until.is_some();
    if has_conditions {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(recipient) = query.recipient {
        where_clause.push("recipient LIKE ");
        where_clause.push_bind_unseparated(format!("%{recipient}%"));
    }
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    builder.push(" LIMIT ").push_bind(query.limit.unwrap_or(-1));
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<SmsRecord>().fetch_all(conn).await
}
