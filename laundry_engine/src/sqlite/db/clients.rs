use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Client, ClientUpdate, NewClient, PhoneNumber},
    lms_api::client_objects::ClientQueryFilter,
    sqlite::db::MAX_IN_CLAUSE,
    traits::ClientApiError,
};

pub async fn insert_client(client: NewClient, conn: &mut SqliteConnection) -> Result<Client, ClientApiError> {
    let phone = client.phone.clone();
    let client: Client = sqlx::query_as(
        r#"
            INSERT INTO clients (name, phone, email, address, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(client.name)
    .bind(client.phone)
    .bind(client.email)
    .bind(client.address)
    .bind(client.notes)
    .bind(client.created_at)
    .fetch_one(conn)
    .await
    .map_err(|e| ClientApiError::from_write_error(e, Some(&phone)))?;
    debug!("🗃️ Client #{} ({}) saved", client.id, client.phone);
    Ok(client)
}

pub async fn update_client(
    id: i64,
    update: ClientUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Client>, ClientApiError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for client #{id}. Update request skipped.");
        return Err(ClientApiError::ClientModificationNoOp);
    }
    let phone = update.phone.clone();
    let mut builder = QueryBuilder::new("UPDATE clients SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(phone) = update.phone {
        builder.push(", phone = ").push_bind(phone);
    }
    if let Some(email) = update.email {
        builder.push(", email = ").push_bind(email);
    }
    if let Some(address) = update.address {
        builder.push(", address = ").push_bind(address);
    }
    if let Some(notes) = update.notes {
        builder.push(", notes = ").push_bind(notes);
    }
    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let client = builder
        .build_query_as::<Client>()
        .fetch_optional(conn)
        .await
        .map_err(|e| ClientApiError::from_write_error(e, phone.as_ref()))?;
    Ok(client)
}

pub async fn delete_client(id: i64, conn: &mut SqliteConnection) -> Result<Option<Client>, ClientApiError> {
    let client = sqlx::query_as("DELETE FROM clients WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await?;
    Ok(client)
}

pub async fn count_orders_for_client(id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE client_id = $1").bind(id).fetch_one(conn).await?;
    Ok(count)
}

pub async fn fetch_client(id: i64, conn: &mut SqliteConnection) -> Result<Option<Client>, sqlx::Error> {
    let client = sqlx::query_as("SELECT * FROM clients WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(client)
}

pub async fn fetch_client_by_phone(
    phone: &PhoneNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Client>, sqlx::Error> {
    let client =
        sqlx::query_as("SELECT * FROM clients WHERE phone = $1").bind(phone.as_str()).fetch_optional(conn).await?;
    Ok(client)
}

/// Clients whose name, phone number or email contain the search term, ordered by name.
///
/// A search term that looks like a phone number is normalised first, so `0712 345` finds `254712345678`.
pub async fn search_clients(query: ClientQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Client>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM clients");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        let phone_pattern = format!("%{}%", phone_fragment(search));
        builder.push(" WHERE name LIKE ").push_bind(pattern.clone());
        builder.push(" OR phone LIKE ").push_bind(phone_pattern);
        builder.push(" OR email LIKE ").push_bind(pattern);
    }
    builder.push(" ORDER BY name COLLATE NOCASE ASC, id ASC");
    builder.push(" LIMIT ").push_bind(query.limit.unwrap_or(-1));
    builder.push(" OFFSET ").push_bind(query.offset.unwrap_or(0));
    trace!("🗃️ Executing query: {}", builder.sql());
    let clients = builder.build_query_as::<Client>().fetch_all(conn).await?;
    trace!("🗃️ Client search returned {} results", clients.len());
    Ok(clients)
}

pub async fn fetch_clients_by_id(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Client>, sqlx::Error> {
    let mut result = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_IN_CLAUSE) {
        let mut builder = QueryBuilder::new("SELECT * FROM clients WHERE id IN (");
        let mut list = builder.separated(", ");
        for id in chunk {
            list.push_bind(*id);
        }
        builder.push(") ORDER BY id");
        let clients = builder.build_query_as::<Client>().fetch_all(&mut *conn).await?;
        result.extend(clients);
    }
    Ok(result)
}

/// Strips a phone-like search term down to the digits stored in the database: `0712-345` becomes `712345`.
fn phone_fragment(search: &str) -> String {
    let digits = search.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
    let looks_like_phone = !digits.is_empty() && search.chars().all(|c| c.is_ascii_digit() || " +-()".contains(c));
    if !looks_like_phone {
        return search.to_string();
    }
    let digits = digits.strip_prefix("254").unwrap_or(&digits);
    digits.strip_prefix('0').unwrap_or(digits).to_string()
}
