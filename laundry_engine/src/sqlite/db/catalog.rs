use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Category, CategorySummary, CategoryUpdate, NewCategory, NewService, Service, ServiceUpdate},
    lms_api::catalog_objects::ServiceQueryFilter,
    sqlite::db::MAX_IN_CLAUSE,
    traits::{is_unique_violation, CatalogApiError},
};

const SERVICE_SELECT: &str = r#"
    SELECT services.*, categories.name AS category_name
    FROM services JOIN categories ON categories.id = services.category_id
"#;

//--------------------------------------      Categories       --------------------------------------------------------
pub async fn insert_category(category: NewCategory, conn: &mut SqliteConnection) -> Result<Category, CatalogApiError> {
    let now = Utc::now();
    let name = category.name.clone();
    let category: Category = sqlx::query_as(
        "INSERT INTO categories (name, description, created_at, updated_at) VALUES ($1, $2, $3, $3) RETURNING *",
    )
    .bind(category.name)
    .bind(category.description)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| if is_unique_violation(&e) { CatalogApiError::DuplicateCategory(name) } else { e.into() })?;
    debug!("🗃️ Category #{} '{}' saved", category.id, category.name);
    Ok(category)
}

pub async fn update_category(
    id: i64,
    update: CategoryUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Category>, CatalogApiError> {
    if update.is_empty() {
        return Err(CatalogApiError::CatalogModificationNoOp);
    }
    let name = update.name.clone();
    let mut builder = QueryBuilder::new("UPDATE categories SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(description) = update.description {
        builder.push(", description = ").push_bind(description);
    }
    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let category = builder.build_query_as::<Category>().fetch_optional(conn).await.map_err(|e| match name {
        Some(name) if is_unique_violation(&e) => CatalogApiError::DuplicateCategory(name),
        _ => e.into(),
    })?;
    Ok(category)
}

pub async fn delete_category(id: i64, conn: &mut SqliteConnection) -> Result<Option<Category>, sqlx::Error> {
    let category =
        sqlx::query_as("DELETE FROM categories WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await?;
    Ok(category)
}

pub async fn count_services_in_category(id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE category_id = $1").bind(id).fetch_one(conn).await?;
    Ok(count)
}

pub async fn fetch_category(id: i64, conn: &mut SqliteConnection) -> Result<Option<Category>, sqlx::Error> {
    let category = sqlx::query_as("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(category)
}

pub async fn fetch_categories(conn: &mut SqliteConnection) -> Result<Vec<CategorySummary>, sqlx::Error> {
    let categories = sqlx::query_as(
        r#"
        SELECT categories.*, COUNT(services.id) AS service_count
        FROM categories LEFT JOIN services ON services.category_id = categories.id
        GROUP BY categories.id
        ORDER BY categories.name COLLATE NOCASE
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(categories)
}

//--------------------------------------       Services        --------------------------------------------------------
pub async fn insert_service(service: NewService, conn: &mut SqliteConnection) -> Result<Service, CatalogApiError> {
    let now = Utc::now();
    let name = service.name.clone();
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO services (category_id, name, description, unit, price, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id;
        "#,
    )
    .bind(service.category_id)
    .bind(service.name)
    .bind(service.description)
    .bind(service.unit)
    .bind(service.price)
    .bind(service.active)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| if is_unique_violation(&e) { CatalogApiError::DuplicateService(name) } else { e.into() })?;
    let service = fetch_service(id, conn).await?.ok_or(CatalogApiError::ServiceNotFound(id))?;
    debug!("🗃️ Service #{id} '{}' saved at {}", service.name, service.price);
    Ok(service)
}

pub async fn update_service(
    id: i64,
    update: ServiceUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Service>, CatalogApiError> {
    if update.is_empty() {
        return Err(CatalogApiError::CatalogModificationNoOp);
    }
    let name = update.name.clone();
    let mut builder = QueryBuilder::new("UPDATE services SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(category_id) = update.category_id {
        builder.push(", category_id = ").push_bind(category_id);
    }
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(description) = update.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(unit) = update.unit {
        builder.push(", unit = ").push_bind(unit);
    }
    if let Some(price) = update.price {
        builder.push(", price = ").push_bind(price);
    }
    if let Some(active) = update.active {
        builder.push(", active = ").push_bind(active);
    }
    builder.push(" WHERE id = ").push_bind(id);
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build().execute(&mut *conn).await.map_err(|e| match name {
        Some(name) if is_unique_violation(&e) => CatalogApiError::DuplicateService(name),
        _ => e.into(),
    })?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(fetch_service(id, conn).await?)
}

pub async fn delete_service(id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, sqlx::Error> {
    let service = fetch_service(id, &mut *conn).await?;
    if service.is_some() {
        sqlx::query("DELETE FROM services WHERE id = $1").bind(id).execute(conn).await?;
    }
    Ok(service)
}

pub async fn fetch_service(id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, sqlx::Error> {
    let service = sqlx::query_as(&format!("{SERVICE_SELECT} WHERE services.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(service)
}

pub async fn fetch_services(
    query: ServiceQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Service>, sqlx::Error> {
    let mut builder = QueryBuilder::new(SERVICE_SELECT);
    if !query.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(category_id) = query.category_id {
        where_clause.push("services.category_id = ");
        where_clause.push_bind_unseparated(category_id);
    }
    if query.active_only.unwrap_or(false) {
        where_clause.push("services.active = TRUE");
    }
    if let Some(search) = query.search {
        where_clause.push("(services.name LIKE ");
        where_clause.push_bind_unseparated(format!("%{search}%"));
        where_clause.push_unseparated(" OR categories.name LIKE ");
        where_clause.push_bind_unseparated(format!("%{search}%"));
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY categories.name COLLATE NOCASE, services.name COLLATE NOCASE");
    trace!("🗃️ Executing query: {}", builder.sql());
    let services = builder.build_query_as::<Service>().fetch_all(conn).await?;
    Ok(services)
}

pub async fn fetch_services_by_id(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Service>, sqlx::Error> {
    let mut result = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_IN_CLAUSE) {
        let mut builder = QueryBuilder::new(SERVICE_SELECT);
        builder.push(" WHERE services.id IN (");
        let mut list = builder.separated(", ");
        for id in chunk {
            list.push_bind(*id);
        }
        builder.push(")");
        result.extend(builder.build_query_as::<Service>().fetch_all(&mut *conn).await?);
    }
    Ok(result)
}
