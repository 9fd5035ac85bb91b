use thiserror::Error;

use crate::{
    db_types::{Category, CategorySummary, CategoryUpdate, NewCategory, NewService, Service, ServiceUpdate},
    lms_api::catalog_objects::ServiceQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Category #{0} does not exist")]
    CategoryNotFound(i64),
    #[error("Service #{0} does not exist")]
    ServiceNotFound(i64),
    #[error("A category called '{0}' already exists")]
    DuplicateCategory(String),
    #[error("The category already has a service called '{0}'")]
    DuplicateService(String),
    #[error("Category #{0} still has {1} services and cannot be deleted")]
    CategoryInUse(i64, i64),
    #[error("Invalid catalog entry: {0}")]
    ValidationError(String),
    #[error("The update request contained no changes")]
    CatalogModificationNoOp,
}

impl From<sqlx::Error> for CatalogApiError {
    fn from(e: sqlx::Error) -> Self {
        CatalogApiError::DatabaseError(e.to_string())
    }
}

/// Storage for the service catalog.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_category(&self, category: NewCategory) -> Result<Category, CatalogApiError>;

    async fn update_category(&self, id: i64, update: CategoryUpdate) -> Result<Category, CatalogApiError>;

    /// Deletes an empty category. Fails with [`CatalogApiError::CategoryInUse`] if any services are filed under it.
    async fn delete_category(&self, id: i64) -> Result<Category, CatalogApiError>;

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogApiError>;

    /// All categories, by name, with the number of services in each.
    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, CatalogApiError>;

    async fn insert_service(&self, service: NewService) -> Result<Service, CatalogApiError>;

    async fn update_service(&self, id: i64, update: ServiceUpdate) -> Result<Service, CatalogApiError>;

    /// Deletes a service. Existing order items keep their own copy of the name and price.
    async fn delete_service(&self, id: i64) -> Result<Service, CatalogApiError>;

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, CatalogApiError>;

    async fn fetch_services(&self, query: ServiceQueryFilter) -> Result<Vec<Service>, CatalogApiError>;

    async fn fetch_services_by_id(&self, ids: &[i64]) -> Result<Vec<Service>, CatalogApiError>;
}
