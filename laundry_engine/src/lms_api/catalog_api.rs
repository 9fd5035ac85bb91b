//! The service catalog: categories and the priced services filed under them.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Category, CategorySummary, CategoryUpdate, NewCategory, NewService, Service, ServiceUpdate},
    lms_api::catalog_objects::ServiceQueryFilter,
    traits::{CatalogApiError, CatalogManagement},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_category(&self, mut category: NewCategory) -> Result<Category, CatalogApiError> {
        category.name = required_name(&category.name, "category")?;
        let category = self.db.insert_category(category).await?;
        info!("🔄️🧺️ Category #{} ({}) created", category.id, category.name);
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, mut update: CategoryUpdate) -> Result<Category, CatalogApiError> {
        update.name = update.name.as_deref().map(|n| required_name(n, "category")).transpose()?;
        self.db.update_category(id, update).await
    }

    /// Deletes a category. Categories that still hold services cannot be deleted.
    pub async fn delete_category(&self, id: i64) -> Result<Category, CatalogApiError> {
        let category = self.db.delete_category(id).await?;
        info!("🔄️🧺️ Category #{id} ({}) deleted", category.name);
        Ok(category)
    }

    pub async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogApiError> {
        self.db.fetch_category(id).await
    }

    pub async fn categories(&self) -> Result<Vec<CategorySummary>, CatalogApiError> {
        self.db.fetch_categories().await
    }

    pub async fn create_service(&self, mut service: NewService) -> Result<Service, CatalogApiError> {
        service.name = required_name(&service.name, "service")?;
        if !service.price.is_positive() {
            return Err(CatalogApiError::ValidationError(format!("The price of {} must be positive", service.name)));
        }
        let service = self.db.insert_service(service).await?;
        info!("🔄️🧺️ Service #{} ({}, {}) created at {}", service.id, service.name, service.category_name, service.price);
        Ok(service)
    }

    pub async fn update_service(&self, id: i64, mut update: ServiceUpdate) -> Result<Service, CatalogApiError> {
        update.name = update.name.as_deref().map(|n| required_name(n, "service")).transpose()?;
        if let Some(price) = update.price.filter(|p| !p.is_positive()) {
            return Err(CatalogApiError::ValidationError(format!("{price} is not a valid price")));
        }
        let service = self.db.update_service(id, update).await?;
        debug!("🔄️🧺️ Service #{id} updated");
        Ok(service)
    }

    pub async fn delete_service(&self, id: i64) -> Result<Service, CatalogApiError> {
        let service = self.db.delete_service(id).await?;
        info!("🔄️🧺️ Service #{id} ({}) deleted", service.name);
        Ok(service)
    }

    pub async fn fetch_service(&self, id: i64) -> Result<Option<Service>, CatalogApiError> {
        self.db.fetch_service(id).await
    }

    pub async fn services(&self, query: ServiceQueryFilter) -> Result<Vec<Service>, CatalogApiError> {
        trace!("🔄️🧺️ Service search: {query}");
        self.db.fetch_services(query).await
    }
}

fn required_name(name: &str, what: &str) -> Result<String, CatalogApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogApiError::ValidationError(format!("A {what} name is required")));
    }
    Ok(name.to_string())
}
