use thiserror::Error;

use crate::{
    db_types::{Client, ClientUpdate, NewClient, PhoneNumber},
    lms_api::client_objects::ClientQueryFilter,
    traits::is_unique_violation,
};

#[derive(Debug, Clone, Error)]
pub enum ClientApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Client #{0} does not exist")]
    ClientNotFound(i64),
    #[error("A client with phone number {0} already exists")]
    DuplicatePhone(PhoneNumber),
    #[error("{0}")]
    InvalidPhone(String),
    #[error("Invalid client details: {0}")]
    ValidationError(String),
    #[error("Client #{0} has orders and cannot be deleted")]
    ClientHasOrders(i64),
    #[error("The update request contained no changes")]
    ClientModificationNoOp,
}

impl From<sqlx::Error> for ClientApiError {
    fn from(e: sqlx::Error) -> Self {
        ClientApiError::DatabaseError(e.to_string())
    }
}

impl From<lms_common::PhoneNumberError> for ClientApiError {
    fn from(e: lms_common::PhoneNumberError) -> Self {
        ClientApiError::InvalidPhone(e.to_string())
    }
}

impl ClientApiError {
    /// Maps a failed insert or update onto `DuplicatePhone` when the phone number was already taken.
    pub(crate) fn from_write_error(e: sqlx::Error, phone: Option<&PhoneNumber>) -> Self {
        match phone {
            Some(p) if is_unique_violation(&e) => ClientApiError::DuplicatePhone(p.clone()),
            _ => e.into(),
        }
    }
}

/// Storage for client records.
#[allow(async_fn_in_trait)]
pub trait ClientManagement {
    /// Stores a new client. Phone numbers are unique: adding a second client with the same number fails with
    /// [`ClientApiError::DuplicatePhone`].
    async fn insert_client(&self, client: NewClient) -> Result<Client, ClientApiError>;

    /// Applies the non-empty fields of `update` to the client, returning the updated record.
    async fn update_client(&self, id: i64, update: ClientUpdate) -> Result<Client, ClientApiError>;

    /// Deletes a client. Clients that have placed orders are kept, and [`ClientApiError::ClientHasOrders`] is
    /// returned.
    async fn delete_client(&self, id: i64) -> Result<Client, ClientApiError>;

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientApiError>;

    async fn fetch_client_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Client>, ClientApiError>;

    /// Clients matching the filter, ordered by name.
    async fn search_clients(&self, query: ClientQueryFilter) -> Result<Vec<Client>, ClientApiError>;

    async fn fetch_clients_by_id(&self, ids: &[i64]) -> Result<Vec<Client>, ClientApiError>;
}
