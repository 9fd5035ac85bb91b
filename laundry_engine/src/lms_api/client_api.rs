//! Client records and their order history.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Client, ClientUpdate, Money, NewClient, OrderStatus, PhoneNumber},
    lms_api::{
        client_objects::{ClientHistory, ClientQueryFilter, ClientUpdateRequest, NewClientRequest},
        order_objects::OrderQueryFilter,
    },
    traits::{ClientApiError, ClientManagement, OrderManagement},
};

pub struct ClientApi<B> {
    db: B,
}

impl<B: Debug> Debug for ClientApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClientApi ({:?})", self.db)
    }
}

impl<B> ClientApi<B>
where B: ClientManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new client. The phone number is normalised, and must not belong to another client.
    pub async fn create_client(&self, request: NewClientRequest) -> Result<Client, ClientApiError> {
        let name = validate_name(&request.name)?;
        let phone = PhoneNumber::parse(&request.phone)?;
        let mut client = NewClient::new(name, phone);
        client.email = non_empty(request.email).map(validate_email).transpose()?;
        client.address = non_empty(request.address);
        client.notes = non_empty(request.notes);
        let client = self.db.insert_client(client).await?;
        info!("🔄️👤️ New client #{} registered: {} ({})", client.id, client.name, client.phone);
        Ok(client)
    }

    /// Changes the fields given in `request`. An empty string clears an optional field.
    pub async fn update_client(&self, id: i64, request: ClientUpdateRequest) -> Result<Client, ClientApiError> {
        let update = ClientUpdate {
            name: request.name.as_deref().map(validate_name).transpose()?,
            phone: request.phone.as_deref().map(PhoneNumber::parse).transpose()?,
            email: request.email.map(clearable_email).transpose()?,
            address: request.address.map(|s| s.trim().to_string()),
            notes: request.notes.map(|s| s.trim().to_string()),
        };
        let client = self.db.update_client(id, update).await?;
        debug!("🔄️👤️ Client #{id} updated");
        Ok(client)
    }

    pub async fn delete_client(&self, id: i64) -> Result<Client, ClientApiError> {
        let client = self.db.delete_client(id).await?;
        info!("🔄️👤️ Client #{id} ({}) deleted", client.name);
        Ok(client)
    }

    pub async fn fetch_client(&self, id: i64) -> Result<Option<Client>, ClientApiError> {
        self.db.fetch_client(id).await
    }

    pub async fn search_clients(&self, query: ClientQueryFilter) -> Result<Vec<Client>, ClientApiError> {
        trace!("🔄️👤️ Client search: {query}");
        self.db.search_clients(query).await
    }
}

impl<B> ClientApi<B>
where B: ClientManagement + OrderManagement
{
    /// A client's orders, newest first, with lifetime totals. Cancelled orders are listed but not counted.
    pub async fn client_history(&self, id: i64) -> Result<ClientHistory, ClientApiError> {
        let client = self.db.fetch_client(id).await?.ok_or(ClientApiError::ClientNotFound(id))?;
        let orders = self
            .db
            .search_orders(OrderQueryFilter::default().with_client_id(id))
            .await
            .map_err(|e| ClientApiError::DatabaseError(e.to_string()))?;
        let counted = orders.iter().filter(|o| o.status != OrderStatus::Cancelled).collect::<Vec<_>>();
        let history = ClientHistory {
            order_count: counted.len(),
            total_spent: counted.iter().map(|o| o.total).sum::<Money>(),
            total_paid: counted.iter().map(|o| o.amount_paid).sum::<Money>(),
            outstanding: counted.iter().map(|o| o.balance()).sum::<Money>(),
            last_order_at: counted.iter().map(|o| o.created_at).max(),
            client,
            orders,
        };
        Ok(history)
    }
}

fn validate_name(name: &str) -> Result<String, ClientApiError> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(ClientApiError::ValidationError("A client name is required".into()));
    }
    Ok(name)
}

fn validate_email(email: String) -> Result<String, ClientApiError> {
    let email = email.trim().to_string();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace) => {
            Ok(email)
        },
        _ => Err(ClientApiError::ValidationError(format!("'{email}' is not a valid email address"))),
    }
}

fn clearable_email(email: String) -> Result<String, ClientApiError> {
    if email.trim().is_empty() {
        Ok(String::new())
    } else {
        validate_email(email)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
