use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Client, Money, Order};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientQueryFilter {
    /// Matches any part of the name, phone number or email address
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ClientQueryFilter {
    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.limit.is_none() && self.offset.is_none()
    }
}

impl Display for ClientQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(search) = &self.search {
            write!(f, "search: {search}. ")?;
        }
        if let Some(limit) = self.limit {
            write!(f, "limit: {limit}. ")?;
        }
        if let Some(offset) = self.offset {
            write!(f, "offset: {offset}. ")?;
        }
        Ok(())
    }
}

/// Client details as entered at the counter. The phone number is validated and normalised on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClientRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl NewClientRequest {
    pub fn new<S: Into<String>>(name: S, phone: S) -> Self {
        Self { name: name.into(), phone: phone.into(), email: None, address: None, notes: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// A client's order history with running totals. Cancelled orders are listed but do not count towards the totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientHistory {
    pub client: Client,
    pub orders: Vec<Order>,
    pub order_count: usize,
    pub total_spent: Money,
    pub total_paid: Money,
    pub outstanding: Money,
    pub last_order_at: Option<DateTime<Utc>>,
}
