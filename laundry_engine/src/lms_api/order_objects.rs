use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Discount, Money, NewOrderItem, Order, OrderStatus, Payment, PaymentMethod, PaymentStatus};

//--------------------------------------         Cart          --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub service_id: i64,
    /// Number of items, pairs or kilograms, depending on the service unit
    pub quantity: f64,
}

impl CartItem {
    pub fn new(service_id: i64, quantity: f64) -> Self {
        Self { service_id, quantity }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub discount: Discount,
}

impl Cart {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items, discount: Discount::None }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }
}

/// A priced cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub items: Vec<NewOrderItem>,
    pub subtotal: Money,
    pub discount: Discount,
    pub discount_amount: Money,
    pub total: Money,
}

//--------------------------------------       Requests        --------------------------------------------------------
/// A payment taken at the counter, or recorded manually by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// The amount handed over. For cash, anything above the balance is returned as change.
    pub amount: Money,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl PaymentRequest {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Self { method, amount, reference: None, notes: None }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A new order from the point of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub client_id: i64,
    #[serde(flatten)]
    pub cart: Cart,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Optional payment taken when the order is handed in
    pub initial_payment: Option<PaymentRequest>,
}

impl NewOrderRequest {
    pub fn new(client_id: i64, cart: Cart) -> Self {
        Self { client_id, cart, notes: None, due_date: None, initial_payment: None }
    }

    pub fn with_payment(mut self, payment: PaymentRequest) -> Self {
        self.initial_payment = Some(payment);
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

//--------------------------------------       Results         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub payment: Option<Payment>,
    /// Cash to hand back to the customer
    pub change: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub order: Order,
    pub payment: Payment,
    pub change: Money,
}

//--------------------------------------       Filters         --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub client_id: Option<i64>,
    pub status: Option<Vec<OrderStatus>>,
    pub payment_status: Option<Vec<PaymentStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Matches the order number, or the client's name or phone number
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_client_id(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

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

    /// Orders that still have money owing and can take payments.
    pub fn open_orders() -> Self {
        Self::default()
            .with_status(OrderStatus::Received)
            .with_status(OrderStatus::InProgress)
            .with_status(OrderStatus::Ready)
            .with_status(OrderStatus::Delivered)
            .with_payment_status(PaymentStatus::Unpaid)
            .with_payment_status(PaymentStatus::Pending)
            .with_payment_status(PaymentStatus::Partial)
            .with_payment_status(PaymentStatus::Failed)
    }

    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() &&
            self.status.is_none() &&
            self.payment_status.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.search.is_none() &&
            self.limit.is_none() &&
            self.offset.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(id) = self.client_id {
            write!(f, "client_id: {id}. ")?;
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "status in [{s}]. ")?;
        }
        if let Some(statuses) = &self.payment_status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "payment status in [{s}]. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentQueryFilter {
    pub order_id: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl PaymentQueryFilter {
    pub fn for_order(order_id: i64) -> Self {
        Self { order_id: Some(order_id), ..Default::default() }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.method.is_none() && self.since.is_none() && self.until.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_filters_accumulate() {
        let q = OrderQueryFilter::default().with_status(OrderStatus::Ready).with_status(OrderStatus::Received);
        assert_eq!(q.status, Some(vec![OrderStatus::Ready, OrderStatus::Received]));
        assert!(!q.is_empty());
        assert_eq!(q.to_string(), "status in [Ready,Received]. ");
        assert!(OrderQueryFilter::default().is_empty());
    }

    #[test]
    fn new_order_request_json() {
        let json = r#"{
            "client_id": 4,
            "items": [{"service_id": 1, "quantity": 2.5}, {"service_id": 3, "quantity": 1}],
            "discount": {"type": "percentage", "value": 10},
            "notes": "No starch",
            "due_date": null,
            "initial_payment": {"method": "Cash", "amount": 50000, "reference": null, "notes": null}
        }"#;
        let req: NewOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.client_id, 4);
        assert_eq!(req.cart.items.len(), 2);
        assert_eq!(req.cart.items[0], CartItem::new(1, 2.5));
        assert_eq!(req.cart.discount, Discount::Percentage(10.0));
        assert_eq!(req.initial_payment.unwrap().amount, Money::from_shillings(500));
    }
}
