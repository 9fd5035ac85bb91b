use thiserror::Error;

use crate::{
    db_types::{Money, NewOrder, NewPayment, Order, OrderStatus, Payment, PaymentStatus},
    lms_api::order_objects::{OrderQueryFilter, PaymentQueryFilter},
    traits::{data_objects::PaymentApplied, CatalogApiError, ClientApiError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNumberNotFound(String),
    #[error("Client #{0} does not exist")]
    ClientNotFound(i64),
    #[error("Service #{0} does not exist")]
    ServiceNotFound(i64),
    #[error("'{0}' is no longer offered")]
    ServiceInactive(String),
    #[error("An order needs at least one item")]
    EmptyCart,
    #[error("Invalid quantity {1} for service #{0}")]
    InvalidQuantity(i64, f64),
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),
    #[error("The order is already {0}")]
    StatusModificationNoOp(OrderStatus),
    #[error("An order cannot move from {from} to {to}")]
    ForbiddenStatusChange { from: OrderStatus, to: OrderStatus },
    #[error("Order {0} has payments against it and cannot be cancelled")]
    CannotCancelPaidOrder(String),
    #[error("Order {0} has been cancelled and cannot take payments")]
    OrderCancelled(String),
    #[error("Order {0} is already paid in full")]
    OrderAlreadyPaid(String),
    #[error("Invalid payment amount: {0}")]
    InvalidPaymentAmount(Money),
    #[error("Payment reference {0} has already been used")]
    DuplicatePaymentReference(String),
    #[error("Payment status cannot move from {from} to {to}")]
    ForbiddenPaymentStatusChange { from: PaymentStatus, to: PaymentStatus },
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<CatalogApiError> for OrderFlowError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::ServiceNotFound(id) => OrderFlowError::ServiceNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<ClientApiError> for OrderFlowError {
    fn from(e: ClientApiError) -> Self {
        match e {
            ClientApiError::ClientNotFound(id) => OrderFlowError::ClientNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

/// Storage for orders and the payments made against them.
///
/// Every method that changes an order runs in a single database transaction, and re-checks the business rules
/// against the stored order before writing.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a priced order and its items, assigning the next order number for the day. If `payment` is given it is
    /// applied to the new order in the same transaction.
    async fn insert_order(
        &self,
        order: NewOrder,
        payment: Option<NewPayment>,
    ) -> Result<(Order, Option<Payment>), OrderFlowError>;

    /// Fetches an order, including its items.
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError>;

    /// Orders matching the filter, newest first, including their items.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Moves an order to a new fulfilment status, enforcing the allowed transitions. Returns the order before and
    /// after the change.
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(Order, Order), OrderFlowError>;

    /// Records a payment against an order and updates its paid amount and payment status.
    ///
    /// Fails if the order is cancelled or already paid, if the amount is not positive, or if the payment reference
    /// has already been used for the same method.
    async fn apply_payment(&self, order_id: i64, payment: NewPayment) -> Result<PaymentApplied, OrderFlowError>;

    async fn fetch_payments(&self, query: PaymentQueryFilter) -> Result<Vec<Payment>, OrderFlowError>;
}
