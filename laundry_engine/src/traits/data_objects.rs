use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// An order as it stands after a payment was applied to it, along with the payment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentApplied {
    pub order: Order,
    pub payment: Payment,
}

impl PaymentApplied {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.order.balance().is_zero()
    }
}
