//! Payment rules shared by the order and M-Pesa flows.
use crate::{
    db_types::{Money, Order, OrderStatus, PaymentMethod, PaymentStatus},
    traits::OrderFlowError,
};

/// Largest single payment the counter accepts: KES 10,000,000.
pub const MAX_PAYMENT: Money = Money::from_shillings(10_000_000);

/// Payment status of an order once `amount_paid` has been received against `total`.
///
/// An order with nothing to pay is `Paid` from the start.
pub fn status_after_payment(total: Money, amount_paid: Money) -> PaymentStatus {
    if amount_paid >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    }
}

/// Payment status of an order whose STK prompt failed, was dismissed or timed out.
pub fn status_after_failed_prompt(amount_paid: Money) -> PaymentStatus {
    if amount_paid.is_zero() {
        PaymentStatus::Failed
    } else {
        PaymentStatus::Partial
    }
}

/// How much of an amount handed over is applied to an order, and how much is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tender {
    pub applied: Money,
    pub change: Money,
}

/// Checks that `order` can take a payment of `amount` and splits the amount into what is applied and the change.
///
/// Cash above the balance is returned as change. Electronic payments have already left the customer's account, so
/// they are applied in full, even when they overpay.
pub fn tender(order: &Order, method: PaymentMethod, amount: Money) -> Result<Tender, OrderFlowError> {
    check_payable(order)?;
    check_payment_amount(amount)?;
    Ok(split_tender(order.balance(), method, amount))
}

/// Splits `amount` against an outstanding `balance`, without any checks. See [`tender`].
pub fn split_tender(balance: Money, method: PaymentMethod, amount: Money) -> Tender {
    match method {
        PaymentMethod::Cash if amount > balance => Tender { applied: balance, change: amount - balance },
        _ => Tender { applied: amount, change: Money::default() },
    }
}

/// A payment must be positive and no larger than [`MAX_PAYMENT`].
pub fn check_payment_amount(amount: Money) -> Result<(), OrderFlowError> {
    if !amount.is_positive() || amount > MAX_PAYMENT {
        return Err(OrderFlowError::InvalidPaymentAmount(amount));
    }
    Ok(())
}

/// The amount paid against an order once `payment` has been added to `amount_paid`.
pub fn add_payment(amount_paid: Money, payment: Money) -> Result<Money, OrderFlowError> {
    amount_paid.checked_add(payment).ok_or(OrderFlowError::InvalidPaymentAmount(payment))
}

pub fn check_payable(order: &Order) -> Result<(), OrderFlowError> {
    if order.status == OrderStatus::Cancelled {
        return Err(OrderFlowError::OrderCancelled(order.order_number.clone()));
    }
    if order.payment_status == PaymentStatus::Paid || !order.balance().is_positive() {
        return Err(OrderFlowError::OrderAlreadyPaid(order.order_number.clone()));
    }
    Ok(())
}

/// Validates a fulfilment status change for `order`.
pub fn check_status_change(order: &Order, new_status: OrderStatus) -> Result<(), OrderFlowError> {
    if order.status == new_status {
        return Err(OrderFlowError::StatusModificationNoOp(new_status));
    }
    if !order.status.can_transition_to(new_status) {
        return Err(OrderFlowError::ForbiddenStatusChange { from: order.status, to: new_status });
    }
    if new_status == OrderStatus::Cancelled && !order.can_cancel() {
        return Err(OrderFlowError::CannotCancelPaidOrder(order.order_number.clone()));
    }
    Ok(())
}
