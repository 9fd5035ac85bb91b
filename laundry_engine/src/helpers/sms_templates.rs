use crate::db_types::{Order, Payment};

/// The first word of a client's name, for a friendlier greeting.
fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

/// Replaces every `{name}` placeholder in `template` with the client's name.
pub fn personalise(template: &str, name: &str) -> String {
    template.replace("{name}", name.trim())
}

pub fn order_created(business: &str, order: &Order) -> String {
    let balance = order.balance();
    let payment_line = if balance.is_zero() { "Fully paid.".to_string() } else { format!("Balance: {balance}.") };
    format!(
        "Hi {}, {business} has received your order {}. Total: {}. {payment_line} We will let you know when it is \
         ready.",
        first_name(&order.client_name),
        order.order_number,
        order.total
    )
}

pub fn order_ready(business: &str, order: &Order) -> String {
    let balance = order.balance();
    let payment_line =
        if balance.is_zero() { String::new() } else { format!(" Please bring {balance} to settle your balance.") };
    format!(
        "Hi {}, your order {} is ready for collection at {business}.{payment_line}",
        first_name(&order.client_name),
        order.order_number
    )
}

pub fn payment_received(business: &str, order: &Order, payment: &Payment) -> String {
    let balance = order.balance();
    let balance_line = if balance.is_zero() {
        "Your order is fully paid.".to_string()
    } else {
        format!("Outstanding balance: {balance}.")
    };
    let reference = payment.reference.as_deref().map(|r| format!(" (ref {r})")).unwrap_or_default();
    format!(
        "Hi {}, {business} has received {}{reference} for order {}. {balance_line} Thank you!",
        first_name(&order.client_name),
        payment.amount,
        order.order_number
    )
}
