use std::collections::HashMap;

use crate::{
    db_types::{Discount, Money, NewOrderItem, Service},
    lms_api::order_objects::{Cart, Quote},
    traits::OrderFlowError,
};

/// Largest quantity of a single cart line, in items, pairs or kilograms.
pub const MAX_QUANTITY: f64 = 10_000.0;

/// Largest value of a single cart line: KES 10,000,000.
pub const MAX_LINE_TOTAL: Money = Money::from_shillings(10_000_000);

/// The amount taken off `subtotal` by `discount`.
///
/// Percentages must lie in `0..=100` and are rounded half-up to the cent. Fixed discounts must not be negative and
/// are capped at the subtotal, so a total never goes below zero.
pub fn discount_amount(subtotal: Money, discount: &Discount) -> Result<Money, OrderFlowError> {
    match *discount {
        Discount::None => Ok(Money::default()),
        Discount::Percentage(p) if !(0.0..=100.0).contains(&p) => {
            Err(OrderFlowError::InvalidDiscount(format!("{p}% is not between 0% and 100%")))
        },
        Discount::Percentage(p) => Ok(subtotal.percent(p)),
        Discount::Fixed(amount) if amount.is_negative() => {
            Err(OrderFlowError::InvalidDiscount(format!("{amount} is negative")))
        },
        Discount::Fixed(amount) => Ok(amount.min(subtotal)),
    }
}

/// Prices `cart` against the catalog entries in `services`.
///
/// Every service in the cart must be present in `services` and active. Every quantity must be positive and at most
/// [`MAX_QUANTITY`], and no line may come to more than [`MAX_LINE_TOTAL`].
pub fn price_cart(cart: &Cart, services: &[Service]) -> Result<Quote, OrderFlowError> {
    if cart.items.is_empty() {
        return Err(OrderFlowError::EmptyCart);
    }
    let catalog = services.iter().map(|s| (s.id, s)).collect::<HashMap<_, _>>();
    let items = cart
        .items
        .iter()
        .map(|item| {
            let service = catalog.get(&item.service_id).ok_or(OrderFlowError::ServiceNotFound(item.service_id))?;
            if !service.active {
                return Err(OrderFlowError::ServiceInactive(service.name.clone()));
            }
            let invalid = || OrderFlowError::InvalidQuantity(item.service_id, item.quantity);
            if !item.quantity.is_finite() || item.quantity <= 0.0 || item.quantity > MAX_QUANTITY {
                return Err(invalid());
            }
            let line_total = service.price.times(item.quantity);
            if line_total > MAX_LINE_TOTAL {
                return Err(invalid());
            }
            Ok(NewOrderItem {
                service_id: Some(service.id),
                service_name: service.name.clone(),
                category_name: service.category_name.clone(),
                unit: service.unit,
                quantity: item.quantity,
                unit_price: service.price,
                line_total,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let subtotal = items.iter().try_fold(Money::default(), |acc, i| {
        let invalid = OrderFlowError::InvalidQuantity(i.service_id.unwrap_or_default(), i.quantity);
        acc.checked_add(i.line_total).ok_or(invalid)
    })?;
    let discount_amount = discount_amount(subtotal, &cart.discount)?;
    let total = subtotal - discount_amount;
    Ok(Quote { items, subtotal, discount: cart.discount, discount_amount, total })
}
