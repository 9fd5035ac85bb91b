//! Value types shared by the laundry management crates.
//!
//! * [`Money`] is an amount of Kenyan shillings held as integer cents.
//! * [`PhoneNumber`] is a normalised Kenyan mobile number (`2547XXXXXXXX` or `2541XXXXXXXX`), the format M-Pesa and the
//!   SMS gateways expect.
//! * [`Secret`] hides configuration values from logs.
mod money;
mod phone;
mod secret;

pub mod helpers;
pub mod op;

pub use money::{Money, MoneyParseError, CURRENCY_CODE};
pub use phone::{PhoneNumber, PhoneNumberError};
pub use secret::Secret;
