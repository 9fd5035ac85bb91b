use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use lms_common::{Money, PhoneNumber};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

/// Implements `Display`, `FromStr` and `From<String>` for simple enums that are stored by variant name, plus an `ALL`
/// constant listing every variant in declaration order.
macro_rules! named_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("Invalid {}: {s}", stringify!($name)))),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                value.parse().unwrap_or_else(|_| {
                    log::warn!("🗃️ Invalid {} value: {value}. Falling back to the default.", stringify!($name));
                    Self::default()
                })
            }
        }
    };
}

//--------------------------------------        Client         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: PhoneNumber,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub phone: PhoneNumber,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewClient {
    pub fn new(name: String, phone: PhoneNumber) -> Self {
        Self { name, phone, email: None, address: None, notes: None, created_at: Utc::now() }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn created_at(mut self, ts: DateTime<Utc>) -> Self {
        self.created_at = ts;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub phone: Option<PhoneNumber>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl ClientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.phone.is_none() &&
            self.email.is_none() &&
            self.address.is_none() &&
            self.notes.is_none()
    }
}

//--------------------------------------       Catalog         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category together with the number of services filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategorySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub service_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum ServiceUnit {
    #[default]
    PerItem,
    PerKg,
    PerPair,
}

named_enum!(ServiceUnit { PerItem, PerKg, PerPair });

/// A priced service. The category name is joined in on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: ServiceUnit,
    pub price: Money,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub unit: ServiceUnit,
    pub price: Money,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl NewService {
    pub fn new(category_id: i64, name: String, unit: ServiceUnit, price: Money) -> Self {
        Self { category_id, name, description: None, unit, price, active: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<ServiceUnit>,
    pub price: Option<Money>,
    pub active: Option<bool>,
}

impl ServiceUpdate {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() &&
            self.name.is_none() &&
            self.description.is_none() &&
            self.unit.is_none() &&
            self.price.is_none() &&
            self.active.is_none()
    }
}

//--------------------------------------     OrderStatus       --------------------------------------------------------
/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Received,
    InProgress,
    Ready,
    Delivered,
    Cancelled,
}

named_enum!(OrderStatus { Received, InProgress, Ready, Delivered, Cancelled });

impl OrderStatus {
    /// Whether an order may move from this status to `new_status`. Moving to the same status is not a transition.
    ///
    /// `Delivered` and `Cancelled` are final. `Ready` may go back to `InProgress` when an item needs rework.
    /// Whether an order may be cancelled also depends on its payments; see [`Order::can_cancel`].
    pub fn can_transition_to(&self, new_status: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, new_status),
            (Received, InProgress | Ready | Delivered | Cancelled) |
                (InProgress, Ready | Delivered | Cancelled) |
                (Ready, InProgress | Delivered | Cancelled)
        )
    }

    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

//--------------------------------------    PaymentStatus      --------------------------------------------------------
/// Payment status of an order.
///
/// ```text
///  Unpaid ──► Pending ──► Paid
///     │        │  ▲ ▲
///     │        ▼  │ └──── Failed
///     └─────► Partial
/// ```
/// Any applied payment moves an order to `Paid` or `Partial`, depending on the remaining balance. A failed STK
/// prompt moves a `Pending` order to `Failed`, or back to `Partial` if something was already paid. `Paid` is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Partial,
    Paid,
    Failed,
}

named_enum!(PaymentStatus { Unpaid, Pending, Partial, Paid, Failed });

impl PaymentStatus {
    pub fn can_transition_to(&self, new_status: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (*self, new_status),
            (Unpaid, Pending | Partial | Paid) |
                (Pending, Partial | Paid | Failed) |
                (Partial, Pending | Partial | Paid) |
                (Failed, Pending | Partial | Paid)
        )
    }

    /// Statuses for which a customer still owes money
    pub fn is_open(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Mpesa,
    Card,
    Bank,
}

named_enum!(PaymentMethod { Cash, Mpesa, Card, Bank });

//--------------------------------------       Discount        --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DiscountKind {
    #[default]
    None,
    Percentage,
    Fixed,
}

named_enum!(DiscountKind { None, Percentage, Fixed });

/// A discount applied to an order subtotal.
///
/// In JSON: `{"type": "percentage", "value": 10.0}`, `{"type": "fixed", "value": 5000}` (cents) or `{"type": "none"}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    Percentage(f64),
    Fixed(Money),
}

impl Discount {
    /// The representation used by the `discount_kind` and `discount_value` columns
    pub fn kind_and_value(&self) -> (DiscountKind, f64) {
        match self {
            Discount::None => (DiscountKind::None, 0.0),
            Discount::Percentage(p) => (DiscountKind::Percentage, *p),
            Discount::Fixed(m) => (DiscountKind::Fixed, m.value() as f64),
        }
    }

    pub fn from_kind_and_value(kind: DiscountKind, value: f64) -> Self {
        match kind {
            DiscountKind::None => Discount::None,
            DiscountKind::Percentage => Discount::Percentage(value),
            DiscountKind::Fixed => Discount::Fixed(Money::from(value.round() as i64)),
        }
    }
}

//--------------------------------------        Order          --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub service_id: Option<i64>,
    pub service_name: String,
    pub category_name: String,
    pub unit: ServiceUnit,
    pub quantity: f64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// An order as stored, with the client's name and phone joined in. `items` are loaded separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub client_id: i64,
    pub client_name: String,
    pub client_phone: PhoneNumber,
    pub subtotal: Money,
    pub discount_kind: DiscountKind,
    pub discount_value: f64,
    pub discount_amount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// The amount still owed. Never negative.
    pub fn balance(&self) -> Money {
        self.total.saturating_sub(self.amount_paid)
    }

    /// The amount received over and above the order total.
    pub fn overpayment(&self) -> Money {
        self.amount_paid.saturating_sub(self.total)
    }

    pub fn discount(&self) -> Discount {
        Discount::from_kind_and_value(self.discount_kind, self.discount_value)
    }

    /// An order can take payments until it is paid off or cancelled.
    pub fn is_payable(&self) -> bool {
        self.status != OrderStatus::Cancelled &&
            self.payment_status != PaymentStatus::Paid &&
            self.balance().is_positive()
    }

    /// Orders can only be cancelled while nothing has been paid against them.
    pub fn can_cancel(&self) -> bool {
        self.amount_paid.is_zero() && self.status.can_transition_to(OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub service_id: Option<i64>,
    pub service_name: String,
    pub category_name: String,
    pub unit: ServiceUnit,
    pub quantity: f64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A fully priced order, ready to be stored. The order number is assigned by the database backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: i64,
    pub items: Vec<NewOrderItem>,
    pub subtotal: Money,
    pub discount: Discount,
    pub discount_amount: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Payment         --------------------------------------------------------
/// Money applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        Self { amount, method, reference: None, notes: None, created_at: Utc::now() }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn created_at(mut self, ts: DateTime<Utc>) -> Self {
        self.created_at = ts;
        self
    }
}

//--------------------------------------     STK requests      --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum StkStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Cancelled,
    TimedOut,
}

named_enum!(StkStatus { Pending, Success, Failed, Cancelled, TimedOut });

impl StkStatus {
    /// Maps a Daraja STK result code onto a final status.
    ///
    /// * `0` - the customer paid
    /// * `1032` - the customer dismissed the prompt
    /// * `1037`, `1019` - the handset could not be reached, or the prompt expired
    /// * anything else (insufficient funds, wrong PIN, ...) is a failure
    pub fn from_result_code(code: i64) -> Self {
        match code {
            0 => StkStatus::Success,
            1032 => StkStatus::Cancelled,
            1037 | 1019 => StkStatus::TimedOut,
            _ => StkStatus::Failed,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, StkStatus::Pending)
    }
}

/// An STK push prompt sent to a customer's phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StkRequest {
    pub id: i64,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub order_id: i64,
    pub phone: PhoneNumber,
    pub amount: Money,
    pub status: StkStatus,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStkRequest {
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub order_id: i64,
    pub phone: PhoneNumber,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// The final result of an STK prompt, from the callback or from a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkResolution {
    pub result_code: i64,
    pub result_desc: String,
    /// The M-Pesa receipt number. Status queries do not report it, callbacks do.
    pub receipt: Option<String>,
    pub amount: Option<Money>,
    pub phone: Option<PhoneNumber>,
    pub transaction_time: Option<DateTime<Utc>>,
}

impl StkResolution {
    pub fn new<S: Into<String>>(result_code: i64, result_desc: S) -> Self {
        Self {
            result_code,
            result_desc: result_desc.into(),
            receipt: None,
            amount: None,
            phone: None,
            transaction_time: None,
        }
    }

    pub fn with_receipt<S: Into<String>>(mut self, receipt: S) -> Self {
        self.receipt = Some(receipt.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_phone(mut self, phone: PhoneNumber) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_transaction_time(mut self, ts: DateTime<Utc>) -> Self {
        self.transaction_time = Some(ts);
        self
    }

    pub fn status(&self) -> StkStatus {
        StkStatus::from_result_code(self.result_code)
    }
}

//--------------------------------------  M-Pesa transactions  --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum TransactionSource {
    #[default]
    C2b,
    Stk,
}

named_enum!(TransactionSource { C2b, Stk });

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Unmatched,
    Matched,
    Ignored,
}

named_enum!(TransactionStatus { Unmatched, Matched, Ignored });

/// Money received through M-Pesa, whether or not it has been linked to an order yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MpesaTransaction {
    pub id: i64,
    /// The M-Pesa receipt number, e.g. `QKJ3X5Y7Z9`
    pub transaction_id: String,
    pub phone: Option<PhoneNumber>,
    pub amount: Money,
    pub account_reference: Option<String>,
    pub payer_name: Option<String>,
    pub transaction_time: DateTime<Utc>,
    pub source: TransactionSource,
    pub status: TransactionStatus,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMpesaTransaction {
    pub transaction_id: String,
    pub phone: Option<PhoneNumber>,
    pub amount: Money,
    pub account_reference: Option<String>,
    pub payer_name: Option<String>,
    pub transaction_time: DateTime<Utc>,
    pub source: TransactionSource,
}

impl NewMpesaTransaction {
    pub fn new<S: Into<String>>(transaction_id: S, amount: Money, source: TransactionSource) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            phone: None,
            amount,
            account_reference: None,
            payer_name: None,
            transaction_time: Utc::now(),
            source,
        }
    }

    pub fn with_phone(mut self, phone: PhoneNumber) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_account_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.account_reference = Some(reference.into());
        self
    }

    pub fn with_payer_name<S: Into<String>>(mut self, name: S) -> Self {
        self.payer_name = Some(name.into());
        self
    }

    pub fn with_transaction_time(mut self, ts: DateTime<Utc>) -> Self {
        self.transaction_time = ts;
        self
    }
}

//--------------------------------------          SMS          --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum SmsStatus {
    #[default]
    Sent,
    Failed,
    Skipped,
}

named_enum!(SmsStatus { Sent, Failed, Skipped });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SmsRecord {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub status: SmsStatus,
    pub provider_message_id: Option<String>,
    pub cost: Option<String>,
    pub error: Option<String>,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSmsRecord {
    pub recipient: String,
    pub message: String,
    pub status: SmsStatus,
    pub provider_message_id: Option<String>,
    pub cost: Option<String>,
    pub error: Option<String>,
    pub order_id: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_transitions() {
        use OrderStatus::*;
        assert!(Received.can_transition_to(InProgress));
        assert!(Received.can_transition_to(Delivered));
        assert!(Ready.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Received));
        assert!(!Delivered.can_transition_to(Ready));
        assert!(!Cancelled.can_transition_to(Received));
        for s in OrderStatus::ALL {
            assert!(!s.can_transition_to(*s), "{s} -> {s}");
        }
    }

    #[test]
    fn payment_status_transitions() {
        use PaymentStatus::*;
        assert!(Unpaid.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(Partial.can_transition_to(Paid));
        assert!(!Unpaid.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Unpaid));
        for s in PaymentStatus::ALL {
            assert!(!Paid.can_transition_to(*s), "Paid -> {s}");
        }
    }

    #[test]
    fn stk_result_codes() {
        assert_eq!(StkStatus::from_result_code(0), StkStatus::Success);
        assert_eq!(StkStatus::from_result_code(1032), StkStatus::Cancelled);
        assert_eq!(StkStatus::from_result_code(1037), StkStatus::TimedOut);
        assert_eq!(StkStatus::from_result_code(1), StkStatus::Failed);
        assert_eq!(StkStatus::from_result_code(2001), StkStatus::Failed);
    }

    #[test]
    fn enum_names_round_trip_through_strings() {
        assert_eq!(OrderStatus::InProgress.to_string(), "InProgress");
        assert_eq!("Ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert!("ready".parse::<OrderStatus>().is_err());
        assert_eq!(PaymentStatus::from("Nonsense".to_string()), PaymentStatus::Unpaid);
    }

    #[test]
    fn discount_columns() {
        let d = Discount::Fixed(Money::from(5000));
        let (kind, value) = d.kind_and_value();
        assert_eq!(kind, DiscountKind::Fixed);
        assert_eq!(Discount::from_kind_and_value(kind, value), d);
        let d = Discount::Percentage(12.5);
        let (kind, value) = d.kind_and_value();
        assert_eq!(Discount::from_kind_and_value(kind, value), d);
    }

    #[test]
    fn discount_json() {
        let d: Discount = serde_json::from_str(r#"{"type":"percentage","value":10.0}"#).unwrap();
        assert_eq!(d, Discount::Percentage(10.0));
        let d: Discount = serde_json::from_str(r#"{"type":"fixed","value":5000}"#).unwrap();
        assert_eq!(d, Discount::Fixed(Money::from(5000)));
        let d: Discount = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(d, Discount::None);
    }
}
