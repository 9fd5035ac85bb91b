use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Money, MpesaTransaction, Order, Payment, PhoneNumber, StkRequest, TransactionSource, TransactionStatus},
    helpers::matching::MatchTier,
};

//--------------------------------------     STK push          --------------------------------------------------------
/// A request to prompt a customer's phone for an M-Pesa payment against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: i64,
    /// The phone to prompt. Defaults to the client's phone number.
    pub phone: Option<String>,
    /// The amount to request. Defaults to the outstanding balance.
    pub amount: Option<Money>,
}

impl InitiatePaymentRequest {
    pub fn for_order(order_id: i64) -> Self {
        Self { order_id, phone: None, amount: None }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkPushResult {
    pub request: StkRequest,
    pub order: Order,
    /// The message M-Pesa wants shown to the cashier
    pub customer_message: String,
}

/// What happened when an STK result was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StkOutcome {
    /// The prompt has not been answered yet
    StillPending { request: StkRequest },
    /// The request was already resolved. Repeated callbacks land here.
    AlreadyResolved { request: StkRequest },
    Paid { request: StkRequest, order: Order, payment: Payment },
    Failed { request: StkRequest, order: Order },
    /// The customer paid, but the order had been settled or cancelled in the meantime. The money is kept as an
    /// unmatched transaction for an administrator to deal with.
    Unapplied { request: StkRequest, transaction: MpesaTransaction },
}

impl StkOutcome {
    pub fn request(&self) -> &StkRequest {
        match self {
            StkOutcome::StillPending { request } |
            StkOutcome::AlreadyResolved { request } |
            StkOutcome::Paid { request, .. } |
            StkOutcome::Failed { request, .. } |
            StkOutcome::Unapplied { request, .. } => request,
        }
    }
}

//--------------------------------------    Reconciliation     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCandidate {
    pub order: Order,
    pub tier: MatchTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub transaction: MpesaTransaction,
    pub tier: MatchTier,
}

/// The result of trying to pair an M-Pesa transaction with an order automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Connected { transaction: MpesaTransaction, order: Order, payment: Payment, tier: MatchTier },
    /// More than one order matched equally well. An administrator must choose.
    Ambiguous { transaction: MpesaTransaction, candidates: Vec<OrderCandidate> },
    /// Only weak matches were found. An administrator must confirm.
    NeedsReview { transaction: MpesaTransaction, candidates: Vec<OrderCandidate> },
    NoMatch { transaction: MpesaTransaction },
    /// The transaction has already been matched or ignored
    AlreadyProcessed { transaction: MpesaTransaction },
}

impl ReconciliationOutcome {
    pub fn transaction(&self) -> &MpesaTransaction {
        match self {
            ReconciliationOutcome::Connected { transaction, .. } |
            ReconciliationOutcome::Ambiguous { transaction, .. } |
            ReconciliationOutcome::NeedsReview { transaction, .. } |
            ReconciliationOutcome::NoMatch { transaction } |
            ReconciliationOutcome::AlreadyProcessed { transaction } => transaction,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ReconciliationOutcome::Connected { .. })
    }
}

/// Tally of a bulk reconciliation run over all unmatched transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub processed: usize,
    pub connected: usize,
    pub ambiguous: usize,
    pub needs_review: usize,
    pub unmatched: usize,
    pub connections: Vec<ConnectedPayment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedPayment {
    pub transaction_id: String,
    pub order_number: String,
    pub amount: Money,
    pub tier: MatchTier,
}

impl ReconciliationSummary {
    pub fn record(&mut self, outcome: &ReconciliationOutcome) {
        self.processed += 1;
        match outcome {
            ReconciliationOutcome::Connected { transaction, order, tier, .. } => {
                self.connected += 1;
                self.connections.push(ConnectedPayment {
                    transaction_id: transaction.transaction_id.clone(),
                    order_number: order.order_number.clone(),
                    amount: transaction.amount,
                    tier: *tier,
                });
            },
            ReconciliationOutcome::Ambiguous { .. } => self.ambiguous += 1,
            ReconciliationOutcome::NeedsReview { .. } => self.needs_review += 1,
            ReconciliationOutcome::NoMatch { .. } => self.unmatched += 1,
            ReconciliationOutcome::AlreadyProcessed { .. } => self.processed -= 1,
        }
    }
}

impl Display for ReconciliationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed: {} connected, {} ambiguous, {} for review, {} unmatched",
            self.processed, self.connected, self.ambiguous, self.needs_review, self.unmatched
        )
    }
}

/// Manually pairs a transaction with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectTransactionRequest {
    pub order_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedTransaction {
    pub transaction: MpesaTransaction,
    pub order: Order,
    pub payment: Payment,
}

//--------------------------------------       Filters         --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MpesaTransactionFilter {
    pub status: Option<TransactionStatus>,
    pub source: Option<TransactionSource>,
    pub phone: Option<PhoneNumber>,
    pub order_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl MpesaTransactionFilter {
    pub fn unmatched() -> Self {
        Self::default().with_status(TransactionStatus::Unmatched)
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: TransactionSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_phone(mut self, phone: PhoneNumber) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
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
        self.status.is_none() &&
            self.source.is_none() &&
            self.phone.is_none() &&
            self.order_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for MpesaTransactionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(status) = self.status {
            write!(f, "status: {status}. ")?;
        }
        if let Some(source) = self.source {
            write!(f, "source: {source}. ")?;
        }
        if let Some(phone) = &self.phone {
            write!(f, "phone: {phone}. ")?;
        }
        if let Some(id) = self.order_id {
            write!(f, "order_id: {id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        Ok(())
    }
}
