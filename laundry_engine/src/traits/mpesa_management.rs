use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{
        MpesaTransaction,
        NewMpesaTransaction,
        NewStkRequest,
        Order,
        StkRequest,
        StkResolution,
        TransactionStatus,
    },
    lms_api::payment_objects::{ConnectedTransaction, MpesaTransactionFilter, StkOutcome},
    traits::{GatewayError, OrderFlowError},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error(transparent)]
    Order(#[from] OrderFlowError),
    #[error("M-Pesa gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("STK request {0} does not exist")]
    StkRequestNotFound(String),
    #[error("Order {order_number} already has a payment prompt pending ({checkout_request_id})")]
    StkAlreadyPending { order_number: String, checkout_request_id: String },
    #[error("M-Pesa transaction #{0} does not exist")]
    TransactionNotFound(i64),
    #[error("M-Pesa transaction {transaction_id} is already {status}")]
    TransactionAlreadyProcessed { transaction_id: String, status: TransactionStatus },
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(String),
    #[error("{0}")]
    InvalidPhone(String),
}

impl From<sqlx::Error> for PaymentFlowError {
    fn from(e: sqlx::Error) -> Self {
        PaymentFlowError::DatabaseError(e.to_string())
    }
}

impl From<lms_common::PhoneNumberError> for PaymentFlowError {
    fn from(e: lms_common::PhoneNumberError) -> Self {
        PaymentFlowError::InvalidPhone(e.to_string())
    }
}

/// Storage for STK prompts and M-Pesa transactions.
#[allow(async_fn_in_trait)]
pub trait MpesaManagement {
    /// Stores a new STK request and marks its order's payment as `Pending`, atomically. Fails with
    /// [`PaymentFlowError::StkAlreadyPending`] if the order already has a pending request.
    async fn insert_stk_request(&self, request: NewStkRequest) -> Result<(StkRequest, Order), PaymentFlowError>;

    async fn fetch_stk_request(&self, checkout_request_id: &str) -> Result<Option<StkRequest>, PaymentFlowError>;

    async fn fetch_pending_stk_request_for_order(&self, order_id: i64)
        -> Result<Option<StkRequest>, PaymentFlowError>;

    /// Pending STK requests created before `created_before`, oldest first.
    async fn fetch_pending_stk_requests(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<StkRequest>, PaymentFlowError>;

    /// Applies the final result of an STK prompt, in a single transaction.
    ///
    /// * On success, the payment is stored as a matched M-Pesa transaction and applied to the order.
    /// * On failure, the order's payment status falls back to `Failed`, or `Partial` if something was paid already.
    /// * A request that is already resolved is left alone, apart from filling in a missing receipt number.
    async fn resolve_stk_request(
        &self,
        checkout_request_id: &str,
        resolution: StkResolution,
    ) -> Result<StkOutcome, PaymentFlowError>;

    /// Stores a transaction unless one with the same receipt number exists. Returns the stored transaction and
    /// whether it was newly inserted.
    async fn insert_mpesa_transaction(
        &self,
        transaction: NewMpesaTransaction,
    ) -> Result<(MpesaTransaction, bool), PaymentFlowError>;

    async fn fetch_mpesa_transaction(&self, id: i64) -> Result<Option<MpesaTransaction>, PaymentFlowError>;

    /// Matching transactions, oldest first.
    async fn search_mpesa_transactions(
        &self,
        query: MpesaTransactionFilter,
    ) -> Result<Vec<MpesaTransaction>, PaymentFlowError>;

    /// Applies an unmatched transaction to an order as an M-Pesa payment and marks it matched, atomically.
    async fn connect_transaction(
        &self,
        transaction_id: i64,
        order_id: i64,
    ) -> Result<ConnectedTransaction, PaymentFlowError>;

    /// Marks an unmatched transaction as ignored, so that it drops out of reconciliation.
    async fn ignore_transaction(&self, transaction_id: i64) -> Result<MpesaTransaction, PaymentFlowError>;
}
