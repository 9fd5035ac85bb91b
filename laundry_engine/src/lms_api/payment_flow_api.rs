//! M-Pesa payments: STK prompts, paybill (C2B) payments and reconciliation of unmatched transactions.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        Money,
        MpesaTransaction,
        NewMpesaTransaction,
        NewStkRequest,
        Order,
        PhoneNumber,
        StkRequest,
        StkResolution,
        TransactionStatus,
    },
    events::{EventProducers, PaymentFailedEvent, PaymentReceivedEvent},
    helpers::{
        matching::{decide, match_tier, rank_transactions, MatchDecision, MatchTier},
        payment_state::check_payable,
    },
    lms_api::{
        order_objects::OrderQueryFilter,
        payment_objects::{
            ConnectedTransaction,
            InitiatePaymentRequest,
            MpesaTransactionFilter,
            OrderCandidate,
            ReconciliationOutcome,
            ReconciliationSummary,
            StkOutcome,
            StkPushResult,
            TransactionCandidate,
        },
    },
    traits::{
        MpesaGateway,
        MpesaManagement,
        OrderFlowError,
        OrderManagement,
        PaymentFlowError,
        StkPushRequest,
        StkQueryOutcome,
    },
};

/// Daraja result code for a prompt the customer never answered.
pub const STK_TIMEOUT_RESULT_CODE: i64 = 1037;

/// `PaymentFlowApi` drives M-Pesa payments, from prompting a customer's phone to matching money that arrived
/// without a prompt to the order it was meant for.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: MpesaManagement + OrderManagement,
    G: MpesaGateway,
{
    //----------------------------------------   STK push   ----------------------------------------------------------

    /// Prompts the customer's phone to pay for an order.
    ///
    /// The phone defaults to the client's number and the amount to the outstanding balance. M-Pesa only moves whole
    /// shillings, so the amount is rounded up to the next shilling, and may not exceed the balance rounded the same
    /// way. An order can have only one prompt pending at a time.
    ///
    /// Once the gateway accepts the request, the order's payment status becomes `Pending` until the callback, a
    /// status query or the timeout resolves it.
    pub async fn initiate_stk_push(&self, request: InitiatePaymentRequest) -> Result<StkPushResult, PaymentFlowError> {
        let order_id = request.order_id;
        let order = self.order(order_id).await?;
        check_payable(&order)?;
        if let Some(pending) = self.db.fetch_pending_stk_request_for_order(order_id).await? {
            return Err(PaymentFlowError::StkAlreadyPending {
                order_number: order.order_number,
                checkout_request_id: pending.checkout_request_id,
            });
        }
        let phone = match request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => PhoneNumber::parse(p)?,
            None => order.client_phone.clone(),
        };
        let max_shillings = order.balance().ceil_shillings();
        let shillings = match request.amount {
            Some(amount) if !amount.is_positive() => {
                return Err(PaymentFlowError::InvalidAmount(format!("{amount} is not a positive amount")));
            },
            Some(amount) if amount.ceil_shillings() > max_shillings => {
                return Err(PaymentFlowError::InvalidAmount(format!(
                    "{amount} is more than the balance of {} on order {}",
                    order.balance(),
                    order.order_number
                )));
            },
            Some(amount) => amount.ceil_shillings(),
            None => max_shillings,
        };
        let push = StkPushRequest {
            phone: phone.clone(),
            amount: shillings,
            account_reference: order.order_number.clone(),
            description: format!("Payment for {}", order.order_number),
        };
        let ack = self.gateway.stk_push(push).await?;
        info!(
            "🔄️💰️ STK prompt for KES {shillings} sent to {phone} for order {}. Checkout id {}",
            order.order_number, ack.checkout_request_id
        );
        let new_request = NewStkRequest {
            checkout_request_id: ack.checkout_request_id,
            merchant_request_id: ack.merchant_request_id,
            order_id,
            phone,
            amount: Money::from_shillings(shillings),
            created_at: Utc::now(),
        };
        let (request, order) = self.db.insert_stk_request(new_request).await?;
        Ok(StkPushResult { request, order, customer_message: ack.customer_message })
    }

    /// Applies the result posted to the STK callback URL. Repeated callbacks for the same request are harmless.
    ///
    /// Emits `PaymentReceived` when the customer paid and `PaymentFailed` when they did not.
    pub async fn handle_stk_callback(
        &self,
        checkout_request_id: &str,
        resolution: StkResolution,
    ) -> Result<StkOutcome, PaymentFlowError> {
        debug!(
            "🔄️💰️ STK result for {checkout_request_id}: {} ({})",
            resolution.result_code, resolution.result_desc
        );
        let outcome = self.db.resolve_stk_request(checkout_request_id, resolution).await?;
        self.publish_stk_outcome(&outcome).await;
        Ok(outcome)
    }

    async fn publish_stk_outcome(&self, outcome: &StkOutcome) {
        match outcome {
            StkOutcome::Paid { order, payment, .. } => {
                info!("🔄️💰️ Order {} received {} through M-Pesa", order.order_number, payment.amount);
                let event = PaymentReceivedEvent::new(order.clone(), payment.clone());
                self.producers.publish_payment_received(event).await;
            },
            StkOutcome::Failed { request, order } => {
                info!("🔄️💰️ STK prompt for order {} ended with {}", order.order_number, request.status);
                self.producers.publish_payment_failed(PaymentFailedEvent::new(order.clone(), request.clone())).await;
            },
            StkOutcome::Unapplied { request, transaction } => {
                warn!(
                    "🔄️💰️ STK payment {} for request {} could not be applied to its order. It needs reconciling.",
                    transaction.transaction_id, request.checkout_request_id
                );
            },
            StkOutcome::AlreadyResolved { request } => {
                debug!("🔄️💰️ STK request {} was already {}", request.checkout_request_id, request.status);
            },
            StkOutcome::StillPending { .. } => {},
        }
    }

    /// Asks the gateway for the result of a pending STK prompt and applies it if there is one.
    pub async fn refresh_stk_status(&self, checkout_request_id: &str) -> Result<StkOutcome, PaymentFlowError> {
        let request = self
            .db
            .fetch_stk_request(checkout_request_id)
            .await?
            .ok_or_else(|| PaymentFlowError::StkRequestNotFound(checkout_request_id.to_string()))?;
        if request.status.is_final() {
            return Ok(StkOutcome::AlreadyResolved { request });
        }
        match self.gateway.stk_query(checkout_request_id).await? {
            StkQueryOutcome::Pending => {
                trace!("🔄️💰️ STK request {checkout_request_id} is still waiting for the customer");
                Ok(StkOutcome::StillPending { request })
            },
            StkQueryOutcome::Completed(resolution) => self.handle_stk_callback(checkout_request_id, resolution).await,
        }
    }

    /// Resolves every prompt that has been pending for longer than `timeout`.
    ///
    /// Each request gets one last status query. If the gateway has no final result, or cannot be reached, the request
    /// is marked as timed out.
    pub async fn expire_stale_stk_requests(&self, timeout: Duration) -> Result<Vec<StkOutcome>, PaymentFlowError> {
        let cutoff = Utc::now() - timeout;
        let stale = self.db.fetch_pending_stk_requests(cutoff).await?;
        let mut outcomes = Vec::with_capacity(stale.len());
        for request in stale {
            let id = request.checkout_request_id.as_str();
            let resolution = match self.gateway.stk_query(id).await {
                Ok(StkQueryOutcome::Completed(resolution)) => resolution,
                Ok(StkQueryOutcome::Pending) => timeout_resolution(),
                Err(e) => {
                    warn!("🔄️💰️ Could not query STK request {id} before expiring it. {e}");
                    timeout_resolution()
                },
            };
            match self.handle_stk_callback(id, resolution).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("🔄️💰️ Could not expire STK request {id}. {e}"),
            }
        }
        Ok(outcomes)
    }

    /// Queries the gateway for every prompt that has been pending for at least `min_age`, applying any final results.
    /// Errors on individual requests are logged and skipped.
    pub async fn refresh_pending_stk_requests(&self, min_age: Duration) -> Result<Vec<StkOutcome>, PaymentFlowError> {
        let pending = self.db.fetch_pending_stk_requests(Utc::now() - min_age).await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        for request in pending {
            match self.refresh_stk_status(&request.checkout_request_id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("🔄️💰️ Could not refresh STK request {}. {e}", request.checkout_request_id),
            }
        }
        Ok(outcomes)
    }

    pub async fn fetch_stk_request(&self, checkout_request_id: &str) -> Result<Option<StkRequest>, PaymentFlowError> {
        self.db.fetch_stk_request(checkout_request_id).await
    }

    //----------------------------------------   Paybill & reconciliation   -----------------------------------------

    /// Stores a paybill payment confirmed by Safaricom and tries to match it to an order. The same receipt can be
    /// confirmed more than once; it is only stored and reconciled the first time.
    pub async fn process_c2b_transaction(
        &self,
        transaction: NewMpesaTransaction,
    ) -> Result<ReconciliationOutcome, PaymentFlowError> {
        let (transaction, inserted) = self.db.insert_mpesa_transaction(transaction).await?;
        if !inserted {
            info!("🔄️💰️ M-Pesa transaction {} has already been received", transaction.transaction_id);
            if transaction.status != TransactionStatus::Unmatched {
                return Ok(ReconciliationOutcome::AlreadyProcessed { transaction });
            }
        } else {
            info!(
                "🔄️💰️ Paybill payment {} of {} received from {}",
                transaction.transaction_id,
                transaction.amount,
                transaction.phone.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "an unknown number".into())
            );
        }
        self.reconcile(transaction).await
    }

    /// Tries to match an unmatched transaction to an open order.
    pub async fn reconcile_transaction(&self, id: i64) -> Result<ReconciliationOutcome, PaymentFlowError> {
        let transaction = self.transaction(id).await?;
        self.reconcile(transaction).await
    }

    async fn reconcile(&self, transaction: MpesaTransaction) -> Result<ReconciliationOutcome, PaymentFlowError> {
        if transaction.status != TransactionStatus::Unmatched {
            return Ok(ReconciliationOutcome::AlreadyProcessed { transaction });
        }
        let open_orders = self.db.search_orders(OrderQueryFilter::open_orders()).await?;
        let outcome = match decide(&transaction, &open_orders) {
            MatchDecision::Connect(order, tier) => {
                let order_id = order.id;
                let connected = self.connect_transaction(transaction.id, order_id).await?;
                info!(
                    "🔄️💰️ M-Pesa transaction {} matched to order {} by {tier:?}",
                    connected.transaction.transaction_id, connected.order.order_number
                );
                let ConnectedTransaction { transaction, order, payment } = connected;
                ReconciliationOutcome::Connected { transaction, order, payment, tier }
            },
            MatchDecision::Ambiguous(tier, orders) => {
                info!(
                    "🔄️💰️ M-Pesa transaction {} matches {} orders by {tier:?}. Leaving it for an administrator.",
                    transaction.transaction_id,
                    orders.len()
                );
                ReconciliationOutcome::Ambiguous { candidates: candidates(&orders, tier), transaction }
            },
            MatchDecision::Review(tier, orders) => {
                info!(
                    "🔄️💰️ M-Pesa transaction {} has {} weak matches. Leaving it for an administrator.",
                    transaction.transaction_id,
                    orders.len()
                );
                ReconciliationOutcome::NeedsReview { candidates: candidates(&orders, tier), transaction }
            },
            MatchDecision::NoMatch => {
                info!("🔄️💰️ M-Pesa transaction {} does not match any open order", transaction.transaction_id);
                ReconciliationOutcome::NoMatch { transaction }
            },
        };
        Ok(outcome)
    }

    /// Runs reconciliation over every unmatched transaction, oldest first. A failure on one transaction is logged and
    /// does not stop the run.
    pub async fn reconcile_unmatched(&self) -> Result<ReconciliationSummary, PaymentFlowError> {
        let unmatched = self.db.search_mpesa_transactions(MpesaTransactionFilter::unmatched()).await?;
        let mut summary = ReconciliationSummary::default();
        for transaction in unmatched {
            let receipt = transaction.transaction_id.clone();
            match self.reconcile_transaction(transaction.id).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => error!("🔄️💰️ Could not reconcile M-Pesa transaction {receipt}. {e}"),
            }
        }
        info!("🔄️💰️ Reconciliation run complete. {summary}");
        Ok(summary)
    }

    /// Every open order the transaction could belong to, best match first.
    pub async fn candidates_for_transaction(&self, id: i64) -> Result<Vec<OrderCandidate>, PaymentFlowError> {
        let transaction = self.transaction(id).await?;
        let open_orders = self.db.search_orders(OrderQueryFilter::open_orders()).await?;
        let mut result = open_orders
            .into_iter()
            .filter_map(|order| match_tier(&transaction, &order).map(|tier| OrderCandidate { order, tier }))
            .collect::<Vec<_>>();
        result.sort_by_key(|c| (c.tier, c.order.created_at, c.order.id));
        Ok(result)
    }

    /// Every unmatched transaction that could belong to the order, best match first.
    pub async fn candidates_for_order(&self, order_id: i64) -> Result<Vec<TransactionCandidate>, PaymentFlowError> {
        let order = self.order(order_id).await?;
        let unmatched = self.db.search_mpesa_transactions(MpesaTransactionFilter::unmatched()).await?;
        let result = rank_transactions(&order, &unmatched)
            .into_iter()
            .map(|(transaction, tier)| TransactionCandidate { transaction: transaction.clone(), tier })
            .collect();
        Ok(result)
    }

    /// Applies an unmatched transaction to an order chosen by an administrator.
    ///
    /// Emits `PaymentReceived`.
    pub async fn connect_transaction(
        &self,
        transaction_id: i64,
        order_id: i64,
    ) -> Result<ConnectedTransaction, PaymentFlowError> {
        let connected = self.db.connect_transaction(transaction_id, order_id).await?;
        self.producers
            .publish_payment_received(PaymentReceivedEvent::new(connected.order.clone(), connected.payment.clone()))
            .await;
        Ok(connected)
    }

    pub async fn ignore_transaction(&self, transaction_id: i64) -> Result<MpesaTransaction, PaymentFlowError> {
        let transaction = self.db.ignore_transaction(transaction_id).await?;
        info!("🔄️💰️ M-Pesa transaction {} will be ignored", transaction.transaction_id);
        Ok(transaction)
    }

    pub async fn search_transactions(
        &self,
        query: MpesaTransactionFilter,
    ) -> Result<Vec<MpesaTransaction>, PaymentFlowError> {
        trace!("🔄️💰️ Transaction search: {query}");
        self.db.search_mpesa_transactions(query).await
    }

    async fn order(&self, order_id: i64) -> Result<Order, PaymentFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        Ok(order)
    }

    async fn transaction(&self, id: i64) -> Result<MpesaTransaction, PaymentFlowError> {
        self.db.fetch_mpesa_transaction(id).await?.ok_or(PaymentFlowError::TransactionNotFound(id))
    }
}

fn candidates(orders: &[&Order], tier: MatchTier) -> Vec<OrderCandidate> {
    orders.iter().map(|o| OrderCandidate { order: (*o).clone(), tier }).collect()
}

fn timeout_resolution() -> StkResolution {
    StkResolution::new(STK_TIMEOUT_RESULT_CODE, "No response from the customer before the prompt expired")
}
