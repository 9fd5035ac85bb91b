use gateway_tools::{
    mpesa_objects::{C2bPayload, StkCallback, StkQueryResult},
    MpesaApi,
    MpesaApiError,
};
use laundry_engine::{
    db_types::{NewMpesaTransaction, StkResolution, TransactionSource},
    traits::{GatewayError, StkPushAck, StkPushRequest, StkQueryOutcome},
    MpesaGateway,
};
use log::*;

/// The engine's M-Pesa gateway, backed by the Daraja API.
#[derive(Clone)]
pub struct DarajaGateway {
    api: MpesaApi,
}

impl DarajaGateway {
    pub fn new(api: MpesaApi) -> Self {
        Self { api }
    }

    fn check_configured(&self) -> Result<(), GatewayError> {
        if self.api.config().is_configured() {
            Ok(())
        } else {
            Err(GatewayError::NotConfigured("Set the LMS_MPESA_* variables to take M-Pesa payments".into()))
        }
    }
}

impl MpesaGateway for DarajaGateway {
    async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, GatewayError> {
        self.check_configured()?;
        let response = self
            .api
            .stk_push(&request.phone, request.amount, &request.account_reference, &request.description)
            .await
            .map_err(gateway_error)?;
        Ok(StkPushAck {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
            customer_message: response.customer_message,
        })
    }

    async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, GatewayError> {
        self.check_configured()?;
        let result = self.api.stk_query(checkout_request_id).await.map_err(gateway_error)?;
        Ok(match result {
            StkQueryResult::Pending => StkQueryOutcome::Pending,
            StkQueryResult::Complete { result_code, result_desc } => {
                StkQueryOutcome::Completed(StkResolution::new(result_code, result_desc))
            },
        })
    }
}

pub fn gateway_error(e: MpesaApiError) -> GatewayError {
    match e {
        MpesaApiError::NotConfigured(s) => GatewayError::NotConfigured(s),
        MpesaApiError::Rejected { .. } => GatewayError::Rejected(e.to_string()),
        e if e.is_transient() => GatewayError::Unavailable(e.to_string()),
        MpesaApiError::QueryError { .. } => GatewayError::Rejected(e.to_string()),
        e => GatewayError::Unavailable(e.to_string()),
    }
}

/// Converts the result Safaricom posts to the STK callback URL.
pub fn stk_resolution_from_callback(callback: &StkCallback) -> StkResolution {
    let mut resolution = StkResolution::new(callback.result_code, callback.result_desc.clone());
    if let Some(receipt) = callback.receipt() {
        resolution = resolution.with_receipt(receipt);
    }
    if let Some(amount) = callback.amount() {
        resolution = resolution.with_amount(amount);
    }
    if let Some(phone) = callback.phone() {
        resolution = resolution.with_phone(phone);
    }
    if let Some(ts) = callback.transaction_time() {
        resolution = resolution.with_transaction_time(ts);
    }
    resolution
}

/// Converts a paybill confirmation into a transaction for reconciliation.
pub fn new_transaction_from_c2b(payload: &C2bPayload) -> Result<NewMpesaTransaction, MpesaApiError> {
    trace!("Converting C2B payload to NewMpesaTransaction: {payload:?}");
    let receipt = payload.trans_id.trim();
    if receipt.is_empty() {
        return Err(MpesaApiError::InvalidCallback("The payment has no TransID".into()));
    }
    let amount = payload.amount()?;
    if !amount.is_positive() {
        return Err(MpesaApiError::InvalidCallback(format!("Invalid TransAmount: {}", payload.trans_amount)));
    }
    let mut tx = NewMpesaTransaction::new(receipt, amount, TransactionSource::C2b)
        .with_transaction_time(payload.transaction_time()?);
    if let Some(phone) = payload.phone() {
        tx = tx.with_phone(phone);
    }
    if let Some(reference) = payload.account_reference() {
        tx = tx.with_account_reference(reference);
    }
    if let Some(name) = payload.payer_name() {
        tx = tx.with_payer_name(name);
    }
    Ok(tx)
}
