//! In-memory stand-ins for the M-Pesa and SMS gateways.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use laundry_engine::{
    db_types::PhoneNumber,
    traits::{GatewayError, SmsDelivery, StkPushAck, StkPushRequest, StkQueryOutcome},
    MpesaGateway,
    SmsGateway,
};

#[derive(Debug, Default)]
struct MpesaState {
    pushes: Vec<StkPushRequest>,
    query_results: HashMap<String, StkQueryOutcome>,
    offline: bool,
}

/// Accepts every STK push and hands out checkout ids `ws_CO_000001`, `ws_CO_000002`, ... Status queries report
/// `Pending` unless a result has been set for the checkout id.
#[derive(Debug, Clone, Default)]
pub struct StubMpesaGateway {
    state: Arc<Mutex<MpesaState>>,
}

impl StubMpesaGateway {
    pub fn pushes(&self) -> Vec<StkPushRequest> {
        self.state.lock().unwrap().pushes.clone()
    }

    pub fn set_query_result(&self, checkout_request_id: &str, outcome: StkQueryOutcome) {
        self.state.lock().unwrap().query_results.insert(checkout_request_id.to_string(), outcome);
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }
}

impl MpesaGateway for StubMpesaGateway {
    async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(GatewayError::Unavailable("The stub gateway is offline".into()));
        }
        state.pushes.push(request);
        let n = state.pushes.len();
        Ok(StkPushAck {
            merchant_request_id: format!("29115-{n}"),
            checkout_request_id: format!("ws_CO_{n:06}"),
            customer_message: "Success. Request accepted for processing".into(),
        })
    }

    async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(GatewayError::Unavailable("The stub gateway is offline".into()));
        }
        Ok(state.query_results.get(checkout_request_id).cloned().unwrap_or(StkQueryOutcome::Pending))
    }
}

#[derive(Debug, Default)]
struct SmsState {
    sent: Vec<(String, String)>,
    undeliverable: HashSet<String>,
    offline: bool,
}

/// Records every message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct StubSmsGateway {
    state: Arc<Mutex<SmsState>>,
}

impl StubSmsGateway {
    /// (recipient, message) pairs that were delivered
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn reject_number(&self, phone: &str) {
        let phone = PhoneNumber::parse(phone).expect("Invalid phone number");
        self.state.lock().unwrap().undeliverable.insert(phone.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }
}

impl SmsGateway for StubSmsGateway {
    async fn send_sms(&self, recipients: &[PhoneNumber], message: &str) -> Result<Vec<SmsDelivery>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(GatewayError::Unavailable("The stub gateway is offline".into()));
        }
        let mut result = Vec::with_capacity(recipients.len());
        for phone in recipients {
            let recipient = phone.to_string();
            if state.undeliverable.contains(&recipient) {
                result.push(SmsDelivery::failed(recipient, "UnsupportedNumberType"));
            } else {
                let id = format!("ATXid_{}", state.sent.len() + 1);
                state.sent.push((recipient.clone(), message.to_string()));
                result.push(SmsDelivery::sent(recipient, Some(id), Some("KES 0.8000".into())));
            }
        }
        Ok(result)
    }
}
