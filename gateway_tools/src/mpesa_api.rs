use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lms_common::{PhoneNumber, Secret};
use log::*;
use reqwest::{header::HeaderValue, Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::{
    config::MpesaConfig,
    helpers::{mpesa_timestamp, stk_password},
    mpesa_objects::{
        AccessTokenResponse,
        DarajaErrorResponse,
        StkPushPayload,
        StkPushResponse,
        StkQueryPayload,
        StkQueryResponse,
        StkQueryResult,
        STK_PROCESSING_ERROR_CODE,
    },
    MpesaApiError,
};

/// Tokens are refreshed this long before Daraja says they expire
const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Clone)]
struct AccessToken {
    token: Secret<String>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECONDS) < self.expires_at
    }
}

/// A client for the Daraja STK push API. Clones share the HTTP client and the cached access token.
#[derive(Clone)]
pub struct MpesaApi {
    config: MpesaConfig,
    client: Arc<Client>,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl MpesaApi {
    pub fn new(config: MpesaConfig) -> Result<Self, MpesaApiError> {
        let client = Client::builder().build().map_err(|e| MpesaApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(RwLock::new(None)) })
    }

    pub fn config(&self) -> &MpesaConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.environment.base_url())
    }

    /// Returns a valid OAuth token, fetching a new one if the cached token is missing or about to expire.
    pub async fn access_token(&self) -> Result<Secret<String>, MpesaApiError> {
        let now = Utc::now();
        if let Some(token) = self.token.read().await.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }
        let mut cache = self.token.write().await;
        // Another task may have refreshed the token while we waited for the lock
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }
        let token = self.fetch_access_token().await?;
        let result = token.token.clone();
        *cache = Some(token);
        Ok(result)
    }

    async fn fetch_access_token(&self) -> Result<AccessToken, MpesaApiError> {
        if !self.config.is_configured() {
            return Err(MpesaApiError::NotConfigured("The consumer key, secret and passkey are required".into()));
        }
        let url = self.url("/oauth/v1/generate");
        debug!("💰️ Fetching a new Daraja access token");
        let response = self
            .client
            .get(url)
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(self.config.consumer_key.reveal(), Some(self.config.consumer_secret.reveal()))
            .send()
            .await
            .map_err(|e| MpesaApiError::AuthenticationError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MpesaApiError::AuthenticationError(format!("Error {status}. {message}")));
        }
        let body = response.json::<AccessTokenResponse>().await.map_err(|e| MpesaApiError::JsonError(e.to_string()))?;
        let lifetime = body.expires_in.trim().parse::<i64>().unwrap_or(3599).clamp(0, 86_400);
        info!("💰️ New Daraja access token obtained. It expires in {lifetime}s");
        Ok(AccessToken { token: Secret::new(body.access_token), expires_at: Utc::now() + Duration::seconds(lifetime) })
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, MpesaApiError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        trace!("💰️ Sending Daraja request: {url}");
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.reveal()))
            .map_err(|e| MpesaApiError::RestRequestError(e.to_string()))?;
        let response = self
            .client
            .post(url)
            .header("Authorization", bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| MpesaApiError::RestRequestError(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| MpesaApiError::RestResponseError(e.to_string()))?;
        if status.is_success() {
            trace!("💰️ Daraja request successful. {status}");
            return serde_json::from_str::<T>(&text).map_err(|e| MpesaApiError::JsonError(e.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED {
            // The token was revoked early. Make sure the next call fetches a new one.
            *self.token.write().await = None;
        }
        match serde_json::from_str::<DarajaErrorResponse>(&text) {
            Ok(e) => Err(MpesaApiError::Rejected { code: e.error_code, message: e.error_message }),
            Err(_) => Err(MpesaApiError::QueryError { status: status.as_u16(), message: text }),
        }
    }

    fn credentials(&self) -> (String, String) {
        let timestamp = mpesa_timestamp(Utc::now());
        let password = stk_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        (password, timestamp)
    }

    /// Sends a payment prompt to `phone` for `amount` whole shillings.
    pub async fn stk_push(
        &self,
        phone: &PhoneNumber,
        amount: i64,
        account_reference: &str,
        description: &str,
    ) -> Result<StkPushResponse, MpesaApiError> {
        let (password, timestamp) = self.credentials();
        let payload = StkPushPayload {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount,
            party_a: phone.to_string(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone.to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: description.to_string(),
        };
        debug!("💰️ Sending STK push of KES {amount} to {phone} for {account_reference}");
        let response = self.post::<StkPushResponse, _>("/mpesa/stkpush/v1/processrequest", &payload).await?;
        if !response.is_accepted() {
            return Err(MpesaApiError::Rejected {
                code: response.response_code,
                message: response.response_description,
            });
        }
        info!("💰️ STK push accepted. Checkout request id {}", response.checkout_request_id);
        Ok(response)
    }

    /// Asks Daraja for the result of an STK prompt.
    pub async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryResult, MpesaApiError> {
        let (password, timestamp) = self.credentials();
        let payload = StkQueryPayload {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            checkout_request_id: checkout_request_id.to_string(),
        };
        trace!("💰️ Querying STK request {checkout_request_id}");
        match self.post::<StkQueryResponse, _>("/mpesa/stkpushquery/v1/query", &payload).await {
            Ok(response) => query_result(response),
            Err(MpesaApiError::Rejected { code, .. }) if code == STK_PROCESSING_ERROR_CODE => {
                trace!("💰️ STK request {checkout_request_id} is still being processed");
                Ok(StkQueryResult::Pending)
            },
            Err(e) => Err(e),
        }
    }
}

fn query_result(response: StkQueryResponse) -> Result<StkQueryResult, MpesaApiError> {
    if response.response_code != "0" {
        return Err(MpesaApiError::Rejected {
            code: response.response_code,
            message: response.response_description,
        });
    }
    if response.result_code.is_empty() {
        return Ok(StkQueryResult::Pending);
    }
    let result_code = response.result_code.trim().parse::<i64>().map_err(|_| {
        MpesaApiError::RestResponseError(format!("Unexpected STK result code: {}", response.result_code))
    })?;
    Ok(StkQueryResult::Complete { result_code, result_desc: response.result_desc })
}
