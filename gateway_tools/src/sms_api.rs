use std::sync::Arc;

use lms_common::PhoneNumber;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{
    config::SmsConfig,
    sms_objects::{RecipientReport, SmsResponse},
    SmsApiError,
};

#[derive(Clone)]
pub struct SmsApi {
    config: SmsConfig,
    client: Arc<Client>,
}

impl SmsApi {
    pub fn new(config: SmsConfig) -> Result<Self, SmsApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| SmsApiError::Initialization(e.to_string()))?;
        headers.insert("apiKey", val);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SmsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &SmsConfig {
        &self.config
    }

    /// Sends `message` to every recipient in one request, returning the provider's report for each of them.
    pub async fn send(&self, recipients: &[PhoneNumber], message: &str) -> Result<Vec<RecipientReport>, SmsApiError> {
        let to = recipients.iter().map(|p| p.international()).collect::<Vec<_>>().join(",");
        let mut form = vec![("username", self.config.username.clone()), ("to", to), ("message", message.to_string())];
        if let Some(sender) = &self.config.sender_id {
            form.push(("from", sender.clone()));
        }
        let url = self.config.environment.messaging_url();
        debug!("📱️ Sending a message to {} recipients", recipients.len());
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SmsApiError::RestResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| SmsApiError::RestResponseError(e.to_string()))?;
            return Err(SmsApiError::QueryError { status, message });
        }
        let body = response.json::<SmsResponse>().await.map_err(|e| SmsApiError::JsonError(e.to_string()))?;
        info!("📱️ {}", body.data.message);
        Ok(body.data.recipients)
    }
}
