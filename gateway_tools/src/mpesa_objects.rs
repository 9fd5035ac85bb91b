//! Daraja request and response bodies, and the payloads Safaricom posts to our callback URLs.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lms_common::{Money, PhoneNumber};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{helpers::parse_mpesa_time, MpesaApiError};

/// Daraja returns the "still processing" error while the customer has not answered an STK prompt.
pub const STK_PROCESSING_ERROR_CODE: &str = "500.001.1001";

/// Daraja is inconsistent about whether codes are strings or numbers.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::default()),
        v => Err(serde::de::Error::custom(format!("expected a string or number, got {v}"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Seconds, sent as a string
    #[serde(deserialize_with = "string_or_number")]
    pub expires_in: String,
}

/// The body of a failed Daraja call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarajaErrorResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub error_code: String,
    pub error_message: String,
}

//--------------------------------------       STK push        --------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: i64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub response_code: String,
    pub response_description: String,
    #[serde(default)]
    pub customer_message: String,
}

impl StkPushResponse {
    pub fn is_accepted(&self) -> bool {
        self.response_code == "0"
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub response_code: String,
    #[serde(default)]
    pub response_description: String,
    #[serde(deserialize_with = "string_or_number", default)]
    pub result_code: String,
    #[serde(default)]
    pub result_desc: String,
}

/// The state of an STK prompt according to a status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StkQueryResult {
    /// The customer has not answered yet
    Pending,
    Complete { result_code: i64, result_desc: String },
}

//--------------------------------------     STK callback      --------------------------------------------------------
/// What Safaricom posts to the STK callback URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl StkCallback {
    fn item(&self, name: &str) -> Option<String> {
        let items = &self.callback_metadata.as_ref()?.items;
        let value = items.iter().find(|i| i.name == name)?.value.as_ref()?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<String> {
        self.item("MpesaReceiptNumber")
    }

    pub fn amount(&self) -> Option<Money> {
        self.item("Amount").and_then(|a| Money::from_str(&a).ok())
    }

    pub fn phone(&self) -> Option<PhoneNumber> {
        self.item("PhoneNumber").and_then(|p| PhoneNumber::parse(&p).ok())
    }

    pub fn transaction_time(&self) -> Option<DateTime<Utc>> {
        self.item("TransactionDate").and_then(|t| parse_mpesa_time(&t))
    }
}

//--------------------------------------          C2B          --------------------------------------------------------
/// A paybill payment, as posted to the C2B validation and confirmation URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct C2bPayload {
    #[serde(default)]
    pub transaction_type: String,
    #[serde(rename = "TransID")]
    pub trans_id: String,
    pub trans_time: String,
    #[serde(deserialize_with = "string_or_number")]
    pub trans_amount: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub business_short_code: String,
    #[serde(default)]
    pub bill_ref_number: String,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub org_account_balance: String,
    #[serde(rename = "ThirdPartyTransID", default)]
    pub third_party_trans_id: String,
    #[serde(rename = "MSISDN", default, deserialize_with = "string_or_number")]
    pub msisdn: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl C2bPayload {
    pub fn amount(&self) -> Result<Money, MpesaApiError> {
        Money::from_str(&self.trans_amount).map_err(|e| MpesaApiError::InvalidCallback(e.to_string()))
    }

    pub fn transaction_time(&self) -> Result<DateTime<Utc>, MpesaApiError> {
        parse_mpesa_time(&self.trans_time)
            .ok_or_else(|| MpesaApiError::InvalidCallback(format!("Invalid TransTime: {}", self.trans_time)))
    }

    /// The payer's number. Safaricom masks or hashes it for some shortcodes, in which case this is `None`.
    pub fn phone(&self) -> Option<PhoneNumber> {
        PhoneNumber::parse(&self.msisdn).ok()
    }

    pub fn account_reference(&self) -> Option<String> {
        Some(self.bill_ref_number.trim().to_string()).filter(|s| !s.is_empty())
    }

    pub fn payer_name(&self) -> Option<String> {
        let name = [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Some(name).filter(|s| !s.is_empty())
    }
}

/// The reply Safaricom expects from our callback URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MpesaAck {
    pub result_code: i64,
    pub result_desc: String,
}

impl MpesaAck {
    pub fn accepted() -> Self {
        Self { result_code: 0, result_desc: "Accepted".to_string() }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    const PAID: &str = r#"{
      "Body": {
        "stkCallback": {
          "MerchantRequestID": "29115-34620561-1",
          "CheckoutRequestID": "ws_CO_191220191020363925",
          "ResultCode": 0,
          "ResultDesc": "The service request is processed successfully.",
          "CallbackMetadata": {
            "Item": [
              { "Name": "Amount", "Value": 1.00 },
              { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
              { "Name": "Balance" },
              { "Name": "TransactionDate", "Value": 20191219102115 },
              { "Name": "PhoneNumber", "Value": 254708374149 }
            ]
          }
        }
      }
    }"#;

    const CANCELLED: &str = r#"{
      "Body": {
        "stkCallback": {
          "MerchantRequestID": "29115-34620561-1",
          "CheckoutRequestID": "ws_CO_191220191020363925",
          "ResultCode": 1032,
          "ResultDesc": "Request cancelled by user"
        }
      }
    }"#;

    #[test]
    fn successful_stk_callback() {
        let envelope: StkCallbackEnvelope = serde_json::from_str(PAID).unwrap();
        let cb = envelope.body.stk_callback;
        assert_eq!(cb.result_code, 0);
        assert_eq!(cb.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(cb.receipt().as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(cb.amount(), Some(Money::from_shillings(1)));
        assert_eq!(cb.phone().unwrap().as_str(), "254708374149");
        assert_eq!(cb.transaction_time(), Some(Utc.with_ymd_and_hms(2019, 12, 19, 7, 21, 15).unwrap()));
    }

    #[test]
    fn cancelled_stk_callback() {
        let envelope: StkCallbackEnvelope = serde_json::from_str(CANCELLED).unwrap();
        let cb = envelope.body.stk_callback;
        assert_eq!(cb.result_code, 1032);
        assert!(cb.callback_metadata.is_none());
        assert_eq!(cb.receipt(), None);
        assert_eq!(cb.amount(), None);
    }

    #[test]
    fn c2b_confirmation() {
        let json = r#"{
          "TransactionType": "Pay Bill",
          "TransID": "RKTQDM7W6S",
          "TransTime": "20240601093000",
          "TransAmount": "1500.00",
          "BusinessShortCode": "600638",
          "BillRefNumber": " lnd-240601-0003 ",
          "InvoiceNumber": "",
          "OrgAccountBalance": "49197.00",
          "ThirdPartyTransID": "",
          "MSISDN": "254712345678",
          "FirstName": "JOHN",
          "MiddleName": "",
          "LastName": "DOE"
        }"#;
        let c2b: C2bPayload = serde_json::from_str(json).unwrap();
        assert_eq!(c2b.amount().unwrap(), Money::from_shillings(1500));
        assert_eq!(c2b.transaction_time().unwrap(), Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap());
        assert_eq!(c2b.phone().unwrap().as_str(), "254712345678");
        assert_eq!(c2b.account_reference().as_deref(), Some("lnd-240601-0003"));
        assert_eq!(c2b.payer_name().as_deref(), Some("JOHN DOE"));
    }

    #[test]
    fn hashed_msisdn_has_no_phone() {
        let json = r#"{"TransID": "RKT1", "TransTime": "20240601093000", "TransAmount": 20,
            "MSISDN": "2dc5d7b7c1e8e15e1aa2bb03f7a34e83a7d1d6a3d1c9d4c5e6f7a8b9c0d1e2f3"}"#;
        let c2b: C2bPayload = serde_json::from_str(json).unwrap();
        assert_eq!(c2b.amount().unwrap(), Money::from_shillings(20));
        assert!(c2b.phone().is_none());
        assert!(c2b.account_reference().is_none());
        assert!(c2b.payer_name().is_none());
    }

    #[test]
    fn query_responses() {
        let json = r#"{"ResponseCode": "0", "ResponseDescription": "Accepted",
            "MerchantRequestID": "22205-34066-1", "CheckoutRequestID": "ws_CO_13012021093521236557",
            "ResultCode": "1032", "ResultDesc": "Request cancelled by user"}"#;
        let r: StkQueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.result_code, "1032");
        let json = r#"{"requestId": "1234-5678", "errorCode": "500.001.1001",
            "errorMessage": "The transaction is being processed"}"#;
        let e: DarajaErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(e.error_code, STK_PROCESSING_ERROR_CODE);
    }

    #[test]
    fn ack() {
        let json = serde_json::to_string(&MpesaAck::accepted()).unwrap();
        assert_eq!(json, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
    }
}
