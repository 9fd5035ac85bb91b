use std::{fmt::Display, str::FromStr};

use lms_common::{helpers::env_flag, Secret};
use log::*;

//--------------------------------------        M-Pesa         --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MpesaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            MpesaEnvironment::Sandbox => "https://sandbox.safaricom.co.ke",
            MpesaEnvironment::Production => "https://api.safaricom.co.ke",
        }
    }
}

impl FromStr for MpesaEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "live" => Ok(Self::Production),
            _ => Err(format!("'{s}' is not an M-Pesa environment. Use sandbox or production")),
        }
    }
}

impl Display for MpesaEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpesaEnvironment::Sandbox => f.write_str("sandbox"),
            MpesaEnvironment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MpesaConfig {
    pub environment: MpesaEnvironment,
    pub consumer_key: Secret<String>,
    pub consumer_secret: Secret<String>,
    /// The paybill or till number payments are made to
    pub shortcode: String,
    pub passkey: Secret<String>,
    /// The public URL Safaricom posts STK results to
    pub callback_url: String,
}

impl MpesaConfig {
    pub fn new_from_env_or_default() -> Self {
        let environment = match std::env::var("LMS_MPESA_ENVIRONMENT") {
            Ok(s) => s.parse().unwrap_or_else(|e| {
                warn!("🪛️ {e}. Using the sandbox.");
                MpesaEnvironment::Sandbox
            }),
            Err(_) => {
                info!("🪛️ LMS_MPESA_ENVIRONMENT not set, using the sandbox");
                MpesaEnvironment::Sandbox
            },
        };
        let consumer_key = Secret::new(std::env::var("LMS_MPESA_CONSUMER_KEY").unwrap_or_else(|_| {
            warn!("🪛️ LMS_MPESA_CONSUMER_KEY not set. M-Pesa payments will not work.");
            String::default()
        }));
        let consumer_secret = Secret::new(std::env::var("LMS_MPESA_CONSUMER_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ LMS_MPESA_CONSUMER_SECRET not set. M-Pesa payments will not work.");
            String::default()
        }));
        let shortcode = std::env::var("LMS_MPESA_SHORTCODE").unwrap_or_else(|_| {
            warn!("🪛️ LMS_MPESA_SHORTCODE not set, using the sandbox shortcode 174379");
            "174379".to_string()
        });
        let passkey = Secret::new(std::env::var("LMS_MPESA_PASSKEY").unwrap_or_else(|_| {
            warn!("🪛️ LMS_MPESA_PASSKEY not set. M-Pesa payments will not work.");
            String::default()
        }));
        let callback_url = std::env::var("LMS_MPESA_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("🪛️ LMS_MPESA_CALLBACK_URL not set. Safaricom will not be able to report STK results.");
            "https://example.com/mpesa/stk_callback".to_string()
        });
        Self { environment, consumer_key, consumer_secret, shortcode, passkey, callback_url }
    }

    /// The credentials needed to call Daraja are all present
    pub fn is_configured(&self) -> bool {
        !self.consumer_key.reveal().is_empty() &&
            !self.consumer_secret.reveal().is_empty() &&
            !self.passkey.reveal().is_empty() &&
            !self.shortcode.is_empty()
    }
}

//--------------------------------------          SMS          --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmsEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl SmsEnvironment {
    pub fn messaging_url(&self) -> &'static str {
        match self {
            SmsEnvironment::Sandbox => "https://api.sandbox.africastalking.com/version1/messaging",
            SmsEnvironment::Production => "https://api.africastalking.com/version1/messaging",
        }
    }
}

impl FromStr for SmsEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "live" => Ok(Self::Production),
            _ => Err(format!("'{s}' is not an SMS environment. Use sandbox or production")),
        }
    }
}

impl Display for SmsEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmsEnvironment::Sandbox => f.write_str("sandbox"),
            SmsEnvironment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub environment: SmsEnvironment,
    pub username: String,
    pub api_key: Secret<String>,
    /// Alphanumeric sender id. The provider's shared short code is used when this is empty.
    pub sender_id: Option<String>,
    /// When false, messages are logged but never sent
    pub enabled: bool,
}

impl SmsConfig {
    pub fn new_from_env_or_default() -> Self {
        let environment = match std::env::var("LMS_SMS_ENVIRONMENT") {
            Ok(s) => s.parse().unwrap_or_else(|e| {
                warn!("🪛️ {e}. Using the sandbox.");
                SmsEnvironment::Sandbox
            }),
            Err(_) => {
                info!("🪛️ LMS_SMS_ENVIRONMENT not set, using the sandbox");
                SmsEnvironment::Sandbox
            },
        };
        let username = std::env::var("LMS_SMS_USERNAME").unwrap_or_else(|_| {
            warn!("🪛️ LMS_SMS_USERNAME not set, using 'sandbox'");
            "sandbox".to_string()
        });
        let api_key = Secret::new(std::env::var("LMS_SMS_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ LMS_SMS_API_KEY not set. Text messages will not be delivered.");
            String::default()
        }));
        let sender_id = std::env::var("LMS_SMS_SENDER_ID").ok().filter(|s| !s.trim().is_empty());
        let enabled = env_flag("LMS_SMS_ENABLED", true) && !api_key.reveal().is_empty();
        if !enabled {
            info!("🪛️ Text messages are disabled");
        }
        Self { environment, username, api_key, sender_id, enabled }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn environments() {
        assert_eq!("Production".parse::<MpesaEnvironment>().unwrap(), MpesaEnvironment::Production);
        assert_eq!(" sandbox ".parse::<SmsEnvironment>().unwrap(), SmsEnvironment::Sandbox);
        assert!("staging".parse::<MpesaEnvironment>().is_err());
        assert_eq!(MpesaEnvironment::Production.base_url(), "https://api.safaricom.co.ke");
    }

    #[test]
    fn unconfigured_mpesa() {
        let mut config = MpesaConfig::default();
        assert!(!config.is_configured());
        config.consumer_key = Secret::new("key".into());
        config.consumer_secret = Secret::new("secret".into());
        config.passkey = Secret::new("passkey".into());
        config.shortcode = "174379".into();
        assert!(config.is_configured());
    }
}
