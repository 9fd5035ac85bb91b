pub mod matching;
pub mod payment_state;
pub mod pricing;
pub mod reporting;
pub mod sms_templates;
