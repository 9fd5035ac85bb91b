use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

const COUNTRY_CODE: &str = "254";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneNumberError {
    #[error("'{0}' is not a valid Kenyan mobile number")]
    Invalid(String),
}

//--------------------------------------     PhoneNumber      ---------------------------------------------------------
/// A Kenyan mobile number in the international format without the leading plus, e.g. `254712345678`.
///
/// Numbers are accepted in any of the usual local spellings (`0712 345 678`, `712345678`, `+254-712-345678`) and
/// normalised on parsing, so two `PhoneNumber`s compare equal iff they reach the same handset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let invalid = || PhoneNumberError::Invalid(s.to_string());
        let cleaned = s.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.')).collect::<String>();
        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let subscriber = match (digits.strip_prefix(COUNTRY_CODE), digits.strip_prefix('0')) {
            (Some(rest), _) if rest.len() == 9 => rest,
            (_, Some(rest)) => rest,
            _ => digits,
        };
        let valid_prefix = subscriber.starts_with('7') || subscriber.starts_with('1');
        if subscriber.len() != 9 || !valid_prefix {
            return Err(invalid());
        }
        Ok(Self(format!("{COUNTRY_CODE}{subscriber}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The number as dialled locally, e.g. `0712345678`
    pub fn local_format(&self) -> String {
        format!("0{}", &self.0[COUNTRY_CODE.len()..])
    }

    /// The number in E.164 format, e.g. `+254712345678`
    pub fn international(&self) -> String {
        format!("+{}", self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
