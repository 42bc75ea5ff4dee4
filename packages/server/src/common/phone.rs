//! E.164 phone numbers for the Indian numbering plan.
//!
//! Admin phone numbers are always stored and compared in normalized form
//! (`+91` followed by a ten digit national number with no leading zero).

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

const COUNTRY_PREFIX: &str = "91";
const NATIONAL_NUMBER_LEN: usize = 10;

lazy_static! {
    static ref E164_INDIA: Regex =
        Regex::new(r"^\+91[1-9][0-9]{9}$").expect("phone regex is valid");
}

/// Rejected phone input. No network call is ever made for such input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone format")]
pub struct ValidationError;

/// A validated, normalized phone number (`+91XXXXXXXXXX`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accept only a number that is already in normalized form.
    pub fn parse_e164(value: &str) -> Result<Self, ValidationError> {
        if E164_INDIA.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form used in logs: country code and last four digits only.
    pub fn masked(&self) -> String {
        let digits = &self.0[3..];
        format!("+91******{}", &digits[digits.len() - 4..])
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_e164(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

/// Normalize user input into an E.164 Indian number and validate it.
///
/// Every non-digit character is dropped. A digit string that already carries
/// the `91` country prefix in front of a national number gets a leading `+`;
/// anything else is treated as a national number and gets `+91`.
pub fn normalize_and_validate(raw_input: &str) -> Result<PhoneNumber, ValidationError> {
    let digits: String = raw_input.chars().filter(|c| c.is_ascii_digit()).collect();

    let candidate =
        if digits.len() > NATIONAL_NUMBER_LEN && digits.starts_with(COUNTRY_PREFIX) {
            format!("+{}", digits)
        } else {
            format!("+{}{}", COUNTRY_PREFIX, digits)
        };

    PhoneNumber::parse_e164(&candidate)
}
