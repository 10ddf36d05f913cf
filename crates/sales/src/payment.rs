//! Payment authorization seam.
//!
//! The orchestrator only needs a yes/no decision before any stock is
//! reserved; declines, errors and timeouts all abort the checkout.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Card details submitted with a checkout. `Debug` never prints the full number.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentInstrument {
    pub card_number: String,
    /// `MM/YY`.
    pub expiry: String,
    pub cvv: String,
}

impl PaymentInstrument {
    pub fn new(card_number: impl Into<String>, expiry: impl Into<String>, cvv: impl Into<String>) -> Self {
        Self {
            card_number: card_number.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
        }
    }

    fn digits(&self) -> String {
        self.card_number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
    }

    pub fn masked_number(&self) -> String {
        let digits = self.digits();
        let tail: String = digits.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("****{tail}")
    }
}

impl core::fmt::Debug for PaymentInstrument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PaymentInstrument")
            .field("card_number", &self.masked_number())
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("malformed payment instrument: {0}")]
    Malformed(String),

    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// External accept/reject decision for a payment instrument.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(&self, instrument: &PaymentInstrument) -> Result<bool, PaymentError>;
}

/// Offline card checks: Luhn checksum, unexpired `MM/YY`, 3–4 digit CVV.
#[derive(Debug, Clone, Default)]
pub struct CardAuthorizer {
    as_of: Option<DateTime<Utc>>,
}

impl CardAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate expiry against a fixed instant instead of the wall clock.
    pub fn as_of(now: DateTime<Utc>) -> Self {
        Self { as_of: Some(now) }
    }

    pub fn check(&self, instrument: &PaymentInstrument) -> Result<bool, PaymentError> {
        let digits = instrument.digits();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::Malformed("card number must be numeric".to_string()));
        }
        let (month, year) = parse_expiry(&instrument.expiry)?;
        let now = self.as_of.unwrap_or_else(Utc::now);

        let cvv_ok = (3..=4).contains(&instrument.cvv.len())
            && instrument.cvv.chars().all(|c| c.is_ascii_digit());
        let not_expired = (year, month) >= (now.year(), now.month());

        Ok((12..=19).contains(&digits.len()) && luhn_valid(&digits) && not_expired && cvv_ok)
    }
}

#[async_trait]
impl PaymentAuthorizer for CardAuthorizer {
    async fn authorize(&self, instrument: &PaymentInstrument) -> Result<bool, PaymentError> {
        self.check(instrument)
    }
}

fn parse_expiry(expiry: &str) -> Result<(u32, i32), PaymentError> {
    let malformed = || PaymentError::Malformed(format!("expiry '{expiry}' is not MM/YY"));
    let (mm, yy) = expiry.trim().split_once('/').ok_or_else(malformed)?;
    if mm.len() != 2 || yy.len() != 2 {
        return Err(malformed());
    }
    let month: u32 = mm.parse().map_err(|_| malformed())?;
    let year: i32 = yy.parse().map_err(|_| malformed())?;
    if !(1..=12).contains(&month) {
        return Err(malformed());
    }
    Ok((month, 2000 + year))
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_2026() -> CardAuthorizer {
        CardAuthorizer::as_of(Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn accepts_valid_card() {
        let card = PaymentInstrument::new("4242 4242 4242 4242", "12/30", "123");
        assert_eq!(june_2026().check(&card), Ok(true));
    }

    #[test]
    fn declines_bad_checksum_cvv_or_expiry() {
        let auth = june_2026();
        assert_eq!(auth.check(&PaymentInstrument::new("4242424242424241", "12/30", "123")), Ok(false));
        assert_eq!(auth.check(&PaymentInstrument::new("4242424242424242", "12/30", "12")), Ok(false));
        assert_eq!(auth.check(&PaymentInstrument::new("4242424242424242", "05/26", "123")), Ok(false));
    }

    #[test]
    fn card_valid_through_expiry_month() {
        let card = PaymentInstrument::new("4242424242424242", "06/26", "1234");
        assert_eq!(june_2026().check(&card), Ok(true));
    }

    #[test]
    fn malformed_expiry_is_an_error() {
        let card = PaymentInstrument::new("4242424242424242", "2030-12", "123");
        assert!(matches!(june_2026().check(&card), Err(PaymentError::Malformed(_))));
    }

    #[test]
    fn debug_masks_card_number() {
        let card = PaymentInstrument::new("4242424242424242", "12/30", "123");
        let printed = format!("{card:?}");
        assert!(!printed.contains("4242424242424242"));
        assert!(printed.contains("****4242"));
        assert!(!printed.contains("123\""));
    }
}
