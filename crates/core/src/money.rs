//! Money in minor currency units (e.g. cents).

use serde::{Deserialize, Serialize};

use crate::{DomainError, ValueObject};

/// Non-negative amount in the smallest currency unit.
///
/// Arithmetic is checked: overflow surfaces as a validation error instead of
/// wrapping, so an order total can never silently disagree with its lines.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(amount: u64) -> Self {
        Self(amount)
    }

    pub fn minor(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Multiply a unit price by a (positive) quantity.
    pub fn times(self, quantity: i64) -> Result<Money, DomainError> {
        let quantity = u64::try_from(quantity)
            .map_err(|_| DomainError::validation("quantity must not be negative"))?;
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Convert for storage in a signed `BIGINT` column.
    pub fn to_i64(self) -> Result<i64, DomainError> {
        i64::try_from(self.0).map_err(|_| DomainError::validation("amount exceeds storage range"))
    }

    pub fn from_i64(value: i64) -> Result<Money, DomainError> {
        u64::try_from(value)
            .map(Money)
            .map_err(|_| DomainError::validation("amount must not be negative"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn times_rejects_negative_quantity() {
        assert!(Money::from_minor(100).times(-1).is_err());
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let err = Money::from_minor(u64::MAX).checked_add(Money::from_minor(1)).unwrap_err();
        assert_eq!(err, DomainError::validation("amount overflow"));
    }

    #[test]
    fn storage_conversion_rejects_negative_values() {
        assert!(Money::from_i64(-5).is_err());
        assert_eq!(Money::from_i64(42).unwrap(), Money::from_minor(42));
    }

    proptest! {
        #[test]
        fn times_matches_integer_multiplication(price in 0u64..1_000_000, qty in 0i64..10_000) {
            let total = Money::from_minor(price).times(qty).unwrap();
            prop_assert_eq!(total.minor(), price * qty as u64);
        }
    }
}
