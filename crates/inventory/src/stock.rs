use serde::{Deserialize, Serialize};

use forgecart_core::DomainError;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reservation {
    Reserved { remaining: i64 },
    InsufficientStock { available: i64 },
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

/// Quantities on order lines and stock adjustments must be positive.
pub fn validate_quantity(quantity: i64) -> Result<i64, DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(quantity)
}

/// On-hand stock for one product row.
///
/// The check and the decrement happen in one call so a store can run it
/// under a single write (row predicate in SQL, table lock in memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevel(i64);

impl StockLevel {
    pub fn new(on_hand: i64) -> Result<Self, DomainError> {
        if on_hand < 0 {
            return Err(DomainError::invariant("stock level cannot be negative"));
        }
        Ok(Self(on_hand))
    }

    pub fn on_hand(self) -> i64 {
        self.0
    }

    /// Subtract `quantity` only if enough is on hand; otherwise leave the level untouched.
    pub fn try_reserve(&mut self, quantity: i64) -> Result<Reservation, DomainError> {
        let quantity = validate_quantity(quantity)?;
        if self.0 < quantity {
            return Ok(Reservation::InsufficientStock { available: self.0 });
        }
        self.0 -= quantity;
        Ok(Reservation::Reserved { remaining: self.0 })
    }

    /// Add stock back. No upper bound is enforced.
    pub fn release(&mut self, quantity: i64) -> Result<i64, DomainError> {
        let quantity = validate_quantity(quantity)?;
        self.0 = self
            .0
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("stock level overflow"))?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_decrements_when_sufficient() {
        let mut level = StockLevel::new(5).unwrap();
        assert_eq!(level.try_reserve(3).unwrap(), Reservation::Reserved { remaining: 2 });
        assert_eq!(level.on_hand(), 2);
    }

    #[test]
    fn reserve_leaves_level_untouched_when_insufficient() {
        let mut level = StockLevel::new(5).unwrap();
        assert_eq!(level.try_reserve(6).unwrap(), Reservation::InsufficientStock { available: 5 });
        assert_eq!(level.on_hand(), 5);
    }

    #[test]
    fn reserving_exact_stock_reaches_zero() {
        let mut level = StockLevel::new(4).unwrap();
        assert_eq!(level.try_reserve(4).unwrap(), Reservation::Reserved { remaining: 0 });
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut level = StockLevel::new(5).unwrap();
        assert!(matches!(level.try_reserve(0), Err(DomainError::Validation(_))));
        assert!(matches!(level.release(-2), Err(DomainError::Validation(_))));
    }

    #[test]
    fn release_has_no_ceiling() {
        let mut level = StockLevel::new(0).unwrap();
        assert_eq!(level.release(1_000).unwrap(), 1_000);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: sequential reservations never drive stock below zero, and
            /// the successful ones sum to exactly the stock consumed.
            #[test]
            fn never_oversells(
                initial in 0i64..500,
                requests in proptest::collection::vec(1i64..50, 0..40),
            ) {
                let mut level = StockLevel::new(initial).unwrap();
                let mut granted = 0i64;
                for q in requests {
                    if level.try_reserve(q).unwrap().is_reserved() {
                        granted += q;
                    }
                    prop_assert!(level.on_hand() >= 0);
                }
                prop_assert_eq!(level.on_hand(), initial - granted);
            }
        }
    }
}
