//! Checkout line handling shared by the orchestrator and the cart reconciler.

use serde::{Deserialize, Serialize};

use forgecart_core::DomainError;
use forgecart_products::ProductId;

use crate::CartItem;

/// A requested order line: product and quantity only. Prices come from the product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Merge lines for the same product (summing quantities), keeping first-seen order.
///
/// Non-positive quantities are rejected before anything is merged.
pub fn merge_duplicate_lines(lines: &[LineRequest]) -> Result<Vec<LineRequest>, DomainError> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Turn cart lines into line requests (oldest first).
pub fn lines_from_cart(items: &[CartItem]) -> Vec<LineRequest> {
    let mut sorted: Vec<&CartItem> = items.iter().collect();
    sorted.sort_by_key(|i| i.added_at);
    sorted
        .into_iter()
        .map(|i| LineRequest {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forgecart_core::TenantId;
    use forgecart_parties::CustomerId;

    use crate::CartOwner;

    fn req(product_id: ProductId, quantity: i64) -> LineRequest {
        LineRequest { product_id, quantity }
    }

    #[test]
    fn duplicates_are_summed_in_first_seen_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let merged = merge_duplicate_lines(&[req(a, 1), req(b, 2), req(a, 3)]).unwrap();
        assert_eq!(merged, vec![req(a, 4), req(b, 2)]);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = merge_duplicate_lines(&[req(ProductId::new(), 0)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cart_lines_are_ordered_by_age() {
        let tenant = TenantId::new();
        let owner = CartOwner::Customer(CustomerId::new());
        let now = Utc::now();
        let newer = CartItem::new(tenant, owner.clone(), ProductId::new(), 1, now).unwrap();
        let older = CartItem::new(tenant, owner, ProductId::new(), 2, now - Duration::minutes(5)).unwrap();

        let lines = lines_from_cart(&[newer.clone(), older.clone()]);
        assert_eq!(lines[0].product_id, older.product_id);
        assert_eq!(lines[1].product_id, newer.product_id);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: merging preserves the total requested quantity per product.
            #[test]
            fn merge_preserves_quantities(picks in proptest::collection::vec((0usize..4, 1i64..100), 0..30)) {
                let products: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();
                let lines: Vec<LineRequest> = picks.iter().map(|(i, q)| req(products[*i], *q)).collect();
                let merged = merge_duplicate_lines(&lines).unwrap();

                for p in &products {
                    let requested: i64 = lines.iter().filter(|l| l.product_id == *p).map(|l| l.quantity).sum();
                    let got: i64 = merged.iter().filter(|l| l.product_id == *p).map(|l| l.quantity).sum();
                    prop_assert_eq!(requested, got);
                    prop_assert!(merged.iter().filter(|l| l.product_id == *p).count() <= 1);
                }
            }
        }
    }
}
