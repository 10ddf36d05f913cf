use tracing::{debug, instrument};

use forgecart_core::{TenantId, UserId};
use forgecart_parties::{ContactDefaults, Customer, CustomerForm};

use crate::store::{StoreTx, TenantScope};

use super::CheckoutError;

/// Finds or creates the customer that owns an order, inside the caller's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerResolver;

impl CustomerResolver {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, tx, form), fields(tenant_id = %tenant_id, principal_id = %principal_id), err)]
    pub async fn resolve_or_create<T: StoreTx>(
        &self,
        tx: &mut T,
        tenant_id: TenantId,
        principal_id: UserId,
        form: &CustomerForm,
    ) -> Result<Customer, CheckoutError> {
        let user = tx
            .find_user(principal_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("user", principal_id))?;

        if !user.can_act_in(tenant_id) {
            return Err(CheckoutError::TenantMismatch(format!(
                "user {principal_id} is not a member of tenant {tenant_id}"
            )));
        }

        if let Some(mut customer) = TenantScope::new(tx, tenant_id).customer_for_user(principal_id).await? {
            if customer.apply_form(form) {
                tx.update_customer_contact(&customer).await?;
                debug!(customer_id = %customer.id, "customer contact updated");
            }
            return Ok(customer);
        }

        let defaults = ContactDefaults {
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
        };
        let customer = Customer::for_user(tenant_id, principal_id, form, &defaults)?;
        tx.insert_customer(&customer).await?;
        debug!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }
}
