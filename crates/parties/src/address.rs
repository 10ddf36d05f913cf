use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, Entity, TenantId, TenantOwned, uuid_newtype};

use crate::CustomerId;

uuid_newtype!(
    /// Shipping address identifier.
    AddressId,
    "AddressId"
);

/// Shipping destination owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Fail unless the address belongs to `customer_id` in `tenant_id`.
    pub fn ensure_owned_by(&self, tenant_id: TenantId, customer_id: CustomerId) -> Result<(), DomainError> {
        self.ensure_tenant(tenant_id)?;
        if self.customer_id != customer_id {
            return Err(DomainError::validation(format!(
                "address {} does not belong to customer {customer_id}",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Address {
    type Id = AddressId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Address {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Inline shipping address supplied at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddressForm {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddressForm {
    pub fn into_address(self, tenant_id: TenantId, customer_id: CustomerId) -> Result<Address, DomainError> {
        let required = [
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DomainError::validation(format!("shipping address {field} is required")));
        }

        let optional = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(Address {
            id: AddressId::new(),
            tenant_id,
            customer_id,
            line1: self.line1.trim().to_string(),
            line2: optional(self.line2),
            city: self.city.trim().to_string(),
            region: optional(self.region),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ShippingAddressForm {
        ShippingAddressForm {
            line1: "1 Main St".to_string(),
            line2: Some("  ".to_string()),
            city: "Springfield".to_string(),
            region: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn inline_form_becomes_owned_address() {
        let tenant = TenantId::new();
        let customer = CustomerId::new();
        let address = form().into_address(tenant, customer).unwrap();

        assert_eq!(address.customer_id, customer);
        assert_eq!(address.line2, None);
        assert!(address.ensure_owned_by(tenant, customer).is_ok());
    }

    #[test]
    fn missing_required_field_is_validation_error() {
        let mut f = form();
        f.city = " ".to_string();
        match f.into_address(TenantId::new(), CustomerId::new()).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("city")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn address_of_other_customer_is_rejected() {
        let tenant = TenantId::new();
        let address = form().into_address(tenant, CustomerId::new()).unwrap();
        assert!(matches!(
            address.ensure_owned_by(tenant, CustomerId::new()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            address.ensure_owned_by(TenantId::new(), address.customer_id),
            Err(DomainError::TenantMismatch(_))
        ));
    }
}
