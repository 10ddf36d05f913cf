use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, Entity, TenantId, TenantOwned, UserId, uuid_newtype};

uuid_newtype!(
    /// Customer identifier.
    CustomerId,
    "CustomerId"
);

/// Buyer identity within a tenant.
///
/// Linked to at most one user account; guest customers have no `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub user_id: Option<UserId>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Contact fields submitted with a checkout. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Profile values used when the form leaves a field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDefaults {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CustomerForm {
    pub fn full_name(&self) -> Option<&str> {
        non_blank(&self.full_name)
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(&self.email)
    }

    pub fn phone(&self) -> Option<&str> {
        non_blank(&self.phone)
    }
}

impl Customer {
    /// New customer linked to `user_id`, seeded from the form with profile fallbacks.
    pub fn for_user(
        tenant_id: TenantId,
        user_id: UserId,
        form: &CustomerForm,
        defaults: &ContactDefaults,
    ) -> Result<Self, DomainError> {
        let full_name = form.full_name().unwrap_or(defaults.full_name.trim()).to_string();
        let email = form.email().unwrap_or(defaults.email.trim()).to_string();
        let phone = form
            .phone()
            .map(str::to_string)
            .or_else(|| defaults.phone.clone());

        if full_name.is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if email.is_empty() {
            return Err(DomainError::validation("customer email is required"));
        }

        Ok(Self {
            id: CustomerId::new(),
            tenant_id,
            user_id: Some(user_id),
            full_name,
            email,
            phone,
        })
    }

    /// Patch mutable contact fields (name, phone) from non-blank form values.
    ///
    /// Returns `true` when anything changed.
    pub fn apply_form(&mut self, form: &CustomerForm) -> bool {
        let mut changed = false;
        if let Some(name) = form.full_name() {
            if name != self.full_name {
                self.full_name = name.to_string();
                changed = true;
            }
        }
        if let Some(phone) = form.phone() {
            if self.phone.as_deref() != Some(phone) {
                self.phone = Some(phone.to_string());
                changed = true;
            }
        }
        changed
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Customer {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ContactDefaults {
        ContactDefaults {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("555-0100".to_string()),
        }
    }

    #[test]
    fn blank_form_falls_back_to_profile() {
        let form = CustomerForm {
            full_name: Some("   ".to_string()),
            email: None,
            phone: Some(String::new()),
        };
        let customer = Customer::for_user(TenantId::new(), UserId::new(), &form, &defaults()).unwrap();

        assert_eq!(customer.full_name, "Ada Lovelace");
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn form_values_override_profile() {
        let form = CustomerForm {
            full_name: Some("Ada King".to_string()),
            email: Some("king@example.com".to_string()),
            phone: None,
        };
        let customer = Customer::for_user(TenantId::new(), UserId::new(), &form, &defaults()).unwrap();

        assert_eq!(customer.full_name, "Ada King");
        assert_eq!(customer.email, "king@example.com");
    }

    #[test]
    fn missing_name_everywhere_is_validation_error() {
        let err = Customer::for_user(
            TenantId::new(),
            UserId::new(),
            &CustomerForm::default(),
            &ContactDefaults::default(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn apply_form_patches_only_non_blank_name_and_phone() {
        let mut customer =
            Customer::for_user(TenantId::new(), UserId::new(), &CustomerForm::default(), &defaults()).unwrap();

        let unchanged = customer.apply_form(&CustomerForm {
            full_name: Some(" ".to_string()),
            email: Some("other@example.com".to_string()),
            phone: None,
        });
        assert!(!unchanged);
        assert_eq!(customer.email, "ada@example.com");

        let changed = customer.apply_form(&CustomerForm {
            full_name: Some("Ada B.".to_string()),
            email: None,
            phone: Some("555-0199".to_string()),
        });
        assert!(changed);
        assert_eq!(customer.full_name, "Ada B.");
        assert_eq!(customer.phone.as_deref(), Some("555-0199"));
    }
}
