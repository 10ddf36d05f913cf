use serde::{Deserialize, Serialize};

use forgecart_core::{Entity, TenantId, UserId};

/// Minimal projection of an identity-provider user.
///
/// `tenant_id` is `None` for platform-level accounts not bound to a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl UserAccount {
    /// Whether this account may act inside `tenant`.
    pub fn can_act_in(&self, tenant: TenantId) -> bool {
        self.tenant_id.is_none_or(|t| t == tenant)
    }
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
