use thiserror::Error;

use forgecart_core::DomainError;

/// Storage-layer failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Row not found (by primary key, or by tenant-predicated write).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Row exists but belongs to another tenant.
    #[error("tenant isolation violated: {0}")]
    TenantIsolation(String),

    /// Unique-constraint style conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A check constraint rejected the write (e.g. stock would go negative).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Stored or supplied data could not be turned into a domain value.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Connection, lock or driver failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::TenantMismatch(msg) => StoreError::TenantIsolation(msg),
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::InvalidData(other.to_string()),
        }
    }
}
