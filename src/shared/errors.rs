use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// A status precondition on a facility, station, point or charger failed.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Admission or overlap violation (double start, overlapping reservation,
    /// session already billed).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account of driver {0} is suspended")]
    AccountSuspended(i32),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if the caller retries it.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = DomainError::not_found("Invoice", 42);
        assert_eq!(err.to_string(), "Not found: Invoice with id=42");
    }

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(DomainError::Storage("connection reset".into()).is_transient());
        assert!(!DomainError::Conflict("busy".into()).is_transient());
        assert!(!DomainError::AccountSuspended(7).is_transient());
    }

    #[test]
    fn app_error_wraps_domain_error() {
        let err: AppError = DomainError::InvalidInput("bad percentage".into()).into();
        assert_eq!(err.to_string(), "Invalid input: bad percentage");
    }
}
