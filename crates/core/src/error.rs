use crate::validation::ValidationErrors;

/// Coarse classification of a [`ClinicError`].
///
/// Transport layers map each kind to a status code; nothing else should need to match on
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    TenantIsolation,
    NotFound,
    Conflict,
    PayloadTooLarge,
    RateLimited,
    Timeout,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("{entity} {id} belongs to another tenant")]
    TenantIsolationViolation { entity: &'static str, id: String },
    #[error("rate limit exceeded for {policy} policy; retry after {retry_after_secs}s")]
    RateLimitExceeded {
        policy: String,
        retry_after_secs: u64,
    },
    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML at {path}: {source}")]
    YamlDeserialization {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("attachment error: {0}")]
    Files(#[from] clinic_files::FilesError),
}

impl ClinicError {
    pub fn kind(&self) -> ErrorKind {
        use clinic_files::FilesError;

        match self {
            ClinicError::Validation(_) => ErrorKind::Validation,
            ClinicError::NotFound { .. } => ErrorKind::NotFound,
            ClinicError::Unauthorized(_) => ErrorKind::Unauthorized,
            ClinicError::Forbidden(_) => ErrorKind::Forbidden,
            ClinicError::Conflict(_) => ErrorKind::Conflict,
            ClinicError::PayloadTooLarge(_) => ErrorKind::PayloadTooLarge,
            ClinicError::TenantIsolationViolation { .. } => ErrorKind::TenantIsolation,
            ClinicError::RateLimitExceeded { .. } => ErrorKind::RateLimited,
            ClinicError::Timeout(_) => ErrorKind::Timeout,
            ClinicError::Files(FilesError::NotFound(_)) => ErrorKind::NotFound,
            ClinicError::Files(FilesError::InvalidHash(_) | FilesError::Empty) => {
                ErrorKind::Validation
            }
            ClinicError::Config(_)
            | ClinicError::Storage(_)
            | ClinicError::Io(_)
            | ClinicError::YamlSerialization(_)
            | ClinicError::YamlDeserialization { .. }
            | ClinicError::Files(_) => ErrorKind::Internal,
        }
    }

    /// Field-keyed validation errors, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ClinicError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ClinicError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        ClinicError::Validation(errors)
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_client_errors() {
        assert_eq!(
            ClinicError::invalid("name", "required").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClinicError::not_found("patient", "abc").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ClinicError::TenantIsolationViolation {
                entity: "patient",
                id: "abc".into()
            }
            .kind(),
            ErrorKind::TenantIsolation
        );
        assert_eq!(
            ClinicError::Conflict("dup".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ClinicError::PayloadTooLarge("photo".into()).kind(),
            ErrorKind::PayloadTooLarge
        );
    }

    #[test]
    fn attachment_errors_are_classified() {
        use clinic_files::FilesError;

        assert_eq!(
            ClinicError::from(FilesError::NotFound("x".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ClinicError::from(FilesError::Empty).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClinicError::from(FilesError::InvalidRootDirectory("x".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn field_errors_only_for_validation() {
        let err = ClinicError::invalid("email", "invalid");
        assert_eq!(
            err.field_errors().unwrap().get("email"),
            Some(&vec!["invalid".to_string()])
        );
        assert!(ClinicError::Storage("x".into()).field_errors().is_none());
    }
}
