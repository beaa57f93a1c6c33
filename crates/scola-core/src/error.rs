use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Student not found: {0}")]
    StudentNotFound(Uuid),
    #[error("Teacher not found: {0}")]
    TeacherNotFound(Uuid),
    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(Uuid),
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Pricing entry not found: {0}")]
    PricingEntryNotFound(Uuid),
    #[error("Cascade event not found: {0}")]
    CascadeEventNotFound(Uuid),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by callers to map failures onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Storage,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::StudentNotFound(_)
            | CoreError::TeacherNotFound(_)
            | CoreError::EnrollmentNotFound(_)
            | CoreError::PaymentNotFound(_)
            | CoreError::TransactionNotFound(_)
            | CoreError::PricingEntryNotFound(_)
            | CoreError::CascadeEventNotFound(_) => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Storage(_) | CoreError::Serde(_) | CoreError::Io(_) => ErrorKind::Storage,
        }
    }
}

impl From<scola_domain::ReportingPeriodError> for CoreError {
    fn from(err: scola_domain::ReportingPeriodError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Rejects blank required text.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Rejects non-finite, negative and (unless allowed) zero amounts.
pub(crate) fn require_amount(field: &str, value: f64, allow_zero: bool) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!("{field} must be a number")));
    }
    if value < 0.0 || (!allow_zero && value == 0.0) {
        let bound = if allow_zero { "zero or more" } else { "greater than zero" };
        return Err(CoreError::Validation(format!("{field} must be {bound}")));
    }
    Ok(())
}
