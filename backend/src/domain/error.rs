//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters (the operator CLI
//! today) map them to exit codes, log lines, or any other protocol-specific
//! envelope. Every failure in the enrolment and progress core is reported per
//! request; none of them is fatal to the process.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
    /// The user already holds a purchase for the course.
    AlreadyPurchased,
    /// The user's balance does not cover the course price.
    InsufficientBalance,
    /// A reorder entry names a module outside the course.
    InvalidModuleId,
    /// A reorder entry targets a position outside `1..=N`.
    InvalidOrder,
    /// Two reorder entries target the same position.
    DuplicateOrder,
    /// A reorder request does not cover exactly the course's modules.
    IncompleteReorder,
    /// The user has no progress row for the module (never purchased).
    NoProgressRecord,
    /// A concurrent writer violated a store constraint first.
    StoreConflict,
    /// The certificate artifact could not be rendered or persisted.
    ArtifactWriteFailed,
    /// A backing store is temporarily unreachable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use academy::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// The message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
}

impl Error {
    /// Create a new error, panicking if validation fails.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_order("position out of range")
    ///     .with_details(json!({ "position": 9 }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyPurchased`].
    pub fn already_purchased(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyPurchased, message)
    }

    /// Convenience constructor for [`ErrorCode::InsufficientBalance`].
    pub fn insufficient_balance(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientBalance, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidModuleId`].
    pub fn invalid_module_id(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidModuleId, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidOrder`].
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOrder, message)
    }

    /// Convenience constructor for [`ErrorCode::DuplicateOrder`].
    pub fn duplicate_order(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateOrder, message)
    }

    /// Convenience constructor for [`ErrorCode::IncompleteReorder`].
    pub fn incomplete_reorder(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IncompleteReorder, message)
    }

    /// Convenience constructor for [`ErrorCode::NoProgressRecord`].
    pub fn no_progress_record(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoProgressRecord, message)
    }

    /// Convenience constructor for [`ErrorCode::StoreConflict`].
    pub fn store_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreConflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ArtifactWriteFailed`].
    pub fn artifact_write_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ArtifactWriteFailed, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}
