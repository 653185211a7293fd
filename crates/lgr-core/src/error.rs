//! Error types for LGR Core
//!
//! Provides error handling for:
//! - Log service failures (structured error codes)
//! - Classification of service failures into permanent vs retryable
//! - Handler-level failures (malformed events, pass-back data, hashing)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes the reconciler inspects
pub mod codes {
    /// Log group does not exist
    pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
    /// Log group already exists
    pub const RESOURCE_ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";
    /// Request parameter rejected by the service
    pub const INVALID_PARAMETER: &str = "InvalidParameterException";
    /// Tag value rejected by the service
    pub const INVALID_PARAMETER_VALUE: &str = "InvalidParameterValueException";
    /// Account-wide log group quota reached
    pub const ACCOUNT_LIMIT_EXCEEDED: &str = "AccountLimitExceededException";
    /// Request rejected before it left the client
    pub const PARAM_VALIDATION: &str = "ParamValidationError";
    /// Request throttled
    pub const THROTTLING: &str = "ThrottlingException";
    /// Service temporarily unavailable
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailableException";
    /// Caller lacks permission
    pub const ACCESS_DENIED: &str = "AccessDenied";
    /// Caller lacks permission (service-specific spelling)
    pub const ACCESS_DENIED_EXCEPTION: &str = "AccessDeniedException";
    /// Credentials not recognized
    pub const UNRECOGNIZED_CLIENT: &str = "UnrecognizedClientException";
    /// Generic request validation failure
    pub const VALIDATION: &str = "ValidationException";
}

/// Codes that are permanent at every call site
const COMMON_PERMANENT_CODES: &[&str] = &[
    codes::ACCESS_DENIED,
    codes::ACCESS_DENIED_EXCEPTION,
    codes::UNRECOGNIZED_CLIENT,
    codes::VALIDATION,
    codes::PARAM_VALIDATION,
];

/// Error reported by the log service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Service error code (e.g. `ResourceNotFoundException`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ServiceError {
    /// Create new service error
    #[inline]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Log group not found
    #[inline]
    pub fn not_found(name: &str) -> Self {
        Self::new(
            codes::RESOURCE_NOT_FOUND,
            format!("The specified log group does not exist: {name}"),
        )
    }

    /// Request failed client-side validation
    #[inline]
    pub fn param_validation(message: impl Into<String>) -> Self {
        Self::new(codes::PARAM_VALIDATION, message)
    }

    /// Check for the not-found code
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == codes::RESOURCE_NOT_FOUND
    }

    /// Check for client-side validation failure
    #[inline]
    #[must_use]
    pub fn is_param_validation(&self) -> bool {
        self.code == codes::PARAM_VALIDATION
    }
}

/// Log service operations, used for error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOperation {
    /// Describe log groups by name prefix
    Describe,
    /// List tags on a log group
    ListTags,
    /// Create a log group
    Create,
    /// Delete a log group
    Delete,
    /// Add tags to a log group
    TagAdd,
    /// Remove tags from a log group
    TagRemove,
}

impl ServiceOperation {
    /// Codes that are permanent for this operation on top of the common set
    #[must_use]
    pub fn permanent_codes(self) -> &'static [&'static str] {
        match self {
            Self::Create => &[codes::INVALID_PARAMETER, codes::ACCOUNT_LIMIT_EXCEEDED],
            Self::TagAdd | Self::TagRemove => &[codes::INVALID_PARAMETER_VALUE],
            Self::Describe | Self::ListTags | Self::Delete => &[],
        }
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Describe => "describe",
            Self::ListTags => "list-tags",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::TagAdd => "tag",
            Self::TagRemove => "untag",
        };
        f.write_str(label)
    }
}

/// Whether a failure may be retried by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Caller must not retry
    Permanent,
    /// Transient; the orchestrator may re-invoke
    Retryable,
}

/// Classify a service error code raised by `operation`
///
/// Common permanent codes apply everywhere, each operation adds its own,
/// and everything else is retryable.
#[must_use]
pub fn classify(operation: ServiceOperation, code: &str) -> ErrorClass {
    if COMMON_PERMANENT_CODES.contains(&code) || operation.permanent_codes().contains(&code) {
        ErrorClass::Permanent
    } else {
        ErrorClass::Retryable
    }
}

/// Handler-level errors
///
/// These never come from a classified service call; the handler surfaces
/// them as permanent failures.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Event envelope could not be decoded
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Component definition could not be decoded
    #[error("invalid component definition: {0}")]
    InvalidDefinition(String),

    /// Pass-back data did not contain a readable operation queue
    #[error("invalid pass-back data: {0}")]
    InvalidPassBack(String),

    /// JSON encoding failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_display() {
        let err = ServiceError::new(codes::THROTTLING, "slow down");
        assert_eq!(err.to_string(), "ThrottlingException: slow down");
    }

    #[test]
    fn not_found_helper() {
        let err = ServiceError::not_found("app-logs");
        assert!(err.is_not_found());
        assert!(err.message.contains("app-logs"));
    }

    #[test]
    fn create_permanent_codes() {
        assert_eq!(
            classify(ServiceOperation::Create, codes::INVALID_PARAMETER),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify(ServiceOperation::Create, codes::ACCOUNT_LIMIT_EXCEEDED),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify(ServiceOperation::Create, codes::THROTTLING),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn operation_codes_do_not_leak() {
        // invalid parameter is only permanent for create
        assert_eq!(
            classify(ServiceOperation::Delete, codes::INVALID_PARAMETER),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify(ServiceOperation::Create, codes::INVALID_PARAMETER_VALUE),
            ErrorClass::Retryable
        );
        assert_eq!(
            classify(ServiceOperation::TagRemove, codes::INVALID_PARAMETER_VALUE),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn common_codes_are_permanent_everywhere() {
        for op in [
            ServiceOperation::Describe,
            ServiceOperation::ListTags,
            ServiceOperation::Create,
            ServiceOperation::Delete,
            ServiceOperation::TagAdd,
            ServiceOperation::TagRemove,
        ] {
            assert_eq!(classify(op, codes::ACCESS_DENIED_EXCEPTION), ErrorClass::Permanent);
            assert_eq!(classify(op, "SomethingElse"), ErrorClass::Retryable);
        }
    }

    #[test]
    fn handler_error_display() {
        let err = HandlerError::MalformedEvent("missing op".to_string());
        assert!(err.to_string().contains("malformed event"));
    }
}
