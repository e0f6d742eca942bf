//! # Service Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  batidoc-core                 batidoc-service              caller      │
//! │  ────────────                 ───────────────              ──────      │
//! │  ValidationError ──► CoreError ──► ServiceError::Core ──► ErrorBody     │
//! │                                    ServiceError::NotFound   { code,     │
//! │                                    ServiceError::Config*      message } │
//! │                                                                         │
//! │  code: NOT_FOUND | VALIDATION_ERROR | INVARIANT_VIOLATION |             │
//! │        CONFIG_ERROR | INTERNAL                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use batidoc_core::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} already exists: {id}")]
    Duplicate { entity: String, id: String },

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Rejected by the core (validation or invariant).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Input document could not be parsed.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ServiceError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Machine-readable category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Core(CoreError::Validation(_)) | ServiceError::InvalidDocument(_) => {
                ErrorCode::ValidationError
            }
            ServiceError::Core(CoreError::SectionNotFound(_))
            | ServiceError::Core(CoreError::RetentionNotFound { .. }) => ErrorCode::NotFound,
            ServiceError::Core(_) | ServiceError::Duplicate { .. } => ErrorCode::InvariantViolation,
            ServiceError::InvalidConfig(_) | ServiceError::ConfigLoadFailed(_) => {
                ErrorCode::ConfigError
            }
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<batidoc_core::ValidationError> for ServiceError {
    fn from(err: batidoc_core::ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::InvalidDocument(err.to_string())
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Error codes for callers building user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Document, section or guarantee does not exist
    NotFound,

    /// Caller input rejected (negative amount, bad rate, missing price)
    ValidationError,

    /// Operation would break an invariant (over-release, second guarantee)
    InvariantViolation,

    /// Configuration file or environment is invalid
    ConfigError,

    /// Internal error
    Internal,
}

/// What a caller receives when an operation fails.
///
/// ```json
/// {
///   "code": "INVARIANT_VIOLATION",
///   "message": "Release of 0,01 € on guarantee ... exceeds remaining 0,00 €"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        ErrorBody {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
