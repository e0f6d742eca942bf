//! # Error Types
//!
//! Domain-specific error types for batidoc-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  batidoc-core errors (this file)                                       │
//! │  ├── ValidationError  - Caller input rejected before computation       │
//! │  └── CoreError        - Invariant violations (+ wraps validation)      │
//! │                                                                         │
//! │  batidoc-service errors (separate crate)                               │
//! │  └── ServiceError     - Lookup, config and collaborator failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (guarantee ID, section ID, amounts)
//! 3. Errors are enum variants, never String
//! 4. A failed operation never leaves a partially mutated tree behind

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Invariant violations and contract failures.
///
/// These are programmer/caller-contract problems. They are reported with
/// enough detail (which guarantee, which section) for the caller to decide
/// on user-facing messaging.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A release would push the released sum past the frozen amount.
    ///
    /// ## Example
    /// ```text
    /// amount = 50.00, released = 50.00
    ///      │
    ///      ▼
    /// add_release(0.01)
    ///      │
    ///      ▼
    /// rejected, release list unchanged
    /// ```
    #[error("Release of {requested} on guarantee {guarantee_id} exceeds remaining {remaining}")]
    OverRelease {
        guarantee_id: String,
        requested: Money,
        remaining: Money,
    },

    /// The guarantee is fully released and accepts no further releases.
    #[error("Retention guarantee {guarantee_id} is already fully released")]
    RetentionAlreadyReleased { guarantee_id: String },

    /// A stored release list adds up to more than the frozen amount.
    #[error("Retention guarantee {guarantee_id} has {released} released against {amount}")]
    ReleasedExceedsAmount {
        guarantee_id: String,
        released: Money,
        amount: Money,
    },

    /// The invoice carries no retention guarantee.
    #[error("Invoice {document_id} has no retention guarantee")]
    RetentionNotFound { document_id: String },

    /// The invoice already carries a retention guarantee.
    #[error("Invoice {document_id} already has retention guarantee {guarantee_id}")]
    RetentionAlreadyExists {
        document_id: String,
        guarantee_id: String,
    },

    /// A line item claims a section it is not contained in.
    #[error("Line item {item_id} references section {claimed_section_id} but is contained in {section_id}")]
    ItemSectionMismatch {
        item_id: String,
        claimed_section_id: String,
        section_id: String,
    },

    /// A line item is not present in the given section.
    #[error("Line item {item_id} is not in section {section_id}")]
    ItemNotInSection { item_id: String, section_id: String },

    /// Section not found in the document.
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    /// Material not found under the given line item.
    #[error("Material {material_id} not found under line item {item_id}")]
    MaterialNotFound {
        item_id: String,
        material_id: String,
    },

    /// The operation requires another document kind.
    #[error("Document {document_id} is a {actual}, expected a {expected}")]
    WrongDocumentKind {
        document_id: String,
        expected: String,
        actual: String,
    },

    /// Document is not in a state that allows the requested operation.
    #[error("Document {document_id} is {current_status}, cannot {operation}")]
    InvalidDocumentStatus {
        document_id: String,
        current_status: String,
        operation: String,
    },

    /// A direct-mode document must hold exactly one section.
    #[error("Direct-mode document {document_id} holds {sections} sections, expected exactly 1")]
    InvalidDirectLayout { document_id: String, sections: usize },

    /// Sections cannot be added or removed while a document is in direct mode.
    #[error("Direct-mode document {document_id} keeps its single section, cannot {operation}")]
    DirectModeSectionsLocked {
        document_id: String,
        operation: String,
    },

    /// A persisted aggregate disagrees with recomputation from children.
    #[error("Stale {field} on {entity}: persisted {persisted}, computed {computed}")]
    StaleAggregate {
        entity: String,
        field: String,
        persisted: Money,
        computed: Money,
    },

    /// Arithmetic left the representable range.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a value reaches the aggregator or the retention
/// lifecycle. Inputs are rejected, never clamped.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is below zero.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, too many decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
