//! # batidoc-core: Financial Engine for Quotes and Invoices
//!
//! This crate holds the money logic of Batidoc: totals for the
//! sections → line items → materials tree, the quote → invoice projection,
//! the direct/sectioned mode switch, and the retention guarantee
//! lifecycle. Everything here is a pure function of its input.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Batidoc Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Forms / PDF rendering / numbering (outside)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ documents, totals                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 batidoc-service (orchestration)                 │   │
//! │  │    repository, reference allocator, config, logging, CLI        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ batidoc-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │  │  money  │ │  tree   │ │  totals  │ │projector│ │retention │ │   │
//! │  │  │  Money  │ │Document │ │ per-rate │ │ quote → │ │ releases │ │   │
//! │  │  │  Rate   │ │ Section │ │ HT/TVA/  │ │ invoice │ │  status  │ │   │
//! │  │  └─────────┘ └─────────┘ │   TTC    │ └─────────┘ └──────────┘ │   │
//! │  │  ┌─────────┐ ┌─────────┐ └──────────┘ ┌─────────┐              │   │
//! │  │  │  mode   │ │normalize│              │validation│              │   │
//! │  │  └─────────┘ └─────────┘              └─────────┘              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOGGING • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` in integer cents and the single rounding point
//! - [`types`] - `Rate`, tax mode, document mode, statuses
//! - [`tree`] - Document / Section / LineItem / Material and tree edits
//! - [`totals`] - HT / TVA / TTC with the per-rate and per-section breakdowns
//! - [`projector`] - accepted quote → draft invoice
//! - [`mode`] - direct ↔ sectioned reshaping
//! - [`retention`] - retention guarantee and its releases
//! - [`normalize`] - loosely-typed input → typed tree
//! - [`validation`] - input rules
//! - [`error`] - domain error types
//!
//! ## Design Principles
//!
//! 1. **Exact until displayed**: quantities and prices are `Decimal`; every
//!    displayed figure is rounded once, half-up, into `Money`, and the
//!    rounded parts always add up to the rounded total
//! 2. **Derived, never cached**: totals and retention status are recomputed
//!    on every read
//! 3. **All-or-nothing**: a failed operation leaves its input untouched
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use batidoc_core::{compute_totals, Document, LineItem, Material, Section};
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let mut quote = Document::new_quote("client-1", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
//! let item = LineItem::new("Pose parquet", Decimal::from(2), Decimal::from(100))
//!     .unwrap()
//!     .with_material(Material::new("Sous-couche", Decimal::ONE, Decimal::from(50)).unwrap());
//! quote.add_section(Section::new("Séjour").unwrap().with_item(item)).unwrap();
//!
//! let totals = compute_totals(&quote).unwrap();
//! assert_eq!(totals.total_ht.cents(), 25_000);
//! assert_eq!(totals.total_tva.cents(), 5_000);
//! assert_eq!(totals.total_ttc.cents(), 30_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod mode;
pub mod money;
pub mod normalize;
pub mod projector;
pub mod retention;
pub mod totals;
pub mod tree;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use mode::{switch_mode, to_direct, to_sectioned};
pub use money::Money;
pub use normalize::{DocumentInput, NormalizeDefaults};
pub use projector::{invoice_from_quote, project_sections};
pub use retention::{
    attach_retention, record_release, RetentionGuarantee, RetentionRelease, RetentionStatus,
};
pub use totals::{
    compute_totals, verify_persisted_totals, verify_section_cache, DocumentTotals,
    PersistedTotals, RateBreakdown, RetentionLine, SectionTotals,
};
pub use tree::{Document, DocumentKind, InvoiceHeader, LineItem, Material, QuoteHeader, Section};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Unit label used when a line or material carries none.
pub const DEFAULT_UNIT: &str = "u";

/// Name given to the section created when leaving direct mode.
pub const DEFAULT_SECTION_NAME: &str = "Section 1";

/// Maximum quantity on a single line or material.
///
/// ## Business Reason
/// Catches typing slips (1 000 000 m² of tiling) before they reach a
/// signed document.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Maximum unit price in euros.
pub const MAX_UNIT_PRICE: i64 = 10_000_000;

/// Maximum length of a line, material or section name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;
