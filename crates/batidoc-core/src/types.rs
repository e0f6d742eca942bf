//! # Domain Types
//!
//! Small value types and enums shared by the document tree, the totals
//! aggregator and the retention lifecycle.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Rate       │   │    TaxMode      │   │  DocumentMode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Normal         │   │  Sectioned      │       │
//! │  │  2000 = 20 %    │   │  Autoliquidation│   │  Direct         │       │
//! │  │   550 = 5.5 %   │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  QuoteStatus    │   │ InvoiceStatus   │   │ BillingTarget   │       │
//! │  │  Draft ... Expd │   │ Draft ... Cancl │   │ Client / Presc. │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_rate_percent, ValidationResult};

// =============================================================================
// Rate
// =============================================================================

/// A percentage in basis points (1 bps = 0.01 %).
///
/// Used for both VAT rates (20, 10, 5.5, 0) and retention rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a decimal percentage (`5.5` → 550 bps).
    ///
    /// ## Rules
    /// - Must be within [0, 100]
    /// - At most two decimal places
    ///
    /// ```rust
    /// use batidoc_core::types::Rate;
    /// use rust_decimal::Decimal;
    ///
    /// let rate = Rate::from_percent(Decimal::new(55, 1)).unwrap();
    /// assert_eq!(rate.bps(), 550);
    /// assert!(Rate::from_percent(Decimal::new(101, 0)).is_err());
    /// ```
    pub fn from_percent(percent: Decimal) -> ValidationResult<Self> {
        validate_rate_percent("rate", percent)?;
        let bps = (percent * Decimal::ONE_HUNDRED).normalize();
        if !bps.fract().is_zero() {
            return Err(ValidationError::InvalidFormat {
                field: "rate".to_string(),
                reason: format!("{} has more than two decimal places", percent),
            });
        }
        let bps = bps.to_u32().ok_or_else(|| ValidationError::InvalidFormat {
            field: "rate".to_string(),
            reason: format!("{} is not representable", percent),
        })?;
        Ok(Rate(bps))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a decimal percentage (`550` → `5.50`).
    #[inline]
    pub fn percent(&self) -> Decimal {
        Decimal::new(self.0 as i64, 2)
    }

    /// Applies the rate to an unrounded amount, without rounding.
    pub fn of(&self, amount: Decimal) -> CoreResult<Decimal> {
        amount
            .checked_mul(Decimal::from(self.0))
            .and_then(|v| v.checked_div(Decimal::from(10_000u32)))
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("{} of {}", self, amount),
            })
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

/// `20 %`, `5.5 %`, `0 %`.
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} %", self.percent().normalize())
    }
}

/// Standard French VAT rate, applied when a line carries no rate.
pub const DEFAULT_TAX_RATE: Rate = Rate::from_bps(2000);

// =============================================================================
// Tax Mode
// =============================================================================

/// How VAT applies to a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Per-line rates apply.
    #[default]
    Normal,
    /// Reverse charge: every effective rate is forced to zero.
    Autoliquidation,
}

impl TaxMode {
    /// The rate actually charged for a line stored at `stored`.
    #[inline]
    pub fn effective_rate(&self, stored: Rate) -> Rate {
        match self {
            TaxMode::Normal => stored,
            TaxMode::Autoliquidation => Rate::zero(),
        }
    }
}

// =============================================================================
// Document Mode
// =============================================================================

/// Editing convention for the section layer.
///
/// Storage is always a list of sections; `Direct` means exactly one
/// unnamed section whose header is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMode {
    #[default]
    Sectioned,
    Direct,
}

// =============================================================================
// Statuses
// =============================================================================

/// Lifecycle of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Checks whether a quote may move from `self` to `next`.
    ///
    /// ```text
    /// Draft ──► Sent ──► Accepted
    ///   │         ├────► Rejected
    ///   │         └────► Expired
    ///   └──────────────► Accepted (signed on site)
    /// ```
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        use QuoteStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Draft, Accepted) | (Sent, Accepted) | (Sent, Rejected) | (Sent, Expired)
        )
    }
}

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Checks whether an invoice may move from `self` to `next`.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Draft, Cancelled) | (Sent, Paid) | (Sent, Cancelled)
        )
    }
}

/// Who the document is addressed to. Resolved upstream, only carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillingTarget {
    #[default]
    Client,
    Prescriber,
}

// =============================================================================
// Unit Tests
// =============================================================================
