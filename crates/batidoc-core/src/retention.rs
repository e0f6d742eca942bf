//! # Retention Guarantee
//!
//! Withheld percentage of an invoice's HT total ("retenue de garantie"),
//! released in one or more tranches.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  attach_retention(invoice, 5 %)    amount = round(1 000,00 × 5 %)       │
//! │        │                                  = 50,00 €  (frozen)           │
//! │        ▼                                                                │
//! │   ┌─────────┐  add_release(30)  ┌─────────┐  add_release(20)  ┌───────┐ │
//! │   │ PENDING │ ────────────────► │ PARTIAL │ ────────────────► │RELEASD│ │
//! │   └─────────┘                   └─────────┘                   └───────┘ │
//! │     Σ = 0                       0 < Σ < amount                Σ ≥ amount│
//! │                                                                         │
//! │  Status is derived from the release list on every read.                 │
//! │  RELEASED is terminal: further releases are rejected.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent `add_release` calls on one guarantee must be serialized by
//! the caller: the over-release check reads the list and appends to it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::totals::compute_totals;
use crate::tree::{generate_id, Document};
use crate::types::Rate;
use crate::validation::{validate_rate_bps, validate_release_amount};

// =============================================================================
// Status
// =============================================================================

/// Derived state of a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionStatus {
    /// Nothing released yet.
    Pending,
    /// Some, but not all, of the amount released.
    Partial,
    /// Released sum reached the frozen amount.
    Released,
}

// =============================================================================
// Release
// =============================================================================

/// One tranche paid back to the contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RetentionRelease {
    pub id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub release_date: NaiveDate,
    pub notes: Option<String>,
}

// =============================================================================
// Guarantee
// =============================================================================

/// Retention guarantee attached to one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RetentionGuarantee {
    pub id: String,
    pub rate: Rate,
    /// Frozen at creation from the pre-retention HT total.
    amount: Money,
    #[ts(as = "Option<String>")]
    pub release_date_target: Option<NaiveDate>,
    pub notes: Option<String>,
    releases: Vec<RetentionRelease>,
}

impl RetentionGuarantee {
    /// Creates a guarantee withholding `rate` of `base_ht`.
    ///
    /// `amount = round_half_up(base_ht × rate / 100)`, frozen from here on.
    ///
    /// ```rust
    /// use batidoc_core::money::Money;
    /// use batidoc_core::retention::{RetentionGuarantee, RetentionStatus};
    /// use batidoc_core::types::Rate;
    ///
    /// let g = RetentionGuarantee::create(Money::from_cents(100_000), Rate::from_bps(500), None).unwrap();
    /// assert_eq!(g.amount().cents(), 5_000);
    /// assert_eq!(g.status(), RetentionStatus::Pending);
    /// ```
    pub fn create(
        base_ht: Money,
        rate: Rate,
        release_date_target: Option<NaiveDate>,
    ) -> CoreResult<Self> {
        validate_rate_bps("retention rate", rate.bps())?;
        if base_ht.is_negative() {
            return Err(ValidationError::Negative {
                field: "retention base".to_string(),
                value: base_ht.to_string(),
            }
            .into());
        }

        Ok(RetentionGuarantee {
            id: generate_id(),
            rate,
            amount: base_ht.apply_rate(rate),
            release_date_target,
            notes: None,
            releases: Vec::new(),
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The frozen withheld amount.
    #[inline]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Releases in the order they were recorded.
    pub fn releases(&self) -> &[RetentionRelease] {
        &self.releases
    }

    /// Sum of all releases.
    ///
    /// Clamped at `i64::MAX` for a record that never went through
    /// [`validate`](Self::validate); a valid guarantee never gets near it.
    pub fn released_amount(&self) -> Money {
        self.releases
            .iter()
            .fold(Money::zero(), |acc, r| acc.saturating_add(r.amount))
    }

    /// `amount − Σ releases`.
    pub fn remaining_amount(&self) -> Money {
        self.amount
            .saturating_sub(self.released_amount())
            .max(Money::zero())
    }

    /// Status derived from the release list.
    ///
    /// A zero amount has nothing to withhold and reads as `Released`.
    pub fn status(&self) -> RetentionStatus {
        let released = self.released_amount();
        if released >= self.amount {
            RetentionStatus::Released
        } else if released.is_zero() {
            RetentionStatus::Pending
        } else {
            RetentionStatus::Partial
        }
    }

    /// Records a release.
    ///
    /// ## Failure cases (list unchanged)
    /// - `amount ≤ 0` → [`CoreError::Validation`]
    /// - already RELEASED → [`CoreError::RetentionAlreadyReleased`]
    /// - `released + amount > frozen amount` → [`CoreError::OverRelease`]
    pub fn add_release(
        &mut self,
        amount: Money,
        release_date: NaiveDate,
        notes: Option<String>,
    ) -> CoreResult<RetentionRelease> {
        validate_release_amount(amount)?;

        if self.status() == RetentionStatus::Released {
            return Err(CoreError::RetentionAlreadyReleased {
                guarantee_id: self.id.clone(),
            });
        }

        let remaining = self.remaining_amount();
        if amount > remaining {
            return Err(CoreError::OverRelease {
                guarantee_id: self.id.clone(),
                requested: amount,
                remaining,
            });
        }

        let release = RetentionRelease {
            id: generate_id(),
            amount,
            release_date,
            notes,
        };
        self.releases.push(release.clone());
        Ok(release)
    }

    /// True while money is still withheld past the target date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status() != RetentionStatus::Released
            && self.release_date_target.is_some_and(|target| target < today)
    }

    /// Checks a stored guarantee: valid rate, positive releases, no
    /// over-release.
    pub fn validate(&self) -> CoreResult<()> {
        validate_rate_bps("retention rate", self.rate.bps())?;
        for release in &self.releases {
            validate_release_amount(release.amount)?;
        }
        let released = Money::checked_sum(self.releases.iter().map(|r| r.amount)).ok_or_else(|| {
            CoreError::AmountOverflow {
                context: format!("releases of guarantee {}", self.id),
            }
        })?;
        if released > self.amount {
            return Err(CoreError::ReleasedExceedsAmount {
                guarantee_id: self.id.clone(),
                released,
                amount: self.amount,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Attaching to an invoice
// =============================================================================

/// Creates the invoice's retention guarantee from its current HT total.
///
/// Rejected on quotes and on invoices that already carry one; the invoice
/// is left untouched on failure.
pub fn attach_retention(
    invoice: &mut Document,
    rate: Rate,
    release_date_target: Option<NaiveDate>,
) -> CoreResult<&RetentionGuarantee> {
    if let Some(existing) = invoice.invoice_header()?.retention.as_ref() {
        return Err(CoreError::RetentionAlreadyExists {
            document_id: invoice.id.clone(),
            guarantee_id: existing.id.clone(),
        });
    }

    let base_ht = compute_totals(invoice)?.total_ht;
    let guarantee = RetentionGuarantee::create(base_ht, rate, release_date_target)?;

    let header = invoice.invoice_header_mut()?;
    let attached: &RetentionGuarantee = header.retention.insert(guarantee);
    Ok(attached)
}

/// Records a release on the invoice's guarantee.
pub fn record_release(
    invoice: &mut Document,
    amount: Money,
    release_date: NaiveDate,
    notes: Option<String>,
) -> CoreResult<RetentionRelease> {
    let document_id = invoice.id.clone();
    invoice
        .invoice_header_mut()?
        .retention
        .as_mut()
        .ok_or(CoreError::RetentionNotFound { document_id })?
        .add_release(amount, release_date, notes)
}

// =============================================================================
// Unit Tests
// =============================================================================
