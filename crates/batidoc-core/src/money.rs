//! # Money Module
//!
//! Provides the `Money` type for rounded monetary values.
//!
//! ## Rounding Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ONE ROUNDING POINT PER DISPLAYED FIGURE                                │
//! │                                                                         │
//! │  quantity × unit price  ──►  Decimal (unrounded)                        │
//! │  Σ line HT              ──►  Decimal (unrounded)                        │
//! │  total / per-rate HT    ──►  Money::round_half_up  ──►  cents (i64)     │
//! │                                                                         │
//! │  1.255 € → 1,26 €       (midpoint rounds away from zero)                │
//! │  3 × 0.333 € → 1,00 €   (rounded once, not 3 × 0,33 €)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use batidoc_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let unrounded = Decimal::new(1255, 3); // 1.255
//! let rounded = Money::round_half_up(unrounded).unwrap();
//! assert_eq!(rounded.cents(), 126);
//! assert_eq!(rounded.to_string(), "1,26 €");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A rounded monetary value in cents.
///
/// Every figure that is displayed or persisted (totals, per-rate lines,
/// retention amounts, releases) is a `Money`. Intermediate sums stay in
/// [`Decimal`] until they are rounded through [`Money::round_half_up`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// ```rust
    /// use batidoc_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(25_000).to_string(), "250,00 €");
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds an exact decimal amount to cents, midpoint away from zero.
    ///
    /// This is the only place where unrounded amounts become `Money`.
    pub fn round_half_up(amount: Decimal) -> CoreResult<Self> {
        let cents = amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("rounding {}", amount),
            })?;
        Ok(Money(cents))
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Two-decimal view, for feeding a rounded figure back into exact math.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Strictly above zero; release amounts must be.
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a percentage and rounds the result half-up to cents.
    ///
    /// Integer math over i128: `(cents × bps ± 5000) / 10000`, the
    /// ±5000 moving the midpoint away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use batidoc_core::money::Money;
    /// use batidoc_core::types::Rate;
    ///
    /// let base = Money::from_cents(100_000); // 1 000,00 €
    /// let withheld = base.apply_rate(Rate::from_bps(500)); // 5 %
    /// assert_eq!(withheld.cents(), 5_000);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let half = if product < 0 { -5000 } else { 5000 };
        Money(((product + half) / 10000) as i64)
    }

    /// Addition that fails instead of wrapping.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Addition clamped to the `i64` range.
    pub const fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Subtraction clamped to the `i64` range.
    pub const fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Sum that reports overflow instead of wrapping or panicking.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// French display convention: `1 234,50 €` without grouping, `-12,00 €`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{},{:02} €", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Apportioning
// =============================================================================

/// Rounds a set of exact amounts so that the rounded parts add up to the
/// rounded total.
///
/// ```text
///   total  = round_half_up(Σ parts)
///   part_i = floor(part_i) + 1 cent for the parts with the largest
///            sub-cent remainders, until Σ part_i == total
/// ```
///
/// Each part lands on the floor or the ceiling of its exact value; a part
/// with no sub-cent remainder is never adjusted. Ties go to the earlier
/// part. Parts must be non-negative.
///
/// ```rust
/// use batidoc_core::money::{apportion, Money};
/// use rust_decimal::Decimal;
///
/// // 5,005 € + 5,005 €: rounding each gives 10,02 €, the sum rounds to 10,01 €.
/// let half = Decimal::new(5005, 3);
/// let (total, parts) = apportion(&[half, half]).unwrap();
/// assert_eq!(total, Money::from_cents(1001));
/// assert_eq!(parts, vec![Money::from_cents(501), Money::from_cents(500)]);
/// ```
pub fn apportion(parts: &[Decimal]) -> CoreResult<(Money, Vec<Money>)> {
    let overflow = || CoreError::AmountOverflow {
        context: "apportioning rounded parts".to_string(),
    };

    let exact_total = parts
        .iter()
        .try_fold(Decimal::ZERO, |acc, part| acc.checked_add(*part))
        .ok_or_else(overflow)?;
    let total = Money::round_half_up(exact_total)?;

    let mut rounded = Vec::with_capacity(parts.len());
    let mut remainders = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        let floor = part.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);
        rounded.push(Money::round_half_up(floor)?);
        remainders.push((*part - floor, index));
    }

    let assigned = Money::checked_sum(rounded.iter().copied()).ok_or_else(overflow)?;
    let leftover = total.0.checked_sub(assigned.0).ok_or_else(overflow)?;
    // Σ remainders < one cent per part, so leftover never exceeds the part count.
    let leftover = usize::try_from(leftover).map_err(|_| overflow())?;

    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, index) in remainders.iter().take(leftover) {
        rounded[index].0 += 1;
    }

    Ok((total, rounded))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(34000).to_string(), "340,00 €");
        assert_eq!(Money::from_cents(1200).to_string(), "12,00 €");
        assert_eq!(Money::from_cents(-550).to_string(), "-5,50 €");
        assert_eq!(Money::from_cents(-5).to_string(), "-0,05 €");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "1234567,89 €");
        assert_eq!(Money::zero().to_string(), "0,00 €");
    }

    #[test]
    fn test_round_half_up_midpoints() {
        assert_eq!(Money::round_half_up(dec!(1.255)).unwrap().cents(), 126);
        assert_eq!(Money::round_half_up(dec!(1.254)).unwrap().cents(), 125);
        assert_eq!(Money::round_half_up(dec!(0.005)).unwrap().cents(), 1);
        assert_eq!(Money::round_half_up(dec!(2.5)).unwrap().cents(), 250);
        assert_eq!(Money::round_half_up(dec!(-1.255)).unwrap().cents(), -126);
    }

    #[test]
    fn test_single_rounding_beats_per_line_rounding() {
        // Three lines of 0.333 € rounded once.
        let unrounded = dec!(0.333) * dec!(3);
        assert_eq!(Money::round_half_up(unrounded).unwrap().cents(), 100);

        // Rounding each line first would have lost a cent.
        let per_line = Money::round_half_up(dec!(0.333)).unwrap();
        assert_eq!((per_line + per_line + per_line).cents(), 99);
    }

    #[test]
    fn test_round_half_up_overflow() {
        let err = Money::round_half_up(Decimal::MAX).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }

    #[test]
    fn test_apply_rate() {
        let base = Money::from_cents(100_000);
        assert_eq!(base.apply_rate(Rate::from_bps(500)).cents(), 5_000);

        // 10,01 € × 5 % = 0,5005 € → 0,50 €
        assert_eq!(Money::from_cents(1001).apply_rate(Rate::from_bps(500)).cents(), 50);
        // 10,10 € × 5 % = 0,505 € → 0,51 €
        assert_eq!(Money::from_cents(1010).apply_rate(Rate::from_bps(500)).cents(), 51);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
        assert_eq!(a.to_decimal(), dec!(10.00));
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::default().is_zero());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_none());
    }

    #[test]
    fn test_apportion_reconciles_with_total() {
        let (total, parts) = apportion(&[dec!(5.005), dec!(5.005)]).unwrap();
        assert_eq!(total.cents(), 1001);
        assert_eq!(parts, vec![Money::from_cents(501), Money::from_cents(500)]);

        // Largest remainder wins the spare cent: 0,004 + 0,004 + 0,007 = 0,015 → 0,02
        let (total, parts) = apportion(&[dec!(0.004), dec!(0.004), dec!(0.007)]).unwrap();
        assert_eq!(total.cents(), 2);
        assert_eq!(parts, vec![Money::from_cents(1), Money::zero(), Money::from_cents(1)]);
    }

    #[test]
    fn test_apportion_leaves_whole_cents_alone() {
        let (total, parts) = apportion(&[dec!(100), dec!(0), dec!(12.34)]).unwrap();
        assert_eq!(total.cents(), 11_234);
        assert_eq!(parts, vec![Money::from_cents(10_000), Money::zero(), Money::from_cents(1_234)]);

        let (total, parts) = apportion(&[]).unwrap();
        assert!(total.is_zero());
        assert!(parts.is_empty());
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Money::from_cents(10), Money::from_cents(5)];
        assert_eq!(Money::checked_sum(amounts), Some(Money::from_cents(15)));
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(Money::checked_sum([huge, huge]), None);
        assert_eq!(huge.saturating_add(huge).cents(), i64::MAX);
        assert_eq!(Money::from_cents(-5).saturating_sub(Money::from_cents(i64::MAX)).cents(), i64::MIN);
    }
}
