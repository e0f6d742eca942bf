//! # Totals Aggregator
//!
//! Computes HT / TVA / TTC for a document, grouped by effective VAT rate.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for section, for item (billable):                                      │
//! │      group[eff(item.rate)]     += item.qty × item.price      (exact)    │
//! │      for material (billable):                                           │
//! │          group[eff(mat.rate)]  += mat.qty × mat.price        (exact)    │
//! │                                                                         │
//! │  eff(rate) = 0 under autoliquidation, else the stored rate              │
//! │                                                                         │
//! │  totalHT  = round(Σ all exact)                                          │
//! │  per group:  TVA = round(Σ exact × rate)    ◄── once per rate,          │
//! │                                                 not per line            │
//! │              HT  = apportioned share of totalHT                         │
//! │  per section: subTotal, materialsTotal = apportioned shares of totalHT  │
//! │  totalTVA = Σ group TVA                                                 │
//! │  totalTTC = totalHT + totalTVA                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every displayed HT figure is rounded once, and the figures always add
//! up: `Σ breakdown HT == totalHT` and `Σ (subTotal + materialsTotal) ==
//! totalHT`. Each share is the floor or the ceiling of its exact amount
//! (see [`apportion`]).
//!
//! The result is a pure function of the tree and the tax mode. An
//! attached retention guarantee only adds a display line; it never feeds
//! back into `total_ht`.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{apportion, Money};
use crate::retention::{RetentionGuarantee, RetentionStatus};
use crate::tree::Document;
use crate::types::Rate;

// =============================================================================
// Output Types
// =============================================================================

/// One VAT line of the breakdown ("TVA 20 % : 340,00 €").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RateBreakdown {
    pub rate: Rate,
    pub total_ht: Money,
    pub total_tva: Money,
}

/// Retention figures for display next to the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RetentionLine {
    pub guarantee_id: String,
    pub rate: Rate,
    pub amount: Money,
    pub released: Money,
    pub remaining: Money,
    pub status: RetentionStatus,
    /// `total_ht − amount`, present only while the guarantee is not released.
    pub total_ht_after_retention: Option<Money>,
}

impl RetentionLine {
    fn new(guarantee: &RetentionGuarantee, total_ht: Money) -> Self {
        let status = guarantee.status();
        RetentionLine {
            guarantee_id: guarantee.id.clone(),
            rate: guarantee.rate,
            amount: guarantee.amount(),
            released: guarantee.released_amount(),
            remaining: guarantee.remaining_amount(),
            status,
            total_ht_after_retention: (status != RetentionStatus::Released)
                .then(|| total_ht - guarantee.amount()),
        }
    }
}

/// Displayed figures of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SectionTotals {
    pub section_id: String,
    /// Billable line items only.
    pub sub_total: Money,
    pub materials_total: Money,
}

/// Everything the rendering layer needs; it must not recompute any of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentTotals {
    pub total_ht: Money,
    pub total_tva: Money,
    pub total_ttc: Money,
    /// Ordered by descending rate.
    pub breakdown: Vec<RateBreakdown>,
    /// In section order.
    pub sections: Vec<SectionTotals>,
    pub retention: Option<RetentionLine>,
}

/// Totals as a persistence collaborator may have stored them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PersistedTotals {
    pub total_ht: Money,
    pub total_tva: Money,
    pub total_ttc: Money,
}

impl From<&DocumentTotals> for PersistedTotals {
    fn from(totals: &DocumentTotals) -> Self {
        PersistedTotals {
            total_ht: totals.total_ht,
            total_tva: totals.total_tva,
            total_ttc: totals.total_ttc,
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

fn overflow(context: &str) -> CoreError {
    CoreError::AmountOverflow {
        context: context.to_string(),
    }
}

/// Exact HT grouped by effective rate, highest rate first.
fn group_by_rate(document: &Document) -> CoreResult<BTreeMap<Reverse<Rate>, Decimal>> {
    let mut groups: BTreeMap<Reverse<Rate>, Decimal> = BTreeMap::new();
    let mut add = |rate: Rate, ht: Decimal| -> CoreResult<()> {
        if ht.is_zero() {
            return Ok(());
        }
        let slot = groups
            .entry(Reverse(document.tax_mode.effective_rate(rate)))
            .or_insert(Decimal::ZERO);
        *slot = slot.checked_add(ht).ok_or_else(|| overflow("rate group HT"))?;
        Ok(())
    };

    for item in document.line_items().filter(|i| i.billable) {
        add(item.tax_rate, item.billed_ht()?)?;
        for material in item.materials.iter().filter(|m| m.billable) {
            add(material.tax_rate, material.billed_ht()?)?;
        }
    }

    Ok(groups)
}

/// Computes the totals of a document.
///
/// ## Example
/// ```rust
/// use batidoc_core::{compute_totals, Document, LineItem, Money, Section};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let mut doc = Document::new_quote("client", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
/// let item = LineItem::new("Peinture", Decimal::from(2), Decimal::from(100)).unwrap();
/// doc.add_section(Section::new("Séjour").unwrap().with_item(item)).unwrap();
///
/// let totals = compute_totals(&doc).unwrap();
/// assert_eq!(totals.total_ht, Money::from_cents(20_000));
/// assert_eq!(totals.total_tva, Money::from_cents(4_000));
/// assert_eq!(totals.total_ttc, Money::from_cents(24_000));
/// ```
pub fn compute_totals(document: &Document) -> CoreResult<DocumentTotals> {
    let groups: Vec<(Rate, Decimal)> = group_by_rate(document)?
        .into_iter()
        .map(|(Reverse(rate), ht)| (rate, ht))
        .collect();

    let exact_rows: Vec<Decimal> = groups.iter().map(|(_, ht)| *ht).collect();
    let (total_ht, row_hts) = apportion(&exact_rows)?;

    let mut breakdown = Vec::with_capacity(groups.len());
    for ((rate, ht), total_ht) in groups.into_iter().zip(row_hts) {
        breakdown.push(RateBreakdown {
            rate,
            total_ht,
            total_tva: Money::round_half_up(rate.of(ht)?)?,
        });
    }

    let total_tva = Money::checked_sum(breakdown.iter().map(|b| b.total_tva))
        .ok_or_else(|| overflow("total TVA"))?;
    let total_ttc = total_ht
        .checked_add(total_tva)
        .ok_or_else(|| overflow("total TTC"))?;

    let retention = document
        .retention()
        .map(|guarantee| RetentionLine::new(guarantee, total_ht));

    Ok(DocumentTotals {
        total_ht,
        total_tva,
        total_ttc,
        breakdown,
        sections: section_totals(document)?,
        retention,
    })
}

/// Per-section shares of the document HT, as `[items, materials]` pairs.
fn section_totals(document: &Document) -> CoreResult<Vec<SectionTotals>> {
    let mut exact = Vec::with_capacity(document.sections.len() * 2);
    for section in &document.sections {
        exact.push(section.items_ht()?);
        exact.push(section.materials_ht()?);
    }
    let (_, shares) = apportion(&exact)?;

    Ok(document
        .sections
        .iter()
        .zip(shares.chunks_exact(2))
        .map(|(section, pair)| SectionTotals {
            section_id: section.id.clone(),
            sub_total: pair[0],
            materials_total: pair[1],
        })
        .collect())
}

/// Checks a section's persisted `subTotal` and `materialsTotal` against
/// the figures [`compute_totals`] displays.
pub fn verify_section_cache(
    document: &Document,
    section_id: &str,
    sub_total: Money,
    materials_total: Money,
) -> CoreResult<()> {
    let totals = compute_totals(document)?;
    let computed = totals
        .sections
        .iter()
        .find(|s| s.section_id == section_id)
        .ok_or_else(|| CoreError::SectionNotFound(section_id.to_string()))?;

    let fields = [
        ("subTotal", sub_total, computed.sub_total),
        ("materialsTotal", materials_total, computed.materials_total),
    ];
    for (field, persisted, computed) in fields {
        if persisted != computed {
            return Err(CoreError::StaleAggregate {
                entity: format!("section {}", section_id),
                field: field.to_string(),
                persisted,
                computed,
            });
        }
    }
    Ok(())
}

/// Checks stored totals against a live recomputation.
pub fn verify_persisted_totals(document: &Document, persisted: &PersistedTotals) -> CoreResult<()> {
    let computed = PersistedTotals::from(&compute_totals(document)?);
    let fields = [
        ("totalHT", persisted.total_ht, computed.total_ht),
        ("totalTVA", persisted.total_tva, computed.total_tva),
        ("totalTTC", persisted.total_ttc, computed.total_ttc),
    ];
    for (field, persisted, computed) in fields {
        if persisted != computed {
            return Err(CoreError::StaleAggregate {
                entity: format!("document {}", document.id),
                field: field.to_string(),
                persisted,
                computed,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::attach_retention;
    use crate::tree::{LineItem, Material, Section};
    use crate::types::TaxMode;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 14).unwrap()
    }

    fn line(ht: Decimal, rate_bps: u32) -> LineItem {
        LineItem::new("Prestation", dec!(1), ht)
            .unwrap()
            .with_tax_rate(Rate::from_bps(rate_bps))
    }

    fn doc_with(items: Vec<LineItem>) -> Document {
        let mut doc = Document::new_quote("client-1", day());
        let mut section = Section::new("Lot").unwrap();
        section.items = items;
        doc.add_section(section).unwrap();
        doc
    }

    #[test]
    fn test_empty_document_is_zero() {
        let doc = Document::new_quote("client-1", day());
        let totals = compute_totals(&doc).unwrap();
        assert_eq!(totals.total_ht, Money::zero());
        assert_eq!(totals.total_tva, Money::zero());
        assert_eq!(totals.total_ttc, Money::zero());
        assert!(totals.breakdown.is_empty());
        assert!(totals.sections.is_empty());
        assert!(totals.retention.is_none());
    }

    #[test]
    fn test_vat_applied_once_per_rate() {
        // Three lines of 0,05 € at 10 %: per-line TVA would round 0,005 → 0,01 three times.
        let doc = doc_with(vec![line(dec!(0.05), 1000), line(dec!(0.05), 1000), line(dec!(0.05), 1000)]);
        let totals = compute_totals(&doc).unwrap();
        assert_eq!(totals.total_ht, Money::from_cents(15));
        // 0,15 × 10 % = 0,015 → 0,02
        assert_eq!(totals.total_tva, Money::from_cents(2));
    }

    #[test]
    fn test_breakdown_ordered_by_descending_rate() {
        let doc = doc_with(vec![line(dec!(10), 550), line(dec!(10), 2000), line(dec!(10), 1000)]);
        let totals = compute_totals(&doc).unwrap();
        let rates: Vec<u32> = totals.breakdown.iter().map(|b| b.rate.bps()).collect();
        assert_eq!(rates, vec![2000, 1000, 550]);
    }

    #[test]
    fn test_materials_grouped_at_their_own_rate() {
        let item = line(dec!(100), 1000)
            .with_material(Material::new("Plaque", dec!(2), dec!(25)).unwrap());
        let totals = compute_totals(&doc_with(vec![item])).unwrap();
        assert_eq!(
            totals.breakdown,
            vec![
                RateBreakdown {
                    rate: Rate::from_bps(2000),
                    total_ht: Money::from_cents(5_000),
                    total_tva: Money::from_cents(1_000),
                },
                RateBreakdown {
                    rate: Rate::from_bps(1000),
                    total_ht: Money::from_cents(10_000),
                    total_tva: Money::from_cents(1_000),
                },
            ]
        );
    }

    #[test]
    fn test_autoliquidation_single_zero_group() {
        let mut doc = doc_with(vec![line(dec!(100), 2000), line(dec!(50), 1000)]);
        doc.tax_mode = TaxMode::Autoliquidation;
        let totals = compute_totals(&doc).unwrap();
        assert_eq!(totals.total_tva, Money::zero());
        assert_eq!(totals.total_ttc, totals.total_ht);
        assert_eq!(totals.breakdown.len(), 1);
        assert_eq!(totals.breakdown[0].rate, Rate::zero());
        assert_eq!(totals.breakdown[0].total_ht, Money::from_cents(15_000));
    }

    #[test]
    fn test_fractional_quantities_rounded_once() {
        // 3 × 33,333 € = 99,999 € → 100,00 €
        let item = LineItem::new("Enduit", dec!(3), dec!(33.333)).unwrap();
        let totals = compute_totals(&doc_with(vec![item])).unwrap();
        assert_eq!(totals.total_ht, Money::from_cents(10_000));
        assert_eq!(totals.total_tva, Money::from_cents(2_000));
    }

    #[test]
    fn test_rounded_rows_and_sections_add_up() {
        // 0,5 × 10,01 = 5,005 twice: rounding each row alone would show 5,01 + 5,01.
        let mut doc = Document::new_quote("client-1", day());
        doc.add_section(
            Section::new("Lot A")
                .unwrap()
                .with_item(LineItem::new("Reprise", dec!(0.5), dec!(10.01)).unwrap()),
        )
        .unwrap();
        doc.add_section(Section::new("Lot B").unwrap().with_item(
            LineItem::new("Reprise", dec!(0.5), dec!(10.01))
                .unwrap()
                .with_tax_rate(Rate::from_bps(1000)),
        ))
        .unwrap();

        let totals = compute_totals(&doc).unwrap();
        assert_eq!(totals.total_ht, Money::from_cents(1_001));

        let rows: Vec<i64> = totals.breakdown.iter().map(|b| b.total_ht.cents()).collect();
        assert_eq!(rows, vec![501, 500]);
        let sections: Vec<i64> = totals.sections.iter().map(|s| s.sub_total.cents()).collect();
        assert_eq!(sections, vec![501, 500]);

        // TVA still rounds each group from its exact HT: 1,001 → 1,00 and 0,5005 → 0,50.
        assert_eq!(totals.breakdown[0].total_tva, Money::from_cents(100));
        assert_eq!(totals.breakdown[1].total_tva, Money::from_cents(50));
        assert_eq!(totals.total_tva, Money::from_cents(150));
        assert_eq!(totals.total_ttc, Money::from_cents(1_151));
    }

    #[test]
    fn test_section_figures_split_items_and_materials() {
        let item = line(dec!(100), 1000)
            .with_material(Material::new("Plaque", dec!(2), dec!(25)).unwrap());
        let doc = doc_with(vec![item]);
        let totals = compute_totals(&doc).unwrap();

        assert_eq!(
            totals.sections,
            vec![SectionTotals {
                section_id: doc.sections[0].id.clone(),
                sub_total: Money::from_cents(10_000),
                materials_total: Money::from_cents(5_000),
            }]
        );
    }

    #[test]
    fn test_verify_section_cache() {
        let doc = doc_with(vec![line(dec!(475), 2000)
            .with_material(Material::new("Colle", dec!(3), dec!(14.9)).unwrap())]);
        let section_id = doc.sections[0].id.clone();

        assert!(verify_section_cache(
            &doc,
            &section_id,
            Money::from_cents(47_500),
            Money::from_cents(4_470)
        )
        .is_ok());

        let err = verify_section_cache(
            &doc,
            &section_id,
            Money::from_cents(51_970),
            Money::from_cents(4_470),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::StaleAggregate { ref field, .. } if field == "subTotal"));

        let err = verify_section_cache(&doc, "missing", Money::zero(), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::SectionNotFound(_)));
    }

    #[test]
    fn test_retention_line_does_not_touch_total_ht() {
        let mut invoice = Document::new_invoice("client-1", day());
        invoice
            .add_section(Section::new("Lot").unwrap().with_item(line(dec!(1000), 2000)))
            .unwrap();
        let before = compute_totals(&invoice).unwrap();

        attach_retention(&mut invoice, Rate::from_bps(500), None).unwrap();
        let after = compute_totals(&invoice).unwrap();

        assert_eq!(after.total_ht, before.total_ht);
        assert_eq!(after.total_ttc, before.total_ttc);
        let line = after.retention.unwrap();
        assert_eq!(line.amount, Money::from_cents(5_000));
        assert_eq!(line.status, RetentionStatus::Pending);
        assert_eq!(line.total_ht_after_retention, Some(Money::from_cents(95_000)));
    }

    #[test]
    fn test_released_retention_has_no_after_retention_figure() {
        let mut invoice = Document::new_invoice("client-1", day());
        invoice
            .add_section(Section::new("Lot").unwrap().with_item(line(dec!(1000), 2000)))
            .unwrap();
        attach_retention(&mut invoice, Rate::from_bps(500), None).unwrap();
        crate::retention::record_release(&mut invoice, Money::from_cents(5_000), day(), None)
            .unwrap();

        let totals = compute_totals(&invoice).unwrap();
        let line = totals.retention.unwrap();
        assert_eq!(line.status, RetentionStatus::Released);
        assert_eq!(line.remaining, Money::zero());
        assert_eq!(line.total_ht_after_retention, None);
        assert_eq!(totals.total_ht, Money::from_cents(100_000));
    }

    #[test]
    fn test_verify_persisted_totals() {
        let doc = doc_with(vec![line(dec!(100), 2000)]);
        let good = PersistedTotals {
            total_ht: Money::from_cents(10_000),
            total_tva: Money::from_cents(2_000),
            total_ttc: Money::from_cents(12_000),
        };
        assert!(verify_persisted_totals(&doc, &good).is_ok());

        let stale = PersistedTotals {
            total_tva: Money::from_cents(1_000),
            ..good
        };
        let err = verify_persisted_totals(&doc, &stale).unwrap_err();
        assert!(matches!(err, CoreError::StaleAggregate { ref field, .. } if field == "totalTVA"));
    }
}
