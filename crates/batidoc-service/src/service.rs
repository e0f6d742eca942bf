//! # Document Service
//!
//! Sequences core operations on stored documents.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_quote ──► edit / import ──► accept_quote ──► convert_to_invoice │
//! │                        │                                   │            │
//! │                        ▼                                   ▼            │
//! │                     totals  ◄──────────────────── attach_retention      │
//! │                        │                                   │            │
//! │                        ▼                                   ▼            │
//! │                  render_summary                     record_release      │
//! │                                                            │            │
//! │                                                            ▼            │
//! │                                                   overdue_retentions    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation runs inside [`DocumentRepository::update`]: it either
//! commits completely or leaves the stored document as it was. Reads never
//! write, and totals are never stored.

use batidoc_core::{
    compute_totals, retention, switch_mode, verify_persisted_totals, CoreError, Document,
    DocumentInput, DocumentMode, DocumentTotals, Money, NormalizeDefaults, PersistedTotals,
    QuoteStatus, Rate, RetentionGuarantee, RetentionRelease, Section,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::numbering::{ReferenceAllocator, Series};
use crate::repository::DocumentRepository;

// =============================================================================
// Read Models
// =============================================================================

/// Per-section figures for the PDF layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub id: String,
    pub name: String,
    pub item_count: usize,
    /// Billable line items only.
    pub sub_total: Money,
    pub materials_total: Money,
}

/// Everything a renderer needs; it must not recompute any of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document_id: String,
    pub reference: Option<String>,
    pub kind: &'static str,
    pub issue_date: NaiveDate,
    pub mode: DocumentMode,
    /// Section headers are hidden in direct mode.
    pub show_section_headers: bool,
    pub sections: Vec<SectionSummary>,
    pub totals: DocumentTotals,
}

/// A guarantee still withheld past its target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueRetention {
    pub document_id: String,
    pub reference: Option<String>,
    pub guarantee_id: String,
    pub remaining: Money,
    pub release_date_target: Option<NaiveDate>,
}

// =============================================================================
// Service
// =============================================================================

pub struct DocumentService<R, A> {
    repository: R,
    allocator: A,
    config: EngineConfig,
    defaults: NormalizeDefaults,
}

impl<R, A> DocumentService<R, A>
where
    R: DocumentRepository,
    A: ReferenceAllocator,
{
    pub fn new(repository: R, allocator: A, config: EngineConfig) -> ServiceResult<Self> {
        config.validate()?;
        let defaults = config.normalize_defaults()?;
        Ok(DocumentService {
            repository,
            allocator,
            config,
            defaults,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    fn store_new(&self, mut document: Document) -> ServiceResult<Document> {
        // A rejected insert must not consume a reference.
        if self.repository.contains(&document.id)? {
            return Err(ServiceError::Duplicate {
                entity: "Document".into(),
                id: document.id,
            });
        }
        if document.reference.is_none() {
            let reference = self
                .allocator
                .next_reference(Series::of(&document), document.issue_date)?;
            document.reference = Some(reference);
        }
        self.repository.insert(document.clone())?;
        info!(
            document_id = %document.id,
            reference = ?document.reference,
            kind = document.kind.label(),
            "Document created"
        );
        Ok(document)
    }

    pub fn create_quote(&self, client_id: &str, issue_date: NaiveDate) -> ServiceResult<Document> {
        self.store_new(Document::new_quote(client_id, issue_date))
    }

    pub fn create_invoice(&self, client_id: &str, issue_date: NaiveDate) -> ServiceResult<Document> {
        self.store_new(Document::new_invoice(client_id, issue_date))
    }

    /// Normalizes an incoming document and stores it.
    pub fn import(&self, input: DocumentInput) -> ServiceResult<Document> {
        let document = input.into_document(&self.defaults)?;
        debug!(document_id = %document.id, sections = document.sections.len(), "Document normalized");
        self.store_new(document)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn get(&self, document_id: &str) -> ServiceResult<Document> {
        self.repository.get(document_id)
    }

    pub fn totals(&self, document_id: &str) -> ServiceResult<DocumentTotals> {
        let document = self.repository.get(document_id)?;
        Ok(compute_totals(&document)?)
    }

    /// Checks totals held by another store against a recomputation.
    pub fn check_persisted_totals(
        &self,
        document_id: &str,
        persisted: &PersistedTotals,
    ) -> ServiceResult<()> {
        let document = self.repository.get(document_id)?;
        verify_persisted_totals(&document, persisted).map_err(|e| {
            warn!(document_id = %document_id, error = %e, "Persisted totals are stale");
            ServiceError::from(e)
        })
    }

    pub fn render_summary(&self, document_id: &str) -> ServiceResult<DocumentSummary> {
        let document = self.repository.get(document_id)?;
        let totals = compute_totals(&document)?;
        let sections = document
            .sections
            .iter()
            .zip(&totals.sections)
            .map(|(section, figures)| SectionSummary {
                id: section.id.clone(),
                name: section.name.clone(),
                item_count: section.items.len(),
                sub_total: figures.sub_total,
                materials_total: figures.materials_total,
            })
            .collect();

        Ok(DocumentSummary {
            totals,
            document_id: document.id,
            reference: document.reference,
            kind: document.kind.label(),
            issue_date: document.issue_date,
            mode: document.mode,
            show_section_headers: document.mode == DocumentMode::Sectioned,
            sections,
        })
    }

    /// Invoices whose guarantee is still withheld after its target date.
    pub fn overdue_retentions(&self, today: NaiveDate) -> ServiceResult<Vec<OverdueRetention>> {
        let mut overdue: Vec<OverdueRetention> = self
            .repository
            .list()?
            .into_iter()
            .filter_map(|document| {
                let guarantee = document.retention()?;
                guarantee.is_overdue(today).then(|| OverdueRetention {
                    guarantee_id: guarantee.id.clone(),
                    remaining: guarantee.remaining_amount(),
                    release_date_target: guarantee.release_date_target,
                    reference: document.reference.clone(),
                    document_id: document.id.clone(),
                })
            })
            .collect();
        overdue.sort_by(|a, b| {
            a.release_date_target
                .cmp(&b.release_date_target)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        debug!(count = overdue.len(), %today, "Overdue retentions listed");
        Ok(overdue)
    }

    // -------------------------------------------------------------------------
    // Tree edits
    // -------------------------------------------------------------------------

    /// Applies an arbitrary tree edit, then validates the whole document.
    pub fn edit<F, T>(&self, document_id: &str, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Document) -> Result<T, CoreError>,
    {
        self.repository.update(document_id, |document| {
            let result = f(document)?;
            document.validate()?;
            Ok(result)
        })
    }

    /// Replaces every section of a document.
    pub fn replace_sections(&self, document_id: &str, sections: Vec<Section>) -> ServiceResult<()> {
        let count = sections.len();
        self.edit(document_id, |document| {
            document.sections = sections;
            Ok(())
        })?;
        debug!(document_id = %document_id, sections = count, "Sections replaced");
        Ok(())
    }

    pub fn switch_mode(&self, document_id: &str, target: DocumentMode) -> ServiceResult<()> {
        let section_name = self.config.defaults.section_name.as_str();
        self.edit(document_id, |document| switch_mode(document, target, section_name))?;
        info!(document_id = %document_id, mode = ?target, "Document mode switched");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Quote lifecycle
    // -------------------------------------------------------------------------

    pub fn set_quote_status(&self, quote_id: &str, status: QuoteStatus) -> ServiceResult<()> {
        self.edit(quote_id, |document| document.set_quote_status(status))?;
        info!(document_id = %quote_id, status = ?status, "Quote status changed");
        Ok(())
    }

    pub fn accept_quote(&self, quote_id: &str) -> ServiceResult<()> {
        self.set_quote_status(quote_id, QuoteStatus::Accepted)
    }

    /// Creates and stores a draft invoice from an accepted quote.
    pub fn convert_to_invoice(
        &self,
        quote_id: &str,
        issue_date: NaiveDate,
        copy_items: bool,
    ) -> ServiceResult<Document> {
        let quote = self.repository.get(quote_id)?;
        let invoice = batidoc_core::invoice_from_quote(&quote, issue_date, copy_items)?;
        info!(
            quote_id = %quote_id,
            invoice_id = %invoice.id,
            copy_items,
            "Quote converted to invoice"
        );
        self.store_new(invoice)
    }

    // -------------------------------------------------------------------------
    // Retention
    // -------------------------------------------------------------------------

    pub fn attach_retention(
        &self,
        invoice_id: &str,
        rate: Rate,
        release_date_target: Option<NaiveDate>,
    ) -> ServiceResult<RetentionGuarantee> {
        let guarantee = self.repository.update(invoice_id, |invoice| {
            Ok(retention::attach_retention(invoice, rate, release_date_target)?.clone())
        })?;
        info!(
            document_id = %invoice_id,
            guarantee_id = %guarantee.id,
            rate = %guarantee.rate,
            amount = %guarantee.amount(),
            "Retention guarantee attached"
        );
        Ok(guarantee)
    }

    pub fn record_release(
        &self,
        invoice_id: &str,
        amount: Money,
        release_date: NaiveDate,
        notes: Option<String>,
    ) -> ServiceResult<RetentionRelease> {
        let outcome = self.repository.update(invoice_id, |invoice| {
            Ok(retention::record_release(invoice, amount, release_date, notes)?)
        });

        match outcome {
            Ok(release) => {
                info!(
                    document_id = %invoice_id,
                    release_id = %release.id,
                    amount = %release.amount,
                    "Retention release recorded"
                );
                Ok(release)
            }
            Err(e) => {
                warn!(document_id = %invoice_id, amount = %amount, error = %e, "Retention release rejected");
                Err(e)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::numbering::SequenceAllocator;
    use crate::repository::InMemoryRepository;
    use batidoc_core::{LineItem, Material, RetentionStatus};
    use rust_decimal_macros::dec;

    type Service = DocumentService<InMemoryRepository, SequenceAllocator>;

    fn service() -> Service {
        let config = EngineConfig::default();
        let allocator = SequenceAllocator::new(config.numbering.clone());
        DocumentService::new(InMemoryRepository::new(), allocator, config).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn quote_with_work(service: &Service) -> Document {
        let quote = service.create_quote("client-1", date(3, 1)).unwrap();
        let section = Section::new("Gros œuvre").unwrap().with_item(
            LineItem::new("Maçonnerie", dec!(1), dec!(1000))
                .unwrap()
                .with_material(Material::new("Parpaings", dec!(40), dec!(2.5)).unwrap()),
        );
        service.replace_sections(&quote.id, vec![section]).unwrap();
        service.get(&quote.id).unwrap()
    }

    #[test]
    fn test_create_assigns_references() {
        let service = service();
        let q1 = service.create_quote("client-1", date(3, 1)).unwrap();
        let q2 = service.create_quote("client-1", date(3, 2)).unwrap();
        let inv = service.create_invoice("client-1", date(3, 2)).unwrap();
        assert_eq!(q1.reference.as_deref(), Some("DEV-2026-0001"));
        assert_eq!(q2.reference.as_deref(), Some("DEV-2026-0002"));
        assert_eq!(inv.reference.as_deref(), Some("FAC-2026-0001"));
    }

    #[test]
    fn test_totals_are_read_only() {
        let service = service();
        let quote = quote_with_work(&service);
        let before = service.get(&quote.id).unwrap();

        let totals = service.totals(&quote.id).unwrap();
        assert_eq!(totals.total_ht.cents(), 110_000);
        assert_eq!(service.get(&quote.id).unwrap(), before);
    }

    #[test]
    fn test_failed_edit_leaves_document_untouched() {
        let service = service();
        let quote = quote_with_work(&service);

        let err = service
            .edit(&quote.id, |doc| {
                doc.sections[0].items[0].quantity = dec!(5);
                doc.remove_section("missing").map(|_| ())
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(service.get(&quote.id).unwrap(), quote);
    }

    #[test]
    fn test_edit_rejects_invalid_tree() {
        let service = service();
        let quote = quote_with_work(&service);

        let err = service
            .edit(&quote.id, |doc| {
                doc.sections[0].items[0].unit_price = dec!(-1);
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(service.get(&quote.id).unwrap(), quote);
    }

    #[test]
    fn test_full_quote_to_retention_flow() {
        let service = service();
        let quote = quote_with_work(&service);

        assert!(service.convert_to_invoice(&quote.id, date(4, 1), true).is_err());
        service.accept_quote(&quote.id).unwrap();

        let invoice = service.convert_to_invoice(&quote.id, date(4, 1), true).unwrap();
        assert_eq!(invoice.reference.as_deref(), Some("FAC-2026-0001"));
        assert_eq!(
            service.totals(&invoice.id).unwrap(),
            service.totals(&quote.id).unwrap()
        );

        let guarantee = service
            .attach_retention(&invoice.id, Rate::from_bps(500), Some(date(10, 1)))
            .unwrap();
        assert_eq!(guarantee.amount().cents(), 5_500);

        let err = service
            .attach_retention(&invoice.id, Rate::from_bps(500), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvariantViolation);

        service
            .record_release(&invoice.id, Money::from_cents(2_500), date(7, 1), None)
            .unwrap();
        let err = service
            .record_release(&invoice.id, Money::from_cents(3_001), date(7, 2), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvariantViolation);

        let stored = service.get(&invoice.id).unwrap();
        let g = stored.retention().unwrap();
        assert_eq!(g.releases().len(), 1);
        assert_eq!(g.status(), RetentionStatus::Partial);
    }

    #[test]
    fn test_overdue_retentions() {
        let service = service();
        let quote = quote_with_work(&service);
        service.accept_quote(&quote.id).unwrap();
        let late = service.convert_to_invoice(&quote.id, date(4, 1), true).unwrap();
        let on_time = service.convert_to_invoice(&quote.id, date(4, 2), true).unwrap();

        service
            .attach_retention(&late.id, Rate::from_bps(500), Some(date(5, 1)))
            .unwrap();
        service
            .attach_retention(&on_time.id, Rate::from_bps(500), Some(date(12, 1)))
            .unwrap();

        let overdue = service.overdue_retentions(date(6, 1)).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].document_id, late.id);
        assert_eq!(overdue[0].remaining.cents(), 5_500);

        service
            .record_release(&late.id, Money::from_cents(5_500), date(6, 1), None)
            .unwrap();
        assert!(service.overdue_retentions(date(6, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_switch_mode_and_summary() {
        let service = service();
        let quote = quote_with_work(&service);

        service.switch_mode(&quote.id, DocumentMode::Direct).unwrap();
        let summary = service.render_summary(&quote.id).unwrap();
        assert!(!summary.show_section_headers);
        assert_eq!(summary.sections.len(), 1);
        assert_eq!(summary.sections[0].sub_total.cents(), 100_000);
        assert_eq!(summary.sections[0].materials_total.cents(), 10_000);
        assert_eq!(summary.totals.total_ttc.cents(), 132_000);

        service.switch_mode(&quote.id, DocumentMode::Sectioned).unwrap();
        let doc = service.get(&quote.id).unwrap();
        assert_eq!(doc.sections[0].name, "Section 1");
        assert_eq!(doc.sections[0].items[0].id, quote.sections[0].items[0].id);
    }

    #[test]
    fn test_import_applies_configured_defaults() {
        let mut config = EngineConfig::default();
        config.defaults.unit = "forfait".into();
        config.defaults.tax_rate = dec!(10);
        let allocator = SequenceAllocator::new(config.numbering.clone());
        let service = DocumentService::new(InMemoryRepository::new(), allocator, config).unwrap();

        let input: DocumentInput = serde_json::from_value(serde_json::json!({
            "clientId": "client-1",
            "issueDate": "2026-03-02",
            "services": [{ "name": "Diagnostic", "price": "150" }]
        }))
        .unwrap();
        let doc = service.import(input).unwrap();

        let item = &doc.sections[0].items[0];
        assert_eq!(item.unit, "forfait");
        assert_eq!(item.tax_rate, Rate::from_bps(1000));
        assert_eq!(doc.reference.as_deref(), Some("DEV-2026-0001"));
        assert_eq!(service.totals(&doc.id).unwrap().total_ttc.cents(), 16_500);
    }

    #[test]
    fn test_duplicate_import_keeps_numbering_gapless() {
        let service = service();
        let json = serde_json::json!({
            "id": "doc-imported",
            "clientId": "client-1",
            "issueDate": "2026-03-02",
            "services": [{ "name": "Diagnostic", "price": "150" }]
        });
        let first: DocumentInput = serde_json::from_value(json.clone()).unwrap();
        let again: DocumentInput = serde_json::from_value(json).unwrap();

        let stored = service.import(first).unwrap();
        assert_eq!(stored.reference.as_deref(), Some("DEV-2026-0001"));

        let err = service.import(again).unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate { ref id, .. } if id == "doc-imported"));
        assert_eq!(service.get("doc-imported").unwrap(), stored);

        let next = service.create_quote("client-1", date(3, 3)).unwrap();
        assert_eq!(next.reference.as_deref(), Some("DEV-2026-0002"));
    }

    #[test]
    fn test_summary_sections_add_up_to_total_ht() {
        let service = service();
        let quote = service.create_quote("client-1", date(3, 1)).unwrap();
        let sections = vec![
            Section::new("Lot A")
                .unwrap()
                .with_item(LineItem::new("Reprise", dec!(0.5), dec!(10.01)).unwrap()),
            Section::new("Lot B").unwrap().with_item(
                LineItem::new("Reprise", dec!(0.5), dec!(10.01))
                    .unwrap()
                    .with_tax_rate(Rate::from_bps(1000)),
            ),
        ];
        service.replace_sections(&quote.id, sections).unwrap();

        let summary = service.render_summary(&quote.id).unwrap();
        let sections: i64 = summary
            .sections
            .iter()
            .map(|s| s.sub_total.cents() + s.materials_total.cents())
            .sum();
        assert_eq!(summary.totals.total_ht.cents(), 1_001);
        assert_eq!(sections, 1_001);
    }

    #[test]
    fn test_check_persisted_totals() {
        let service = service();
        let quote = quote_with_work(&service);
        let fresh = PersistedTotals::from(&service.totals(&quote.id).unwrap());
        assert!(service.check_persisted_totals(&quote.id, &fresh).is_ok());

        let stale = PersistedTotals {
            total_ht: Money::from_cents(1),
            ..fresh
        };
        assert!(service.check_persisted_totals(&quote.id, &stale).is_err());
    }

    #[test]
    fn test_unknown_document() {
        let service = service();
        let err = service.totals("missing").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
