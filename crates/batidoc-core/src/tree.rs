//! # Document Tree
//!
//! The three-level tree shared by quotes and invoices.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Document (Quote | Invoice)                                             │
//! │  ├── header: status, dates, client/prescriber, tax mode, mode           │
//! │  └── sections: Vec<Section>            ordered, owned                   │
//! │       └── items: Vec<LineItem>         ordered, owned                   │
//! │            └── materials: Vec<Material> ordered, owned                  │
//! │                                                                         │
//! │  Invoice only: retention: Option<RetentionGuarantee>  (0 or 1)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Section aggregates (`items_ht`, `materials_ht`) are computed from
//! children on every call and never stored. The rounded figures a section
//! displays come from [`crate::totals::compute_totals`], and a persisted
//! copy of them can be checked with [`crate::totals::verify_section_cache`].
//!
//! Every edit method validates its input and looks up every id it needs
//! before touching the tree, so a failed edit leaves the tree unchanged.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::retention::RetentionGuarantee;
use crate::types::{
    BillingTarget, DocumentMode, InvoiceStatus, QuoteStatus, Rate, TaxMode, DEFAULT_TAX_RATE,
};
use crate::validation::{
    validate_line_name, validate_quantity, validate_rate_bps, validate_section_name,
    validate_unit_price, ValidationResult,
};
use crate::DEFAULT_UNIT;

/// Generates a fresh entity identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// `quantity × unit_price`, unrounded.
fn extend(quantity: Decimal, unit_price: Decimal, what: &str) -> CoreResult<Decimal> {
    quantity
        .checked_mul(unit_price)
        .ok_or_else(|| CoreError::AmountOverflow {
            context: format!("{} HT", what),
        })
}

fn add_exact(a: Decimal, b: Decimal, what: &str) -> CoreResult<Decimal> {
    a.checked_add(b).ok_or_else(|| CoreError::AmountOverflow {
        context: what.to_string(),
    })
}

// =============================================================================
// Material
// =============================================================================

/// A supply consumed by a line item. Leaf of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Material {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// Price per unit in euros, tax excluded.
    #[ts(as = "String")]
    pub unit_price: Decimal,
    pub unit: String,
    /// Supplier reference.
    pub reference: Option<String>,
    pub tax_rate: Rate,
    /// `false` keeps the material visible without charging it.
    pub billable: bool,
}

impl Material {
    /// Creates a billable material at the default rate and unit.
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> ValidationResult<Self> {
        let material = Material {
            id: generate_id(),
            name: name.into(),
            quantity,
            unit_price,
            unit: DEFAULT_UNIT.to_string(),
            reference: None,
            tax_rate: DEFAULT_TAX_RATE,
            billable: true,
        };
        material.validate()?;
        Ok(material)
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    /// Checks name, quantity, price and rate.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_name("material name", &self.name)?;
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price)?;
        validate_rate_bps("material tax rate", self.tax_rate.bps())
    }

    /// Unrounded HT contribution; zero when not billable.
    pub fn billed_ht(&self) -> CoreResult<Decimal> {
        if !self.billable {
            return Ok(Decimal::ZERO);
        }
        extend(self.quantity, self.unit_price, "material")
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A service line ("prestation") with the materials it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub description: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    pub unit: String,
    /// Price per unit in euros, tax excluded.
    #[ts(as = "String")]
    pub unit_price: Decimal,
    pub tax_rate: Rate,
    /// `false` keeps the line (and its materials) visible without charging it.
    pub billable: bool,
    pub category: Option<String>,
    pub materials: Vec<Material>,
}

impl LineItem {
    /// Creates a billable line at the default rate and unit, with no materials.
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> ValidationResult<Self> {
        let item = LineItem {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            quantity,
            unit: DEFAULT_UNIT.to_string(),
            unit_price,
            tax_rate: DEFAULT_TAX_RATE,
            billable: true,
            category: None,
            materials: Vec::new(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Checks this line and every material under it.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_name("line item name", &self.name)?;
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price)?;
        validate_rate_bps("line item tax rate", self.tax_rate.bps())?;
        self.materials.iter().try_for_each(Material::validate)
    }

    /// Unrounded HT of the line itself, materials excluded.
    pub fn billed_ht(&self) -> CoreResult<Decimal> {
        if !self.billable {
            return Ok(Decimal::ZERO);
        }
        extend(self.quantity, self.unit_price, "line item")
    }

    /// Unrounded HT of the billable materials. Zero when the line itself
    /// is excluded.
    pub fn materials_ht(&self) -> CoreResult<Decimal> {
        if !self.billable {
            return Ok(Decimal::ZERO);
        }
        self.materials.iter().try_fold(Decimal::ZERO, |acc, m| {
            add_exact(acc, m.billed_ht()?, "materials HT")
        })
    }

    /// Unrounded HT of the line and its materials.
    pub fn total_ht(&self) -> CoreResult<Decimal> {
        add_exact(self.billed_ht()?, self.materials_ht()?, "line item HT")
    }
}

// =============================================================================
// Section
// =============================================================================

/// A named group of line items ("lot").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Section {
    pub id: String,
    /// Empty for the single section of a direct-mode document.
    pub name: String,
    pub category: Option<String>,
    pub items: Vec<LineItem>,
}

impl Section {
    /// Creates an empty named section.
    pub fn new(name: impl Into<String>) -> ValidationResult<Self> {
        let name = name.into();
        validate_section_name(&name)?;
        Ok(Section {
            id: generate_id(),
            name,
            category: None,
            items: Vec::new(),
        })
    }

    /// Creates the unnamed section used by direct mode.
    pub fn unnamed() -> Self {
        Section {
            id: generate_id(),
            name: String::new(),
            category: None,
            items: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    /// Checks the name and every line item.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_section_name(&self.name)?;
        self.items.iter().try_for_each(LineItem::validate)
    }

    /// Unrounded HT of the billable line items, materials excluded.
    pub fn items_ht(&self) -> CoreResult<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |acc, i| {
            add_exact(acc, i.billed_ht()?, "section items HT")
        })
    }

    /// Unrounded HT of the billable materials.
    pub fn materials_ht(&self) -> CoreResult<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |acc, i| {
            add_exact(acc, i.materials_ht()?, "section materials HT")
        })
    }

    /// Unrounded HT of everything billed in this section.
    pub fn total_ht(&self) -> CoreResult<Decimal> {
        add_exact(self.items_ht()?, self.materials_ht()?, "section HT")
    }

    fn item_mut(&mut self, item_id: &str) -> CoreResult<&mut LineItem> {
        let section_id = &self.id;
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotInSection {
                item_id: item_id.to_string(),
                section_id: section_id.clone(),
            })
    }
}

// =============================================================================
// Document Headers
// =============================================================================

/// Quote-specific header fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteHeader {
    pub status: QuoteStatus,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
}

/// Invoice-specific header fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceHeader {
    pub status: InvoiceStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    /// Back-reference to the quote this invoice was projected from.
    pub source_quote_id: Option<String>,
    pub retention: Option<RetentionGuarantee>,
}

/// Quote or invoice. Same tree, different header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum DocumentKind {
    Quote(QuoteHeader),
    Invoice(InvoiceHeader),
}

impl DocumentKind {
    /// Lowercase label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Quote(_) => "quote",
            DocumentKind::Invoice(_) => "invoice",
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A business document and its tree.
///
/// Totals are not stored here: see [`crate::totals::compute_totals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Document {
    pub id: String,
    /// Human-readable reference, assigned by the numbering collaborator.
    pub reference: Option<String>,
    pub kind: DocumentKind,
    pub client_id: String,
    pub prescriber_id: Option<String>,
    pub billing_target: BillingTarget,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    pub payment_terms: Option<String>,
    pub tax_mode: TaxMode,
    pub mode: DocumentMode,
    pub sections: Vec<Section>,
}

impl Document {
    fn with_kind(kind: DocumentKind, client_id: impl Into<String>, issue_date: NaiveDate) -> Self {
        Document {
            id: generate_id(),
            reference: None,
            kind,
            client_id: client_id.into(),
            prescriber_id: None,
            billing_target: BillingTarget::Client,
            issue_date,
            payment_terms: None,
            tax_mode: TaxMode::Normal,
            mode: DocumentMode::Sectioned,
            sections: Vec::new(),
        }
    }

    /// Creates an empty draft quote in sectioned mode.
    pub fn new_quote(client_id: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self::with_kind(
            DocumentKind::Quote(QuoteHeader::default()),
            client_id,
            issue_date,
        )
    }

    /// Creates an empty draft invoice in sectioned mode.
    pub fn new_invoice(client_id: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self::with_kind(
            DocumentKind::Invoice(InvoiceHeader::default()),
            client_id,
            issue_date,
        )
    }

    pub fn is_quote(&self) -> bool {
        matches!(self.kind, DocumentKind::Quote(_))
    }

    pub fn is_invoice(&self) -> bool {
        matches!(self.kind, DocumentKind::Invoice(_))
    }

    fn wrong_kind(&self, expected: &str) -> CoreError {
        CoreError::WrongDocumentKind {
            document_id: self.id.clone(),
            expected: expected.to_string(),
            actual: self.kind.label().to_string(),
        }
    }

    /// Quote header, or a typed error on an invoice.
    pub fn quote_header(&self) -> CoreResult<&QuoteHeader> {
        match &self.kind {
            DocumentKind::Quote(header) => Ok(header),
            DocumentKind::Invoice(_) => Err(self.wrong_kind("quote")),
        }
    }

    /// Invoice header, or a typed error on a quote.
    pub fn invoice_header(&self) -> CoreResult<&InvoiceHeader> {
        match &self.kind {
            DocumentKind::Invoice(header) => Ok(header),
            DocumentKind::Quote(_) => Err(self.wrong_kind("invoice")),
        }
    }

    pub fn invoice_header_mut(&mut self) -> CoreResult<&mut InvoiceHeader> {
        match &mut self.kind {
            DocumentKind::Invoice(header) => Ok(header),
            DocumentKind::Quote(_) => Err(CoreError::WrongDocumentKind {
                document_id: self.id.clone(),
                expected: "invoice".to_string(),
                actual: "quote".to_string(),
            }),
        }
    }

    /// The attached retention guarantee, if any. Always `None` on quotes.
    pub fn retention(&self) -> Option<&RetentionGuarantee> {
        match &self.kind {
            DocumentKind::Invoice(header) => header.retention.as_ref(),
            DocumentKind::Quote(_) => None,
        }
    }

    /// Moves a quote to `next` if the transition is allowed.
    pub fn set_quote_status(&mut self, next: QuoteStatus) -> CoreResult<()> {
        let current = self.quote_header()?.status;
        if !current.can_transition_to(next) {
            return Err(CoreError::InvalidDocumentStatus {
                document_id: self.id.clone(),
                current_status: format!("{:?}", current),
                operation: format!("move to {:?}", next),
            });
        }
        if let DocumentKind::Quote(header) = &mut self.kind {
            header.status = next;
        }
        Ok(())
    }

    /// Moves an invoice to `next` if the transition is allowed.
    pub fn set_invoice_status(&mut self, next: InvoiceStatus) -> CoreResult<()> {
        let current = self.invoice_header()?.status;
        if !current.can_transition_to(next) {
            return Err(CoreError::InvalidDocumentStatus {
                document_id: self.id.clone(),
                current_status: format!("{:?}", current),
                operation: format!("move to {:?}", next),
            });
        }
        self.invoice_header_mut()?.status = next;
        Ok(())
    }

    /// All line items across sections, in display order.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn section(&self, section_id: &str) -> CoreResult<&Section> {
        self.sections
            .iter()
            .find(|s| s.id == section_id)
            .ok_or_else(|| CoreError::SectionNotFound(section_id.to_string()))
    }

    fn section_mut(&mut self, section_id: &str) -> CoreResult<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or_else(|| CoreError::SectionNotFound(section_id.to_string()))
    }

    fn ensure_sectioned(&self, operation: &str) -> CoreResult<()> {
        if self.mode == DocumentMode::Direct {
            return Err(CoreError::DirectModeSectionsLocked {
                document_id: self.id.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Checks every node of the tree and the direct-mode layout.
    pub fn validate(&self) -> CoreResult<()> {
        if self.mode == DocumentMode::Direct && self.sections.len() != 1 {
            return Err(CoreError::InvalidDirectLayout {
                document_id: self.id.clone(),
                sections: self.sections.len(),
            });
        }
        for section in &self.sections {
            section.validate()?;
        }
        if let Some(retention) = self.retention() {
            retention.validate()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tree edits
    // -------------------------------------------------------------------------

    /// Appends a section. Rejected in direct mode, which holds exactly one.
    pub fn add_section(&mut self, section: Section) -> CoreResult<()> {
        self.ensure_sectioned("add a section")?;
        section.validate()?;
        self.sections.push(section);
        Ok(())
    }

    /// Removes a section and everything it owns.
    pub fn remove_section(&mut self, section_id: &str) -> CoreResult<Section> {
        let index = self
            .sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or_else(|| CoreError::SectionNotFound(section_id.to_string()))?;
        self.ensure_sectioned("remove a section")?;
        Ok(self.sections.remove(index))
    }

    /// Appends a line item to a section.
    pub fn add_item(&mut self, section_id: &str, item: LineItem) -> CoreResult<()> {
        item.validate()?;
        self.section_mut(section_id)?.items.push(item);
        Ok(())
    }

    /// Removes a line item (and its materials) from a section.
    pub fn remove_item(&mut self, section_id: &str, item_id: &str) -> CoreResult<LineItem> {
        let section = self.section_mut(section_id)?;
        let index = section
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotInSection {
                item_id: item_id.to_string(),
                section_id: section_id.to_string(),
            })?;
        Ok(section.items.remove(index))
    }

    /// Moves a line item to the end of another section, keeping its id.
    pub fn move_item(&mut self, item_id: &str, from_section: &str, to_section: &str) -> CoreResult<()> {
        self.section(to_section)?;
        if !self.section(from_section)?.items.iter().any(|i| i.id == item_id) {
            return Err(CoreError::ItemNotInSection {
                item_id: item_id.to_string(),
                section_id: from_section.to_string(),
            });
        }
        let item = self.remove_item(from_section, item_id)?;
        self.section_mut(to_section)?.items.push(item);
        Ok(())
    }

    /// Appends a material to a line item.
    pub fn add_material(&mut self, section_id: &str, item_id: &str, material: Material) -> CoreResult<()> {
        material.validate()?;
        self.section_mut(section_id)?
            .item_mut(item_id)?
            .materials
            .push(material);
        Ok(())
    }

    /// Removes a material from a line item.
    pub fn remove_material(
        &mut self,
        section_id: &str,
        item_id: &str,
        material_id: &str,
    ) -> CoreResult<Material> {
        let item = self.section_mut(section_id)?.item_mut(item_id)?;
        let index = item
            .materials
            .iter()
            .position(|m| m.id == material_id)
            .ok_or_else(|| CoreError::MaterialNotFound {
                item_id: item_id.to_string(),
                material_id: material_id.to_string(),
            })?;
        Ok(item.materials.remove(index))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn tiling() -> LineItem {
        LineItem::new("Pose carrelage", dec!(12.5), dec!(38))
            .unwrap()
            .with_unit("m²")
            .with_material(Material::new("Colle", dec!(3), dec!(14.9)).unwrap())
    }

    #[test]
    fn test_line_item_defaults() {
        let item = LineItem::new("Dépose", dec!(1), dec!(80)).unwrap();
        assert_eq!(item.unit, DEFAULT_UNIT);
        assert_eq!(item.tax_rate, DEFAULT_TAX_RATE);
        assert!(item.billable);
        assert!(item.description.is_empty());
    }

    #[test]
    fn test_constructors_reject_negative_values() {
        assert!(LineItem::new("x", dec!(-1), dec!(10)).is_err());
        assert!(LineItem::new("x", dec!(1), dec!(-10)).is_err());
        assert!(Material::new("x", dec!(-1), dec!(10)).is_err());
        assert!(LineItem::new("", dec!(1), dec!(10)).is_err());
    }

    #[test]
    fn test_line_item_ht() {
        let item = tiling();
        assert_eq!(item.billed_ht().unwrap(), dec!(475));
        assert_eq!(item.materials_ht().unwrap(), dec!(44.7));
        assert_eq!(item.total_ht().unwrap(), dec!(519.7));
    }

    #[test]
    fn test_excluded_line_excludes_its_materials() {
        let item = tiling().with_billable(false);
        assert_eq!(item.billed_ht().unwrap(), Decimal::ZERO);
        assert_eq!(item.materials_ht().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_section_aggregates_are_live() {
        let mut section = Section::new("Salle de bain").unwrap().with_item(tiling());
        assert_eq!(section.items_ht().unwrap(), dec!(475));
        assert_eq!(section.materials_ht().unwrap(), dec!(44.7));
        assert_eq!(section.total_ht().unwrap(), dec!(519.7));

        section.items[0].quantity = dec!(10);
        assert_eq!(section.items_ht().unwrap(), dec!(380));
    }

    #[test]
    fn test_direct_mode_locks_sections() {
        let mut doc = Document::new_quote("client-1", day());
        let section = Section::unnamed().with_item(tiling());
        let section_id = section.id.clone();
        doc.sections.push(section);
        doc.mode = DocumentMode::Direct;

        let err = doc.add_section(Section::new("Extra").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DirectModeSectionsLocked { ref operation, .. } if operation == "add a section"
        ));
        assert!(!err.to_string().contains("sections, expected"));

        let err = doc.remove_section(&section_id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DirectModeSectionsLocked { ref operation, .. } if operation == "remove a section"
        ));
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn test_add_and_remove_items() {
        let mut doc = Document::new_quote("client-1", day());
        let section = Section::new("Lot 1").unwrap();
        let section_id = section.id.clone();
        doc.add_section(section).unwrap();

        let item = tiling();
        let item_id = item.id.clone();
        doc.add_item(&section_id, item).unwrap();
        assert_eq!(doc.line_items().count(), 1);

        let err = doc.remove_item(&section_id, "missing").unwrap_err();
        assert!(matches!(err, CoreError::ItemNotInSection { .. }));

        let removed = doc.remove_item(&section_id, &item_id).unwrap();
        assert_eq!(removed.id, item_id);
        assert_eq!(doc.line_items().count(), 0);
    }

    #[test]
    fn test_add_item_rejects_invalid_without_mutation() {
        let mut doc = Document::new_quote("client-1", day());
        let section = Section::new("Lot 1").unwrap();
        let section_id = section.id.clone();
        doc.add_section(section).unwrap();

        let mut bad = tiling();
        bad.quantity = dec!(-2);
        assert!(matches!(
            doc.add_item(&section_id, bad),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(doc.line_items().count(), 0);
    }

    #[test]
    fn test_move_item_keeps_identity() {
        let mut doc = Document::new_quote("client-1", day());
        let a = Section::new("A").unwrap().with_item(tiling());
        let b = Section::new("B").unwrap();
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        let item_id = a.items[0].id.clone();
        doc.add_section(a).unwrap();
        doc.add_section(b).unwrap();

        doc.move_item(&item_id, &a_id, &b_id).unwrap();
        assert!(doc.section(&a_id).unwrap().items.is_empty());
        assert_eq!(doc.section(&b_id).unwrap().items[0].id, item_id);

        // Unknown target: nothing moves.
        let err = doc.move_item(&item_id, &b_id, "nowhere").unwrap_err();
        assert!(matches!(err, CoreError::SectionNotFound(_)));
        assert_eq!(doc.section(&b_id).unwrap().items.len(), 1);

        // Item claimed in the wrong section.
        let err = doc.move_item(&item_id, &a_id, &b_id).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotInSection { .. }));
    }

    #[test]
    fn test_materials_edit() {
        let mut doc = Document::new_quote("client-1", day());
        let section = Section::new("A").unwrap().with_item(tiling());
        let section_id = section.id.clone();
        let item_id = section.items[0].id.clone();
        doc.add_section(section).unwrap();

        let joint = Material::new("Joint", dec!(2), dec!(9.5)).unwrap();
        let joint_id = joint.id.clone();
        doc.add_material(&section_id, &item_id, joint).unwrap();
        assert_eq!(doc.section(&section_id).unwrap().items[0].materials.len(), 2);

        doc.remove_material(&section_id, &item_id, &joint_id).unwrap();
        let err = doc
            .remove_material(&section_id, &item_id, &joint_id)
            .unwrap_err();
        assert!(matches!(err, CoreError::MaterialNotFound { .. }));
    }

    #[test]
    fn test_header_accessors() {
        let quote = Document::new_quote("client-1", day());
        assert!(quote.quote_header().is_ok());
        assert!(matches!(
            quote.invoice_header(),
            Err(CoreError::WrongDocumentKind { .. })
        ));
        assert!(quote.retention().is_none());
    }

    #[test]
    fn test_quote_status_transitions() {
        let mut quote = Document::new_quote("client-1", day());
        quote.set_quote_status(QuoteStatus::Sent).unwrap();
        quote.set_quote_status(QuoteStatus::Accepted).unwrap();
        let err = quote.set_quote_status(QuoteStatus::Draft).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDocumentStatus { .. }));
        assert_eq!(quote.quote_header().unwrap().status, QuoteStatus::Accepted);
    }

    #[test]
    fn test_invoice_status_transitions() {
        let mut invoice = Document::new_invoice("client-1", day());
        invoice.set_invoice_status(InvoiceStatus::Sent).unwrap();
        invoice.set_invoice_status(InvoiceStatus::Paid).unwrap();
        assert!(invoice.set_invoice_status(InvoiceStatus::Cancelled).is_err());

        let mut quote = Document::new_quote("client-1", day());
        let err = quote.set_invoice_status(InvoiceStatus::Sent).unwrap_err();
        assert!(matches!(err, CoreError::WrongDocumentKind { .. }));
    }

    #[test]
    fn test_document_serde_shape() {
        let doc = Document::new_invoice("client-1", day());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["kind"]["kind"], "invoice");
        assert_eq!(json["taxMode"], "normal");
        assert_eq!(json["mode"], "sectioned");

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
