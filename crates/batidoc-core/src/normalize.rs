//! # Boundary Normalization
//!
//! Maps loosely-shaped request bodies onto the typed document tree.
//!
//! ## Accepted shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Field aliases                                                          │
//! │    unitPrice  ◄── price                                                 │
//! │    items      ◄── services, prestations                                 │
//! │    taxRate    ◄── tva, vatRate                                          │
//! │                                                                         │
//! │  Nested:   { sections: [ { items: [ { materials: [..] } ] } ] }         │
//! │  Flat:     { sections: [..], items: [ { sectionId, .. } ] }             │
//! │  Direct:   { items: [..] }                     (no sections at all)     │
//! │                                                                         │
//! │  Defaults                                                               │
//! │    unit ─────────► "u"          taxRate ──► 20                          │
//! │    quantity ─────► 1            billable ─► true                        │
//! │    description ──► ""           id ───────► fresh UUID                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are never defaulted: a line without one is rejected.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::retention::RetentionGuarantee;
use crate::tree::{generate_id, Document, DocumentKind, InvoiceHeader, LineItem, Material, QuoteHeader, Section};
use crate::types::{
    BillingTarget, DocumentMode, InvoiceStatus, QuoteStatus, Rate, TaxMode, DEFAULT_TAX_RATE,
};
use crate::validation::{validate_uuid, ValidationResult};
use crate::{DEFAULT_SECTION_NAME, DEFAULT_UNIT};

// =============================================================================
// Defaults
// =============================================================================

/// Values applied when an optional field is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeDefaults {
    pub unit: String,
    pub tax_rate: Rate,
    /// Name of the section created for flat items in sectioned mode.
    pub section_name: String,
}

impl Default for NormalizeDefaults {
    fn default() -> Self {
        NormalizeDefaults {
            unit: DEFAULT_UNIT.to_string(),
            tax_rate: DEFAULT_TAX_RATE,
            section_name: DEFAULT_SECTION_NAME.to_string(),
        }
    }
}

impl NormalizeDefaults {
    fn unit(&self, unit: Option<String>) -> String {
        unit.filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.unit.clone())
    }

    fn tax_rate(&self, percent: Option<Decimal>) -> ValidationResult<Rate> {
        percent.map_or(Ok(self.tax_rate), Rate::from_percent)
    }
}

fn resolve_id(id: Option<String>) -> ValidationResult<String> {
    match id {
        Some(id) => {
            validate_uuid(&id)?;
            Ok(id)
        }
        None => Ok(generate_id()),
    }
}

fn required<T>(value: Option<T>, field: &str) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInput {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub quantity: Option<Decimal>,
    #[serde(alias = "price")]
    pub unit_price: Option<Decimal>,
    pub unit: Option<String>,
    pub reference: Option<String>,
    #[serde(alias = "tva", alias = "vatRate")]
    pub tax_rate: Option<Decimal>,
    pub billable: Option<bool>,
}

impl MaterialInput {
    pub fn into_material(self, defaults: &NormalizeDefaults) -> CoreResult<Material> {
        let material = Material {
            id: resolve_id(self.id)?,
            name: self.name,
            quantity: self.quantity.unwrap_or(Decimal::ONE),
            unit_price: required(self.unit_price, "material unit price")?,
            unit: defaults.unit(self.unit),
            reference: self.reference,
            tax_rate: defaults.tax_rate(self.tax_rate)?,
            billable: self.billable.unwrap_or(true),
        };
        material.validate()?;
        Ok(material)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub id: Option<String>,
    /// Section the caller believes owns this item.
    pub section_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    #[serde(alias = "price")]
    pub unit_price: Option<Decimal>,
    pub unit: Option<String>,
    #[serde(alias = "tva", alias = "vatRate")]
    pub tax_rate: Option<Decimal>,
    pub billable: Option<bool>,
    pub category: Option<String>,
    #[serde(default)]
    pub materials: Vec<MaterialInput>,
}

impl LineItemInput {
    pub fn into_line_item(self, defaults: &NormalizeDefaults) -> CoreResult<LineItem> {
        let materials = self
            .materials
            .into_iter()
            .map(|m| m.into_material(defaults))
            .collect::<CoreResult<Vec<_>>>()?;

        let item = LineItem {
            id: resolve_id(self.id)?,
            name: self.name,
            description: self.description.unwrap_or_default(),
            quantity: self.quantity.unwrap_or(Decimal::ONE),
            unit: defaults.unit(self.unit),
            unit_price: required(self.unit_price, "line item unit price")?,
            tax_rate: defaults.tax_rate(self.tax_rate)?,
            billable: self.billable.unwrap_or(true),
            category: self.category,
            materials,
        };
        item.validate()?;
        Ok(item)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub category: Option<String>,
    #[serde(default, alias = "services", alias = "prestations")]
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Quote,
    Invoice,
}

/// A whole document as received at the boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub id: Option<String>,
    pub reference: Option<String>,
    #[serde(default)]
    pub kind: InputKind,
    pub quote_status: Option<QuoteStatus>,
    pub invoice_status: Option<InvoiceStatus>,
    #[serde(default)]
    pub client_id: String,
    pub prescriber_id: Option<String>,
    pub billing_target: Option<BillingTarget>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub payment_terms: Option<String>,
    pub source_quote_id: Option<String>,
    pub tax_mode: Option<TaxMode>,
    /// Legacy boolean form of `taxMode`.
    pub autoliquidation: Option<bool>,
    pub mode: Option<DocumentMode>,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
    /// Flat items, placed by their `sectionId` or into the implicit section.
    #[serde(default, alias = "services", alias = "prestations")]
    pub items: Vec<LineItemInput>,
    pub retention: Option<RetentionGuarantee>,
}

impl DocumentInput {
    /// Builds the typed document, validating every node.
    ///
    /// ## Errors
    /// - [`CoreError::Validation`] for missing prices, bad numbers, bad ids
    /// - [`CoreError::ItemSectionMismatch`] when a nested item claims another section
    /// - [`CoreError::SectionNotFound`] when a flat item names an unknown section
    /// - [`CoreError::InvalidDirectLayout`] for direct mode with several sections
    pub fn into_document(self, defaults: &NormalizeDefaults) -> CoreResult<Document> {
        if self.client_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "clientId".to_string(),
            }
            .into());
        }
        let issue_date = required(self.issue_date, "issueDate")?;
        let id = resolve_id(self.id)?;

        let kind = match self.kind {
            InputKind::Quote => {
                if let Some(retention) = &self.retention {
                    return Err(CoreError::WrongDocumentKind {
                        document_id: retention.id.clone(),
                        expected: "invoice".to_string(),
                        actual: "quote".to_string(),
                    });
                }
                DocumentKind::Quote(QuoteHeader {
                    status: self.quote_status.unwrap_or_default(),
                    valid_until: self.valid_until,
                })
            }
            InputKind::Invoice => DocumentKind::Invoice(InvoiceHeader {
                status: self.invoice_status.unwrap_or_default(),
                due_date: self.due_date,
                source_quote_id: self.source_quote_id,
                retention: self.retention,
            }),
        };

        let tax_mode = match (self.tax_mode, self.autoliquidation) {
            (Some(mode), _) => mode,
            (None, Some(true)) => TaxMode::Autoliquidation,
            (None, _) => TaxMode::Normal,
        };

        let (mode, sections) = build_sections(self.sections, self.items, self.mode, defaults)?;

        let document = Document {
            id,
            reference: self.reference,
            kind,
            client_id: self.client_id,
            prescriber_id: self.prescriber_id,
            billing_target: self.billing_target.unwrap_or_default(),
            issue_date,
            payment_terms: self.payment_terms,
            tax_mode,
            mode,
            sections,
        };
        document.validate()?;
        Ok(document)
    }
}

fn build_sections(
    inputs: Vec<SectionInput>,
    flat_items: Vec<LineItemInput>,
    mode: Option<DocumentMode>,
    defaults: &NormalizeDefaults,
) -> CoreResult<(DocumentMode, Vec<Section>)> {
    if inputs.is_empty() {
        let mode = mode.unwrap_or(if flat_items.is_empty() {
            DocumentMode::Sectioned
        } else {
            DocumentMode::Direct
        });
        let name = match mode {
            DocumentMode::Direct => String::new(),
            DocumentMode::Sectioned if flat_items.is_empty() => return Ok((mode, Vec::new())),
            DocumentMode::Sectioned => defaults.section_name.clone(),
        };
        let items = flat_items
            .into_iter()
            .map(|i| i.into_line_item(defaults))
            .collect::<CoreResult<Vec<_>>>()?;
        let section = Section {
            name,
            items,
            ..Section::unnamed()
        };
        return Ok((mode, vec![section]));
    }

    let mut sections = Vec::with_capacity(inputs.len());
    for input in inputs {
        let section_id = resolve_id(input.id)?;
        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            if let Some(claimed) = item.section_id.as_deref() {
                if claimed != section_id {
                    return Err(CoreError::ItemSectionMismatch {
                        item_id: item.id.clone().unwrap_or_default(),
                        claimed_section_id: claimed.to_string(),
                        section_id,
                    });
                }
            }
            items.push(item.into_line_item(defaults)?);
        }
        sections.push(Section {
            id: section_id,
            name: input.name,
            category: input.category,
            items,
        });
    }

    for item in flat_items {
        let section_id = required(item.section_id.clone(), "sectionId")?;
        let line = item.into_line_item(defaults)?;
        sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or(CoreError::SectionNotFound(section_id))?
            .items
            .push(line);
    }

    Ok((mode.unwrap_or_default(), sections))
}

// =============================================================================
// Unit Tests
// =============================================================================
