//! # Quote → Invoice Projector
//!
//! Builds an invoice tree from an accepted quote.
//!
//! ```text
//! Quote                               Invoice (Draft)
//! ├── Section  id=a  "Cuisine"   ──►  ├── Section  id=a' "Cuisine"
//! │   └── LineItem id=b          ──►  │   └── LineItem id=b'
//! │       └── Material id=c      ──►  │       └── Material id=c'
//! └── ...                             └── source_quote_id = quote.id
//! ```
//!
//! Every id is regenerated: the two trees never alias, so later edits on
//! either side cannot leak into the other. Mode switches keep ids; the
//! projector never does.

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::tree::{generate_id, Document, InvoiceHeader, LineItem, Material, Section};
use crate::types::{DocumentMode, QuoteStatus};
use crate::{DEFAULT_SECTION_NAME, DEFAULT_UNIT};

fn unit_or_default(unit: &str) -> String {
    if unit.trim().is_empty() {
        DEFAULT_UNIT.to_string()
    } else {
        unit.to_string()
    }
}

fn project_material(material: &Material) -> Material {
    Material {
        id: generate_id(),
        unit: unit_or_default(&material.unit),
        ..material.clone()
    }
}

fn project_item(item: &LineItem) -> LineItem {
    LineItem {
        id: generate_id(),
        unit: unit_or_default(&item.unit),
        materials: item.materials.iter().map(project_material).collect(),
        ..item.clone()
    }
}

fn project_section(section: &Section) -> Section {
    Section {
        id: generate_id(),
        items: section.items.iter().map(project_item).collect(),
        ..section.clone()
    }
}

/// Copies the quote's sections with fresh ids at every level.
///
/// With `copy_items == false` a single empty section is emitted instead:
/// unnamed for a direct-mode quote, named [`DEFAULT_SECTION_NAME`]
/// otherwise.
pub fn project_sections(quote: &Document, copy_items: bool) -> Vec<Section> {
    if copy_items {
        return quote.sections.iter().map(project_section).collect();
    }

    let placeholder = match quote.mode {
        DocumentMode::Direct => Section::unnamed(),
        DocumentMode::Sectioned => Section {
            name: DEFAULT_SECTION_NAME.to_string(),
            ..Section::unnamed()
        },
    };
    vec![placeholder]
}

/// Creates a draft invoice from an accepted quote.
///
/// Header fields (client, prescriber, billing target, payment terms, tax
/// mode, mode) are carried over; the invoice keeps a back-reference to the
/// quote. The quote itself is not modified.
///
/// ## Errors
/// - [`CoreError::WrongDocumentKind`] if `quote` is an invoice
/// - [`CoreError::InvalidDocumentStatus`] unless the quote is Accepted
pub fn invoice_from_quote(
    quote: &Document,
    issue_date: NaiveDate,
    copy_items: bool,
) -> CoreResult<Document> {
    let status = quote.quote_header()?.status;
    if status != QuoteStatus::Accepted {
        return Err(CoreError::InvalidDocumentStatus {
            document_id: quote.id.clone(),
            current_status: format!("{:?}", status),
            operation: "convert to invoice".to_string(),
        });
    }

    let mut invoice = Document::new_invoice(quote.client_id.clone(), issue_date);
    invoice.prescriber_id = quote.prescriber_id.clone();
    invoice.billing_target = quote.billing_target;
    invoice.payment_terms = quote.payment_terms.clone();
    invoice.tax_mode = quote.tax_mode;
    invoice.mode = quote.mode;
    invoice.sections = project_sections(quote, copy_items);
    *invoice.invoice_header_mut()? = InvoiceHeader {
        source_quote_id: Some(quote.id.clone()),
        ..InvoiceHeader::default()
    };

    invoice.validate()?;
    Ok(invoice)
}

// =============================================================================
// Unit Tests
// =============================================================================
