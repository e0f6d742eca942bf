//! # Document Mode Switch
//!
//! Reshapes the section layer between the two editing conventions.
//!
//! ```text
//!   Sectioned                               Direct
//!   ┌──────────────┐                        ┌──────────────┐
//!   │ "Cuisine"    │  item 1, item 2        │ ""           │  item 1
//!   ├──────────────┤         ─── to_direct ───►            │  item 2
//!   │ "SdB"        │  item 3                │              │  item 3
//!   └──────────────┘                        └──────────────┘
//!   ┌──────────────┐                                ▲
//!   │ "Section 1"  │  item 1, item 2, item 3  ◄── to_sectioned
//!   └──────────────┘
//! ```
//!
//! Items keep their ids and their materials across a switch. Section
//! names and categories are dropped when flattening.

use crate::error::CoreResult;
use crate::tree::{Document, Section};
use crate::types::DocumentMode;
use crate::validation::validate_section_name;

/// Flattens every section into the single unnamed section of direct mode,
/// preserving item order. No-op on a well-formed direct document.
pub fn to_direct(document: &mut Document) {
    if document.mode == DocumentMode::Direct && document.sections.len() == 1 {
        return;
    }

    let items = document
        .sections
        .drain(..)
        .flat_map(|section| section.items)
        .collect();
    document.sections = vec![Section {
        items,
        ..Section::unnamed()
    }];
    document.mode = DocumentMode::Direct;
}

/// Moves the direct-mode items into one new section named `section_name`.
///
/// An empty direct document still yields one (empty) named section.
/// No-op on a sectioned document.
pub fn to_sectioned(document: &mut Document, section_name: &str) -> CoreResult<()> {
    if document.mode == DocumentMode::Sectioned {
        return Ok(());
    }
    validate_section_name(section_name)?;

    let items = document
        .sections
        .drain(..)
        .flat_map(|section| section.items)
        .collect();
    document.sections = vec![Section {
        name: section_name.to_string(),
        items,
        ..Section::unnamed()
    }];
    document.mode = DocumentMode::Sectioned;
    Ok(())
}

/// Switches to `target`, naming the new section `section_name` when
/// leaving direct mode.
pub fn switch_mode(document: &mut Document, target: DocumentMode, section_name: &str) -> CoreResult<()> {
    match target {
        DocumentMode::Direct => {
            to_direct(document);
            Ok(())
        }
        DocumentMode::Sectioned => to_sectioned(document, section_name),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
