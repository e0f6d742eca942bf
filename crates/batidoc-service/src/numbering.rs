//! # Reference Numbering
//!
//! Human-readable references for quotes and invoices.
//!
//! ```text
//!   FAC - 2026 - 0007
//!   ───   ────   ────
//!    │     │      └── counter, zero-padded, restarts each period
//!    │     └───────── period: year, year-month, or absent
//!    └─────────────── series prefix
//! ```
//!
//! Totals never depend on a reference; references are assigned once, at
//! creation, and never recomputed on read.

use std::collections::HashMap;
use std::sync::Mutex;

use batidoc_core::Document;
use chrono::{Datelike, NaiveDate};

use crate::config::{NumberingFormat, NumberingSettings, ResetPeriod};
use crate::error::{ServiceError, ServiceResult};

/// Which reference series a document draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Quote,
    Invoice,
}

impl Series {
    pub fn of(document: &Document) -> Self {
        if document.is_invoice() {
            Series::Invoice
        } else {
            Series::Quote
        }
    }
}

/// Hands out the next reference of a series.
pub trait ReferenceAllocator: Send + Sync {
    fn next_reference(&self, series: Series, date: NaiveDate) -> ServiceResult<String>;
}

/// Counter-based allocator with per-period reset.
#[derive(Debug)]
pub struct SequenceAllocator {
    settings: NumberingSettings,
    counters: Mutex<HashMap<(Series, String), u64>>,
}

impl SequenceAllocator {
    pub fn new(settings: NumberingSettings) -> Self {
        SequenceAllocator {
            settings,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Continues a series from `last` (e.g. the highest number already
    /// stored for that period).
    pub fn resume(&self, series: Series, date: NaiveDate, last: u64) -> ServiceResult<()> {
        let period = period_key(self.format(series).reset, date);
        self.counters
            .lock()
            .map_err(|_| ServiceError::Internal("numbering mutex poisoned".into()))?
            .insert((series, period), last);
        Ok(())
    }

    fn format(&self, series: Series) -> &NumberingFormat {
        match series {
            Series::Quote => &self.settings.quote,
            Series::Invoice => &self.settings.invoice,
        }
    }
}

fn period_key(reset: ResetPeriod, date: NaiveDate) -> String {
    match reset {
        ResetPeriod::Never => String::new(),
        ResetPeriod::Yearly => format!("{:04}", date.year()),
        ResetPeriod::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
    }
}

/// Renders one reference: `PREFIX[-PERIOD]-COUNTER`.
pub fn render_reference(format: &NumberingFormat, date: NaiveDate, counter: u64) -> String {
    let period = period_key(format.reset, date);
    if period.is_empty() {
        format!("{}-{:0width$}", format.prefix, counter, width = format.padding)
    } else {
        format!(
            "{}-{}-{:0width$}",
            format.prefix,
            period,
            counter,
            width = format.padding
        )
    }
}

impl ReferenceAllocator for SequenceAllocator {
    fn next_reference(&self, series: Series, date: NaiveDate) -> ServiceResult<String> {
        let format = self.format(series);
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| ServiceError::Internal("numbering mutex poisoned".into()))?;
        let counter = counters
            .entry((series, period_key(format.reset, date)))
            .or_insert(0);
        *counter += 1;
        Ok(render_reference(format, date, *counter))
    }
}
