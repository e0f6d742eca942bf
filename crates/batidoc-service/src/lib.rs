//! # batidoc-service: Orchestration Layer
//!
//! Puts `batidoc-core` behind a small service: storage, reference numbering,
//! configuration and the operation sequence a caller drives.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   caller / CLI                                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌──────────────────────┐     ┌──────────────────────┐                 │
//! │   │   DocumentService    │────►│  ReferenceAllocator  │                 │
//! │   │   (service.rs)       │     │  (numbering.rs)      │                 │
//! │   └──────────┬───────────┘     └──────────────────────┘                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │   ┌──────────────────────┐     ┌──────────────────────┐                 │
//! │   │  DocumentRepository  │     │    EngineConfig      │                 │
//! │   │  (repository.rs)     │     │  (config.rs)         │                 │
//! │   └──────────────────────┘     └──────────────────────┘                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │        batidoc-core (tree, totals, mode, projector, retention)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`]: TOML + environment configuration
//! - [`error`]: Service errors and caller-facing codes
//! - [`numbering`]: Quote and invoice references
//! - [`repository`]: Document storage seam
//! - [`service`]: The operations

pub mod config;
pub mod error;
pub mod numbering;
pub mod repository;
pub mod service;

pub use config::{DocumentDefaults, EngineConfig, NumberingFormat, NumberingSettings, ResetPeriod};
pub use error::{ErrorBody, ErrorCode, ServiceError, ServiceResult};
pub use numbering::{render_reference, ReferenceAllocator, SequenceAllocator, Series};
pub use repository::{DocumentRepository, InMemoryRepository};
pub use service::{DocumentService, DocumentSummary, OverdueRetention, SectionSummary};

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr; `RUST_LOG` overrides
/// the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,batidoc_service=debug,batidoc_core=debug"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
