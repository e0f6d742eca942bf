//! # batidoc-totals
//!
//! Reads one document as JSON and prints its totals as JSON.
//!
//! ```text
//! batidoc-totals [--config <engine.toml>] [--summary] <document.json>
//! ```
//!
//! The document may use the legacy field names (`price`, `services`,
//! `tva`, flat items with `sectionId`). Errors go to stderr as
//! `{ "code": ..., "message": ... }` with exit status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use batidoc_core::{compute_totals, DocumentInput};
use batidoc_service::{init_tracing, EngineConfig, ErrorBody, ServiceError, ServiceResult};
use tracing::{debug, error};

const USAGE: &str = "usage: batidoc-totals [--config <engine.toml>] [--summary] <document.json>";

struct Args {
    config: Option<PathBuf>,
    summary: bool,
    document: PathBuf,
}

fn parse_args() -> ServiceResult<Args> {
    let mut config = None;
    let mut summary = false;
    let mut document = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| ServiceError::InvalidConfig(USAGE.into()))?;
                config = Some(PathBuf::from(path));
            }
            "--summary" => summary = true,
            _ if document.is_none() && !arg.starts_with("--") => {
                document = Some(PathBuf::from(arg));
            }
            _ => return Err(ServiceError::InvalidConfig(USAGE.into())),
        }
    }

    Ok(Args {
        config,
        summary,
        document: document.ok_or_else(|| ServiceError::InvalidConfig(USAGE.into()))?,
    })
}

fn run() -> ServiceResult<String> {
    let args = parse_args()?;
    let config = EngineConfig::load_or_default(args.config.as_deref());
    config.validate()?;

    let raw = std::fs::read_to_string(&args.document)
        .map_err(|e| ServiceError::InvalidDocument(format!("{}: {}", args.document.display(), e)))?;
    let input: DocumentInput = serde_json::from_str(&raw)?;
    let document = input.into_document(&config.normalize_defaults()?)?;
    debug!(document_id = %document.id, sections = document.sections.len(), "Document loaded");

    let totals = compute_totals(&document)?;
    let output = if args.summary {
        let sections: Vec<_> = document
            .sections
            .iter()
            .zip(&totals.sections)
            .map(|(s, figures)| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "subTotal": figures.sub_total,
                    "materialsTotal": figures.materials_total,
                })
            })
            .collect();
        serde_json::json!({ "sections": sections, "totals": totals })
    } else {
        serde_json::to_value(&totals)?
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "batidoc-totals failed");
            let body = ErrorBody::from(&e);
            match serde_json::to_string(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}
