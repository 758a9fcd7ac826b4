//! GEDCOM 5.5.1 exporter for Lineage.
//!
//! Turns a snapshot of [`lineage_core`] persons and edges into a
//! lineage-linked GEDCOM file. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use lineage_gedcom::{ExportConfig, export_gedcom};
//!
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let text = export_gedcom(&[], &[], &ExportConfig::default(), today).unwrap();
//! assert!(text.starts_with("0 HEAD"));
//! ```

pub mod error;
mod encode;

use chrono::NaiveDate;
use lineage_core::{
  edge::Edge,
  household::{RemarriagePolicy, group_households},
  person::Person,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use encode::encode;
pub use error::{Error, Result};

/// File name offered to clients downloading an export.
pub const SUGGESTED_FILENAME: &str = "family_tree.ged";

/// MIME type of an export.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ─── Configuration ───────────────────────────────────────────────────────────

/// What to do with an id that needs more than three digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdOverflow {
  /// Write the wider number, e.g. `@I1000@`.
  #[default]
  Widen,
  /// Fail the export with [`Error::IdOverflow`].
  Reject,
}

/// Header values and policies for one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
  /// `HEAD.SOUR`: the approved system id of the producing program.
  pub source_id:       String,
  pub product_name:    String,
  pub product_version: String,
  /// `NAME` of the `@SUBM@` record.
  pub submitter:       String,
  pub remarriage:      RemarriagePolicy,
  pub id_overflow:     IdOverflow,
}

impl Default for ExportConfig {
  fn default() -> Self {
    Self {
      source_id:       "LINEAGE".into(),
      product_name:    "Lineage Family Tree".into(),
      product_version: env!("CARGO_PKG_VERSION").into(),
      submitter:       "Lineage".into(),
      remarriage:      RemarriagePolicy::default(),
      id_overflow:     IdOverflow::default(),
    }
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Group `edges` into household units and encode everything as GEDCOM.
///
/// `date` becomes `HEAD.DATE`; pass today's date for a fresh export.
pub fn export_gedcom(
  persons: &[Person],
  edges: &[Edge],
  config: &ExportConfig,
  date: NaiveDate,
) -> Result<String> {
  let households = group_households(persons, edges, config.remarriage);
  if !households.skipped_edges.is_empty() {
    warn!(
      skipped = households.skipped_edges.len(),
      "edges left out of the export"
    );
  }
  encode(persons, &households.units, config, date)
}

// ─── Shared test helpers ─────────────────────────────────────────────────────


// ─── Whole-file tests ────────────────────────────────────────────────────────
