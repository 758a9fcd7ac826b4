//! Error types for the GEDCOM exporter.

use lineage_core::person::PersonId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An id needs more than three digits and the export is configured to
  /// reject rather than widen.
  #[error("{prefix} id {id} does not fit a three-digit xref")]
  IdOverflow { prefix: char, id: i64 },

  #[error("{prefix} id {id} cannot be written as an xref")]
  InvalidId { prefix: char, id: i64 },

  /// A household names a person missing from the exported slice.
  #[error("household references person {0}, who is not being exported")]
  UnknownPerson(PersonId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
