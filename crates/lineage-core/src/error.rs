//! Error types for `lineage-core`.

use thiserror::Error;

use crate::person::PersonId;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field is missing or blank.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("person not found: {0}")]
  PersonNotFound(PersonId),

  /// Some edge already links the two persons, in either direction.
  #[error("a relationship between {a} and {b} already exists")]
  DuplicateRelationship { a: PersonId, b: PersonId },

  /// Legacy embedded data on a person could not be decoded.
  #[error("malformed legacy data on person {person_id}: {reason}")]
  Parse { person_id: PersonId, reason: String },

  #[error("invalid date: {0:?}")]
  InvalidDate(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
