//! Error type for `lineage-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, missing-person and duplicate-relationship failures.
  #[error(transparent)]
  Core(#[from] lineage_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A stored column held a value the domain types cannot represent.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// The domain error, if this is one.
  pub fn as_core(&self) -> Option<&lineage_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
