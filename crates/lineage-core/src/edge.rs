//! Pairwise relationship edges between persons.
//!
//! A `parent` edge is directed: `person_a` is the parent of `person_b`. A
//! `spouse` relation is symmetric and is always stored as two directed rows,
//! `a → b` and `b → a`, written together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::person::PersonId;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EdgeKind {
  Parent,
  Spouse,
}

/// A persisted edge. `edge_id` increases with creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub edge_id:    i64,
  pub person_a:   PersonId,
  pub person_b:   PersonId,
  pub kind:       EdgeKind,
  pub created_at: DateTime<Utc>,
}

impl Edge {
  pub fn involves(&self, id: PersonId) -> bool {
    self.person_a == id || self.person_b == id
  }

  /// Whether this edge links `x` and `y`, in either direction.
  pub fn connects(&self, x: PersonId, y: PersonId) -> bool {
    (self.person_a == x && self.person_b == y)
      || (self.person_a == y && self.person_b == x)
  }
}
