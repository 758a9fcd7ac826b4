//! Conversions between domain types and the plain-text column values stored
//! in SQLite.
//!
//! Timestamps are RFC 3339 strings. Genealogical dates keep their
//! `YYYY[-MM[-DD]]` text form, and enums are stored by variant name.

use chrono::{DateTime, Utc};
use lineage_core::{
  date::GenDate,
  edge::{Edge, EdgeKind},
  person::{Gender, MaritalStatus, NewPerson, Person, PersonId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_gender(s: &str) -> Result<Gender> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown gender: {s:?}")))
}

pub fn decode_marital_status(s: &str) -> Result<MaritalStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown marital status: {s:?}")))
}

pub fn decode_edge_kind(s: &str) -> Result<EdgeKind> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown edge kind: {s:?}")))
}

fn decode_gen_date(s: Option<String>) -> Result<Option<GenDate>> {
  Ok(s.map(|s| s.parse()).transpose()?)
}

// ─── Person columns ──────────────────────────────────────────────────────────

/// The editable columns of a `persons` row, encoded for binding.
#[derive(Debug, Clone)]
pub struct PersonColumns {
  pub full_name:       String,
  pub localized_name:  Option<String>,
  pub nickname:        Option<String>,
  pub gender:          String,
  pub birth_date:      Option<String>,
  pub birth_place:     Option<String>,
  pub death_date:      Option<String>,
  pub death_place:     Option<String>,
  pub is_alive:        bool,
  pub notes:           String,
  pub marital_status:  Option<String>,
  pub father_name:     Option<String>,
  pub mother_name:     Option<String>,
  pub have_children:   Option<bool>,
  pub spouse_name:     Option<String>,
  pub legacy_children: Option<String>,
}

impl From<&NewPerson> for PersonColumns {
  fn from(p: &NewPerson) -> Self {
    Self {
      full_name:       p.full_name.clone(),
      localized_name:  p.localized_name.clone(),
      nickname:        p.nickname.clone(),
      gender:          p.gender.as_ref().to_owned(),
      birth_date:      p.birth_date.map(|d| d.to_string()),
      birth_place:     p.birth_place.clone(),
      death_date:      p.death_date.map(|d| d.to_string()),
      death_place:     p.death_place.clone(),
      is_alive:        p.is_alive,
      notes:           p.notes.clone(),
      marital_status:  p.marital_status.map(|m| m.as_ref().to_owned()),
      father_name:     p.father_name.clone(),
      mother_name:     p.mother_name.clone(),
      have_children:   p.have_children,
      spouse_name:     p.spouse_name.clone(),
      legacy_children: p.legacy_children.clone(),
    }
  }
}

/// Column list matching [`RawPerson::from_row`].
pub const PERSON_COLUMNS: &str = "person_id, full_name, localized_name, \
  nickname, gender, birth_date, birth_place, death_date, death_place, \
  is_alive, notes, marital_status, father_name, mother_name, have_children, \
  spouse_name, legacy_children, created_at, updated_at";

/// Intermediate struct holding raw strings from a `persons` row.
#[derive(Debug)]
pub struct RawPerson {
  pub person_id:  i64,
  pub columns:    PersonColumns,
  pub created_at: String,
  pub updated_at: String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:  row.get(0)?,
      columns:    PersonColumns {
        full_name:       row.get(1)?,
        localized_name:  row.get(2)?,
        nickname:        row.get(3)?,
        gender:          row.get(4)?,
        birth_date:      row.get(5)?,
        birth_place:     row.get(6)?,
        death_date:      row.get(7)?,
        death_place:     row.get(8)?,
        is_alive:        row.get(9)?,
        notes:           row.get(10)?,
        marital_status:  row.get(11)?,
        father_name:     row.get(12)?,
        mother_name:     row.get(13)?,
        have_children:   row.get(14)?,
        spouse_name:     row.get(15)?,
        legacy_children: row.get(16)?,
      },
      created_at: row.get(17)?,
      updated_at: row.get(18)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let c = self.columns;
    Ok(Person {
      id:              PersonId(self.person_id),
      full_name:       c.full_name,
      localized_name:  c.localized_name,
      nickname:        c.nickname,
      gender:          decode_gender(&c.gender)?,
      birth_date:      decode_gen_date(c.birth_date)?,
      birth_place:     c.birth_place,
      death_date:      decode_gen_date(c.death_date)?,
      death_place:     c.death_place,
      is_alive:        c.is_alive,
      notes:           c.notes,
      marital_status:  c
        .marital_status
        .as_deref()
        .map(decode_marital_status)
        .transpose()?,
      father_name:     c.father_name,
      mother_name:     c.mother_name,
      have_children:   c.have_children,
      spouse_name:     c.spouse_name,
      legacy_children: c.legacy_children,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Edges ───────────────────────────────────────────────────────────────────

pub const EDGE_COLUMNS: &str = "edge_id, person_a, person_b, kind, created_at";

#[derive(Debug)]
pub struct RawEdge {
  pub edge_id:    i64,
  pub person_a:   i64,
  pub person_b:   i64,
  pub kind:       String,
  pub created_at: String,
}

impl RawEdge {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      edge_id:    row.get(0)?,
      person_a:   row.get(1)?,
      person_b:   row.get(2)?,
      kind:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_edge(self) -> Result<Edge> {
    Ok(Edge {
      edge_id:    self.edge_id,
      person_a:   PersonId(self.person_a),
      person_b:   PersonId(self.person_b),
      kind:       decode_edge_kind(&self.kind)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
