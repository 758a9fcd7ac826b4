//! Person records and the legacy fields carried on them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, date::GenDate};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned person id. Monotonic and never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
  Male,
  Female,
  #[default]
  Unknown,
}

impl Gender {
  /// The gender assumed for a spouse known only by name.
  pub fn opposite(self) -> Self {
    match self {
      Self::Male => Self::Female,
      Self::Female | Self::Unknown => Self::Male,
    }
  }

  /// Lenient parse for free-text form input; anything unrecognised is
  /// [`Gender::Unknown`].
  pub fn from_loose(s: &str) -> Self { s.trim().parse().unwrap_or_default() }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum MaritalStatus {
  Single,
  Married,
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// A persisted person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub id:              PersonId,
  pub full_name:       String,
  /// The name in another script, e.g. a Chinese rendering.
  pub localized_name:  Option<String>,
  pub nickname:        Option<String>,
  pub gender:          Gender,
  pub birth_date:      Option<GenDate>,
  pub birth_place:     Option<String>,
  pub death_date:      Option<GenDate>,
  pub death_place:     Option<String>,
  pub is_alive:        bool,
  pub notes:           String,
  pub marital_status:  Option<MaritalStatus>,
  pub father_name:     Option<String>,
  pub mother_name:     Option<String>,
  pub have_children:   Option<bool>,
  /// Legacy: a spouse entered by name only. Cleared once normalized.
  pub spouse_name:     Option<String>,
  /// Legacy: raw JSON array of embedded child descriptors. Cleared once
  /// normalized.
  pub legacy_children: Option<String>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Person {
  /// Materialise a stored record from its input fields.
  pub fn from_new(id: PersonId, input: NewPerson, at: DateTime<Utc>) -> Self {
    Self {
      id,
      full_name: input.full_name,
      localized_name: input.localized_name,
      nickname: input.nickname,
      gender: input.gender,
      birth_date: input.birth_date,
      birth_place: input.birth_place,
      death_date: input.death_date,
      death_place: input.death_place,
      is_alive: input.is_alive,
      notes: input.notes,
      marital_status: input.marital_status,
      father_name: input.father_name,
      mother_name: input.mother_name,
      have_children: input.have_children,
      spouse_name: input.spouse_name,
      legacy_children: input.legacy_children,
      created_at: at,
      updated_at: at,
    }
  }

  /// Every name this person is known by, full name first.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.full_name.as_str())
      .chain(self.localized_name.as_deref())
      .chain(self.nickname.as_deref())
  }

  /// The legacy spouse name, if it still needs normalizing.
  pub fn pending_spouse_name(&self) -> Option<&str> {
    self
      .spouse_name
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty() && *s != "undefined")
  }

  /// Whether the legacy children field holds anything worth decoding.
  pub fn has_pending_children(&self) -> bool {
    self
      .legacy_children
      .as_deref()
      .map(str::trim)
      .is_some_and(|s| !matches!(s, "" | "[]" | "null"))
  }

  pub fn has_legacy_fields(&self) -> bool {
    self.has_pending_children() || self.pending_spouse_name().is_some()
  }

  /// The editable fields of this record, e.g. as the base of an update.
  pub fn to_new(&self) -> NewPerson {
    NewPerson {
      full_name:       self.full_name.clone(),
      localized_name:  self.localized_name.clone(),
      nickname:        self.nickname.clone(),
      gender:          self.gender,
      birth_date:      self.birth_date,
      birth_place:     self.birth_place.clone(),
      death_date:      self.death_date,
      death_place:     self.death_place.clone(),
      is_alive:        self.is_alive,
      notes:           self.notes.clone(),
      marital_status:  self.marital_status,
      father_name:     self.father_name.clone(),
      mother_name:     self.mother_name.clone(),
      have_children:   self.have_children,
      spouse_name:     self.spouse_name.clone(),
      legacy_children: self.legacy_children.clone(),
    }
  }
}

// ─── NewPerson ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::FamilyStore::add_person`] and
/// [`crate::store::FamilyStore::update_person`]. Ids and timestamps are always
/// set by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
  pub full_name:       String,
  #[serde(default, alias = "chinese_name")]
  pub localized_name:  Option<String>,
  #[serde(default)]
  pub nickname:        Option<String>,
  pub gender:          Gender,
  #[serde(default)]
  pub birth_date:      Option<GenDate>,
  #[serde(default)]
  pub birth_place:     Option<String>,
  #[serde(default)]
  pub death_date:      Option<GenDate>,
  #[serde(default)]
  pub death_place:     Option<String>,
  #[serde(default = "alive")]
  pub is_alive:        bool,
  #[serde(default)]
  pub notes:           String,
  #[serde(default)]
  pub marital_status:  Option<MaritalStatus>,
  #[serde(default)]
  pub father_name:     Option<String>,
  #[serde(default)]
  pub mother_name:     Option<String>,
  #[serde(default)]
  pub have_children:   Option<bool>,
  #[serde(default)]
  pub spouse_name:     Option<String>,
  #[serde(default)]
  pub legacy_children: Option<String>,
}

fn alive() -> bool { true }

impl NewPerson {
  /// Convenience constructor: a living person with every optional field empty.
  pub fn new(full_name: impl Into<String>, gender: Gender) -> Self {
    Self {
      full_name: full_name.into(),
      localized_name: None,
      nickname: None,
      gender,
      birth_date: None,
      birth_place: None,
      death_date: None,
      death_place: None,
      is_alive: true,
      notes: String::new(),
      marital_status: None,
      father_name: None,
      mother_name: None,
      have_children: None,
      spouse_name: None,
      legacy_children: None,
    }
  }

  /// Reject records the store must never hold.
  pub fn validate(&self) -> Result<()> {
    if self.full_name.trim().is_empty() {
      return Err(Error::Validation("full_name is required".into()));
    }
    Ok(())
  }
}

// ─── Legacy embedded children ────────────────────────────────────────────────

/// One entry of a parent's legacy children list, as captured by the old
/// intake form. Every field is optional on the wire; the normalizer decides
/// what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyChildRecord {
  #[serde(default)]
  pub full_name:      String,
  #[serde(default, alias = "chinese_name")]
  pub localized_name: Option<String>,
  #[serde(default)]
  pub nickname:       Option<String>,
  #[serde(default)]
  pub gender:         Option<String>,
  #[serde(default)]
  pub birth_date:     Option<String>,
}

/// `Some(trimmed)` if `s` has visible content.
pub(crate) fn non_blank(s: Option<&str>) -> Option<String> {
  s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn person(spouse: Option<&str>, children: Option<&str>) -> Person {
    let mut input = NewPerson::new("Juan Santos", Gender::Male);
    input.spouse_name = spouse.map(str::to_owned);
    input.legacy_children = children.map(str::to_owned);
    Person::from_new(PersonId(1), input, Utc::now())
  }

  #[test]
  fn gender_parsing_is_lenient() {
    assert_eq!(Gender::from_loose("male"), Gender::Male);
    assert_eq!(Gender::from_loose(" Female "), Gender::Female);
    assert_eq!(Gender::from_loose(""), Gender::Unknown);
    assert_eq!(Gender::from_loose("other"), Gender::Unknown);
    assert_eq!(Gender::Unknown.opposite(), Gender::Male);
  }

  #[test]
  fn blank_and_placeholder_spouse_names_are_not_pending() {
    assert_eq!(person(Some("  "), None).pending_spouse_name(), None);
    assert_eq!(person(Some("undefined"), None).pending_spouse_name(), None);
    assert_eq!(
      person(Some(" Maria Cruz "), None).pending_spouse_name(),
      Some("Maria Cruz")
    );
  }

  #[test]
  fn empty_children_lists_are_not_pending() {
    for raw in ["", "[]", "null", "  "] {
      assert!(!person(None, Some(raw)).has_legacy_fields(), "{raw:?}");
    }
    assert!(person(None, Some(r#"[{"full_name":"Ana"}]"#)).has_legacy_fields());
  }

  #[test]
  fn validate_requires_full_name() {
    assert!(NewPerson::new("  ", Gender::Female).validate().is_err());
    assert!(NewPerson::new("Ana", Gender::Female).validate().is_ok());
  }

  #[test]
  fn new_person_accepts_original_form_field_names() {
    let input: NewPerson = serde_json::from_str(
      r#"{"full_name":"Ana","chinese_name":"安娜","gender":"Female"}"#,
    )
    .unwrap();
    assert_eq!(input.localized_name.as_deref(), Some("安娜"));
    assert!(input.is_alive);
  }
}
