//! Person fields shared by `add` and `edit`.

use std::{io::Read as _, path::Path};

use anyhow::Context as _;
use clap::Args;
use lineage_core::{
  date::GenDate,
  person::{Gender, MaritalStatus, NewPerson},
};

/// Optional overrides for a person record. An empty string clears a text
/// field.
#[derive(Args, Debug, Default)]
pub struct PersonFields {
  #[arg(long)]
  gender:          Option<Gender>,
  #[arg(long, alias = "chinese-name")]
  localized_name:  Option<String>,
  #[arg(long)]
  nickname:        Option<String>,
  /// YYYY, YYYY-MM or YYYY-MM-DD.
  #[arg(long)]
  birth_date:      Option<GenDate>,
  #[arg(long)]
  birth_place:     Option<String>,
  #[arg(long)]
  death_date:      Option<GenDate>,
  #[arg(long)]
  death_place:     Option<String>,
  #[arg(long)]
  alive:           Option<bool>,
  #[arg(long)]
  notes:           Option<String>,
  #[arg(long)]
  marital_status:  Option<MaritalStatus>,
  #[arg(long)]
  father_name:     Option<String>,
  #[arg(long)]
  mother_name:     Option<String>,
  #[arg(long)]
  have_children:   Option<bool>,
  /// Legacy spouse name, turned into a person by `normalize`.
  #[arg(long)]
  spouse_name:     Option<String>,
  /// Legacy children as a JSON array, turned into persons by `normalize`.
  #[arg(long, value_name = "JSON")]
  children:        Option<String>,
}

fn text(value: String) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl PersonFields {
  pub fn apply(self, target: &mut NewPerson) {
    let set = |slot: &mut Option<String>, value: Option<String>| {
      if let Some(value) = value {
        *slot = text(value);
      }
    };

    if let Some(gender) = self.gender {
      target.gender = gender;
    }
    set(&mut target.localized_name, self.localized_name);
    set(&mut target.nickname, self.nickname);
    if let Some(date) = self.birth_date {
      target.birth_date = Some(date);
    }
    set(&mut target.birth_place, self.birth_place);
    if let Some(date) = self.death_date {
      target.death_date = Some(date);
    }
    set(&mut target.death_place, self.death_place);
    if let Some(alive) = self.alive {
      target.is_alive = alive;
    }
    if let Some(notes) = self.notes {
      target.notes = notes;
    }
    if let Some(status) = self.marital_status {
      target.marital_status = Some(status);
    }
    set(&mut target.father_name, self.father_name);
    set(&mut target.mother_name, self.mother_name);
    if let Some(flag) = self.have_children {
      target.have_children = Some(flag);
    }
    set(&mut target.spouse_name, self.spouse_name);
    set(&mut target.legacy_children, self.children);
  }
}

/// Read a [`NewPerson`] from a JSON file, or from stdin when `path` is `-`.
///
/// Field names from the old intake form (`chinese_name`) are accepted.
pub fn read_person_json(path: &Path) -> anyhow::Result<NewPerson> {
  let raw = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("failed to read stdin")?;
    buf
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?
  };
  serde_json::from_str(&raw).context("failed to parse person JSON")
}
