//! GEDCOM 5.5.1 serializer.
//!
//! Output is one line per `\n`, with no blank lines. Values are escaped
//! (`@` doubled), split into `CONT` lines at embedded newlines, and split
//! into `CONC` lines once they pass [`MAX_VALUE_BYTES`].

use std::collections::HashSet;

use chrono::NaiveDate;
use lineage_core::{
  date::GenDate,
  household::HouseholdUnit,
  person::{Gender, Person, PersonId},
};
use tracing::debug;

use crate::{
  ExportConfig, IdOverflow,
  error::{Error, Result},
};

/// Longest value, in escaped bytes, written on a single line.
pub(crate) const MAX_VALUE_BYTES: usize = 200;

const MONTHS: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov",
  "Dec",
];

// ─── Dates ───────────────────────────────────────────────────────────────────

fn month_abbr(month: u32) -> Option<&'static str> {
  let idx = usize::try_from(month).ok()?.checked_sub(1)?;
  MONTHS.get(idx).copied()
}

pub(crate) fn format_naive_date(d: NaiveDate) -> String {
  d.format("%d %b %Y").to_string()
}

/// `DD Mon YYYY`, or `Mon YYYY` / `YYYY` for partially known dates.
pub(crate) fn format_date(d: GenDate) -> String {
  match d {
    GenDate::Full(d) => format_naive_date(d),
    GenDate::YearMonth { year, month } => match month_abbr(month) {
      Some(m) => format!("{m} {year}"),
      None => year.to_string(),
    },
    GenDate::Year(year) => year.to_string(),
  }
}

// ─── Xrefs ───────────────────────────────────────────────────────────────────

/// Hands out `@I…@` and `@F…@` cross-reference ids for one encode call.
pub(crate) struct XrefAllocator {
  overflow:    IdOverflow,
  last_family: i64,
}

impl XrefAllocator {
  pub(crate) fn new(overflow: IdOverflow) -> Self {
    Self { overflow, last_family: 0 }
  }

  fn format(&self, prefix: char, id: i64) -> Result<String> {
    if id < 1 {
      return Err(Error::InvalidId { prefix, id });
    }
    if id > 999 && self.overflow == IdOverflow::Reject {
      return Err(Error::IdOverflow { prefix, id });
    }
    Ok(format!("@{prefix}{id:03}@"))
  }

  pub(crate) fn person(&self, id: PersonId) -> Result<String> {
    self.format('I', id.0)
  }

  /// The next family xref, numbered from 1 in emission order.
  pub(crate) fn next_family(&mut self) -> Result<String> {
    self.last_family += 1;
    self.format('F', self.last_family)
  }
}

// ─── Line writer ─────────────────────────────────────────────────────────────

/// Split `s` into pieces of at most `max` bytes once `@` is doubled,
/// breaking only on char boundaries. Always yields at least one piece.
pub(crate) fn conc_chunks(s: &str, max: usize) -> Vec<&str> {
  let mut chunks = Vec::new();
  let mut start = 0;
  let mut len = 0;

  for (i, ch) in s.char_indices() {
    let width = if ch == '@' { 2 } else { ch.len_utf8() };
    if len + width > max && i > start {
      chunks.push(&s[start..i]);
      start = i;
      len = 0;
    }
    len += width;
  }
  chunks.push(&s[start..]);
  chunks
}

#[derive(Default)]
pub(crate) struct Writer {
  lines: Vec<String>,
}

impl Writer {
  fn raw(&mut self, level: u8, tag: &str, value: &str) {
    if value.is_empty() {
      self.lines.push(format!("{level} {tag}"));
    } else {
      self.lines.push(format!("{level} {tag} {value}"));
    }
  }

  /// `0 @X…@ TAG`
  fn record(&mut self, xref: &str, tag: &str) {
    self.lines.push(format!("0 {xref} {tag}"));
  }

  fn tag(&mut self, level: u8, tag: &str) { self.raw(level, tag, "") }

  /// A pointer value; written verbatim.
  fn pointer(&mut self, level: u8, tag: &str, xref: &str) {
    self.raw(level, tag, xref);
  }

  /// A free-text value with escaping and continuation lines.
  pub(crate) fn value(&mut self, level: u8, tag: &str, value: &str) {
    for (i, segment) in value.split('\n').enumerate() {
      let segment = segment.strip_suffix('\r').unwrap_or(segment);
      let (lvl, t) = if i == 0 { (level, tag) } else { (level + 1, "CONT") };

      for (j, chunk) in conc_chunks(segment, MAX_VALUE_BYTES).into_iter().enumerate() {
        let escaped = chunk.replace('@', "@@");
        if j == 0 {
          self.raw(lvl, t, &escaped);
        } else {
          self.raw(level + 1, "CONC", &escaped);
        }
      }
    }
  }

  pub(crate) fn finish(self) -> String { self.lines.join("\n") }
}

// ─── Records ─────────────────────────────────────────────────────────────────

fn non_empty(s: &Option<String>) -> Option<&str> {
  s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn header(out: &mut Writer, config: &ExportConfig, date: NaiveDate) {
  out.tag(0, "HEAD");
  out.value(1, "SOUR", &config.source_id);
  out.value(2, "NAME", &config.product_name);
  out.value(2, "VERS", &config.product_version);
  out.raw(1, "DEST", "ANSTFILE");
  out.raw(1, "DATE", &format_naive_date(date));
  out.pointer(1, "SUBM", "@SUBM@");
  out.tag(1, "GEDC");
  out.raw(2, "VERS", "5.5.1");
  out.raw(2, "FORM", "LINEAGE-LINKED");
  out.raw(1, "CHAR", "UTF-8");
  out.record("@SUBM@", "SUBM");
  out.value(1, "NAME", &config.submitter);
}

fn event(out: &mut Writer, tag: &str, date: GenDate, place: Option<&str>) {
  out.tag(1, tag);
  out.raw(2, "DATE", &format_date(date));
  if let Some(place) = place {
    out.value(2, "PLAC", place);
  }
}

fn individual(out: &mut Writer, xref: &str, p: &Person) {
  out.record(xref, "INDI");
  out.value(1, "NAME", &p.full_name);
  if let Some(given) = non_empty(&p.localized_name) {
    out.value(2, "GIVN", given);
  }
  if let Some(nick) = non_empty(&p.nickname) {
    out.value(2, "NICK", nick);
  }

  // Anything other than Male is written as F.
  let sex = if p.gender == Gender::Male { "M" } else { "F" };
  out.raw(1, "SEX", sex);

  if let Some(born) = p.birth_date {
    event(out, "BIRT", born, non_empty(&p.birth_place));
  }
  // A recorded death date is ignored while the person is marked alive.
  if let (false, Some(died)) = (p.is_alive, p.death_date) {
    event(out, "DEAT", died, non_empty(&p.death_place));
  }

  if !p.notes.is_empty() {
    out.value(1, "NOTE", &p.notes);
  }
}

/// Encode `persons` and their household units as a complete GEDCOM file.
///
/// Individuals are written in slice order, then one `FAM` per unit, then a
/// block of `FAMS`/`FAMC` back-links pointing each member at its own unit.
pub fn encode(
  persons: &[Person],
  units: &[HouseholdUnit],
  config: &ExportConfig,
  date: NaiveDate,
) -> Result<String> {
  let mut alloc = XrefAllocator::new(config.id_overflow);
  let mut out = Writer::default();

  header(&mut out, config, date);

  let mut exported = HashSet::with_capacity(persons.len());
  for p in persons {
    individual(&mut out, &alloc.person(p.id)?, p);
    exported.insert(p.id);
  }

  let families = units
    .iter()
    .map(|_| alloc.next_family())
    .collect::<Result<Vec<_>>>()?;

  let member = |id: PersonId| -> Result<String> {
    if !exported.contains(&id) {
      return Err(Error::UnknownPerson(id));
    }
    alloc.person(id)
  };

  for (unit, fam) in units.iter().zip(&families) {
    out.record(fam, "FAM");
    if let Some(husband) = unit.husband {
      out.pointer(1, "HUSB", &member(husband)?);
    }
    if let Some(wife) = unit.wife {
      out.pointer(1, "WIFE", &member(wife)?);
    }
    for &child in &unit.children {
      out.pointer(1, "CHIL", &member(child)?);
    }
  }

  for (unit, fam) in units.iter().zip(&families) {
    for spouse in [unit.husband, unit.wife].into_iter().flatten() {
      out.record(&member(spouse)?, "INDI");
      out.pointer(1, "FAMS", fam);
    }
    for &child in &unit.children {
      out.record(&member(child)?, "INDI");
      out.pointer(1, "FAMC", fam);
    }
  }

  out.tag(0, "TRLR");

  debug!(persons = persons.len(), families = families.len(), "encoded GEDCOM");
  Ok(out.finish())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
