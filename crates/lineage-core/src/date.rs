//! Genealogical dates, which are frequently only partially known.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, Result};

/// A calendar date with optional month and day precision.
///
/// Stored and exchanged as `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenDate {
  Year(i32),
  YearMonth { year: i32, month: u32 },
  Full(NaiveDate),
}

impl GenDate {
  pub fn year(&self) -> i32 {
    match self {
      Self::Year(y) => *y,
      Self::YearMonth { year, .. } => *year,
      Self::Full(d) => d.year(),
    }
  }

  /// The month (1–12), if known.
  pub fn month(&self) -> Option<u32> {
    match self {
      Self::Year(_) => None,
      Self::YearMonth { month, .. } => Some(*month),
      Self::Full(d) => Some(d.month()),
    }
  }
}

impl From<NaiveDate> for GenDate {
  fn from(d: NaiveDate) -> Self { Self::Full(d) }
}

fn parse_year(s: &str) -> Option<i32> {
  if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok().filter(|y| *y > 0)
}

impl FromStr for GenDate {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    let invalid = || Error::InvalidDate(s.to_owned());

    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
      [y] => parse_year(y).map(Self::Year).ok_or_else(invalid),
      [y, m] => {
        let year = parse_year(y).ok_or_else(invalid)?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if m.len() != 2 || !(1..=12).contains(&month) {
          return Err(invalid());
        }
        Ok(Self::YearMonth { year, month })
      }
      [y, _, _] => {
        parse_year(y).ok_or_else(invalid)?;
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
          .map(Self::Full)
          .map_err(|_| invalid())
      }
      _ => Err(invalid()),
    }
  }
}

impl fmt::Display for GenDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Year(y) => write!(f, "{y:04}"),
      Self::YearMonth { year, month } => write!(f, "{year:04}-{month:02}"),
      Self::Full(d) => write!(f, "{}", d.format("%Y-%m-%d")),
    }
  }
}

impl Serialize for GenDate {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for GenDate {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
  }
}
