//! Name matching over a snapshot of persons.
//!
//! Matching is a plain case-insensitive substring test. There is no ranking;
//! results come back in snapshot order.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  edge::EdgeKind,
  person::{Person, PersonId},
};

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
  haystack.to_lowercase().contains(needle_lower)
}

/// Persons whose full name, localized name, or nickname contains `name`.
///
/// Used to flag likely duplicates before an insert. A blank query is an
/// error, not an empty result.
pub fn find_similar<'a>(persons: &'a [Person], name: &str) -> Result<Vec<&'a Person>> {
  let needle = name.trim().to_lowercase();
  if needle.is_empty() {
    return Err(Error::Validation("name is required".into()));
  }

  Ok(
    persons
      .iter()
      .filter(|p| p.names().any(|n| contains_ci(n, &needle)))
      .collect(),
  )
}

// ─── Relationship suggestions ────────────────────────────────────────────────

/// The role a suggested candidate would play for the member.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Relation {
  Father,
  Mother,
  Spouse,
}

impl Relation {
  pub fn edge_kind(self) -> EdgeKind {
    match self {
      Self::Father | Self::Mother => EdgeKind::Parent,
      Self::Spouse => EdgeKind::Spouse,
    }
  }
}

/// Free-text relative names typed on an intake form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionRequest {
  /// The person being described; never suggested as their own relative.
  pub member_id:   Option<PersonId>,
  pub father_name: Option<String>,
  pub mother_name: Option<String>,
  pub spouse_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
  #[serde(rename = "type")]
  pub kind:         EdgeKind,
  pub relationship: Relation,
  pub candidate:    Person,
}

/// Candidate relatives for each non-blank name in `request`: fathers first,
/// then mothers, then spouses. Only full names are matched.
pub fn suggest_relationships(
  persons: &[Person],
  request: &SuggestionRequest,
) -> Vec<Suggestion> {
  let wanted = [
    (Relation::Father, request.father_name.as_deref()),
    (Relation::Mother, request.mother_name.as_deref()),
    (Relation::Spouse, request.spouse_name.as_deref()),
  ];

  let mut suggestions = Vec::new();
  for (relationship, name) in wanted {
    let Some(needle) = name.map(|n| n.trim().to_lowercase()) else {
      continue;
    };
    if needle.is_empty() {
      continue;
    }

    suggestions.extend(
      persons
        .iter()
        .filter(|p| Some(p.id) != request.member_id)
        .filter(|p| contains_ci(&p.full_name, &needle))
        .map(|p| Suggestion {
          kind: relationship.edge_kind(),
          relationship,
          candidate: p.clone(),
        }),
    );
  }
  suggestions
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{person::Gender, test_helpers::person};

  fn people() -> Vec<Person> {
    let mut juan = person(1, "Juan Santos TU SANG", Gender::Male);
    juan.nickname = Some("Papa Juan".into());
    let mut maria = person(2, "Maria Cruz TU SANG", Gender::Female);
    maria.localized_name = Some("玛丽亚".into());
    let carlos = person(3, "Carlos TU SANG", Gender::Male);
    vec![juan, maria, carlos]
  }

  #[test]
  fn blank_query_is_an_error() {
    assert!(matches!(
      find_similar(&people(), "   "),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn no_match_is_empty() {
    assert!(find_similar(&people(), "Nobody").unwrap().is_empty());
  }

  #[test]
  fn matches_any_name_case_insensitively() {
    let persons = people();
    let ids = |q: &str| -> Vec<i64> {
      find_similar(&persons, q).unwrap().iter().map(|p| p.id.0).collect()
    };

    assert_eq!(ids("tu sang"), vec![1, 2, 3]);
    assert_eq!(ids("papa"), vec![1]);
    assert_eq!(ids("玛丽"), vec![2]);
  }

  #[test]
  fn a_person_matching_several_names_appears_once() {
    let mut persons = people();
    persons[0].nickname = Some("Juan".into());
    let found = find_similar(&persons, "juan").unwrap();
    assert_eq!(found.len(), 1);
  }

  #[test]
  fn suggestions_are_grouped_by_relation_in_order() {
    let request = SuggestionRequest {
      member_id:   Some(PersonId(3)),
      father_name: Some("Juan".into()),
      mother_name: Some("maria".into()),
      spouse_name: Some("tu sang".into()),
    };
    let got = suggest_relationships(&people(), &request);
    let summary: Vec<(Relation, EdgeKind, i64)> = got
      .iter()
      .map(|s| (s.relationship, s.kind, s.candidate.id.0))
      .collect();

    assert_eq!(
      summary,
      vec![
        (Relation::Father, EdgeKind::Parent, 1),
        (Relation::Mother, EdgeKind::Parent, 2),
        (Relation::Spouse, EdgeKind::Spouse, 1),
        (Relation::Spouse, EdgeKind::Spouse, 2),
      ]
    );
  }

  #[test]
  fn suggestions_ignore_blank_names_and_other_name_fields() {
    let request = SuggestionRequest {
      father_name: Some("  ".into()),
      mother_name: Some("玛丽亚".into()),
      ..Default::default()
    };
    assert!(suggest_relationships(&people(), &request).is_empty());
  }
}
