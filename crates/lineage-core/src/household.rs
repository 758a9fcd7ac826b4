//! Grouping of the edge set into household units for export.
//!
//! A household unit is an optional husband, an optional wife, and their
//! children. Units are derived per export and never persisted.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
  edge::{Edge, EdgeKind},
  person::{Gender, Person, PersonId},
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Where the children of a person with more than one spouse are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarriagePolicy {
  /// One unit per couple. A child joins the couple formed with its other
  /// recorded parent. A parent with a single spouse takes the child into
  /// that couple only when the child has no other recorded parent; otherwise
  /// the child joins the parent's single-parent unit.
  #[default]
  PerCouple,
  /// Every child of a parent joins the couple formed by that parent's
  /// earliest spouse edge. A child is placed once, by its first parent edge,
  /// so it is never a child of two units.
  FirstSpouse,
}

// ─── Units ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HouseholdKey {
  /// An unordered spouse pair, lower id first.
  Couple { low: PersonId, high: PersonId },
  /// A parent with no spouse to attach the child to.
  Single { parent: PersonId },
}

impl HouseholdKey {
  pub fn couple(a: PersonId, b: PersonId) -> Self {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    Self::Couple { low, high }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HouseholdUnit {
  pub key:      HouseholdKey,
  pub husband:  Option<PersonId>,
  pub wife:     Option<PersonId>,
  /// In parent-edge creation order, without repeats.
  pub children: Vec<PersonId>,
}

impl HouseholdUnit {
  fn new(key: HouseholdKey) -> Self {
    Self { key, husband: None, wife: None, children: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.husband.is_none() && self.wife.is_none() && self.children.is_empty()
  }
}

/// The result of [`group_households`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Households {
  /// Units in order of first creation.
  pub units:         Vec<HouseholdUnit>,
  /// Ids of edges that were not grouped: self-edges and edges naming a
  /// person absent from the snapshot.
  pub skipped_edges: Vec<i64>,
}

// ─── Role assignment ─────────────────────────────────────────────────────────

/// `(husband, wife)` for a couple. A male partner is the husband and a
/// female partner the wife; ties and unknowns put the lower id as husband.
fn couple_roles(
  (a, ga): (PersonId, Gender),
  (b, gb): (PersonId, Gender),
) -> (PersonId, PersonId) {
  use Gender::*;
  match (ga, gb) {
    (Male, g) if g != Male => (a, b),
    (g, Male) if g != Male => (b, a),
    (Female, g) if g != Female => (b, a),
    (g, Female) if g != Female => (a, b),
    _ if a <= b => (a, b),
    _ => (b, a),
  }
}

// ─── Grouper ─────────────────────────────────────────────────────────────────

struct Grouper {
  genders: HashMap<PersonId, Gender>,
  units:   Vec<HouseholdUnit>,
  index:   HashMap<HouseholdKey, usize>,
}

impl Grouper {
  fn unit(&mut self, key: HouseholdKey) -> &mut HouseholdUnit {
    let idx = *self.index.entry(key).or_insert_with(|| {
      self.units.push(HouseholdUnit::new(key));
      self.units.len() - 1
    });
    &mut self.units[idx]
  }

  fn gender(&self, id: PersonId) -> Gender {
    self.genders.get(&id).copied().unwrap_or_default()
  }

  fn add_couple(&mut self, a: PersonId, b: PersonId) {
    let (husband, wife) = couple_roles((a, self.gender(a)), (b, self.gender(b)));
    let unit = self.unit(HouseholdKey::couple(a, b));
    unit.husband = Some(husband);
    unit.wife = Some(wife);
  }

  fn add_child(&mut self, key: HouseholdKey, child: PersonId) {
    let lone_is_male = match key {
      HouseholdKey::Single { parent } => {
        Some((parent, self.gender(parent) == Gender::Male))
      }
      HouseholdKey::Couple { .. } => None,
    };

    let unit = self.unit(key);
    if let Some((parent, is_male)) = lone_is_male {
      if is_male {
        unit.husband = Some(parent);
      } else {
        unit.wife = Some(parent);
      }
    }
    if !unit.children.contains(&child) {
      unit.children.push(child);
    }
  }
}

/// Partition `edges` into household units.
///
/// Couples are formed from spouse edges first, in edge order. Each parent
/// edge then places its child according to `policy`. Units with no members
/// are dropped. The result depends only on the inputs and their order.
pub fn group_households(
  persons: &[Person],
  edges: &[Edge],
  policy: RemarriagePolicy,
) -> Households {
  let genders: HashMap<PersonId, Gender> =
    persons.iter().map(|p| (p.id, p.gender)).collect();

  let mut skipped_edges = Vec::new();
  let mut valid: Vec<&Edge> = Vec::with_capacity(edges.len());
  for edge in edges {
    let known = genders.contains_key(&edge.person_a)
      && genders.contains_key(&edge.person_b);
    if known && edge.person_a != edge.person_b {
      valid.push(edge);
    } else {
      warn!(edge_id = edge.edge_id, "edge not grouped: dangling or self-referencing");
      skipped_edges.push(edge.edge_id);
    }
  }

  // Spouses per person in order of first spouse edge; parents per child.
  let mut spouses: HashMap<PersonId, Vec<PersonId>> = HashMap::new();
  let mut parents: HashMap<PersonId, Vec<PersonId>> = HashMap::new();
  for edge in &valid {
    let (a, b) = (edge.person_a, edge.person_b);
    match edge.kind {
      EdgeKind::Spouse => {
        push_unique(spouses.entry(a).or_default(), b);
        push_unique(spouses.entry(b).or_default(), a);
      }
      EdgeKind::Parent => push_unique(parents.entry(b).or_default(), a),
    }
  }

  let mut grouper = Grouper { genders, units: Vec::new(), index: HashMap::new() };
  let mut placed: HashSet<PersonId> = HashSet::new();

  for edge in valid.iter().filter(|e| e.kind == EdgeKind::Spouse) {
    grouper.add_couple(edge.person_a, edge.person_b);
  }

  for edge in valid.iter().filter(|e| e.kind == EdgeKind::Parent) {
    let (parent, child) = (edge.person_a, edge.person_b);
    let partners = spouses.get(&parent).map(Vec::as_slice).unwrap_or_default();
    let co_parents = parents.get(&child).map(Vec::as_slice).unwrap_or_default();

    let key = match policy {
      RemarriagePolicy::PerCouple => co_parents
        .iter()
        .find(|q| **q != parent && partners.contains(*q))
        .map(|co| HouseholdKey::couple(parent, *co))
        .or_else(|| match partners {
          [only] if co_parents.iter().all(|q| *q == parent) => {
            Some(HouseholdKey::couple(parent, *only))
          }
          _ => None,
        }),
      RemarriagePolicy::FirstSpouse => {
        if !placed.insert(child) {
          continue;
        }
        partners.first().map(|first| HouseholdKey::couple(parent, *first))
      }
    }
    .unwrap_or(HouseholdKey::Single { parent });

    grouper.add_child(key, child);
  }

  let mut units = grouper.units;
  units.retain(|u| !u.is_empty());

  Households { units, skipped_edges }
}

fn push_unique(list: &mut Vec<PersonId>, id: PersonId) {
  if !list.contains(&id) {
    list.push(id);
  }
}
