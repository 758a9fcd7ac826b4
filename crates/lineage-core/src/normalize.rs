//! One-time promotion of legacy embedded fields into persons and edges.
//!
//! Two legacy fields are handled: a JSON list of children embedded on a
//! parent, and a spouse entered by name only. [`plan_parent`] turns one
//! parent's fields into a [`NormalizationPlan`] without touching the store;
//! [`normalize_legacy_fields`] runs the plans for every parent and applies
//! each one atomically.
//!
//! A processed field is cleared in the same transaction that writes its
//! persons and edges, so re-running the batch is a no-op for parents already
//! handled.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  date::GenDate,
  edge::{Edge, EdgeKind},
  person::{
    Gender, LegacyChildRecord, MaritalStatus, NewPerson, Person, PersonId,
    non_blank,
  },
  store::FamilyStore,
};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// One end of a planned edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
  Existing(PersonId),
  /// Index into [`NormalizationPlan::new_persons`].
  Planned(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEdge {
  pub from: EdgeEnd,
  pub to:   EdgeEnd,
  pub kind: EdgeKind,
}

/// A record of work deliberately not done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Skip {
  /// A person with the child's exact full name already exists (or appears
  /// earlier in the same list); neither person nor edge is created.
  ChildExists {
    parent_id:   PersonId,
    name:        String,
    existing_id: Option<PersonId>,
  },
  /// Both spouse rows already link the pair.
  SpouseLinked { person_id: PersonId, spouse_id: PersonId },
  /// The legacy spouse name is the person's own name.
  SelfSpouse { person_id: PersonId },
  /// The named spouse is already linked to the person as parent or child.
  AlreadyRelated { person_id: PersonId, spouse_id: PersonId },
}

/// Every write needed to normalize one parent.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationPlan {
  pub parent_id:      PersonId,
  pub new_persons:    Vec<NewPerson>,
  pub edges:          Vec<PlannedEdge>,
  /// Clear the parent's `legacy_children` field.
  pub clear_children: bool,
  /// Clear the parent's `spouse_name` field.
  pub clear_spouse:   bool,
  pub skipped:        Vec<Skip>,
}

impl NormalizationPlan {
  fn new(parent_id: PersonId) -> Self {
    Self {
      parent_id,
      new_persons: Vec::new(),
      edges: Vec::new(),
      clear_children: false,
      clear_spouse: false,
      skipped: Vec::new(),
    }
  }

  fn plan_person(&mut self, person: NewPerson) -> EdgeEnd {
    self.new_persons.push(person);
    EdgeEnd::Planned(self.new_persons.len() - 1)
  }

  fn link(&mut self, from: EdgeEnd, to: EdgeEnd, kind: EdgeKind) {
    self.edges.push(PlannedEdge { from, to, kind });
  }

  fn planned_named(&self, name: &str) -> Option<usize> {
    self.new_persons.iter().position(|p| p.full_name == name)
  }
}

/// What the store wrote for one plan.
#[derive(Debug, Clone, Default)]
pub struct AppliedPlan {
  /// The planned persons, in plan order.
  pub persons: Vec<Person>,
  pub edges:   Vec<Edge>,
}

// ─── Planning ────────────────────────────────────────────────────────────────

fn parse_error(person_id: PersonId, reason: impl Into<String>) -> Error {
  Error::Parse { person_id, reason: reason.into() }
}

/// Decode a legacy children field. `Ok(None)` when there is nothing to do.
///
/// Old intake forms sometimes stored the list JSON-encoded twice, as a JSON
/// string holding the array; that form is unwrapped once.
fn decode_children(
  person_id: PersonId,
  raw: &str,
) -> Result<Option<Vec<LegacyChildRecord>>> {
  if raw.trim().is_empty() {
    return Ok(None);
  }

  let decode = |s: &str| -> Result<serde_json::Value> {
    serde_json::from_str(s)
      .map_err(|e| parse_error(person_id, format!("children list: {e}")))
  };
  let value = match decode(raw)? {
    serde_json::Value::String(inner) => decode(&inner)?,
    value => value,
  };

  match value {
    serde_json::Value::Null => Ok(None),
    serde_json::Value::Array(items) if items.is_empty() => Ok(None),
    serde_json::Value::Array(items) => items
      .into_iter()
      .enumerate()
      .map(|(i, item)| {
        serde_json::from_value(item)
          .map_err(|e| parse_error(person_id, format!("child #{}: {e}", i + 1)))
      })
      .collect::<Result<Vec<_>>>()
      .map(Some),
    other => Err(parse_error(
      person_id,
      format!("children list must be a JSON array, found {other}"),
    )),
  }
}

fn plan_child(
  plan: &mut NormalizationPlan,
  parent: &Person,
  persons: &[Person],
  child: LegacyChildRecord,
  position: usize,
) -> Result<()> {
  let name = child.full_name.trim();
  if name.is_empty() {
    return Err(parse_error(
      parent.id,
      format!("child #{position} has no full_name"),
    ));
  }

  let birth_date = non_blank(child.birth_date.as_deref())
    .map(|s| s.parse::<GenDate>())
    .transpose()
    .map_err(|e| parse_error(parent.id, format!("child #{position}: {e}")))?;

  let existing = persons.iter().find(|p| p.full_name == name).map(|p| p.id);
  if existing.is_some() || plan.planned_named(name).is_some() {
    plan.skipped.push(Skip::ChildExists {
      parent_id:   parent.id,
      name:        name.to_owned(),
      existing_id: existing,
    });
    return Ok(());
  }

  let mut input = NewPerson::new(
    name,
    child.gender.as_deref().map(Gender::from_loose).unwrap_or_default(),
  );
  input.localized_name = non_blank(child.localized_name.as_deref());
  input.nickname = non_blank(child.nickname.as_deref());
  input.birth_date = birth_date;
  input.notes = format!("Child of {}", parent.full_name);
  input.marital_status = Some(MaritalStatus::Single);
  input.have_children = Some(false);
  match parent.gender {
    Gender::Male => input.father_name = Some(parent.full_name.clone()),
    Gender::Female => input.mother_name = Some(parent.full_name.clone()),
    Gender::Unknown => {}
  }

  let child_end = plan.plan_person(input);
  plan.link(EdgeEnd::Existing(parent.id), child_end, EdgeKind::Parent);
  Ok(())
}

fn plan_spouse(
  plan: &mut NormalizationPlan,
  owner: &Person,
  persons: &[Person],
  edges: &[Edge],
  name: &str,
) {
  if name == owner.full_name {
    plan.skipped.push(Skip::SelfSpouse { person_id: owner.id });
    return;
  }

  let owner_end = EdgeEnd::Existing(owner.id);

  if let Some(spouse) = persons.iter().find(|p| p.full_name == name) {
    let related = edges.iter().any(|e| {
      e.kind != EdgeKind::Spouse && e.connects(owner.id, spouse.id)
    });
    if related {
      plan.skipped.push(Skip::AlreadyRelated {
        person_id: owner.id,
        spouse_id: spouse.id,
      });
      return;
    }

    let has = |a: PersonId, b: PersonId| {
      edges.iter().any(|e| {
        e.kind == EdgeKind::Spouse && e.person_a == a && e.person_b == b
      })
    };
    let forward = has(owner.id, spouse.id);
    let backward = has(spouse.id, owner.id);

    if forward && backward {
      plan.skipped.push(Skip::SpouseLinked {
        person_id: owner.id,
        spouse_id: spouse.id,
      });
    }
    let spouse_end = EdgeEnd::Existing(spouse.id);
    if !forward {
      plan.link(owner_end, spouse_end, EdgeKind::Spouse);
    }
    if !backward {
      plan.link(spouse_end, owner_end, EdgeKind::Spouse);
    }
    return;
  }

  let spouse_end = match plan.planned_named(name) {
    Some(idx) => EdgeEnd::Planned(idx),
    None => {
      let mut input = NewPerson::new(name, owner.gender.opposite());
      input.notes = format!("Spouse of {}", owner.full_name);
      input.marital_status = Some(MaritalStatus::Married);
      plan.plan_person(input)
    }
  };
  plan.link(owner_end, spouse_end, EdgeKind::Spouse);
  plan.link(spouse_end, owner_end, EdgeKind::Spouse);
}

/// Plan the normalization of one parent's legacy fields against a snapshot.
///
/// Returns `Ok(None)` if the parent carries no legacy data. Malformed data
/// fails the whole parent with [`Error::Parse`]; nothing is planned for it.
pub fn plan_parent(
  parent: &Person,
  persons: &[Person],
  edges: &[Edge],
) -> Result<Option<NormalizationPlan>> {
  // A pending field that decodes to an empty list still gets a plan, so the
  // field is cleared and the parent counted.
  let children = match parent.legacy_children.as_deref() {
    Some(raw) if parent.has_pending_children() => {
      Some(decode_children(parent.id, raw)?.unwrap_or_default())
    }
    _ => None,
  };
  let spouse_name = parent.pending_spouse_name();

  if children.is_none() && spouse_name.is_none() {
    return Ok(None);
  }

  let mut plan = NormalizationPlan::new(parent.id);

  if let Some(children) = children {
    for (i, child) in children.into_iter().enumerate() {
      plan_child(&mut plan, parent, persons, child, i + 1)?;
    }
    plan.clear_children = true;
  }

  if let Some(name) = spouse_name {
    plan_spouse(&mut plan, parent, persons, edges, name);
    plan.clear_spouse = true;
  }

  Ok(Some(plan))
}

// ─── Batch driver ────────────────────────────────────────────────────────────

/// A parent that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationIssue {
  pub person_id: PersonId,
  pub message:   String,
}

/// Summary of one [`normalize_legacy_fields`] run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
  pub created_person_ids: Vec<PersonId>,
  pub created_edge_count: usize,
  /// Parents whose plan was committed.
  pub processed_parents:  usize,
  pub skipped:            Vec<Skip>,
  pub errors:             Vec<NormalizationIssue>,
}

/// Normalize every person carrying legacy fields, in id order.
///
/// Each parent's plan is applied atomically. A parent that fails to decode or
/// to commit is logged, recorded in the report, and left untouched so a
/// later run can retry it; the batch carries on. Only failing to read the
/// initial snapshot aborts the run.
///
/// Callers must not run two batches against the same store concurrently.
pub async fn normalize_legacy_fields<S: FamilyStore>(
  store: &S,
) -> Result<NormalizationReport, S::Error> {
  let mut persons = store.list_persons().await?;
  let mut edges = store.list_edges().await?;

  let pending: Vec<PersonId> = persons
    .iter()
    .filter(|p| p.has_legacy_fields())
    .map(|p| p.id)
    .collect();
  info!(parents = pending.len(), "normalizing legacy fields");

  let mut report = NormalizationReport::default();

  for parent_id in pending {
    let Some(parent) = persons.iter().find(|p| p.id == parent_id).cloned() else {
      continue;
    };

    let plan = match plan_parent(&parent, &persons, &edges) {
      Ok(Some(plan)) => plan,
      Ok(None) => continue,
      Err(e) => {
        warn!(person_id = %parent_id, error = %e, "skipping malformed legacy data");
        report.errors.push(NormalizationIssue {
          person_id: parent_id,
          message:   e.to_string(),
        });
        continue;
      }
    };

    let skipped = plan.skipped.clone();
    let (clear_children, clear_spouse) = (plan.clear_children, plan.clear_spouse);

    match store.apply_plan(plan).await {
      Ok(applied) => {
        debug!(
          person_id = %parent_id,
          persons = applied.persons.len(),
          edges = applied.edges.len(),
          "normalized legacy fields"
        );
        report.processed_parents += 1;
        report.created_edge_count += applied.edges.len();
        report
          .created_person_ids
          .extend(applied.persons.iter().map(|p| p.id));
        report.skipped.extend(skipped);

        if let Some(p) = persons.iter_mut().find(|p| p.id == parent_id) {
          if clear_children {
            p.legacy_children = None;
          }
          if clear_spouse {
            p.spouse_name = None;
          }
        }
        persons.extend(applied.persons);
        edges.extend(applied.edges);
      }
      Err(e) => {
        warn!(person_id = %parent_id, error = %e, "failed to apply normalization");
        report.errors.push(NormalizationIssue {
          person_id: parent_id,
          message:   e.to_string(),
        });
      }
    }
  }

  info!(
    created_persons = report.created_person_ids.len(),
    created_edges = report.created_edge_count,
    skipped = report.skipped.len(),
    errors = report.errors.len(),
    "legacy normalization finished"
  );

  Ok(report)
}
