//! Integration tests for `SqliteStore` against an in-memory database.

use std::future::Future;

use lineage_core::{
  date::GenDate,
  edge::{Edge, EdgeKind},
  normalize::{
    AppliedPlan, EdgeEnd, NormalizationPlan, PlannedEdge, normalize_legacy_fields,
  },
  person::{Gender, MaritalStatus, NewPerson, Person, PersonId},
  store::FamilyStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn add(s: &SqliteStore, name: &str, gender: Gender) -> PersonId {
  s.add_person(NewPerson::new(name, gender)).await.unwrap().id
}

fn is_core(e: &Error, check: impl Fn(&lineage_core::Error) -> bool) -> bool {
  e.as_core().is_some_and(check)
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_person() {
  let s = store().await;

  let mut input = NewPerson::new("  John Doe ", Gender::Male);
  input.birth_date = Some("1950-03-05".parse().unwrap());
  input.death_date = Some(GenDate::Year(2001));
  input.marital_status = Some(MaritalStatus::Married);
  input.nickname = Some("Jack".into());

  let added = s.add_person(input).await.unwrap();
  assert_eq!(added.full_name, "John Doe");
  assert!(added.is_alive);

  let fetched = s.get_person(added.id).await.unwrap().unwrap();
  assert_eq!(fetched, added);
  assert_eq!(fetched.death_date, Some(GenDate::Year(2001)));
}

#[tokio::test]
async fn get_missing_person_returns_none() {
  let s = store().await;
  assert!(s.get_person(PersonId(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn blank_full_name_is_rejected() {
  let s = store().await;
  let err = s
    .add_person(NewPerson::new("   ", Gender::Unknown))
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(e, lineage_core::Error::Validation(_))));
  assert!(s.list_persons().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_persons_is_ordered_by_id() {
  let s = store().await;
  let a = add(&s, "A", Gender::Male).await;
  let b = add(&s, "B", Gender::Female).await;
  let c = add(&s, "C", Gender::Unknown).await;

  let ids: Vec<PersonId> = s.list_persons().await.unwrap().iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![a, b, c]);
}

#[tokio::test]
async fn update_replaces_fields_and_keeps_created_at() {
  let s = store().await;
  let added = s
    .add_person(NewPerson::new("Jane Roe", Gender::Female))
    .await
    .unwrap();

  let mut edit = added.to_new();
  edit.full_name = "Jane Doe".into();
  edit.notes = "married name".into();
  let updated = s.update_person(added.id, edit).await.unwrap();

  assert_eq!(updated.full_name, "Jane Doe");
  assert_eq!(updated.notes, "married name");
  assert_eq!(updated.created_at, added.created_at);
  assert_eq!(s.get_person(added.id).await.unwrap().unwrap(), updated);
}

#[tokio::test]
async fn update_missing_person_fails() {
  let s = store().await;
  let err = s
    .update_person(PersonId(9), NewPerson::new("Ghost", Gender::Unknown))
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(
    e,
    lineage_core::Error::PersonNotFound(PersonId(9))
  )));
}

#[tokio::test]
async fn delete_cascades_to_edges_and_ids_are_not_reused() {
  let s = store().await;
  let father = add(&s, "Father", Gender::Male).await;
  let mother = add(&s, "Mother", Gender::Female).await;
  let child = add(&s, "Child", Gender::Unknown).await;
  s.add_relationship(mother, father, EdgeKind::Spouse).await.unwrap();
  s.add_relationship(child, father, EdgeKind::Parent).await.unwrap();
  s.add_relationship(child, mother, EdgeKind::Parent).await.unwrap();

  let removed = s.delete_person(father).await.unwrap();
  assert_eq!(removed, 3);

  let edges = s.list_edges().await.unwrap();
  assert_eq!(edges.len(), 1);
  assert!(edges.iter().all(|e| !e.involves(father)));

  let next = add(&s, "Newcomer", Gender::Male).await;
  assert!(next.0 > child.0);
}

#[tokio::test]
async fn delete_missing_person_fails() {
  let s = store().await;
  let err = s.delete_person(PersonId(1)).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, lineage_core::Error::PersonNotFound(_))));
}

// ─── Relationships ───────────────────────────────────────────────────────────

#[tokio::test]
async fn parent_relationship_points_parent_to_child() {
  let s = store().await;
  let child = add(&s, "Child", Gender::Female).await;
  let parent = add(&s, "Parent", Gender::Male).await;

  let edges = s
    .add_relationship(child, parent, EdgeKind::Parent)
    .await
    .unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!((edges[0].person_a, edges[0].person_b), (parent, child));
  assert_eq!(s.list_edges().await.unwrap(), edges);
}

#[tokio::test]
async fn spouse_relationship_writes_both_directions() {
  let s = store().await;
  let a = add(&s, "A", Gender::Male).await;
  let b = add(&s, "B", Gender::Female).await;

  let edges = s.add_relationship(a, b, EdgeKind::Spouse).await.unwrap();
  let pairs: Vec<_> = edges.iter().map(|e| (e.person_a, e.person_b)).collect();
  assert_eq!(pairs, vec![(a, b), (b, a)]);
  assert!(edges.iter().all(|e| e.kind == EdgeKind::Spouse));
}

#[tokio::test]
async fn duplicate_relationship_in_either_direction_is_rejected() {
  let s = store().await;
  let a = add(&s, "A", Gender::Male).await;
  let b = add(&s, "B", Gender::Female).await;
  s.add_relationship(a, b, EdgeKind::Parent).await.unwrap();

  for (x, y, kind) in [
    (a, b, EdgeKind::Parent),
    (b, a, EdgeKind::Parent),
    (b, a, EdgeKind::Spouse),
  ] {
    let err = s.add_relationship(x, y, kind).await.unwrap_err();
    assert!(is_core(&err, |e| matches!(
      e,
      lineage_core::Error::DuplicateRelationship { .. }
    )));
  }
  assert_eq!(s.list_edges().await.unwrap().len(), 1);
}

#[tokio::test]
async fn relationship_with_missing_person_fails() {
  let s = store().await;
  let a = add(&s, "A", Gender::Male).await;

  let err = s
    .add_relationship(a, PersonId(99), EdgeKind::Spouse)
    .await
    .unwrap_err();
  assert!(is_core(&err, |e| matches!(
    e,
    lineage_core::Error::PersonNotFound(PersonId(99))
  )));
  assert!(s.list_edges().await.unwrap().is_empty());
}

#[tokio::test]
async fn self_relationship_is_rejected() {
  let s = store().await;
  let a = add(&s, "A", Gender::Male).await;
  let err = s.add_relationship(a, a, EdgeKind::Spouse).await.unwrap_err();
  assert!(is_core(&err, |e| matches!(e, lineage_core::Error::Validation(_))));
}

// ─── Legacy normalization ────────────────────────────────────────────────────

async fn add_legacy(
  s: &SqliteStore,
  name: &str,
  gender: Gender,
  spouse: Option<&str>,
  children: Option<&str>,
) -> PersonId {
  let mut input = NewPerson::new(name, gender);
  input.spouse_name = spouse.map(Into::into);
  input.legacy_children = children.map(Into::into);
  s.add_person(input).await.unwrap().id
}

#[tokio::test]
async fn spouse_name_creates_one_opposite_gender_spouse() {
  let s = store().await;
  let john = add_legacy(&s, "John Doe", Gender::Male, Some("Jane Doe"), None).await;

  let report = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(report.processed_parents, 1);
  assert_eq!(report.created_person_ids.len(), 1);
  assert_eq!(report.created_edge_count, 2);
  assert!(report.errors.is_empty());

  let persons = s.list_persons().await.unwrap();
  let jane = persons.iter().find(|p| p.full_name == "Jane Doe").unwrap();
  assert_eq!(jane.gender, Gender::Female);
  assert_eq!(jane.marital_status, Some(MaritalStatus::Married));
  assert_eq!(jane.notes, "Spouse of John Doe");

  let edges = s.list_edges().await.unwrap();
  assert_eq!(edges.len(), 2);
  assert!(edges.iter().all(|e| e.kind == EdgeKind::Spouse && e.connects(john, jane.id)));

  let john = s.get_person(john).await.unwrap().unwrap();
  assert!(john.spouse_name.is_none());
}

#[tokio::test]
async fn children_list_is_normalized_once() {
  let s = store().await;
  let children = r#"[{"full_name":"Jack Doe","gender":"Male","birth_date":"1980"}]"#;
  let john = add_legacy(&s, "John Doe", Gender::Male, None, Some(children)).await;

  normalize_legacy_fields(&s).await.unwrap();
  let second = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(second.processed_parents, 0);
  assert!(second.created_person_ids.is_empty());
  assert_eq!(second.created_edge_count, 0);

  let persons = s.list_persons().await.unwrap();
  let jacks: Vec<_> = persons.iter().filter(|p| p.full_name == "Jack Doe").collect();
  assert_eq!(jacks.len(), 1);
  assert_eq!(jacks[0].father_name.as_deref(), Some("John Doe"));
  assert_eq!(jacks[0].birth_date, Some(GenDate::Year(1980)));

  let edges = s.list_edges().await.unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!((edges[0].person_a, edges[0].person_b), (john, jacks[0].id));
  assert_eq!(edges[0].kind, EdgeKind::Parent);

  let john = s.get_person(john).await.unwrap().unwrap();
  assert!(!john.has_legacy_fields());
}

#[tokio::test]
async fn malformed_parent_is_reported_and_batch_continues() {
  let s = store().await;
  let broken = add_legacy(&s, "Broken", Gender::Male, None, Some("{not json")).await;
  add_legacy(&s, "Mary Roe", Gender::Female, Some("Tom Roe"), None).await;

  let report = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(report.errors.len(), 1);
  assert_eq!(report.errors[0].person_id, broken);
  assert_eq!(report.processed_parents, 1);

  let tom = s
    .list_persons()
    .await
    .unwrap()
    .into_iter()
    .find(|p| p.full_name == "Tom Roe")
    .unwrap();
  assert_eq!(tom.gender, Gender::Male);

  let broken = s.get_person(broken).await.unwrap().unwrap();
  assert_eq!(broken.legacy_children.as_deref(), Some("{not json"));
}

#[tokio::test]
async fn spouses_naming_each_other_end_up_linked_once() {
  let s = store().await;
  add_legacy(&s, "John Doe", Gender::Male, Some("Jane Doe"), None).await;
  add_legacy(&s, "Jane Doe", Gender::Female, Some("John Doe"), None).await;

  normalize_legacy_fields(&s).await.unwrap();

  assert_eq!(s.list_persons().await.unwrap().len(), 2);
  assert_eq!(s.list_edges().await.unwrap().len(), 2);
  assert!(
    s.list_persons()
      .await
      .unwrap()
      .iter()
      .all(|p| !p.has_legacy_fields())
  );
}

#[tokio::test]
async fn empty_children_list_is_cleared_and_counted() {
  let s = store().await;
  let parent = add_legacy(&s, "Juan", Gender::Male, None, Some("\"[]\"")).await;

  let first = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(first.processed_parents, 1);
  assert!(first.created_person_ids.is_empty());
  assert!(first.errors.is_empty());

  let parent = s.get_person(parent).await.unwrap().unwrap();
  assert_eq!(parent.legacy_children, None);

  let second = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(second.processed_parents, 0);
}

#[tokio::test]
async fn failed_plan_rolls_back_every_write() {
  let s = store().await;
  let children = r#"[{"full_name":"Jack Doe"}]"#;
  let john = add_legacy(&s, "John Doe", Gender::Male, Some("Jane Doe"), Some(children)).await;

  let mut plan = NormalizationPlan {
    parent_id:      john,
    new_persons:    vec![NewPerson::new("Jack Doe", Gender::Male)],
    edges:          vec![PlannedEdge {
      from: EdgeEnd::Existing(john),
      to:   EdgeEnd::Planned(0),
      kind: EdgeKind::Parent,
    }],
    clear_children: true,
    clear_spouse:   true,
    skipped:        Vec::new(),
  };
  // The second edge names a person that does not exist.
  plan.edges.push(PlannedEdge {
    from: EdgeEnd::Existing(PersonId(999)),
    to:   EdgeEnd::Planned(0),
    kind: EdgeKind::Parent,
  });

  assert!(s.apply_plan(plan).await.is_err());

  let persons = s.list_persons().await.unwrap();
  assert_eq!(persons.len(), 1);
  assert!(s.list_edges().await.unwrap().is_empty());
  assert_eq!(persons[0].legacy_children.as_deref(), Some(children));
  assert_eq!(persons[0].spouse_name.as_deref(), Some("Jane Doe"));
}

/// Delegates to a `SqliteStore` but fails every plan for one parent.
struct FailingCommit {
  inner:    SqliteStore,
  fail_for: PersonId,
}

impl FamilyStore for FailingCommit {
  type Error = Error;

  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Error>> + Send + '_ {
    self.inner.add_person(input)
  }

  fn get_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Error>> + Send + '_ {
    self.inner.get_person(id)
  }

  fn list_persons(&self) -> impl Future<Output = Result<Vec<Person>, Error>> + Send + '_ {
    self.inner.list_persons()
  }

  fn update_person(
    &self,
    id: PersonId,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Error>> + Send + '_ {
    self.inner.update_person(id, input)
  }

  fn delete_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<usize, Error>> + Send + '_ {
    self.inner.delete_person(id)
  }

  fn add_relationship(
    &self,
    member: PersonId,
    related: PersonId,
    kind: EdgeKind,
  ) -> impl Future<Output = Result<Vec<Edge>, Error>> + Send + '_ {
    self.inner.add_relationship(member, related, kind)
  }

  fn list_edges(&self) -> impl Future<Output = Result<Vec<Edge>, Error>> + Send + '_ {
    self.inner.list_edges()
  }

  async fn apply_plan(&self, mut plan: NormalizationPlan) -> Result<AppliedPlan, Error> {
    if plan.parent_id == self.fail_for {
      plan.edges.push(PlannedEdge {
        from: EdgeEnd::Existing(PersonId(999)),
        to:   EdgeEnd::Existing(plan.parent_id),
        kind: EdgeKind::Parent,
      });
    }
    self.inner.apply_plan(plan).await
  }
}

#[tokio::test]
async fn failed_commit_keeps_fields_and_batch_continues() {
  let s = store().await;
  let children = r#"[{"full_name":"Jack Doe"}]"#;
  let john = add_legacy(&s, "John Doe", Gender::Male, Some("Jane Doe"), Some(children)).await;
  let mary = add_legacy(&s, "Mary Roe", Gender::Female, Some("Tom Roe"), None).await;
  let s = FailingCommit { inner: s, fail_for: john };

  let report = normalize_legacy_fields(&s).await.unwrap();
  assert_eq!(report.errors.len(), 1);
  assert_eq!(report.errors[0].person_id, john);
  assert_eq!(report.processed_parents, 1);
  assert_eq!(report.created_edge_count, 2);

  let names: Vec<String> = s
    .list_persons()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.full_name)
    .collect();
  assert_eq!(names, vec!["John Doe", "Mary Roe", "Tom Roe"]);

  let john = s.get_person(john).await.unwrap().unwrap();
  assert_eq!(john.legacy_children.as_deref(), Some(children));
  assert_eq!(john.spouse_name.as_deref(), Some("Jane Doe"));
  assert!(!s.get_person(mary).await.unwrap().unwrap().has_legacy_fields());
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn normalized_family_exports_as_one_household() {
  let s = store().await;
  let children = r#"[{"full_name":"Jack Doe","gender":"Male"}]"#;
  add_legacy(&s, "John Doe", Gender::Male, Some("Jane Doe"), Some(children)).await;
  normalize_legacy_fields(&s).await.unwrap();

  let persons = s.list_persons().await.unwrap();
  let edges = s.list_edges().await.unwrap();
  let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
  let out = lineage_gedcom::export_gedcom(
    &persons,
    &edges,
    &lineage_gedcom::ExportConfig::default(),
    date,
  )
  .unwrap();

  // John is 1; Jack (child) is planned before Jane (spouse), so 2 and 3.
  assert!(out.contains("0 @F001@ FAM\n1 HUSB @I001@\n1 WIFE @I003@\n1 CHIL @I002@"));
  assert_eq!(out.matches(" FAM\n").count(), 1);
  assert!(out.starts_with("0 HEAD\n"));
  assert!(out.ends_with("\n0 TRLR"));
}
