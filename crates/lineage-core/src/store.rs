//! The `FamilyStore` trait.
//!
//! Implemented by storage backends (e.g. `lineage-store-sqlite`). The
//! normalizer and the binary depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  edge::{Edge, EdgeKind},
  normalize::{AppliedPlan, NormalizationPlan},
  person::{NewPerson, Person, PersonId},
};

/// Abstraction over a person/edge store.
///
/// Taxonomy errors (validation, missing person, duplicate relationship) are
/// reported through the backend's error type, which must be able to carry a
/// [`crate::Error`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait FamilyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Persons ───────────────────────────────────────────────────────────

  /// Validate and persist a new person. The id is assigned by the store.
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Retrieve a person by id. Returns `None` if not found.
  fn get_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// All persons, ordered by id.
  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Replace every editable field of an existing person.
  fn update_person(
    &self,
    id: PersonId,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Delete a person and every edge that references it. Returns the number of
  /// edges removed alongside the person.
  fn delete_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Edges ─────────────────────────────────────────────────────────────

  /// Link `member` to `related`.
  ///
  /// - [`EdgeKind::Parent`]: `related` becomes a parent of `member`.
  /// - [`EdgeKind::Spouse`]: both directed rows are written.
  ///
  /// Fails if either person is missing, if `member == related`, or if any
  /// edge already links the pair in either direction.
  fn add_relationship(
    &self,
    member: PersonId,
    related: PersonId,
    kind: EdgeKind,
  ) -> impl Future<Output = Result<Vec<Edge>, Self::Error>> + Send + '_;

  /// All edges in creation order.
  fn list_edges(
    &self,
  ) -> impl Future<Output = Result<Vec<Edge>, Self::Error>> + Send + '_;

  // ── Normalization ─────────────────────────────────────────────────────

  /// Apply one parent's normalization plan atomically: create the planned
  /// persons and edges and clear the parent's processed legacy fields, or
  /// write nothing at all.
  fn apply_plan(
    &self,
    plan: NormalizationPlan,
  ) -> impl Future<Output = Result<AppliedPlan, Self::Error>> + Send + '_;
}
