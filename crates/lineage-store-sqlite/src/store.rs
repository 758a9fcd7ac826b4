//! [`SqliteStore`], the SQLite implementation of [`FamilyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use lineage_core::{
  edge::{Edge, EdgeKind},
  normalize::{AppliedPlan, EdgeEnd, NormalizationPlan},
  person::{NewPerson, Person, PersonId},
  store::FamilyStore,
};

use crate::{
  Error, Result,
  encode::{EDGE_COLUMNS, PERSON_COLUMNS, PersonColumns, RawEdge, RawPerson, encode_dt},
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn insert_person(
  conn: &rusqlite::Connection,
  c: &PersonColumns,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO persons (
       full_name, localized_name, nickname, gender,
       birth_date, birth_place, death_date, death_place,
       is_alive, notes, marital_status, father_name, mother_name,
       have_children, spouse_name, legacy_children, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
               ?15, ?16, ?17, ?17)",
    rusqlite::params![
      c.full_name,
      c.localized_name,
      c.nickname,
      c.gender,
      c.birth_date,
      c.birth_place,
      c.death_date,
      c.death_place,
      c.is_alive,
      c.notes,
      c.marital_status,
      c.father_name,
      c.mother_name,
      c.have_children,
      c.spouse_name,
      c.legacy_children,
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn insert_edge(
  conn: &rusqlite::Connection,
  (a, b): (PersonId, PersonId),
  kind: EdgeKind,
  at: DateTime<Utc>,
) -> rusqlite::Result<Edge> {
  conn.execute(
    "INSERT INTO edges (person_a, person_b, kind, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![a.0, b.0, kind.as_ref(), encode_dt(at)],
  )?;
  Ok(Edge {
    edge_id: conn.last_insert_rowid(),
    person_a: a,
    person_b: b,
    kind,
    created_at: at,
  })
}

fn person_exists(conn: &rusqlite::Connection, id: PersonId) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM persons WHERE person_id = ?1",
        rusqlite::params![id.0],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn select_person(
  conn: &rusqlite::Connection,
  id: PersonId,
) -> rusqlite::Result<Option<RawPerson>> {
  conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE person_id = ?1"),
      rusqlite::params![id.0],
      RawPerson::from_row,
    )
    .optional()
}

/// Trim the name the way it will be stored, then validate.
fn prepare(mut input: NewPerson) -> Result<NewPerson> {
  input.full_name = input.full_name.trim().to_owned();
  input.validate()?;
  Ok(input)
}

/// Outcome of the checks run inside the `add_relationship` transaction.
enum Relate {
  Created(Vec<Edge>),
  Missing(PersonId),
  Duplicate,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lineage family store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── FamilyStore impl ────────────────────────────────────────────────────────

impl FamilyStore for SqliteStore {
  type Error = Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn add_person(&self, input: NewPerson) -> Result<Person> {
    let input = prepare(input)?;
    let now = Utc::now();
    let columns = PersonColumns::from(&input);
    let at = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| Ok(insert_person(conn, &columns, &at)?))
      .await?;

    debug!(person_id = id, "person added");
    Ok(Person::from_new(PersonId(id), input, now))
  }

  async fn get_person(&self, id: PersonId) -> Result<Option<Person>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_person(conn, id)?))
      .await?;
    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_persons(&self) -> Result<Vec<Person>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons ORDER BY person_id"
        ))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn update_person(&self, id: PersonId, input: NewPerson) -> Result<Person> {
    let input = prepare(input)?;
    let c = PersonColumns::from(&input);
    let at = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE persons SET
             full_name = ?2, localized_name = ?3, nickname = ?4, gender = ?5,
             birth_date = ?6, birth_place = ?7, death_date = ?8,
             death_place = ?9, is_alive = ?10, notes = ?11,
             marital_status = ?12, father_name = ?13, mother_name = ?14,
             have_children = ?15, spouse_name = ?16, legacy_children = ?17,
             updated_at = ?18
           WHERE person_id = ?1",
          rusqlite::params![
            id.0,
            c.full_name,
            c.localized_name,
            c.nickname,
            c.gender,
            c.birth_date,
            c.birth_place,
            c.death_date,
            c.death_place,
            c.is_alive,
            c.notes,
            c.marital_status,
            c.father_name,
            c.mother_name,
            c.have_children,
            c.spouse_name,
            c.legacy_children,
            at,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_person(conn, id)?)
      })
      .await?;

    match raw {
      Some(raw) => {
        debug!(person_id = %id, "person updated");
        raw.into_person()
      }
      None => Err(lineage_core::Error::PersonNotFound(id).into()),
    }
  }

  async fn delete_person(&self, id: PersonId) -> Result<usize> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let edges: i64 = tx.query_row(
          "SELECT COUNT(*) FROM edges WHERE person_a = ?1 OR person_b = ?1",
          rusqlite::params![id.0],
          |r| r.get(0),
        )?;
        // Edges go with the person through ON DELETE CASCADE.
        let deleted = tx.execute(
          "DELETE FROM persons WHERE person_id = ?1",
          rusqlite::params![id.0],
        )?;
        if deleted == 0 {
          return Ok(None);
        }
        tx.commit()?;
        Ok(Some(edges))
      })
      .await?;

    let Some(edges) = removed else {
      return Err(lineage_core::Error::PersonNotFound(id).into());
    };
    let edges = usize::try_from(edges)
      .map_err(|_| Error::Decode(format!("edge count out of range: {edges}")))?;
    debug!(person_id = %id, edges, "person deleted");
    Ok(edges)
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  async fn add_relationship(
    &self,
    member: PersonId,
    related: PersonId,
    kind: EdgeKind,
  ) -> Result<Vec<Edge>> {
    if member == related {
      return Err(
        lineage_core::Error::Validation(
          "a person cannot be related to themselves".into(),
        )
        .into(),
      );
    }

    let rows = match kind {
      EdgeKind::Parent => vec![(related, member)],
      EdgeKind::Spouse => vec![(member, related), (related, member)],
    };
    let now = Utc::now();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in [member, related] {
          if !person_exists(&tx, id)? {
            return Ok(Relate::Missing(id));
          }
        }

        let linked = tx
          .query_row(
            "SELECT 1 FROM edges
             WHERE (person_a = ?1 AND person_b = ?2)
                OR (person_a = ?2 AND person_b = ?1)
             LIMIT 1",
            rusqlite::params![member.0, related.0],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if linked {
          return Ok(Relate::Duplicate);
        }

        let mut edges = Vec::with_capacity(rows.len());
        for pair in rows {
          edges.push(insert_edge(&tx, pair, kind, now)?);
        }
        tx.commit()?;
        Ok(Relate::Created(edges))
      })
      .await?;

    match outcome {
      Relate::Created(edges) => {
        debug!(member = %member, related = %related, %kind, "relationship added");
        Ok(edges)
      }
      Relate::Missing(id) => Err(lineage_core::Error::PersonNotFound(id).into()),
      Relate::Duplicate => Err(
        lineage_core::Error::DuplicateRelationship { a: member, b: related }.into(),
      ),
    }
  }

  async fn list_edges(&self) -> Result<Vec<Edge>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges ORDER BY edge_id"))?;
        let rows = stmt
          .query_map([], RawEdge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawEdge::into_edge).collect()
  }

  // ── Normalization ─────────────────────────────────────────────────────────

  async fn apply_plan(&self, plan: NormalizationPlan) -> Result<AppliedPlan> {
    let new_persons = plan
      .new_persons
      .into_iter()
      .map(prepare)
      .collect::<Result<Vec<_>>>()?;

    let planned = new_persons.len();
    let dangling = plan.edges.iter().flat_map(|e| [e.from, e.to]).any(|end| {
      matches!(end, EdgeEnd::Planned(i) if i >= planned)
    });
    if dangling {
      return Err(Error::Decode(format!(
        "plan for person {} references a person it does not create",
        plan.parent_id
      )));
    }

    let parent_id = plan.parent_id;
    let (clear_children, clear_spouse) = (plan.clear_children, plan.clear_spouse);
    let planned_edges = plan.edges;
    let now = Utc::now();
    let at = encode_dt(now);

    let applied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = tx.execute(
          "UPDATE persons SET
             legacy_children = CASE WHEN ?2 THEN NULL ELSE legacy_children END,
             spouse_name     = CASE WHEN ?3 THEN NULL ELSE spouse_name END,
             updated_at      = ?4
           WHERE person_id = ?1",
          rusqlite::params![parent_id.0, clear_children, clear_spouse, at],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let mut persons = Vec::with_capacity(new_persons.len());
        for input in new_persons {
          let id = insert_person(&tx, &PersonColumns::from(&input), &at)?;
          persons.push(Person::from_new(PersonId(id), input, now));
        }

        let resolve = |end: EdgeEnd| match end {
          EdgeEnd::Existing(id) => id,
          EdgeEnd::Planned(i) => persons[i].id,
        };
        let mut edges = Vec::with_capacity(planned_edges.len());
        for e in &planned_edges {
          edges.push(insert_edge(&tx, (resolve(e.from), resolve(e.to)), e.kind, now)?);
        }

        tx.commit()?;
        Ok(Some(AppliedPlan { persons, edges }))
      })
      .await?;

    applied.ok_or_else(|| lineage_core::Error::PersonNotFound(parent_id).into())
  }
}
