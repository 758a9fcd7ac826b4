//! SQL schema for the Lineage SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- AUTOINCREMENT guarantees a deleted person's id is never handed out again.
CREATE TABLE IF NOT EXISTS persons (
    person_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name       TEXT NOT NULL CHECK (trim(full_name) != ''),
    localized_name  TEXT,
    nickname        TEXT,
    gender          TEXT NOT NULL,            -- 'Male' | 'Female' | 'Unknown'
    birth_date      TEXT,                     -- YYYY, YYYY-MM or YYYY-MM-DD
    birth_place     TEXT,
    death_date      TEXT,
    death_place     TEXT,
    is_alive        INTEGER NOT NULL DEFAULT 1,
    notes           TEXT NOT NULL DEFAULT '',
    marital_status  TEXT,                     -- 'Single' | 'Married'
    father_name     TEXT,
    mother_name     TEXT,
    have_children   INTEGER,
    spouse_name     TEXT,                     -- legacy, cleared once normalized
    legacy_children TEXT,                     -- legacy JSON, cleared once normalized
    created_at      TEXT NOT NULL,            -- ISO 8601 UTC
    updated_at      TEXT NOT NULL
);

-- Parent edges point parent -> child. Spouse relations are two rows, one per
-- direction, always inserted together.
CREATE TABLE IF NOT EXISTS edges (
    edge_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    person_a   INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    person_b   INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    kind       TEXT NOT NULL,                 -- 'parent' | 'spouse'
    created_at TEXT NOT NULL,
    UNIQUE (person_a, person_b, kind),
    CHECK  (person_a != person_b)
);

CREATE INDEX IF NOT EXISTS persons_full_name_idx ON persons(full_name);
CREATE INDEX IF NOT EXISTS edges_a_idx           ON edges(person_a);
CREATE INDEX IF NOT EXISTS edges_b_idx           ON edges(person_b);

PRAGMA user_version = 1;
";
