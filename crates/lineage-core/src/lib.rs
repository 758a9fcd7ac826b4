//! Core types and algorithms for the Lineage family graph.
//!
//! This crate is deliberately free of database and I/O dependencies. The
//! store backend implements [`store::FamilyStore`]; everything else here is a
//! pure function over a snapshot of persons and edges, except the batch
//! driver in [`normalize`], which is generic over the store trait.

// Backends implement `FamilyStore` with plain `async fn`; the trait itself
// spells out the `Send` bound on each returned future.
#![allow(async_fn_in_trait)]

pub mod date;
pub mod edge;
pub mod error;
pub mod household;
pub mod matcher;
pub mod normalize;
pub mod person;
pub mod store;

pub use error::{Error, Result};
