//! `lineage`: command-line front end for a Lineage family tree.
//!
//! Reads `lineage.toml` (or the path given with `--config`), opens the
//! SQLite store it names, runs one subcommand and prints the result as JSON.
//!
//! # Usage
//!
//! ```text
//! lineage add "John Doe" --gender male --spouse-name "Jane Doe"
//! lineage relate 3 1 --kind parent
//! lineage tree
//! lineage normalize
//! lineage export --output family_tree.ged
//! ```

mod args;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use lineage_core::{
  edge::{Edge, EdgeKind},
  matcher::{SuggestionRequest, find_similar, suggest_relationships},
  normalize::normalize_legacy_fields,
  person::{Gender, NewPerson, Person, PersonId},
  store::FamilyStore,
};
use lineage_gedcom::{SUGGESTED_FILENAME, export_gedcom};
use lineage_store_sqlite::SqliteStore;
use serde::Serialize;
use serde_json::json;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::{args::PersonFields, settings::Settings};

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lineage", author, version, about = "Family tree store and GEDCOM exporter")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "lineage.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Add a person.
  Add {
    /// Full name; optional when `--json` supplies one.
    name: Option<String>,
    /// Read the record from a JSON file (`-` for stdin). Flags override it.
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
    #[command(flatten)]
    fields: PersonFields,
  },
  /// Edit a person; fields not given keep their current value.
  Edit {
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    fields: PersonFields,
  },
  /// Show one person.
  Show { id: i64 },
  /// List every person.
  List,
  /// Delete a person and every relationship they are part of.
  Delete { id: i64 },
  /// Record that `related` is the parent or spouse of `member`.
  Relate {
    member:  i64,
    related: i64,
    #[arg(long, value_name = "parent|spouse")]
    kind:    EdgeKind,
  },
  /// Print every person and every relationship, for drawing the tree.
  Tree,
  /// Persons whose names contain NAME, to spot duplicates before adding.
  Similar { name: String },
  /// Suggest existing persons for typed-in relative names.
  Suggest {
    #[arg(long)]
    member: Option<i64>,
    #[arg(long)]
    father: Option<String>,
    #[arg(long)]
    mother: Option<String>,
    #[arg(long)]
    spouse: Option<String>,
  },
  /// Turn legacy spouse names and embedded children into persons and edges.
  Normalize,
  /// Write the whole tree as GEDCOM 5.5.1.
  Export {
    /// Output file.
    #[arg(short, long, default_value = SUGGESTED_FILENAME, conflicts_with = "stdout")]
    output: PathBuf,
    /// Write to stdout instead of a file.
    #[arg(long)]
    stdout: bool,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so exports on stdout stay clean.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config).context("failed to read configuration")?;
  let store_path = settings.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  run(cli.command, &store, &settings).await
}

/// The whole graph as one JSON document: `{ "persons": [..], "edges": [..] }`.
fn tree_json(persons: &[Person], edges: &[Edge]) -> serde_json::Value {
  json!({ "persons": persons, "edges": edges })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
  println!("{text}");
  Ok(())
}

async fn run(command: Command, store: &SqliteStore, settings: &Settings) -> anyhow::Result<()> {
  match command {
    Command::Add { name, json, fields } => {
      let mut input = match (json, name) {
        (Some(path), name) => {
          let mut input = args::read_person_json(&path)?;
          if let Some(name) = name {
            input.full_name = name;
          }
          input
        }
        (None, Some(name)) => NewPerson::new(name, Gender::default()),
        (None, None) => bail!("a name is required unless --json is given"),
      };
      fields.apply(&mut input);
      let person = store.add_person(input).await.context("failed to add person")?;
      info!(person_id = %person.id, "added {}", person.full_name);
      print_json(&person)
    }

    Command::Edit { id, name, fields } => {
      let id = PersonId(id);
      let Some(current) = store.get_person(id).await? else {
        bail!("person {id} not found");
      };
      let mut input = current.to_new();
      if let Some(name) = name {
        input.full_name = name;
      }
      fields.apply(&mut input);
      let person = store
        .update_person(id, input)
        .await
        .with_context(|| format!("failed to update person {id}"))?;
      print_json(&person)
    }

    Command::Show { id } => {
      let id = PersonId(id);
      match store.get_person(id).await? {
        Some(person) => print_json(&person),
        None => bail!("person {id} not found"),
      }
    }

    Command::List => print_json(&store.list_persons().await?),

    Command::Delete { id } => {
      let id = PersonId(id);
      let edges = store
        .delete_person(id)
        .await
        .with_context(|| format!("failed to delete person {id}"))?;
      print_json(&json!({ "deleted": id, "relationships_removed": edges }))
    }

    Command::Relate { member, related, kind } => {
      let edges = store
        .add_relationship(PersonId(member), PersonId(related), kind)
        .await
        .context("failed to create relationship")?;
      print_json(&edges)
    }

    Command::Tree => {
      let persons = store.list_persons().await?;
      let edges = store.list_edges().await?;
      print_json(&tree_json(&persons, &edges))
    }

    Command::Similar { name } => {
      let persons = store.list_persons().await?;
      print_json(&find_similar(&persons, &name)?)
    }

    Command::Suggest { member, father, mother, spouse } => {
      let persons = store.list_persons().await?;
      let request = SuggestionRequest {
        member_id:   member.map(PersonId),
        father_name: father,
        mother_name: mother,
        spouse_name: spouse,
      };
      print_json(&suggest_relationships(&persons, &request))
    }

    Command::Normalize => {
      let report = normalize_legacy_fields(store)
        .await
        .context("normalization could not start")?;
      print_json(&report)
    }

    Command::Export { output, stdout } => {
      let persons = store.list_persons().await?;
      let edges = store.list_edges().await?;
      let today = chrono::Local::now().date_naive();
      let text = export_gedcom(&persons, &edges, &settings.export, today)
        .context("failed to export GEDCOM")?;

      if stdout {
        println!("{text}");
        return Ok(());
      }
      std::fs::write(&output, format!("{text}\n"))
        .with_context(|| format!("failed to write {}", output.display()))?;
      info!(path = %output.display(), persons = persons.len(), "exported GEDCOM");
      print_json(&json!({ "path": output, "persons": persons.len() }))
    }
  }
}
