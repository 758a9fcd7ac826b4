//! Layered configuration: an optional TOML file under `LINEAGE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use lineage_gedcom::ExportConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub export:     ExportConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("family_tree.db") }

fn environment() -> config::Environment {
  // LINEAGE_STORE_PATH, LINEAGE_EXPORT__SUBMITTER, ...
  config::Environment::with_prefix("LINEAGE")
    .prefix_separator("_")
    .separator("__")
}

impl Settings {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment())
      .build()?
      .try_deserialize()
  }

  /// The store path with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
