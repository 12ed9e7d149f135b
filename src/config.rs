//! Loading of the changesets configuration in `.changeset/config.json`.
//!
//! Only the `ignore` list is consulted; every other key is accepted and
//! left alone.
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

use crate::error::{ChangesetsError, Result};

/// Directory holding changeset fragments and the configuration file.
pub const CHANGESET_DIR: &str = ".changeset";
/// Configuration file name inside [`CHANGESET_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Changesets configuration relevant to fragment generation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChangesetsConfig {
    /// Package names (or `*` wildcard patterns) that never receive
    /// fragments.
    pub ignore: Vec<String>,
}

impl ChangesetsConfig {
    /// Reads the configuration from `<root>/.changeset/config.json`.
    ///
    /// Both a missing file and an unparsable file are reported as
    /// [`ChangesetsError::ConfigError`] so the caller can decide whether to
    /// fall back to [`ChangesetsConfig::default`].
    pub async fn read(root: &Path) -> Result<Self> {
        let path = root.join(CHANGESET_DIR).join(CONFIG_FILE);

        let content = fs::read_to_string(&path).await.map_err(|e| {
            ChangesetsError::config(format!("{}: {e}", path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ChangesetsError::config(format!("{}: {e}", path.display()))
        })
    }

    /// Whether `name` matches any entry of the ignore list.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|pattern| {
            if !pattern.contains('*') {
                return pattern == name;
            }

            let escaped = regex::escape(pattern).replace(r"\*", ".*");

            Regex::new(&format!("^{escaped}$"))
                .map(|r| r.is_match(name))
                .unwrap_or(false)
        })
    }
}
