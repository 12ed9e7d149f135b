//! Structural diff of dependency sections between two manifests.
use serde::Serialize;
use std::fmt;

use crate::workspace::{DependencyMap, Manifest};

/// Manifest section a change was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DependencySection {
    Dependencies,
    PeerDependencies,
}

impl DependencySection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Add,
    Update,
    Remove,
}

/// A single dependency change within one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    /// Dependency name.
    pub key: String,
    /// Specifier after the change (absent for removals).
    pub new_value: Option<String>,
    /// Specifier before the change (absent for additions).
    pub old_value: Option<String>,
    pub section: DependencySection,
}

impl ChangeEntry {
    /// The specifier shown for this change: the new one, or the old one for
    /// removals.
    pub fn value(&self) -> &str {
        self.new_value
            .as_deref()
            .or(self.old_value.as_deref())
            .unwrap_or_default()
    }
}

/// All changes found for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageChanges {
    pub dependencies: Vec<ChangeEntry>,
    pub peer_dependencies: Vec<ChangeEntry>,
}

impl PackageChanges {
    /// Entries in rendering order: `dependencies` first, then
    /// `peerDependencies`.
    pub fn entries(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.dependencies.iter().chain(self.peer_dependencies.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.peer_dependencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len() + self.peer_dependencies.len()
    }
}

/// Diffs one dependency section.
///
/// Removals and updates come first in `old` key order, followed by additions
/// in `new` key order.
pub fn diff_section(
    old: &DependencyMap,
    new: &DependencyMap,
    section: DependencySection,
) -> Vec<ChangeEntry> {
    let mut entries = vec![];

    for (key, old_value) in old {
        match new.get(key) {
            None => entries.push(ChangeEntry {
                kind: ChangeKind::Remove,
                key: key.clone(),
                new_value: None,
                old_value: Some(old_value.clone()),
                section,
            }),
            Some(new_value) if new_value != old_value => {
                entries.push(ChangeEntry {
                    kind: ChangeKind::Update,
                    key: key.clone(),
                    new_value: Some(new_value.clone()),
                    old_value: Some(old_value.clone()),
                    section,
                })
            }
            Some(_) => {}
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            entries.push(ChangeEntry {
                kind: ChangeKind::Add,
                key: key.clone(),
                new_value: Some(new_value.clone()),
                old_value: None,
                section,
            });
        }
    }

    entries
}

/// Diffs the `dependencies` and `peerDependencies` sections of two
/// manifests.
pub fn diff_manifests(old: &Manifest, new: &Manifest) -> PackageChanges {
    PackageChanges {
        dependencies: diff_section(
            &old.dependencies,
            &new.dependencies,
            DependencySection::Dependencies,
        ),
        peer_dependencies: diff_section(
            &old.peer_dependencies,
            &new.peer_dependencies,
            DependencySection::PeerDependencies,
        ),
    }
}
