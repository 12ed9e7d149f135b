//! Workspace package discovery.
//!
//! Packages are declared either through the `workspaces` field of the root
//! `package.json` (array form or `{ "packages": [...] }` form) or through
//! `pnpm-workspace.yaml`. When neither is present the repository root is
//! treated as a single package.
use log::*;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::error::{ChangesetsError, Result};

pub mod glob;

use glob::PatternSet;

/// Manifest file name for every package.
pub const MANIFEST_FILE: &str = "package.json";
/// pnpm workspace declaration file.
pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

/// Dependency name to version specifier.
pub type DependencyMap = BTreeMap<String, String>;

/// `workspaces` field of a root `package.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    Patterns(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            WorkspacesField::Patterns(p) => p,
            WorkspacesField::Object { packages } => packages,
        }
    }
}

/// The subset of `package.json` this tool reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub private: bool,
    pub dependencies: DependencyMap,
    pub peer_dependencies: DependencyMap,
    pub workspaces: Option<WorkspacesField>,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

/// A discovered workspace package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    pub name: String,
    /// Absolute package directory.
    pub dir: PathBuf,
    /// Manifest as it currently exists in the working tree.
    pub manifest: Manifest,
    /// Absolute path to the package's manifest.
    pub manifest_path: PathBuf,
    /// Manifest path relative to the repository root, `/` separated.
    pub relative_path: String,
}

/// Enumerates the workspace packages under `root`.
///
/// The root package itself is only returned when the repository does not
/// declare a workspace. Results are ordered by directory.
pub fn get_packages(root: &Path) -> Result<Vec<PackageDescriptor>> {
    let root_manifest_path = root.join(MANIFEST_FILE);
    let root_manifest = if root_manifest_path.is_file() {
        Some(Manifest::parse(&fs::read_to_string(&root_manifest_path)?)?)
    } else {
        None
    };

    let patterns = workspace_patterns(root, root_manifest.as_ref())?;

    let Some(patterns) = patterns else {
        debug!("no workspace declared, using root package");
        let manifest = root_manifest.ok_or_else(|| {
            ChangesetsError::invalid_workspace(format!(
                "no {MANIFEST_FILE} found in {}",
                root.display()
            ))
        })?;
        return Ok(vec![describe(root, root, manifest)?]);
    };

    let set = PatternSet::new(&patterns)?;
    let mut packages = vec![];

    for dir in package_dirs(root, &set)? {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = Manifest::parse(&fs::read_to_string(&manifest_path)?)?;
        packages.push(describe(root, &dir, manifest)?);
    }

    Ok(packages)
}

fn workspace_patterns(
    root: &Path,
    root_manifest: Option<&Manifest>,
) -> Result<Option<Vec<String>>> {
    let pnpm_path = root.join(PNPM_WORKSPACE_FILE);

    if pnpm_path.is_file() {
        debug!("reading workspace patterns from {PNPM_WORKSPACE_FILE}");
        let content = fs::read_to_string(&pnpm_path)?;
        let workspace: Option<PnpmWorkspace> = serde_yaml::from_str(&content)?;
        return Ok(Some(workspace.unwrap_or_default().packages));
    }

    Ok(root_manifest
        .and_then(|m| m.workspaces.as_ref())
        .map(|w| w.patterns().to_vec()))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && matches!(
            entry.file_name().to_str(),
            Some("node_modules") | Some(".git")
        )
}

fn package_dirs(root: &Path, set: &PatternSet) -> Result<Vec<PathBuf>> {
    if set.is_empty() {
        return Ok(vec![]);
    }

    let mut dirs = vec![];

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry?;

        if !entry.file_type().is_dir() {
            continue;
        }

        let relative = relative_slash_path(root, entry.path());

        if set.matches(&relative) && entry.path().join(MANIFEST_FILE).is_file()
        {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn describe(
    root: &Path,
    dir: &Path,
    manifest: Manifest,
) -> Result<PackageDescriptor> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let relative_path = relative_slash_path(root, &manifest_path);

    let name = manifest.name.clone().ok_or_else(|| {
        ChangesetsError::invalid_workspace(format!(
            "package at {relative_path} has no name"
        ))
    })?;

    Ok(PackageDescriptor {
        name,
        dir: dir.to_path_buf(),
        manifest,
        manifest_path,
        relative_path,
    })
}
