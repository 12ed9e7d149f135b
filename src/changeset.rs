//! Changeset fragment rendering and reconciliation.
//!
//! Each package with dependency changes in a pull request owns exactly one
//! fragment file, `.changeset/<sanitized-name>-<pr>-dependencies.md`. The
//! file is rewritten from scratch on every run and removed once the
//! package's dependency changes have been reverted, so repeated runs converge
//! on the same set of files.
use log::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tokio::fs;

use crate::{
    config::CHANGESET_DIR,
    diff::{ChangeEntry, ChangeKind, PackageChanges},
    error::Result,
};

pub mod sanitize;
pub mod version;

use sanitize::sanitize_filename;
use version::resolve_display_version;

/// Release bump assigned to every dependency fragment.
pub const PATCH_BUMP: &str = "patch";
/// Base URL for dependency links.
pub const NPM_PACKAGE_BASE_URL: &str = "https://www.npmjs.com/package";

const FRAGMENT_TEMPLATE_NAME: &str = "fragment.md";

/// Front-matter release list followed by the bulleted summary.
const FRAGMENT_TEMPLATE: &str = concat!(
    "---\n",
    "{% for release in releases %}",
    "\"{{ release.name }}\": {{ release.bump }}\n",
    "{% endfor %}",
    "---\n",
    "\n",
    "dependencies updates: \n",
    "\n",
    "{{ summary }}\n",
);

#[derive(Debug, Serialize)]
struct FragmentRelease<'a> {
    name: &'a str,
    bump: &'a str,
}

#[derive(Debug, Serialize)]
struct FragmentContext<'a> {
    releases: Vec<FragmentRelease<'a>>,
    summary: String,
}

/// What happened to a package's fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Written(PathBuf),
    Removed(PathBuf),
    Unchanged,
}

/// Renders one change as a markdown line (without the bullet).
pub fn textify(entry: &ChangeEntry) -> String {
    let value = entry.value();
    let link = format!(
        "[`{}@{}` \u{2197}\u{fe0e}]({}/{}/v/{})",
        entry.key,
        value,
        NPM_PACKAGE_BASE_URL,
        entry.key,
        resolve_display_version(value)
    );

    match entry.kind {
        ChangeKind::Add => {
            format!("Added dependency {link} (to `{}`)", entry.section)
        }
        ChangeKind::Update => format!(
            "Updated dependency {link} (from `{}`, in `{}`)",
            entry.old_value.as_deref().unwrap_or_default(),
            entry.section
        ),
        ChangeKind::Remove => {
            format!("Removed dependency {link} (from `{}`)", entry.section)
        }
    }
}

/// Bulleted summary of all changes, `dependencies` first.
pub fn summarize(changes: &PackageChanges) -> String {
    changes
        .entries()
        .map(|entry| format!("- {}", textify(entry)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// File name of the fragment for `package_name` in pull request `pr_number`.
pub fn fragment_file_name(package_name: &str, pr_number: u64) -> String {
    format!(
        "{}-{}-dependencies.md",
        sanitize_filename(package_name, "_"),
        pr_number
    )
}

/// Writes and removes fragment files inside the changeset directory.
pub struct ChangesetWriter {
    dir: PathBuf,
    pr_number: u64,
    tera: Tera,
}

impl ChangesetWriter {
    pub fn new(repo_root: &Path, pr_number: u64) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(FRAGMENT_TEMPLATE_NAME, FRAGMENT_TEMPLATE)?;

        Ok(Self {
            dir: repo_root.join(CHANGESET_DIR),
            pr_number,
            tera,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the changeset directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn fragment_path(&self, package_name: &str) -> PathBuf {
        self.dir
            .join(fragment_file_name(package_name, self.pr_number))
    }

    /// Renders the full fragment document for a package.
    pub fn render(
        &self,
        package_name: &str,
        changes: &PackageChanges,
    ) -> Result<String> {
        let ctx = FragmentContext {
            releases: vec![FragmentRelease {
                name: package_name,
                bump: PATCH_BUMP,
            }],
            summary: summarize(changes),
        };

        let context = Context::from_serialize(&ctx)?;

        Ok(self.tera.render(FRAGMENT_TEMPLATE_NAME, &context)?)
    }

    /// Writes the package's fragment when it has changes, or removes a
    /// previously written one when it has none.
    pub async fn reconcile(
        &self,
        package_name: &str,
        changes: &PackageChanges,
    ) -> Result<ReconcileOutcome> {
        let path = self.fragment_path(package_name);

        if changes.is_empty() {
            let is_file = fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);

            if is_file {
                info!(
                    "dependency changes reverted for {package_name}, removing {}",
                    path.display()
                );
                fs::remove_file(&path).await?;
                return Ok(ReconcileOutcome::Removed(path));
            }

            return Ok(ReconcileOutcome::Unchanged);
        }

        let content = self.render(package_name, changes)?;

        debug!("writing changeset to {}: {content}", path.display());

        fs::write(&path, content).await?;

        Ok(ReconcileOutcome::Written(path))
    }
}
