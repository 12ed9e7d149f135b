//! Run orchestration.
//!
//! A run is strictly sequential: discover packages, diff each manifest
//! against the base commit, switch to the pull request branch, reconcile
//! fragment files, and commit and push when anything changed. Warnings
//! (unreadable config, manifest missing at the base commit) are logged and
//! absorbed; every other error aborts the run without rolling back files
//! already written.
use log::*;
use std::path::PathBuf;

use crate::{
    changeset::{ChangesetWriter, ReconcileOutcome},
    config::ChangesetsConfig,
    context::RunContext,
    diff::{PackageChanges, diff_manifests},
    error::Result,
    git::{Git, setup_credentials},
    workspace::{Manifest, PackageDescriptor, get_packages},
};

/// Message of the commit that carries fragment updates.
pub const COMMIT_MESSAGE: &str =
    "chore(deps): updated changesets for modified dependencies";

/// What a run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Packages skipped because their manifest was missing at the base
    /// commit.
    pub skipped: Vec<String>,
    pub committed: bool,
}

pub struct Orchestrator {
    ctx: RunContext,
    git: Git,
}

impl Orchestrator {
    pub fn new(ctx: RunContext, git: Git) -> Self {
        Self { ctx, git }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if self.ctx.git_setup {
            self.setup_git().await?;
        }

        let packages = self.relevant_packages().await?;

        let changes = self.collect_changes(&packages, &mut summary).await?;

        debug!("changes: {}", serde_json::to_string(&changes)?);

        if self.ctx.dry_run {
            info!("dry run: not switching to {}", self.ctx.head_branch);
        } else {
            self.git.fetch().await?;
            self.git
                .switch_to_maybe_existing_branch(&self.ctx.head_branch)
                .await?;
        }

        let writer =
            ChangesetWriter::new(&self.ctx.repo_root, self.ctx.pr_number)?;
        writer.ensure_dir().await?;

        for (name, package_changes) in changes.iter() {
            match writer.reconcile(name, package_changes).await? {
                ReconcileOutcome::Written(path) => summary.written.push(path),
                ReconcileOutcome::Removed(path) => summary.removed.push(path),
                ReconcileOutcome::Unchanged => {}
            }
        }

        if self.ctx.dry_run {
            info!(
                "dry run: would commit {} written and {} removed changesets",
                summary.written.len(),
                summary.removed.len()
            );
            return Ok(summary);
        }

        if self.git.is_clean().await? {
            info!("changesets are up to date, nothing to commit");
            return Ok(summary);
        }

        self.git.commit_all(COMMIT_MESSAGE).await?;
        self.git.push(Some(&self.ctx.head_branch), false).await?;
        summary.committed = true;

        Ok(summary)
    }

    async fn setup_git(&self) -> Result<()> {
        self.git.setup_user().await?;

        match &self.ctx.netrc_path {
            Some(path) => setup_credentials(path, &self.ctx.token).await?,
            None => warn!("no home directory found, skipping git credentials"),
        }

        Ok(())
    }

    async fn load_config(&self) -> ChangesetsConfig {
        match ChangesetsConfig::read(&self.ctx.repo_root).await {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}, using default config...");
                ChangesetsConfig::default()
            }
        }
    }

    /// Workspace packages that are neither ignored nor private.
    async fn relevant_packages(&self) -> Result<Vec<PackageDescriptor>> {
        let packages = get_packages(&self.ctx.repo_root)?;
        let config = self.load_config().await;

        let relevant = packages
            .into_iter()
            .filter(|pkg| !config.is_ignored(&pkg.name) && !pkg.manifest.private)
            .collect::<Vec<_>>();

        info!(
            "found relevant packages to check: {}",
            relevant
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(relevant)
    }

    /// Diffs every package against its manifest at the base commit.
    /// Packages whose manifest did not exist there are skipped.
    async fn collect_changes(
        &self,
        packages: &[PackageDescriptor],
        summary: &mut RunSummary,
    ) -> Result<Vec<(String, PackageChanges)>> {
        let mut changes = vec![];

        for pkg in packages {
            let content = self
                .git
                .read_file_at(&self.ctx.base_sha, &pkg.relative_path)
                .await?;

            let Some(content) = content else {
                warn!(
                    "Failed to locate previous file content of {}, skipping {}...",
                    pkg.relative_path, pkg.name
                );
                summary.skipped.push(pkg.name.clone());
                continue;
            };

            let old = Manifest::parse(&content)?;
            let package_changes = diff_manifests(&old, &pkg.manifest);

            debug!(
                "{}: {} dependency change(s)",
                pkg.name,
                package_changes.len()
            );

            changes.push((pkg.name.clone(), package_changes));
        }

        Ok(changes)
    }
}
