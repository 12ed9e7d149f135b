//! Run context resolution.
//!
//! Everything the run needs from its environment (the token and the pull
//! request coordinates) is gathered once into a [`RunContext`] before any
//! side effect happens. Missing values fail in a fixed order: token, base
//! SHA, PR number, head branch.
use derive_builder::Builder;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ChangesetsError, Result};

/// A `base` or `head` reference of a pull request event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefPayload {
    pub sha: Option<String>,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    pub number: Option<u64>,
    pub base: Option<RefPayload>,
    pub head: Option<RefPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuePayload {
    pub number: Option<u64>,
}

/// The parts of a GitHub Actions event payload used by the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub number: Option<u64>,
    pub pull_request: Option<PullRequestPayload>,
    pub issue: Option<IssuePayload>,
}

impl EventPayload {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ChangesetsError::InvalidEventPayload(e.to_string()))
    }

    pub fn base_sha(&self) -> Option<&str> {
        self.pull_request
            .as_ref()?
            .base
            .as_ref()?
            .sha
            .as_deref()
    }

    pub fn head_ref(&self) -> Option<&str> {
        self.pull_request
            .as_ref()?
            .head
            .as_ref()?
            .ref_name
            .as_deref()
    }

    /// Issue number first, then pull request number, then top-level number.
    pub fn issue_number(&self) -> Option<u64> {
        if let Some(issue) = &self.issue {
            return issue.number;
        }

        if let Some(pr) = &self.pull_request {
            return pr.number;
        }

        self.number
    }
}

/// Fully resolved inputs for one run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RunContext {
    pub token: SecretString,
    pub base_sha: String,
    pub pr_number: u64,
    pub head_branch: String,
    /// Absolute repository root; also the working directory for git.
    pub repo_root: PathBuf,
    /// Configure the git identity and credentials before touching the
    /// repository.
    #[builder(default)]
    pub git_setup: bool,
    /// Where git credentials are written during git setup.
    #[builder(default)]
    pub netrc_path: Option<PathBuf>,
    #[builder(default)]
    pub dry_run: bool,
}

impl RunContext {
    pub fn builder() -> RunContextBuilder {
        RunContextBuilder::default()
    }
}

/// Raw inputs gathered from flags, action inputs and the environment.
#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    pub token: Option<String>,
    pub base_sha: Option<String>,
    pub pr_number: Option<u64>,
    pub head_branch: Option<String>,
    pub event: Option<EventPayload>,
    pub git_setup: bool,
    pub netrc_path: Option<PathBuf>,
    pub dry_run: bool,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(String::from)
}

impl ContextSources {
    /// Validates the sources into a [`RunContext`]. Explicit values take
    /// precedence over the event payload.
    pub fn resolve(self, repo_root: &Path) -> Result<RunContext> {
        let event = self.event.unwrap_or_default();

        let token = non_empty(self.token.as_deref())
            .ok_or(ChangesetsError::MissingToken)?;

        let base_sha = non_empty(self.base_sha.as_deref())
            .or_else(|| non_empty(event.base_sha()))
            .ok_or(ChangesetsError::MissingBaseSha)?;

        let pr_number = self
            .pr_number
            .or_else(|| event.issue_number())
            .filter(|n| *n > 0)
            .ok_or(ChangesetsError::MissingPrNumber)?;

        let head_branch = non_empty(self.head_branch.as_deref())
            .or_else(|| non_empty(event.head_ref()))
            .ok_or(ChangesetsError::MissingHeadBranch)?;

        Ok(RunContext {
            token: SecretString::from(token),
            base_sha,
            pr_number,
            head_branch,
            repo_root: repo_root.to_path_buf(),
            git_setup: self.git_setup,
            netrc_path: self.netrc_path,
            dry_run: self.dry_run,
        })
    }
}
