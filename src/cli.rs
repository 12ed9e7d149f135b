//! CLI argument parsing and environment lookups.
//!
//! This is the only place that reads the process environment. Values given
//! as flags win over action inputs, which win over the Actions-provided
//! environment.
use clap::Parser;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    context::{ContextSources, EventPayload, RunContext},
    error::Result,
};

/// Action input holding the token (`with: token: ...`).
pub const TOKEN_INPUT_ENV: &str = "INPUT_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_EVENT_PATH_ENV: &str = "GITHUB_EVENT_PATH";
pub const HOME_ENV: &str = "HOME";
/// Set by the runner when step debug logging is enabled.
pub const RUNNER_DEBUG_ENV: &str = "RUNNER_DEBUG";

/// Keep changeset fragments in sync with dependency changes in a pull
/// request.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long)]
    /// Token used to push fragment commits. Falls back to INPUT_TOKEN, then
    /// GITHUB_TOKEN.
    pub token: Option<String>,

    #[arg(long)]
    /// Path to the triggering event payload. Falls back to GITHUB_EVENT_PATH.
    pub event_path: Option<PathBuf>,

    #[arg(long)]
    /// Base commit to diff against. Overrides the event payload.
    pub base_sha: Option<String>,

    #[arg(long)]
    /// Pull request number. Overrides the event payload.
    pub pr_number: Option<u64>,

    #[arg(long)]
    /// Pull request head branch. Overrides the event payload.
    pub head_branch: Option<String>,

    #[arg(long, default_value = ".")]
    /// Repository root.
    pub repo_path: String,

    #[arg(long, default_value_t = false)]
    /// Do not configure the git identity and credentials.
    pub skip_git_setup: bool,

    #[arg(long, default_value_t = false)]
    /// Write fragments but do not switch branches, commit or push.
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Args {
    /// Debug logging is on when requested by flag or by the runner.
    pub fn is_debug(&self) -> bool {
        self.debug || env_value(RUNNER_DEBUG_ENV).as_deref() == Some("1")
    }

    fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| env_value(TOKEN_INPUT_ENV))
            .or_else(|| env_value(GITHUB_TOKEN_ENV))
    }

    fn load_event(&self) -> Result<Option<EventPayload>> {
        let path = self
            .event_path
            .clone()
            .or_else(|| env_value(GITHUB_EVENT_PATH_ENV).map(PathBuf::from));

        let Some(path) = path else {
            return Ok(None);
        };

        let content = fs::read_to_string(&path)?;

        Ok(Some(EventPayload::parse(&content)?))
    }

    /// Gathers every context input from flags and environment.
    ///
    /// The event payload is only loaded once a token is known, so a missing
    /// token is reported ahead of an unreadable payload.
    pub fn context_sources(&self) -> Result<ContextSources> {
        let token = self.resolve_token();
        let event = match token {
            Some(_) => self.load_event()?,
            None => None,
        };

        Ok(ContextSources {
            token,
            base_sha: self.base_sha.clone(),
            pr_number: self.pr_number,
            head_branch: self.head_branch.clone(),
            event,
            git_setup: !self.skip_git_setup,
            netrc_path: env_value(HOME_ENV)
                .map(|home| PathBuf::from(home).join(".netrc")),
            dry_run: self.dry_run,
        })
    }

    /// Absolute repository root.
    pub fn repo_root(&self) -> Result<PathBuf> {
        Ok(fs::canonicalize(Path::new(&self.repo_path))?)
    }

    /// Builds the [`RunContext`] for this invocation.
    pub fn run_context(&self) -> Result<RunContext> {
        let sources = self.context_sources()?;
        sources.resolve(&self.repo_root()?)
    }
}
