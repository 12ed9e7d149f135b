//! Git repository operations backed by the `git` binary.
//!
//! The run needs a handful of porcelain commands: fetching, switching to the
//! pull request branch, reading a manifest as of the base commit, and
//! committing and pushing changeset fragments. Each one is a single
//! invocation through a [`CommandRunner`], awaited to completion.
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use tokio::fs;

use crate::{
    error::{ChangesetsError, Result},
    shell::{CommandOutput, CommandRunner},
};

/// Name used for commits made by the action.
pub const BOT_USER_NAME: &str = "github-actions[bot]";
/// Email used for commits made by the action.
pub const BOT_USER_EMAIL: &str =
    "github-actions[bot]@users.noreply.github.com";
/// Remote that fragment commits are pushed to.
pub const DEFAULT_REMOTE: &str = "origin";

const GIT: &str = "git";

/// Thin command set over the `git` CLI.
pub struct Git {
    runner: Box<dyn CommandRunner>,
}

impl Git {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        self.runner.run(GIT, &args).await
    }

    async fn exec_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.exec(args).await?;

        if !output.success() {
            return Err(ChangesetsError::command_failed(
                format!("{GIT} {}", args.join(" ")),
                output.code,
                output.stderr.trim(),
            ));
        }

        Ok(output)
    }

    /// Configures the commit identity used for fragment commits.
    pub async fn setup_user(&self) -> Result<()> {
        info!("configuring git user: {BOT_USER_NAME}");
        self.exec_checked(&["config", "user.name", BOT_USER_NAME])
            .await?;
        self.exec_checked(&["config", "user.email", BOT_USER_EMAIL])
            .await?;
        Ok(())
    }

    pub async fn fetch(&self) -> Result<()> {
        info!("fetching remote refs");
        self.exec_checked(&["fetch"]).await?;
        Ok(())
    }

    /// Checks out `branch`, creating it locally when the checkout probe
    /// fails.
    pub async fn switch_to_maybe_existing_branch(
        &self,
        branch: &str,
    ) -> Result<()> {
        let probe = self.exec(&["checkout", branch]).await?;

        if probe.success() {
            info!("switched to branch: {branch}");
            return Ok(());
        }

        debug!(
            "checkout of {branch} failed ({}), creating it",
            probe.stderr.trim()
        );

        info!("creating branch: {branch}");
        self.exec_checked(&["checkout", "-b", branch]).await?;

        Ok(())
    }

    /// Stages every change in the working tree and commits it.
    pub async fn commit_all(&self, message: &str) -> Result<()> {
        info!("committing: {message}");
        self.exec_checked(&["add", "."]).await?;
        self.exec_checked(&["commit", "-m", message]).await?;
        Ok(())
    }

    /// Pushes `HEAD` to `branch` on the default remote, or the upstream of
    /// the current branch when no branch is given.
    pub async fn push(&self, branch: Option<&str>, force: bool) -> Result<()> {
        let refspec = branch.map(|b| format!("HEAD:{b}"));

        let mut args = vec!["push", DEFAULT_REMOTE];

        if let Some(refspec) = refspec.as_deref() {
            args.push(refspec);
        }

        if force {
            args.push("--force");
        }

        info!("pushing to {DEFAULT_REMOTE}");
        self.exec_checked(&args).await?;

        Ok(())
    }

    /// True when `git status --porcelain` reports nothing.
    pub async fn is_clean(&self) -> Result<bool> {
        let output = self.exec_checked(&["status", "--porcelain"]).await?;
        Ok(output.stdout.trim().is_empty())
    }

    /// Fails with [`ChangesetsError::CommandFailed`] unless `revision`
    /// resolves to a commit in the local repository.
    pub async fn verify_commit(&self, revision: &str) -> Result<()> {
        let commit = format!("{revision}^{{commit}}");
        self.exec_checked(&["rev-parse", "--verify", "--quiet", &commit])
            .await?;
        Ok(())
    }

    /// Reads `path` as of `revision`.
    ///
    /// Returns `Ok(None)` when the file does not exist at that revision,
    /// e.g. when it was added after it. A revision that is unknown locally
    /// (such as one missing from a shallow clone) is an error.
    pub async fn read_file_at(
        &self,
        revision: &str,
        path: &str,
    ) -> Result<Option<String>> {
        self.verify_commit(revision).await?;

        let object = format!("{revision}:{path}");
        let output = self.exec(&["show", &object]).await?;

        if !output.success() {
            debug!("git show {object} failed: {}", output.stderr.trim());
            return Ok(None);
        }

        Ok(Some(output.stdout))
    }
}

/// Writes a `.netrc` entry so pushes over HTTPS authenticate with `token`.
pub async fn setup_credentials(
    netrc_path: &Path,
    token: &SecretString,
) -> Result<()> {
    info!("writing git credentials to {}", netrc_path.display());

    let content = format!(
        "machine github.com\nlogin {BOT_USER_NAME}\npassword {}",
        token.expose_secret()
    );

    fs::write(netrc_path, content).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockCommandRunner, ProcessRunner};
    use mockall::Sequence;

    fn ok(stdout: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            code: 0,
            stdout: stdout.into(),
            stderr: "".into(),
        })
    }

    fn failed(code: i32, stderr: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            code,
            stdout: "".into(),
            stderr: stderr.into(),
        })
    }

    fn expect_git(
        mock: &mut MockCommandRunner,
        seq: &mut Sequence,
        expected: &'static str,
        result: fn() -> Result<CommandOutput>,
    ) {
        mock.expect_run()
            .withf(move |program, args| {
                program == "git" && args.join(" ") == expected
            })
            .times(1)
            .in_sequence(seq)
            .returning(move |_, _| result());
    }

    #[tokio::test]
    async fn setup_user_configures_bot_identity() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(
            &mut mock,
            &mut seq,
            "config user.name github-actions[bot]",
            || ok(""),
        );
        expect_git(
            &mut mock,
            &mut seq,
            "config user.email github-actions[bot]@users.noreply.github.com",
            || ok(""),
        );

        Git::new(Box::new(mock)).setup_user().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_propagates_failure() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "fetch", || {
            failed(128, "fatal: could not read from remote\n")
        });

        let err = Git::new(Box::new(mock)).fetch().await.unwrap_err();

        match err {
            ChangesetsError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "git fetch");
                assert_eq!(code, 128);
                assert_eq!(stderr, "fatal: could not read from remote");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn switch_uses_existing_branch() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "checkout renovate/foo", || ok(""));

        Git::new(Box::new(mock))
            .switch_to_maybe_existing_branch("renovate/foo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn switch_creates_missing_branch() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "checkout renovate/foo", || {
            failed(1, "error: pathspec 'renovate/foo' did not match")
        });
        expect_git(&mut mock, &mut seq, "checkout -b renovate/foo", || ok(""));

        Git::new(Box::new(mock))
            .switch_to_maybe_existing_branch("renovate/foo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn commit_all_stages_then_commits() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "add .", || ok(""));
        expect_git(&mut mock, &mut seq, "commit -m chore: test", || ok(""));

        Git::new(Box::new(mock))
            .commit_all("chore: test")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn push_targets_branch_refspec() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "push origin HEAD:renovate/foo", || {
            ok("")
        });
        expect_git(&mut mock, &mut seq, "push origin --force", || ok(""));

        let git = Git::new(Box::new(mock));
        git.push(Some("renovate/foo"), false).await.unwrap();
        git.push(None, true).await.unwrap();
    }

    #[tokio::test]
    async fn is_clean_reads_porcelain_status() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(&mut mock, &mut seq, "status --porcelain", || ok(""));
        expect_git(&mut mock, &mut seq, "status --porcelain", || {
            ok("?? .changeset/foo-1-dependencies.md\n")
        });

        let git = Git::new(Box::new(mock));
        assert!(git.is_clean().await.unwrap());
        assert!(!git.is_clean().await.unwrap());
    }

    #[tokio::test]
    async fn read_file_at_returns_content() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(
            &mut mock,
            &mut seq,
            "rev-parse --verify --quiet abc123^{commit}",
            || ok("abc123\n"),
        );
        expect_git(
            &mut mock,
            &mut seq,
            "show abc123:packages/foo/package.json",
            || ok(r#"{"name":"foo"}"#),
        );

        let content = Git::new(Box::new(mock))
            .read_file_at("abc123", "packages/foo/package.json")
            .await
            .unwrap();

        assert_eq!(content.as_deref(), Some(r#"{"name":"foo"}"#));
    }

    #[tokio::test]
    async fn read_file_at_tolerates_missing_file() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(
            &mut mock,
            &mut seq,
            "rev-parse --verify --quiet abc123^{commit}",
            || ok("abc123\n"),
        );
        expect_git(
            &mut mock,
            &mut seq,
            "show abc123:packages/baz/package.json",
            || failed(128, "fatal: path 'packages/baz/package.json' missing"),
        );

        let content = Git::new(Box::new(mock))
            .read_file_at("abc123", "packages/baz/package.json")
            .await
            .unwrap();

        assert!(content.is_none());
    }

    #[tokio::test]
    async fn read_file_at_fails_for_unknown_revision() {
        let mut mock = MockCommandRunner::new();
        let mut seq = Sequence::new();
        expect_git(
            &mut mock,
            &mut seq,
            "rev-parse --verify --quiet deadbeef^{commit}",
            || failed(1, ""),
        );

        let err = Git::new(Box::new(mock))
            .read_file_at("deadbeef", "package.json")
            .await
            .unwrap_err();

        match err {
            ChangesetsError::CommandFailed { command, code, .. } => {
                assert_eq!(
                    command,
                    "git rev-parse --verify --quiet deadbeef^{commit}"
                );
                assert_eq!(code, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn read_file_at_against_real_repository() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name":"a"}"#)
            .unwrap();

        let runner = ProcessRunner::new(dir.path());
        for args in [
            vec!["init", "-q"],
            vec!["add", "."],
            vec![
                "-c",
                "user.name=test",
                "-c",
                "user.email=test@example.com",
                "commit",
                "-q",
                "-m",
                "init",
            ],
        ] {
            let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
            assert!(runner.run("git", &args).await.unwrap().success());
        }

        let git = Git::new(Box::new(runner));

        let content = git.read_file_at("HEAD", "package.json").await.unwrap();
        assert_eq!(content.as_deref(), Some(r#"{"name":"a"}"#));

        let missing =
            git.read_file_at("HEAD", "nope/package.json").await.unwrap();
        assert!(missing.is_none());

        let unknown = "0123456789abcdef0123456789abcdef01234567";
        let result = git.read_file_at(unknown, "package.json").await;
        assert!(matches!(result, Err(ChangesetsError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn setup_credentials_writes_netrc() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".netrc");

        setup_credentials(&path, &SecretString::from("s3cret".to_string()))
            .await
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "machine github.com\nlogin github-actions[bot]\npassword s3cret"
        );
    }
}
