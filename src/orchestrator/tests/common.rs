//! Common test utilities for orchestrator tests.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use secrecy::SecretString;
use tempfile::TempDir;

use crate::{
    context::RunContext,
    error::Result,
    git::Git,
    orchestrator::Orchestrator,
    shell::{CommandOutput, MockCommandRunner},
};

pub const BASE_SHA: &str = "base123";
pub const HEAD_BRANCH: &str = "renovate/deps";
pub const PR_NUMBER: u64 = 42;

/// `rev-parse` call that verifies the base commit before each read.
pub const VERIFY_BASE: &str = "rev-parse --verify --quiet base123^{commit}";

/// Every git invocation recorded by the scripted runner, as joined args.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Describes how the scripted git binary behaves.
#[derive(Default, Clone)]
pub struct GitScript {
    /// Manifest content at the base commit keyed by repo-relative path.
    pub base_files: HashMap<String, String>,
    /// Output of `git status --porcelain`.
    pub status: String,
    /// Whether `git checkout <branch>` succeeds without `-b`.
    pub branch_exists: bool,
    /// Whether the base commit is absent locally, as in a shallow clone.
    pub base_unreachable: bool,
}

impl GitScript {
    pub fn with_base_file(mut self, path: &str, content: &str) -> Self {
        self.base_files.insert(path.into(), content.into());
        self
    }

    pub fn dirty(mut self) -> Self {
        self.status = "?? .changeset/\n".into();
        self
    }
}

fn output(code: i32, stdout: &str, stderr: &str) -> Result<CommandOutput> {
    Ok(CommandOutput {
        code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    })
}

/// Builds a mock runner that answers git commands from `script` and records
/// each call.
pub fn scripted_runner(script: GitScript, calls: CallLog) -> MockCommandRunner {
    let mut mock = MockCommandRunner::new();

    mock.expect_run().returning(move |program, args| {
        assert_eq!(program, "git");
        calls.lock().unwrap().push(args.join(" "));

        match args.first().map(String::as_str) {
            Some("rev-parse") if script.base_unreachable => output(1, "", ""),
            Some("show") => {
                let (_, path) = args[1].split_once(':').unwrap();
                match script.base_files.get(path) {
                    Some(content) => output(0, content, ""),
                    None => output(
                        128,
                        "",
                        &format!("fatal: path '{path}' does not exist"),
                    ),
                }
            }
            Some("status") => output(0, &script.status, ""),
            Some("checkout") if args.len() == 2 && !script.branch_exists => {
                output(1, "", "error: pathspec did not match")
            }
            _ => output(0, "", ""),
        }
    });

    mock
}

/// Writes `content` to `path` under `root`, creating parent directories.
pub fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

pub fn test_context(root: &Path) -> RunContext {
    RunContext::builder()
        .token(SecretString::from("test-token".to_string()))
        .base_sha(BASE_SHA)
        .pr_number(PR_NUMBER)
        .head_branch(HEAD_BRANCH)
        .repo_root(root)
        .build()
        .unwrap()
}

/// Creates an orchestrator over `root` backed by a scripted git runner.
pub fn create_test_orchestrator(
    root: &Path,
    script: GitScript,
) -> (Orchestrator, CallLog) {
    create_test_orchestrator_with_context(test_context(root), script)
}

pub fn create_test_orchestrator_with_context(
    ctx: RunContext,
    script: GitScript,
) -> (Orchestrator, CallLog) {
    let calls: CallLog = Arc::new(Mutex::new(vec![]));
    let runner = scripted_runner(script, Arc::clone(&calls));
    let orchestrator = Orchestrator::new(ctx, Git::new(Box::new(runner)));
    (orchestrator, calls)
}

/// A workspace with `packages/*` declared in the root manifest.
pub fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"name":"monorepo","private":true,"workspaces":["packages/*"]}"#,
    );
    dir
}

pub fn fragment(root: &Path, file: &str) -> std::path::PathBuf {
    root.join(".changeset").join(file)
}

pub fn recorded(calls: &CallLog) -> Vec<String> {
    calls.lock().unwrap().clone()
}
