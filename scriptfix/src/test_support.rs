//! Test-only helpers: scratch git repositories and scripted backends.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::backend::Generator;
use crate::error::GenerationError;
use crate::io::git::{Git, GitIdentity, INITIAL_COMMIT_MESSAGE};

/// Identity matching the one configured in every [`TestRepo`].
pub fn test_identity() -> GitIdentity {
    GitIdentity {
        name: "scriptfix tests".to_string(),
        email: "tests@scriptfix.invalid".to_string(),
    }
}

/// Temporary git repository with a local identity and one empty commit.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo")?;
        let repo = Self { dir };
        repo.git_cmd(&["init", "--quiet"])?;
        repo.git_cmd(&["config", "user.name", "scriptfix tests"])?;
        repo.git_cmd(&["config", "user.email", "tests@scriptfix.invalid"])?;
        repo.git_cmd(&["config", "commit.gpgsign", "false"])?;
        repo.git_cmd(&["commit", "--allow-empty", "--quiet", "-m", INITIAL_COMMIT_MESSAGE])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> Git {
        Git::new(self.path())
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> Result<usize> {
        Ok(self.git().log_oneline()?.len())
    }

    /// Paths touched by the HEAD commit, relative to the repository root.
    pub fn head_files(&self) -> Result<Vec<String>> {
        let out = self.git_cmd(&["show", "--name-only", "--pretty=format:", "HEAD"])?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn git_cmd(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Generator that replays queued responses and records every prompt.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: RefCell<VecDeque<Result<String, GenerationError>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Queue a failure after the responses already queued.
    pub fn then_fail(self, err: GenerationError) -> Self {
        self.responses.borrow_mut().push_back(Err(err));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn assert_drained(&self) {
        let left = self.responses.borrow().len();
        assert_eq!(left, 0, "{left} scripted responses were never requested");
    }
}

impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::backend("scripted generator exhausted")))
    }
}
