//! Git adapter bound to the working tree that holds the edited script.
//!
//! Every applied action is checkpointed with a commit, so we keep a small,
//! explicit wrapper around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

/// Message used for the commit that follows `git init`.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Author and committer used for checkpoint commits.
///
/// Without one, git falls back to its own configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

/// Wrapper for executing git commands in a fixed working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    identity: Option<GitIdentity>,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            identity: None,
        }
    }

    /// Commit as `identity` instead of the configured git user.
    pub fn with_identity(mut self, identity: Option<GitIdentity>) -> Self {
        self.identity = identity;
        self
    }

    /// Bind to the directory containing `script`.
    pub fn for_script(script: &Path) -> Self {
        let dir = script
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if the working directory is inside a git work tree.
    pub fn is_repository(&self) -> bool {
        if self.workdir.join(".git").exists() {
            return true;
        }
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Run `git init` unless a repository already exists.
    ///
    /// With `initial_commit`, everything already present is committed right
    /// after initialization. Returns whether a repository was created.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn init_if_absent(&self, initial_commit: bool) -> Result<bool> {
        if self.is_repository() {
            debug!("git repository already initialized");
            return Ok(false);
        }
        self.run_checked(&["init"])?;
        info!("git repository initialized");
        if initial_commit {
            self.add_all()?;
            self.commit_staged(INITIAL_COMMIT_MESSAGE)?;
        }
        Ok(true)
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    /// One-line commit log, newest first. Empty when there are no commits.
    pub fn log_oneline(&self) -> Result<Vec<String>> {
        if !self.has_commits()? {
            return Ok(Vec::new());
        }
        let out = self.run_capture(&["log", "--oneline"])?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Unstaged changes in the working tree.
    pub fn diff(&self) -> Result<String> {
        self.run_capture(&["diff"])
    }

    /// Discard all staged and unstaged changes to tracked files.
    #[instrument(skip_all)]
    pub fn hard_reset(&self) -> Result<()> {
        self.run_checked(&["reset", "--hard"])?;
        info!("reset to last commit");
        Ok(())
    }

    /// True once HEAD points at a commit.
    pub fn has_commits(&self) -> Result<bool> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", "HEAD"])?;
        Ok(out.status.success())
    }

    /// Stage all changes under the working directory (respects .gitignore).
    ///
    /// Files elsewhere in an enclosing repository are left alone.
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A", "--", "."])?;
        Ok(())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// Commit staged changes with a message.
    ///
    /// If there are no staged changes, this returns Ok(false) and does nothing.
    #[instrument(skip_all)]
    pub fn commit_staged(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(false);
        }
        debug!(message, "committing staged changes");
        self.run_checked(&["commit", "-m", message])?;
        Ok(true)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        if let Some(id) = &self.identity {
            cmd.env("GIT_AUTHOR_NAME", &id.name)
                .env("GIT_AUTHOR_EMAIL", &id.email)
                .env("GIT_COMMITTER_NAME", &id.name)
                .env("GIT_COMMITTER_EMAIL", &id.email);
        }
        cmd.output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestRepo, test_identity};
    use std::fs;

    #[test]
    fn parses_untracked_line() {
        let e = parse_status_line("?? foo.py").expect("parse");
        assert_eq!(
            e,
            StatusEntry {
                code: "??".to_string(),
                path: "foo.py".to_string()
            }
        );
    }

    #[test]
    fn parses_modified_line() {
        let e = parse_status_line(" M src/main.py").expect("parse");
        assert_eq!(e.code, " M");
        assert_eq!(e.path, "src/main.py");
    }

    #[test]
    fn parses_rename_line_uses_new_path() {
        let e = parse_status_line("R  old.py -> new.py").expect("parse");
        assert_eq!(e.path, "new.py");
    }

    #[test]
    fn for_script_binds_to_parent_dir() {
        assert_eq!(Git::for_script(Path::new("a/b/c.py")).workdir(), Path::new("a/b"));
        assert_eq!(Git::for_script(Path::new("c.py")).workdir(), Path::new("."));
    }

    #[test]
    fn init_if_absent_is_a_no_op_on_existing_repo() {
        let repo = TestRepo::new().expect("repo");
        let git = repo.git();
        assert!(git.is_repository());
        assert!(!git.init_if_absent(true).expect("init"));
    }

    #[test]
    fn init_if_absent_creates_repo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path());
        assert!(!temp.path().join(".git").exists());
        assert!(git.init_if_absent(false).expect("init"));
        assert!(git.is_repository());
        assert!(git.log_oneline().expect("log").is_empty());
    }

    #[test]
    fn init_if_absent_commits_existing_files_as_identity() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("f.py"), "print(1)\n").expect("write");
        let git = Git::new(temp.path()).with_identity(Some(test_identity()));

        assert!(git.init_if_absent(true).expect("init"));

        let log = git.log_oneline().expect("log");
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with(INITIAL_COMMIT_MESSAGE));
        assert!(git.status_porcelain().expect("status").is_empty());
        let author = git
            .run_capture(&["log", "-1", "--format=%an <%ae>"])
            .expect("author");
        assert_eq!(author.trim(), "scriptfix tests <tests@scriptfix.invalid>");
    }

    #[test]
    fn add_all_stays_inside_workdir() {
        let repo = TestRepo::new().expect("repo");
        fs::create_dir_all(repo.path().join("work")).expect("mkdir work");
        fs::create_dir_all(repo.path().join("other")).expect("mkdir other");
        fs::write(repo.path().join("other/notes.txt"), "v1\n").expect("write notes");
        let root = repo.git();
        root.add_all().expect("add");
        root.commit_staged("add notes").expect("commit");

        fs::write(repo.path().join("other/notes.txt"), "v2\n").expect("dirty notes");
        fs::write(repo.path().join("work/f.py"), "x = 1\n").expect("write script");
        let work = Git::new(repo.path().join("work"));
        work.add_all().expect("add work");
        assert!(work.commit_staged("checkpoint").expect("commit work"));

        assert_eq!(repo.head_files().expect("head files"), vec!["work/f.py"]);
        let status = root.status_porcelain().expect("status");
        assert_eq!(
            status,
            vec![StatusEntry {
                code: " M".to_string(),
                path: "other/notes.txt".to_string()
            }]
        );
    }

    #[test]
    fn commit_log_status_diff_and_reset() {
        let repo = TestRepo::new().expect("repo");
        let git = repo.git();
        let before = git.log_oneline().expect("log").len();

        fs::write(repo.path().join("a.py"), "x = 1\n").expect("write");
        assert_eq!(git.status_porcelain().expect("status").len(), 1);
        git.add_all().expect("add");
        assert!(git.commit_staged("add a").expect("commit"));
        assert!(!git.commit_staged("nothing").expect("empty commit"));
        let log = git.log_oneline().expect("log");
        assert_eq!(log.len(), before + 1);
        assert!(log[0].ends_with("add a"));

        fs::write(repo.path().join("a.py"), "x = 2\n").expect("rewrite");
        assert!(git.diff().expect("diff").contains("+x = 2"));
        git.hard_reset().expect("reset");
        assert_eq!(
            fs::read_to_string(repo.path().join("a.py")).expect("read"),
            "x = 1\n"
        );
        assert!(git.status_porcelain().expect("status").is_empty());
    }
}
