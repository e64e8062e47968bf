//! Apply an [`ActionBatch`] to the working tree, one checkpoint per action.
//!
//! Actions run strictly in document order. Each write or delete is followed
//! by stage-all + commit, so every applied action is a separate commit.
//! Version-control failures are collected as warnings and never stop the
//! batch; a filesystem failure stops it, and commits made before that point
//! are kept.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::action::{ActionBatch, FileAction, FileOperation, SkipReason};
use crate::io::atomic::write_atomic;
use crate::io::config::DEFAULT_COMMIT_MESSAGE;
use crate::io::git::Git;

/// Caller-controlled apply behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Relative action paths resolve against this directory.
    pub base_dir: PathBuf,
    pub commit_message: String,
    /// After a halt, hard-reset the working tree to the last commit.
    pub reset_on_failure: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            reset_on_failure: false,
        }
    }
}

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The filesystem change happened. `committed` is false when git had
    /// nothing to commit or the commit failed (see warnings).
    Applied { path: String, committed: bool },
    Skipped { reason: SkipReason },
    /// The filesystem change failed; the batch halted here.
    Failed { path: String, error: String },
}

/// Outcome of one action, by position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

/// Non-fatal version-control failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionControlWarning {
    /// Action that triggered the git call, if any.
    pub index: Option<usize>,
    pub message: String,
}

/// Result of applying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedSummary {
    /// One record per attempted action, in order.
    pub actions: Vec<ActionRecord>,
    pub warnings: Vec<VersionControlWarning>,
    pub halted: bool,
    /// Actions never attempted because the batch halted.
    pub not_attempted: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub commits: usize,
}

impl AppliedSummary {
    fn record(&mut self, index: usize, action: &FileAction, outcome: ActionOutcome) {
        match &outcome {
            ActionOutcome::Applied { committed, .. } => {
                self.applied += 1;
                if *committed {
                    self.commits += 1;
                }
            }
            ActionOutcome::Skipped { .. } => self.skipped += 1,
            ActionOutcome::Failed { .. } => self.failed += 1,
        }
        self.actions.push(ActionRecord {
            index,
            kind: action.kind.to_string(),
            outcome,
        });
    }

    fn warn(&mut self, index: Option<usize>, err: &anyhow::Error) {
        let message = format!("{err:#}");
        warn!(?index, err = %message, "version control warning");
        self.warnings.push(VersionControlWarning { index, message });
    }
}

/// Apply `batch` in order against `git`'s working tree.
#[instrument(skip_all, fields(actions = batch.len(), base_dir = %options.base_dir.display()))]
pub fn apply_actions(batch: &ActionBatch, git: &Git, options: &ApplyOptions) -> AppliedSummary {
    let mut summary = AppliedSummary::default();

    for (index, action) in batch.iter().enumerate() {
        let op = match action.resolve() {
            Ok(op) => op,
            Err(reason) => {
                info!(index, kind = %action.kind, %reason, "skipping action");
                summary.record(index, action, ActionOutcome::Skipped { reason });
                continue;
            }
        };

        let (path, result) = match op {
            FileOperation::Write { path, contents } => {
                let target = resolve_path(&options.base_dir, path);
                debug!(index, path = %target.display(), bytes = contents.len(), "writing file");
                (path, write_atomic(&target, contents.as_bytes()))
            }
            FileOperation::Delete { path } => {
                let target = resolve_path(&options.base_dir, path);
                if fs::symlink_metadata(&target).is_err() {
                    let reason = SkipReason::NotFound {
                        path: path.to_string(),
                    };
                    warn!(index, %reason, "nothing to delete");
                    summary.record(index, action, ActionOutcome::Skipped { reason });
                    continue;
                }
                debug!(index, path = %target.display(), "deleting file");
                let result = fs::remove_file(&target)
                    .with_context(|| format!("remove {}", target.display()));
                (path, result)
            }
        };

        if let Err(err) = result {
            let error = format!("{err:#}");
            warn!(index, path, err = %error, "action failed, halting batch");
            summary.record(
                index,
                action,
                ActionOutcome::Failed {
                    path: path.to_string(),
                    error,
                },
            );
            summary.halted = true;
            summary.not_attempted = batch.len() - index - 1;
            if options.reset_on_failure
                && let Err(err) = git.hard_reset()
            {
                summary.warn(Some(index), &err);
            }
            break;
        }

        let committed = checkpoint(git, &options.commit_message, index, &mut summary);
        info!(index, path, committed, "action applied");
        summary.record(
            index,
            action,
            ActionOutcome::Applied {
                path: path.to_string(),
                committed,
            },
        );
    }

    summary
}

fn checkpoint(git: &Git, message: &str, index: usize, summary: &mut AppliedSummary) -> bool {
    if let Err(err) = git.add_all() {
        summary.warn(Some(index), &err);
        return false;
    }
    match git.commit_staged(message) {
        Ok(committed) => committed,
        Err(err) => {
            summary.warn(Some(index), &err);
            false
        }
    }
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionKind;
    use crate::test_support::TestRepo;

    fn action(kind: &str, path: Option<&str>, contents: Option<&str>) -> FileAction {
        FileAction {
            kind: ActionKind::from_type(kind),
            path: path.map(str::to_string),
            contents: contents.map(str::to_string),
        }
    }

    fn options(repo: &TestRepo) -> ApplyOptions {
        ApplyOptions {
            base_dir: repo.path().to_path_buf(),
            ..ApplyOptions::default()
        }
    }

    #[test]
    fn each_applied_action_is_one_commit_in_order() {
        let repo = TestRepo::new().expect("repo");
        let before = repo.commit_count().expect("count");
        let batch = vec![
            action("create_file", Some("a.py"), Some("a = 1\n")),
            action("create_file", Some("pkg/b.py"), Some("b = 2\n")),
            action("edit_file", Some("a.py"), Some("a = 3\n")),
        ];

        let summary = apply_actions(&batch, &repo.git(), &options(&repo));

        assert_eq!(summary.applied, 3);
        assert_eq!(summary.commits, 3);
        assert!(!summary.halted);
        assert!(summary.warnings.is_empty());
        assert_eq!(repo.commit_count().expect("count"), before + 3);
        let log = repo.git().log_oneline().expect("log");
        assert!(log[0].ends_with("Update"));
        assert_eq!(
            fs::read_to_string(repo.path().join("a.py")).expect("read"),
            "a = 3\n"
        );
        assert_eq!(
            fs::read_to_string(repo.path().join("pkg/b.py")).expect("read"),
            "b = 2\n"
        );
    }

    #[test]
    fn write_reads_back_exactly() {
        let repo = TestRepo::new().expect("repo");
        let contents = "line one\r\n\tline two\n\n  <tag> & 'q'\n";
        let batch = vec![action("edit_file", Some("f.py"), Some(contents))];
        apply_actions(&batch, &repo.git(), &options(&repo));
        assert_eq!(
            fs::read_to_string(repo.path().join("f.py")).expect("read"),
            contents
        );
    }

    #[test]
    fn deleting_missing_file_is_skipped_without_commit() {
        let repo = TestRepo::new().expect("repo");
        let before = repo.commit_count().expect("count");
        let batch = vec![action("delete_file", Some("ghost.py"), None)];

        let summary = apply_actions(&batch, &repo.git(), &options(&repo));

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.commits, 0);
        assert!(!summary.halted);
        assert!(matches!(
            &summary.actions[0].outcome,
            ActionOutcome::Skipped { reason: SkipReason::NotFound { path } } if path == "ghost.py"
        ));
        assert_eq!(repo.commit_count().expect("count"), before);
    }

    #[test]
    fn delete_existing_file_commits() {
        let repo = TestRepo::new().expect("repo");
        let batch = vec![
            action("create_file", Some("old.py"), Some("x\n")),
            action("delete_file", Some("old.py"), None),
        ];
        let summary = apply_actions(&batch, &repo.git(), &options(&repo));
        assert_eq!(summary.commits, 2);
        assert!(!repo.path().join("old.py").exists());
    }

    #[test]
    fn incomplete_and_unknown_actions_are_skipped() {
        let repo = TestRepo::new().expect("repo");
        let before = repo.commit_count().expect("count");
        let batch = vec![
            action("edit_file", None, Some("x")),
            action("create_file", Some("f.py"), None),
            action("rename_file", Some("f.py"), Some("x")),
            action("delete_file", Some("  "), None),
        ];

        let summary = apply_actions(&batch, &repo.git(), &options(&repo));

        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.applied, 0);
        let reasons: Vec<_> = summary
            .actions
            .iter()
            .map(|r| match &r.outcome {
                ActionOutcome::Skipped { reason } => reason.clone(),
                other => panic!("unexpected outcome {other:?}"),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingPath,
                SkipReason::MissingContents,
                SkipReason::UnknownType {
                    value: "rename_file".to_string()
                },
                SkipReason::MissingPath,
            ]
        );
        assert_eq!(repo.commit_count().expect("count"), before);
    }

    #[test]
    fn write_failure_halts_and_keeps_earlier_commits() {
        let repo = TestRepo::new().expect("repo");
        let before = repo.commit_count().expect("count");
        fs::create_dir_all(repo.path().join("taken/inner")).expect("mkdir");
        let batch = vec![
            action("create_file", Some("first.py"), Some("1\n")),
            action("create_file", Some("taken"), Some("2\n")),
            action("create_file", Some("third.py"), Some("3\n")),
        ];

        let summary = apply_actions(&batch, &repo.git(), &options(&repo));

        assert!(summary.halted);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_attempted, 1);
        assert_eq!(summary.actions.len(), 2);
        assert!(matches!(
            &summary.actions[1].outcome,
            ActionOutcome::Failed { path, .. } if path == "taken"
        ));
        assert!(!repo.path().join("third.py").exists());
        assert_eq!(repo.commit_count().expect("count"), before + 1);
    }

    #[test]
    fn git_failures_become_warnings() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path().join("not-a-dir"));
        let opts = ApplyOptions {
            base_dir: temp.path().to_path_buf(),
            ..ApplyOptions::default()
        };
        let batch = vec![action("create_file", Some("f.py"), Some("x"))];

        let summary = apply_actions(&batch, &git, &opts);

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.commits, 0);
        assert_eq!(summary.warnings.len(), 1);
        assert!(!summary.halted);
        assert!(temp.path().join("f.py").exists());
    }

    #[test]
    fn summary_serializes_outcomes_flat() {
        let repo = TestRepo::new().expect("repo");
        let batch = vec![action("delete_file", Some("ghost.py"), None)];
        let summary = apply_actions(&batch, &repo.git(), &options(&repo));
        let json = serde_json::to_value(&summary).expect("json");
        assert_eq!(json["actions"][0]["type"], "delete_file");
        assert_eq!(json["actions"][0]["outcome"], "skipped");
        assert_eq!(json["actions"][0]["reason"]["reason"], "not_found");
    }
}
