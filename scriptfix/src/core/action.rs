//! File actions extracted from an editor response.
//!
//! A [`FileAction`] keeps exactly what the response said: the mandatory
//! `type` plus the optional `file_path` / `file_contents` fields. Whether an
//! action has an observable effect is decided later by [`FileAction::resolve`],
//! so a structurally odd action stays visible in the batch instead of being
//! dropped silently.

use std::fmt;

use serde::Serialize;

/// Recognized action `type` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateFile,
    EditFile,
    DeleteFile,
    /// Any other value. Accepted structurally, a no-op at apply time.
    Unknown(String),
}

impl ActionKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            "create_file" => ActionKind::CreateFile,
            "edit_file" => ActionKind::EditFile,
            "delete_file" => ActionKind::DeleteFile,
            other => ActionKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::CreateFile => "create_file",
            ActionKind::EditFile => "edit_file",
            ActionKind::DeleteFile => "delete_file",
            ActionKind::Unknown(other) => other,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested file-level operation.
///
/// `path` and `contents` are `None` when the element was absent; an element
/// that was present but empty yields `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAction {
    pub kind: ActionKind,
    pub path: Option<String>,
    pub contents: Option<String>,
}

/// Ordered actions parsed from a single response (document order).
pub type ActionBatch = Vec<FileAction>;

/// The effective filesystem operation of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation<'a> {
    /// Full replace of `path` with `contents` (create or edit).
    Write { path: &'a str, contents: &'a str },
    Delete { path: &'a str },
}

/// Why an action has no filesystem effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingPath,
    MissingContents,
    UnknownType { value: String },
    /// `delete_file` target did not exist on disk.
    NotFound { path: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPath => f.write_str("missing file_path"),
            SkipReason::MissingContents => f.write_str("missing file_contents"),
            SkipReason::UnknownType { value } => write!(f, "unrecognized action type '{value}'"),
            SkipReason::NotFound { path } => write!(f, "file {path} not found for deletion"),
        }
    }
}

impl FileAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            path: None,
            contents: None,
        }
    }

    /// Resolve the operation this action performs, or why it performs none.
    ///
    /// A blank path counts as missing. Empty contents are a valid write.
    pub fn resolve(&self) -> Result<FileOperation<'_>, SkipReason> {
        let path = self.path.as_deref().filter(|p| !p.trim().is_empty());
        match &self.kind {
            ActionKind::CreateFile | ActionKind::EditFile => {
                let path = path.ok_or(SkipReason::MissingPath)?;
                let contents = self
                    .contents
                    .as_deref()
                    .ok_or(SkipReason::MissingContents)?;
                Ok(FileOperation::Write { path, contents })
            }
            ActionKind::DeleteFile => {
                let path = path.ok_or(SkipReason::MissingPath)?;
                Ok(FileOperation::Delete { path })
            }
            ActionKind::Unknown(value) => Err(SkipReason::UnknownType {
                value: value.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: &str, path: Option<&str>, contents: Option<&str>) -> FileAction {
        FileAction {
            kind: ActionKind::from_type(kind),
            path: path.map(str::to_string),
            contents: contents.map(str::to_string),
        }
    }

    #[test]
    fn create_and_edit_resolve_to_write() {
        for kind in ["create_file", "edit_file"] {
            let a = action(kind, Some("a.py"), Some("x = 1\n"));
            assert_eq!(
                a.resolve(),
                Ok(FileOperation::Write {
                    path: "a.py",
                    contents: "x = 1\n"
                })
            );
        }
    }

    #[test]
    fn empty_contents_are_still_a_write() {
        let a = action("edit_file", Some("a.py"), Some(""));
        assert!(matches!(
            a.resolve(),
            Ok(FileOperation::Write { contents: "", .. })
        ));
    }

    #[test]
    fn write_without_path_or_contents_is_skipped() {
        assert_eq!(
            action("edit_file", None, Some("x")).resolve(),
            Err(SkipReason::MissingPath)
        );
        assert_eq!(
            action("create_file", Some("   "), Some("x")).resolve(),
            Err(SkipReason::MissingPath)
        );
        assert_eq!(
            action("create_file", Some("a.py"), None).resolve(),
            Err(SkipReason::MissingContents)
        );
    }

    #[test]
    fn delete_needs_only_a_path() {
        assert_eq!(
            action("delete_file", Some("old.py"), None).resolve(),
            Ok(FileOperation::Delete { path: "old.py" })
        );
        assert_eq!(
            action("delete_file", None, None).resolve(),
            Err(SkipReason::MissingPath)
        );
    }

    #[test]
    fn unknown_type_is_kept_but_skipped() {
        let a = action("rename_file", Some("a.py"), Some("x"));
        assert_eq!(a.kind, ActionKind::Unknown("rename_file".to_string()));
        assert_eq!(a.kind.as_str(), "rename_file");
        assert_eq!(
            a.resolve(),
            Err(SkipReason::UnknownType {
                value: "rename_file".to_string()
            })
        );
    }
}
