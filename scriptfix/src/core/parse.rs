//! Parse an editor response document into an [`ActionBatch`].
//!
//! Expected shape:
//!
//! ```xml
//! <actions>
//!   <action>
//!     <type>edit_file</type>
//!     <file_path>script.py</file_path>
//!     <file_contents>...</file_contents>
//!   </action>
//! </actions>
//! ```
//!
//! The root element name is not checked. Only direct children of the root
//! named `action` are read, and within an action only the first direct
//! `type`, `file_path` and `file_contents` children count. A document that
//! is not well-formed yields an empty batch plus a [`MalformedResponse`];
//! this module never returns `Err` for bad input.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use tracing::{debug, warn};

use super::action::{ActionBatch, ActionKind, FileAction};

const ACTION_TAG: &[u8] = b"action";
const TYPE_TAG: &[u8] = b"type";
const PATH_TAG: &[u8] = b"file_path";
const CONTENTS_TAG: &[u8] = b"file_contents";

/// Structural parse failure. Non-fatal: the batch comes back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedResponse {
    pub message: String,
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed response: {}", self.message)
    }
}

/// Result of parsing one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Actions carrying a `type`, in document order.
    pub batch: ActionBatch,
    /// Number of `action` elements encountered, including skipped ones.
    pub elements_seen: usize,
    /// Number of `action` elements skipped for lacking a `type`.
    pub missing_type: usize,
    pub failure: Option<MalformedResponse>,
}

impl ParseReport {
    fn malformed(message: impl Into<String>) -> Self {
        let failure = MalformedResponse {
            message: message.into(),
        };
        warn!(error = %failure, "discarding response");
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Type,
    Path,
    Contents,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            TYPE_TAG => Some(Field::Type),
            PATH_TAG => Some(Field::Path),
            CONTENTS_TAG => Some(Field::Contents),
            _ => None,
        }
    }
}

/// Fields collected for the `action` element currently open.
#[derive(Debug, Default)]
struct PendingAction {
    kind: Option<String>,
    path: Option<String>,
    contents: Option<String>,
}

impl PendingAction {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Type => &mut self.kind,
            Field::Path => &mut self.path,
            Field::Contents => &mut self.contents,
        }
    }

    fn finish(self) -> Option<FileAction> {
        let kind = self.kind?;
        Some(FileAction {
            kind: ActionKind::from_type(kind.trim()),
            path: self.path.map(|p| p.trim().to_string()),
            contents: self.contents,
        })
    }
}

/// Text capture for a field element: only text before its first child
/// element counts, matching the usual "element text" notion.
#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    buf: String,
    closed: bool,
}

/// Parse `payload` into a [`ParseReport`].
pub fn parse_actions(payload: &str) -> ParseReport {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(false);

    let mut report = ParseReport::default();
    let mut depth = 0usize;
    let mut root_closed = false;
    let mut pending: Option<PendingAction> = None;
    let mut capture: Option<Capture> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return ParseReport::malformed(format!(
                    "{err} at byte {}",
                    reader.buffer_position()
                ));
            }
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if depth == 0 && root_closed {
                    return ParseReport::malformed("junk after document element");
                }
                let name = e.name();
                let name = name.as_ref();

                if let Some(cap) = capture.as_mut() {
                    cap.closed = true;
                } else if depth == 1 && name == ACTION_TAG {
                    report.elements_seen += 1;
                    pending = Some(PendingAction::default());
                } else if depth == 2
                    && let Some(action) = pending.as_mut()
                    && let Some(field) = Field::from_tag(name)
                    && action.slot(field).is_none()
                {
                    if is_empty {
                        *action.slot(field) = Some(String::new());
                    } else {
                        capture = Some(Capture {
                            field,
                            depth: depth + 1,
                            buf: String::new(),
                            closed: false,
                        });
                    }
                }

                if is_empty {
                    if depth == 0 {
                        root_closed = true;
                    } else if depth == 1 && name == ACTION_TAG {
                        finish_action(&mut report, pending.take());
                    }
                } else {
                    depth += 1;
                }
            }
            Event::End(ref e) => {
                if depth == 0 {
                    return ParseReport::malformed("unexpected closing tag");
                }
                if let Some(cap) = capture.take_if(|cap| cap.depth == depth)
                    && let Some(action) = pending.as_mut()
                {
                    *action.slot(cap.field) = Some(cap.buf);
                }
                depth -= 1;
                if depth == 1 && e.name().as_ref() == ACTION_TAG {
                    finish_action(&mut report, pending.take());
                }
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Text(e) => {
                let text = match e.unescape() {
                    Ok(text) => text,
                    Err(err) => {
                        return ParseReport::malformed(format!(
                            "{err} at byte {}",
                            reader.buffer_position()
                        ));
                    }
                };
                if depth == 0 {
                    if !text.trim().is_empty() {
                        return ParseReport::malformed("text outside of the root element");
                    }
                    continue;
                }
                push_text(capture.as_mut(), depth, &text);
            }
            Event::CData(e) => {
                if depth == 0 {
                    return ParseReport::malformed("CDATA outside of the root element");
                }
                let Ok(text) = String::from_utf8(e.into_inner().into_owned()) else {
                    return ParseReport::malformed("CDATA section is not valid UTF-8");
                };
                push_text(capture.as_mut(), depth, &text);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if depth != 0 {
        return ParseReport::malformed("unexpected end of document (unclosed element)");
    }
    if !root_closed {
        return ParseReport::malformed("no element found");
    }

    debug!(
        actions = report.batch.len(),
        elements_seen = report.elements_seen,
        missing_type = report.missing_type,
        "parsed response"
    );
    report
}

fn push_text(capture: Option<&mut Capture>, depth: usize, text: &str) {
    if let Some(cap) = capture
        && cap.depth == depth
        && !cap.closed
    {
        cap.buf.push_str(text);
    }
}

fn finish_action(report: &mut ParseReport, pending: Option<PendingAction>) {
    let Some(pending) = pending else {
        return;
    };
    match pending.finish() {
        Some(action) => report.batch.push(action),
        None => {
            report.missing_type += 1;
            warn!(
                element = report.elements_seen,
                "action element without a type, skipping"
            );
        }
    }
}
