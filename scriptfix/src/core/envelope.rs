//! Request envelopes: the tagged documents sent to the generation backend.
//!
//! Payload text (script contents, analysis report) is embedded verbatim. The
//! output contract asks the backend to escape `<` and `>` in its own answer,
//! but nothing escapes the script we send, so a script containing envelope
//! tags can make the request ambiguous.

use minijinja::{AutoEscape, Environment, context};
use serde::Serialize;

use crate::error::EnvelopeError;

const ENVELOPE_TEMPLATE: &str = include_str!("../prompts/envelope.j2");

/// Which request is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Analyze,
    Edit,
}

/// Agent-owned text that frames every request.
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    /// Root element name (e.g. `function_editor`).
    pub root_tag: &'a str,
    pub instructions: &'a str,
    pub role_description: &'a str,
    /// Rendered output contract.
    pub structure: &'a str,
}

/// Per-invocation payload.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFields<'a> {
    pub script_path: &'a str,
    pub script_contents: &'a str,
    /// Required for [`EnvelopeKind::Edit`], ignored otherwise.
    pub analysis_report: Option<&'a str>,
}

/// One named section of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tag: &'static str,
    /// Rendered as a `path` attribute when set.
    pub path: Option<String>,
    pub body: String,
}

/// Immutable request document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    kind: EnvelopeKind,
    root_tag: String,
    sections: Vec<Section>,
}

impl RequestEnvelope {
    /// Build an envelope, checking that every section it needs is non-empty.
    pub fn build(
        kind: EnvelopeKind,
        parts: &PromptParts<'_>,
        fields: &EnvelopeFields<'_>,
    ) -> Result<Self, EnvelopeError> {
        require("original_script_path", fields.script_path)?;
        require("original_script", fields.script_contents)?;
        require("root tag", parts.root_tag)?;
        require("instructions", parts.instructions)?;
        require("role_description", parts.role_description)?;
        require("structure", parts.structure)?;

        let mut sections = Vec::with_capacity(5);
        sections.push(Section {
            tag: "instructions",
            path: None,
            body: parts.instructions.trim().to_string(),
        });
        sections.push(Section {
            tag: "original_script",
            path: Some(fields.script_path.to_string()),
            body: fields.script_contents.to_string(),
        });
        if kind == EnvelopeKind::Edit {
            let report = fields.analysis_report.unwrap_or_default();
            require("analysis_report", report)?;
            sections.push(Section {
                tag: "analysis_report",
                path: None,
                body: report.to_string(),
            });
        }
        sections.push(Section {
            tag: "role_description",
            path: None,
            body: parts.role_description.trim().to_string(),
        });
        sections.push(Section {
            tag: "structure",
            path: None,
            body: parts.structure.to_string(),
        });

        Ok(Self {
            kind,
            root_tag: parts.root_tag.to_string(),
            sections,
        })
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, tag: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.tag == tag)
    }

    /// Render to the tagged text sent to the backend.
    pub fn render(&self) -> Result<String, EnvelopeError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template("envelope", ENVELOPE_TEMPLATE)?;
        let rendered = env.get_template("envelope")?.render(context! {
            root => &self.root_tag,
            sections => &self.sections,
        })?;
        Ok(rendered)
    }
}

fn require(name: &str, value: &str) -> Result<(), EnvelopeError> {
    if value.trim().is_empty() {
        return Err(EnvelopeError::MissingInput(format!("{name} is empty")));
    }
    Ok(())
}
