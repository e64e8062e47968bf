//! Function editor: turns the script plus an analysis report into file actions.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::{Agent, AgentProfile};
use crate::backend::Generator;
use crate::core::contract::{OutputContract, STRICT_XML_PREAMBLE};
use crate::core::envelope::{EnvelopeFields, EnvelopeKind, RequestEnvelope};
use crate::core::normalize::normalize;
use crate::core::parse::{ParseReport, parse_actions};
use crate::error::{EnvelopeError, PipelineError};
use crate::io::audit::AuditSink;
use crate::io::prompt::BuiltinTemplates;

pub const ROOT_TAG: &str = "function_editor";

const BUILTIN: BuiltinTemplates = BuiltinTemplates {
    dir_name: "editor",
    role: include_str!("../prompts/editor/role.xml"),
    structure: include_str!("../prompts/editor/structure.xml"),
    instructions: include_str!("../prompts/editor/instructions.txt"),
};

/// Editor response, before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorOutput {
    /// Response text as received.
    #[serde(skip)]
    pub raw: String,
    pub parse: ParseReport,
}

#[derive(Debug, Clone)]
pub struct FunctionEditor {
    profile: AgentProfile,
}

impl FunctionEditor {
    /// Load templates, preferring `prompts_dir/editor/*` when present.
    pub fn new(prompts_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            profile: AgentProfile::load(
                ROOT_TAG,
                EnvelopeKind::Edit,
                &BUILTIN,
                STRICT_XML_PREAMBLE,
                prompts_dir,
            )?,
        })
    }

    pub fn with_contract(mut self, contract: OutputContract) -> Self {
        self.profile.set_contract(contract);
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }
}

/// Normalize and parse a raw editor response.
pub fn interpret_response(raw: &str) -> ParseReport {
    let report = parse_actions(normalize(raw));
    if let Some(failure) = &report.failure {
        warn!(%failure, "editor response could not be parsed");
    } else {
        info!(
            elements_seen = report.elements_seen,
            usable = report.batch.len(),
            missing_type = report.missing_type,
            "editor response parsed"
        );
    }
    report
}

impl Agent for FunctionEditor {
    type Output = EditorOutput;

    fn name(&self) -> &str {
        self.profile.root_tag()
    }

    fn build_request(&self, fields: &EnvelopeFields<'_>) -> Result<RequestEnvelope, EnvelopeError> {
        self.profile.build_request(fields)
    }

    fn run(
        &self,
        generator: &dyn Generator,
        audit: &mut dyn AuditSink,
        fields: &EnvelopeFields<'_>,
        timeout: Duration,
    ) -> Result<EditorOutput, PipelineError> {
        let raw = self.profile.send(generator, audit, fields, timeout)?;
        let parse = interpret_response(&raw);
        Ok(EditorOutput { raw, parse })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionKind;
    use crate::io::audit::NullAudit;
    use crate::test_support::ScriptedGenerator;

    fn fields(report: Option<&'static str>) -> EnvelopeFields<'static> {
        EnvelopeFields {
            script_path: "f.py",
            script_contents: "def f(): pass",
            analysis_report: report,
        }
    }

    #[test]
    fn request_carries_report_and_strict_contract() {
        let editor = FunctionEditor::new(None).expect("editor");
        let envelope = editor.build_request(&fields(Some("no issues"))).expect("build");
        assert_eq!(envelope.root_tag(), "function_editor");
        assert_eq!(
            envelope.section("analysis_report").expect("report").body,
            "no issues"
        );
        let structure = &envelope.section("structure").expect("structure").body;
        assert!(structure.starts_with(STRICT_XML_PREAMBLE));
        assert!(structure.contains("<file_contents>"));
    }

    #[test]
    fn missing_report_fails_before_backend_call() {
        let editor = FunctionEditor::new(None).expect("editor");
        let generator = ScriptedGenerator::new(["unused"]);
        let err = editor
            .run(&generator, &mut NullAudit, &fields(None), Duration::from_secs(1))
            .expect_err("missing report");
        assert!(matches!(err, PipelineError::MissingInput(ref m) if m.contains("analysis_report")));
        assert!(generator.prompts().is_empty());
    }

    #[test]
    fn fenced_response_is_parsed_into_actions() {
        let editor = FunctionEditor::new(None).expect("editor");
        let generator = ScriptedGenerator::new([
            "Here you go:\n```xml\n<actions><action><type>edit_file</type>\
             <file_path>f.py</file_path><file_contents>def f():\n    return None</file_contents>\
             </action></actions>\n```\nDone.",
        ]);

        let out = editor
            .run(&generator, &mut NullAudit, &fields(Some("r")), Duration::from_secs(1))
            .expect("run");

        generator.assert_drained();
        assert!(out.raw.starts_with("Here you go:"));
        assert_eq!(out.parse.elements_seen, 1);
        let action = &out.parse.batch[0];
        assert_eq!(action.kind, ActionKind::EditFile);
        assert_eq!(action.path.as_deref(), Some("f.py"));
        assert_eq!(action.contents.as_deref(), Some("def f():\n    return None"));
    }

    #[test]
    fn prose_response_is_reported_malformed() {
        let report = interpret_response("I could not find any issues.");
        assert!(report.is_malformed());
        assert!(report.batch.is_empty());
    }
}
