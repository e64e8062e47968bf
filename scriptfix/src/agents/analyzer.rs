//! Function analyzer: reviews the script and returns a free-text report.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use super::{Agent, AgentProfile};
use crate::backend::Generator;
use crate::core::contract::{BASE_PREAMBLE, OutputContract};
use crate::core::envelope::{EnvelopeFields, EnvelopeKind, RequestEnvelope};
use crate::error::{EnvelopeError, PipelineError};
use crate::io::audit::AuditSink;
use crate::io::prompt::BuiltinTemplates;

pub const ROOT_TAG: &str = "function_analyzer";

const BUILTIN: BuiltinTemplates = BuiltinTemplates {
    dir_name: "analyzer",
    role: include_str!("../prompts/analyzer/role.xml"),
    structure: include_str!("../prompts/analyzer/structure.xml"),
    instructions: include_str!("../prompts/analyzer/instructions.txt"),
};

#[derive(Debug, Clone)]
pub struct FunctionAnalyzer {
    profile: AgentProfile,
}

impl FunctionAnalyzer {
    /// Load templates, preferring `prompts_dir/analyzer/*` when present.
    pub fn new(prompts_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            profile: AgentProfile::load(
                ROOT_TAG,
                EnvelopeKind::Analyze,
                &BUILTIN,
                BASE_PREAMBLE,
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

impl Agent for FunctionAnalyzer {
    /// The analysis report, as returned by the backend.
    type Output = String;

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
    ) -> Result<String, PipelineError> {
        self.profile.send(generator, audit, fields, timeout)
    }
}
