//! Agents that drive one request/response round-trip each.
//!
//! Both agents share their scaffolding through [`AgentProfile`]: templates,
//! the output contract, envelope building, auditing, and the backend call.
//! What differs is the envelope kind and how the response is interpreted.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::backend::Generator;
use crate::core::contract::OutputContract;
use crate::core::envelope::{EnvelopeFields, EnvelopeKind, PromptParts, RequestEnvelope};
use crate::error::{EnvelopeError, PipelineError};
use crate::io::audit::AuditSink;
use crate::io::prompt::{AgentTemplates, BuiltinTemplates};

pub mod analyzer;
pub mod editor;

/// One role in the pipeline.
pub trait Agent {
    type Output;

    /// Root tag of the agent's requests; also names its audit log.
    fn name(&self) -> &str;

    /// Build the request envelope for `fields` without sending it.
    fn build_request(&self, fields: &EnvelopeFields<'_>) -> Result<RequestEnvelope, EnvelopeError>;

    /// Send one request and interpret the response.
    fn run(
        &self,
        generator: &dyn Generator,
        audit: &mut dyn AuditSink,
        fields: &EnvelopeFields<'_>,
        timeout: Duration,
    ) -> Result<Self::Output, PipelineError>;
}

/// Shared agent state, fixed at construction.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    root_tag: &'static str,
    kind: EnvelopeKind,
    templates: AgentTemplates,
    contract: OutputContract,
}

impl AgentProfile {
    /// Load templates and compose the output contract from `preamble`.
    pub fn load(
        root_tag: &'static str,
        kind: EnvelopeKind,
        builtin: &BuiltinTemplates,
        preamble: &str,
        prompts_dir: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let templates = AgentTemplates::load(builtin, prompts_dir)?;
        let contract = OutputContract::compose(preamble, &templates.structure);
        Ok(Self {
            root_tag,
            kind,
            templates,
            contract,
        })
    }

    pub fn root_tag(&self) -> &'static str {
        self.root_tag
    }

    pub fn contract(&self) -> &OutputContract {
        &self.contract
    }

    /// Replace the output contract wholesale, preamble included.
    pub fn set_contract(&mut self, contract: OutputContract) {
        self.contract = contract;
    }

    pub fn build_request(
        &self,
        fields: &EnvelopeFields<'_>,
    ) -> Result<RequestEnvelope, EnvelopeError> {
        let parts = PromptParts {
            root_tag: self.root_tag,
            instructions: &self.templates.instructions,
            role_description: &self.templates.role_description,
            structure: self.contract.as_str(),
        };
        RequestEnvelope::build(self.kind, &parts, fields)
    }

    /// Build, render, audit and send a request; return the raw response.
    #[instrument(skip_all, fields(agent = self.root_tag, backend = generator.name()))]
    pub fn send(
        &self,
        generator: &dyn Generator,
        audit: &mut dyn AuditSink,
        fields: &EnvelopeFields<'_>,
        timeout: Duration,
    ) -> Result<String, PipelineError> {
        let prompt = self.build_request(fields)?.render()?;
        debug!(prompt_bytes = prompt.len(), "request built");
        if let Err(err) = audit.record(self.root_tag, &prompt) {
            let err = format!("{err:#}");
            warn!(%err, "failed to record prompt");
        }
        info!("sending request");
        let response = generator.generate(&prompt, timeout)?;
        debug!(response_bytes = response.len(), "response received");
        Ok(response)
    }
}
