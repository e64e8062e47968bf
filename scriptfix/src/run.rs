//! End-to-end run: analyze, edit, parse, apply.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::agents::Agent;
use crate::agents::analyzer::FunctionAnalyzer;
use crate::agents::editor::FunctionEditor;
use crate::backend::Generator;
use crate::core::envelope::EnvelopeFields;
use crate::core::parse::ParseReport;
use crate::error::PipelineError;
use crate::io::apply::{AppliedSummary, ApplyOptions, VersionControlWarning, apply_actions};
use crate::io::audit::AuditSink;
use crate::io::git::{Git, GitIdentity};

/// The two agents of a run.
#[derive(Debug, Clone)]
pub struct Agents {
    pub analyzer: FunctionAnalyzer,
    pub editor: FunctionEditor,
}

impl Agents {
    /// Built-in templates, overridden per file from `prompts_dir`.
    pub fn load(prompts_dir: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self {
            analyzer: FunctionAnalyzer::new(prompts_dir)?,
            editor: FunctionEditor::new(prompts_dir)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Bound on each backend call.
    pub timeout: Duration,
    /// Author for checkpoint commits; git's own config when unset.
    pub identity: Option<GitIdentity>,
    pub apply: ApplyOptions,
}

/// Everything a run did, in a form fit for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub script: String,
    /// True when the run had to `git init` the script's directory.
    pub repository_created: bool,
    pub analysis_report_bytes: usize,
    pub parse: ParseReport,
    pub applied: AppliedSummary,
}

impl RunReport {
    pub fn halted(&self) -> bool {
        self.applied.halted
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        let a = &self.applied;
        let mut line = format!(
            "{}: {} action(s) parsed ({} seen, {} without type); applied {}, skipped {}, failed {}, commits {}",
            self.script,
            self.parse.batch.len(),
            self.parse.elements_seen,
            self.parse.missing_type,
            a.applied,
            a.skipped,
            a.failed,
            a.commits,
        );
        if let Some(failure) = &self.parse.failure {
            line.push_str(&format!("; {failure}"));
        }
        if a.halted {
            line.push_str(&format!("; halted ({} not attempted)", a.not_attempted));
        }
        if !a.warnings.is_empty() {
            line.push_str(&format!("; {} git warning(s)", a.warnings.len()));
        }
        line
    }
}

/// Run the full pipeline on `script`.
///
/// Only unreadable input and backend failures are errors. Malformed
/// responses and per-action problems end up in the report.
#[instrument(skip_all, fields(script = %script.display()))]
pub fn run_script(
    script: &Path,
    agents: &Agents,
    generator: &dyn Generator,
    audit: &mut dyn AuditSink,
    options: &RunOptions,
) -> Result<RunReport, PipelineError> {
    let contents = fs::read_to_string(script).map_err(|e| {
        PipelineError::MissingInput(format!("read script {}: {e}", script.display()))
    })?;
    if contents.trim().is_empty() {
        return Err(PipelineError::MissingInput(format!(
            "script {} is empty",
            script.display()
        )));
    }
    let script_path = script.display().to_string();

    let git = Git::for_script(script).with_identity(options.identity.clone());
    let mut early_warnings = Vec::new();
    let repository_created = match git.init_if_absent(true) {
        Ok(created) => created,
        Err(err) => {
            let message = format!("{err:#}");
            warn!(err = %message, "could not initialize repository");
            early_warnings.push(VersionControlWarning {
                index: None,
                message,
            });
            false
        }
    };

    let mut fields = EnvelopeFields {
        script_path: &script_path,
        script_contents: &contents,
        analysis_report: None,
    };
    let analysis = agents
        .analyzer
        .run(generator, audit, &fields, options.timeout)?;
    info!(bytes = analysis.len(), "analysis received");

    fields.analysis_report = Some(&analysis);
    let edit = agents.editor.run(generator, audit, &fields, options.timeout)?;

    let mut applied = apply_actions(&edit.parse.batch, &git, &options.apply);
    if !early_warnings.is_empty() {
        early_warnings.append(&mut applied.warnings);
        applied.warnings = early_warnings;
    }

    if let Err(err) = audit.close() {
        let err = format!("{err:#}");
        warn!(%err, "failed to close audit log");
    }

    let report = RunReport {
        script: script_path,
        repository_created,
        analysis_report_bytes: analysis.len(),
        parse: edit.parse,
        applied,
    };
    info!(summary = %report.summary_line(), "run finished");
    Ok(report)
}
