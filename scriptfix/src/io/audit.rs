//! Append-only record of prompts sent to the generation backend.
//!
//! Audit output is a product artifact, separate from `tracing` diagnostics:
//! it is written whenever enabled, regardless of `RUST_LOG`. A directory the
//! log creates for itself carries a `.gitignore` so checkpoint commits never
//! pick the logs up.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Sink for outgoing prompts, with an explicit lifecycle.
pub trait AuditSink {
    /// Record one prompt sent on behalf of `agent`.
    fn record(&mut self, agent: &str, prompt: &str) -> Result<()>;

    /// Flush and release any open files. Recording after close reopens them.
    fn close(&mut self) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&mut self, _agent: &str, _prompt: &str) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends `"Prompt Sent:\n{prompt}\n\n"` to `<dir>/<agent>_sent_prompts.log`.
#[derive(Debug)]
pub struct FileAuditLog {
    dir: PathBuf,
    open: Vec<(String, BufWriter<File>)>,
}

impl FileAuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file used for `agent`.
    pub fn log_path(&self, agent: &str) -> PathBuf {
        self.dir.join(format!("{agent}_sent_prompts.log"))
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create audit dir {}", self.dir.display()))?;
        let ignore = self.dir.join(".gitignore");
        fs::write(&ignore, "*\n").with_context(|| format!("write {}", ignore.display()))?;
        debug!(dir = %self.dir.display(), "created audit dir");
        Ok(())
    }

    fn writer(&mut self, agent: &str) -> Result<&mut BufWriter<File>> {
        let idx = match self.open.iter().position(|(name, _)| name == agent) {
            Some(idx) => idx,
            None => {
                self.ensure_dir()?;
                let path = self.log_path(agent);
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("open audit log {}", path.display()))?;
                debug!(path = %path.display(), "opened audit log");
                self.open.push((agent.to_string(), BufWriter::new(file)));
                self.open.len() - 1
            }
        };
        Ok(&mut self.open[idx].1)
    }
}

impl AuditSink for FileAuditLog {
    fn record(&mut self, agent: &str, prompt: &str) -> Result<()> {
        let writer = self.writer(agent)?;
        write!(writer, "Prompt Sent:\n{prompt}\n\n").context("append audit entry")?;
        writer.flush().context("flush audit log")
    }

    fn close(&mut self) -> Result<()> {
        for (agent, mut writer) in self.open.drain(..) {
            writer
                .flush()
                .with_context(|| format!("flush audit log for {agent}"))?;
        }
        Ok(())
    }
}

impl Drop for FileAuditLog {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
