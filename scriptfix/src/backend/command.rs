//! Backend that pipes the prompt through an external program.
//!
//! The program reads the prompt on stdin and writes the response to stdout.
//! Any CLI that talks to a model this way can be plugged in through config:
//!
//! ```toml
//! [backend]
//! name = "command"
//! command = ["llm", "-m", "gpt-4o"]
//! ```

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use super::{BackendOptions, Generator};
use crate::error::GenerationError;
use crate::io::process::run_command_with_timeout;

pub const NAME: &str = "command";

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    output_limit_bytes: usize,
}

impl CommandGenerator {
    pub fn new(command: &[String], output_limit_bytes: usize) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or_else(|| anyhow!("backend.command must be a non-empty array"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            output_limit_bytes,
        })
    }
}

impl Generator for CommandGenerator {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip_all, fields(program = %self.program, timeout_secs = timeout.as_secs()))]
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        info!("running generation command");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            timeout,
            self.output_limit_bytes,
        )
        .map_err(GenerationError::Backend)?;

        if output.timed_out {
            return Err(GenerationError::Timeout(timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "generation command failed");
            return Err(GenerationError::backend(format!(
                "{} exited with status {:?}: {}",
                self.program,
                output.status.code(),
                output.stderr_text().trim()
            )));
        }
        if output.stdout_truncated > 0 {
            warn!(
                dropped = output.stdout_truncated,
                limit = self.output_limit_bytes,
                "generation output over limit"
            );
            return Err(GenerationError::backend(format!(
                "{} output exceeded output_limit_bytes={} ({} bytes dropped)",
                self.program, self.output_limit_bytes, output.stdout_truncated
            )));
        }
        Ok(output.stdout_text())
    }
}

pub fn create(options: &BackendOptions) -> Result<Box<dyn Generator>> {
    Ok(Box::new(CommandGenerator::new(
        &options.command,
        options.output_limit_bytes,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandGenerator {
        sh_with_limit(script, 4096)
    }

    fn sh_with_limit(script: &str, limit: usize) -> CommandGenerator {
        let command = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        CommandGenerator::new(&command, limit).expect("generator")
    }

    #[test]
    fn rejects_empty_command() {
        assert!(CommandGenerator::new(&[], 10).is_err());
        assert!(CommandGenerator::new(&[" ".to_string()], 10).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn returns_stdout_of_program() {
        let out = sh("cat")
            .generate("<actions/>", Duration::from_secs(10))
            .expect("generate");
        assert_eq!(out, "<actions/>");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_backend_error_with_stderr() {
        let err = sh("echo quota exceeded >&2; exit 3")
            .generate("p", Duration::from_secs(10))
            .expect_err("failure");
        assert!(matches!(err, GenerationError::Backend(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[cfg(unix)]
    #[test]
    fn output_over_limit_is_backend_error() {
        let response = "<actions><action><type>delete</type><path>a.py</path></action></actions>";
        let err = sh_with_limit(&format!("printf '%s' '{response}'"), 20)
            .generate("p", Duration::from_secs(10))
            .expect_err("truncated output");
        assert!(matches!(err, GenerationError::Backend(_)));
        assert!(err.to_string().contains("output_limit_bytes=20"));
    }

    #[cfg(unix)]
    #[test]
    fn output_at_limit_is_returned_whole() {
        let out = sh_with_limit("printf '<actions/>'", 10)
            .generate("p", Duration::from_secs(10))
            .expect("generate");
        assert_eq!(out, "<actions/>");
    }

    #[cfg(unix)]
    #[test]
    fn slow_program_times_out() {
        let err = sh("exec sleep 5")
            .generate("p", Duration::from_millis(200))
            .expect_err("timeout");
        assert!(matches!(err, GenerationError::Timeout(_)));
    }
}
