//! scriptfix configuration stored in `scriptfix.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::backend::BackendOptions;
use crate::io::atomic::write_atomic;
use crate::io::git::GitIdentity;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "scriptfix.toml";

/// Default commit message for each applied action.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update";

/// scriptfix configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid. CLI flags
/// override whatever is loaded here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptfixConfig {
    /// Per-request generation timeout in seconds.
    pub timeout_secs: u64,

    /// Commit message used for every applied action.
    pub commit_message: String,

    /// Hard-reset the working tree when an action fails to apply.
    pub reset_on_failure: bool,

    pub audit: AuditConfig,
    pub prompts: PromptsConfig,
    pub git: GitConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    /// Append every prompt sent to `<dir>/<agent>_sent_prompts.log`.
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("logs"),
        }
    }
}

/// Override directory for agent templates.
///
/// Expected layout: `<dir>/<agent>/{role.xml,structure.xml,instructions.txt}`.
/// Files that are absent fall back to the built-in templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Identity for checkpoint commits. Unset means git's own user config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl GitConfig {
    pub fn identity(&self) -> Option<GitIdentity> {
        match (&self.user_name, &self.user_email) {
            (Some(name), Some(email)) => Some(GitIdentity {
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// Registry name (`mock`, `command`, `openai`, `deepseek`, `google`).
    pub name: String,
    /// Key or path to a key file. Prefer the backend's env var.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Program and arguments for the `command` backend.
    pub command: Vec<String>,
    /// Truncate backend output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            api_key: None,
            model: None,
            base_url: None,
            command: Vec::new(),
            output_limit_bytes: 1_000_000,
        }
    }
}

impl BackendConfig {
    pub fn options(&self) -> BackendOptions {
        BackendOptions {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            command: self.command.clone(),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

impl Default for ScriptfixConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            reset_on_failure: false,
            audit: AuditConfig::default(),
            prompts: PromptsConfig::default(),
            git: GitConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl ScriptfixConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.commit_message.trim().is_empty() {
            return Err(anyhow!("commit_message must not be empty"));
        }
        if self.backend.name.trim().is_empty() {
            return Err(anyhow!("backend.name must not be empty"));
        }
        if self.backend.output_limit_bytes == 0 {
            return Err(anyhow!("backend.output_limit_bytes must be > 0"));
        }
        if self.audit.enabled && self.audit.dir.as_os_str().is_empty() {
            return Err(anyhow!("audit.dir must be set when audit is enabled"));
        }
        if self.git.user_name.is_some() != self.git.user_email.is_some() {
            return Err(anyhow!("git.user_name and git.user_email must be set together"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScriptfixConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScriptfixConfig> {
    if !path.exists() {
        let cfg = ScriptfixConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScriptfixConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ScriptfixConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
}
