//! Agent prompt templates: role description, output schema, instructions.
//!
//! Every agent ships built-in templates compiled into the binary. An override
//! directory may replace any of them per agent:
//! `<dir>/<agent>/{role.xml,structure.xml,instructions.txt}`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

const ROLE_FILE: &str = "role.xml";
const STRUCTURE_FILE: &str = "structure.xml";
const INSTRUCTIONS_FILE: &str = "instructions.txt";

/// Templates compiled into the binary for one agent.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTemplates {
    /// Subdirectory name under the override directory.
    pub dir_name: &'static str,
    pub role: &'static str,
    pub structure: &'static str,
    pub instructions: &'static str,
}

/// Loaded template text for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTemplates {
    /// Text of the `<description>` element of the role template.
    pub role_description: String,
    /// Schema body appended to the output contract preamble.
    pub structure: String,
    pub instructions: String,
}

impl AgentTemplates {
    /// Load templates, preferring files under `override_dir` when present.
    pub fn load(builtin: &BuiltinTemplates, override_dir: Option<&Path>) -> Result<Self> {
        let dir = override_dir.map(|d| d.join(builtin.dir_name));
        let dir = dir.as_deref();
        let role = read_or(dir, ROLE_FILE, builtin.role)?;
        let structure = read_or(dir, STRUCTURE_FILE, builtin.structure)?;
        let instructions = read_or(dir, INSTRUCTIONS_FILE, builtin.instructions)?;
        let role_description = role_description(&role)
            .with_context(|| format!("load {} role template", builtin.dir_name))?;
        Ok(Self {
            role_description,
            structure,
            instructions: instructions.trim().to_string(),
        })
    }

    pub fn builtin(builtin: &BuiltinTemplates) -> Result<Self> {
        Self::load(builtin, None)
    }
}

fn read_or(dir: Option<&Path>, file: &str, fallback: &str) -> Result<String> {
    if let Some(path) = dir.map(|d| d.join(file))
        && let Some(contents) = read_optional(&path)?
    {
        debug!(path = %path.display(), "using template override");
        return Ok(contents);
    }
    Ok(fallback.to_string())
}

fn read_optional(path: impl Into<PathBuf>) -> Result<Option<String>> {
    let path = path.into();
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

/// Extract the trimmed text of the first `<description>` element.
pub fn role_description(role_xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(role_xml);
    let mut inside = false;
    let mut text = String::new();
    loop {
        match reader.read_event().context("parse role template")? {
            Event::Start(e) if !inside && e.name().as_ref() == b"description" => inside = true,
            Event::Text(t) if inside => text.push_str(&t.unescape().context("unescape role text")?),
            Event::CData(c) if inside => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) if inside && e.name().as_ref() == b"description" => break,
            Event::Eof => return Err(anyhow!("role template has no <description> element")),
            _ => {}
        }
    }
    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow!("role template has an empty <description>"));
    }
    Ok(text.to_string())
}
