//! API key resolution.
//!
//! An explicit key may be the key itself or a path to a file holding it.
//! Without one, the backend's environment variable is consulted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Resolve a key from `explicit` or the process environment.
pub fn resolve_api_key(explicit: Option<&str>, env_var: &str) -> Result<String> {
    resolve_api_key_with(explicit, env_var, |name| std::env::var(name).ok())
}

/// Like [`resolve_api_key`], with an injectable environment lookup.
pub fn resolve_api_key_with<F>(explicit: Option<&str>, env_var: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        let path = Path::new(value);
        if path.is_file() {
            debug!(path = %path.display(), "reading api key from file");
            let key = fs::read_to_string(path)
                .with_context(|| format!("read api key file {}", path.display()))?;
            return non_empty(key.trim(), &format!("api key file {}", path.display()));
        }
        return Ok(value.to_string());
    }
    match lookup(env_var) {
        Some(key) => non_empty(key.trim(), env_var),
        None => Err(anyhow!(
            "no api key: pass --api-key (key or key file) or set {env_var}"
        )),
    }
}

fn non_empty(key: &str, source: &str) -> Result<String> {
    if key.is_empty() {
        return Err(anyhow!("api key from {source} is empty"));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn explicit_value_is_used_as_key() {
        let key = resolve_api_key_with(Some("sk-123"), "OPENAI_API_KEY", no_env).expect("key");
        assert_eq!(key, "sk-123");
    }

    #[test]
    fn explicit_path_is_read_and_trimmed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("google_api.key");
        fs::write(&path, "abc\n").expect("write key");
        let key = resolve_api_key_with(path.to_str(), "GOOGLEAI_API_KEY", no_env).expect("key");
        assert_eq!(key, "abc");
    }

    #[test]
    fn empty_key_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("empty.key");
        fs::write(&path, "\n").expect("write key");
        assert!(resolve_api_key_with(path.to_str(), "X", no_env).is_err());
    }

    #[test]
    fn falls_back_to_env_var() {
        let key = resolve_api_key_with(None, "DEEPSEEK_API_KEY", |name| {
            (name == "DEEPSEEK_API_KEY").then(|| "ds-key".to_string())
        })
        .expect("key");
        assert_eq!(key, "ds-key");

        let key = resolve_api_key_with(Some("  "), "DEEPSEEK_API_KEY", |_| {
            Some("from-env".to_string())
        })
        .expect("key");
        assert_eq!(key, "from-env");
    }

    #[test]
    fn missing_key_names_env_var() {
        let err = resolve_api_key_with(None, "OPENAI_API_KEY", no_env).expect_err("missing");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
