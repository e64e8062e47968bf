//! Generation backends, resolved by name.
//!
//! The [`Generator`] trait is the only thing the pipeline knows about a
//! backend. Tests use scripted generators that return queued responses
//! without touching the network or spawning processes.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::error::GenerationError;

pub mod command;
pub mod http;
pub mod keys;
pub mod mock;

/// Abstraction over text generation backends.
pub trait Generator {
    /// Registry name of the backend, used in logs and audit file names.
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw response text.
    ///
    /// Implementations must give up once `timeout` has elapsed and report
    /// [`GenerationError::Timeout`]. Failures are never retried here.
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        (**self).generate(prompt, timeout)
    }
}

/// Settings handed to a backend constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// Key value or path to a key file. Falls back to the backend's env var.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Program and arguments for the `command` backend.
    pub command: Vec<String>,
    /// Keep at most this many bytes of backend output.
    pub output_limit_bytes: usize,
}

/// Constructor registered under a backend name.
pub type BackendFactory = fn(&BackendOptions) -> Result<Box<dyn Generator>>;

/// Name to constructor map.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(mock::NAME, mock::create);
        registry.register(command::NAME, command::create);
        registry.register(http::OPENAI, http::create_openai);
        registry.register(http::DEEPSEEK, http::create_deepseek);
        registry.register(http::GOOGLE, http::create_google);
        registry
    }

    /// Add or replace the constructor for `name`.
    pub fn register(&mut self, name: &str, factory: BackendFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the backend registered as `name`.
    pub fn create(&self, name: &str, options: &BackendOptions) -> Result<Box<dyn Generator>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            anyhow!(
                "unknown backend '{name}' (available: {})",
                self.names().join(", ")
            )
        })?;
        factory(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sorted_by_name() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["command", "deepseek", "google", "mock", "openai"]
        );
    }

    #[test]
    fn unknown_backend_lists_available_names() {
        let registry = BackendRegistry::with_defaults();
        let err = registry
            .create("bard", &BackendOptions::default())
            .err()
            .expect("unknown backend");
        let msg = err.to_string();
        assert!(msg.contains("unknown backend 'bard'"));
        assert!(msg.contains("mock"));
    }

    #[test]
    fn register_adds_custom_backend() {
        fn custom(options: &BackendOptions) -> Result<Box<dyn Generator>> {
            mock::create(options)
        }
        let mut registry = BackendRegistry::new();
        assert!(registry.names().is_empty());
        registry.register("custom", custom);
        let backend = registry
            .create("custom", &BackendOptions::default())
            .expect("create");
        assert_eq!(backend.name(), mock::NAME);
    }
}
