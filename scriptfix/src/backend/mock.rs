//! Offline backend that echoes the prompt back.

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use super::{BackendOptions, Generator};
use crate::error::GenerationError;

pub const NAME: &str = "mock";

const CANNED: &str = "The capital of France is **Paris**.";

/// Returns `"Mock response for prompt {prompt}: {canned}"` for every call.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator;

impl Generator for MockGenerator {
    fn name(&self) -> &str {
        NAME
    }

    fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
        debug!(prompt_bytes = prompt.len(), "mock generation");
        Ok(format!("Mock response for prompt {prompt}: {CANNED}"))
    }
}

pub fn create(_options: &BackendOptions) -> Result<Box<dyn Generator>> {
    Ok(Box::new(MockGenerator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_prompt() {
        let out = MockGenerator
            .generate("hello", Duration::from_secs(1))
            .expect("generate");
        assert!(out.starts_with("Mock response for prompt hello: "));
    }
}
