//! HTTPS backends: OpenAI-compatible chat completions and Google Gemini.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::keys::resolve_api_key;
use super::{BackendOptions, Generator};
use crate::error::GenerationError;

pub const OPENAI: &str = "openai";
pub const DEEPSEEK: &str = "deepseek";
pub const GOOGLE: &str = "google";

/// Wire format spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {base}/chat/completions` with bearer auth.
    ChatCompletions,
    /// `POST {base}/models/{model}:generateContent` with `x-goog-api-key`.
    GeminiGenerate,
}

/// Static description of a hosted backend.
#[derive(Debug, Clone, Copy)]
pub struct Provider {
    pub name: &'static str,
    pub flavor: ApiFlavor,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub key_env: &'static str,
}

pub const OPENAI_PROVIDER: Provider = Provider {
    name: OPENAI,
    flavor: ApiFlavor::ChatCompletions,
    base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o-mini",
    key_env: "OPENAI_API_KEY",
};

pub const DEEPSEEK_PROVIDER: Provider = Provider {
    name: DEEPSEEK,
    flavor: ApiFlavor::ChatCompletions,
    base_url: "https://api.deepseek.com/v1",
    default_model: "deepseek-chat",
    key_env: "DEEPSEEK_API_KEY",
};

pub const GOOGLE_PROVIDER: Provider = Provider {
    name: GOOGLE,
    flavor: ApiFlavor::GeminiGenerate,
    base_url: "https://generativelanguage.googleapis.com/v1beta",
    default_model: "gemini-2.0-flash-thinking-exp",
    key_env: "GOOGLEAI_API_KEY",
};

/// Blocking HTTP client for one provider.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    provider: Provider,
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(provider: Provider, options: &BackendOptions) -> Result<Self> {
        let api_key = resolve_api_key(options.api_key.as_deref(), provider.key_env)
            .with_context(|| format!("configure {} backend", provider.name))?;
        let client = Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            provider,
            client,
            base_url: options
                .base_url
                .clone()
                .unwrap_or_else(|| provider.base_url.to_string()),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model.to_string()),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider.flavor {
            ApiFlavor::ChatCompletions => format!("{base}/chat/completions"),
            ApiFlavor::GeminiGenerate => format!("{base}/models/{}:generateContent", self.model),
        }
    }

    fn request(&self, prompt: &str, timeout: Duration) -> RequestBuilder {
        let builder = self.client.post(self.endpoint()).timeout(timeout);
        match self.provider.flavor {
            ApiFlavor::ChatCompletions => builder
                .bearer_auth(&self.api_key)
                .json(&chat_body(&self.model, prompt)),
            ApiFlavor::GeminiGenerate => builder
                .header("x-goog-api-key", &self.api_key)
                .json(&gemini_body(prompt)),
        }
    }
}

impl Generator for HttpGenerator {
    fn name(&self) -> &str {
        self.provider.name
    }

    #[instrument(skip_all, fields(backend = self.provider.name, model = %self.model))]
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        debug!(prompt_bytes = prompt.len(), "sending generation request");
        let response = self
            .request(prompt, timeout)
            .send()
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "generation request rejected");
            return Err(GenerationError::backend(format!(
                "{} API error {status}: {}",
                self.provider.name,
                body.trim()
            )));
        }

        let body: Value = response
            .json()
            .map_err(|e| transport_error(e, timeout))?;
        let text = match self.provider.flavor {
            ApiFlavor::ChatCompletions => chat_text(&body),
            ApiFlavor::GeminiGenerate => gemini_text(&body),
        }
        .map_err(GenerationError::Backend)?;
        debug!(response_bytes = text.len(), "generation response received");
        Ok(text)
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout)
    } else {
        GenerationError::Backend(anyhow::Error::new(err))
    }
}

fn chat_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
    })
}

fn gemini_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
    })
}

fn chat_text(body: &Value) -> Result<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no content in chat completion response"))
}

fn gemini_text(body: &Value) -> Result<String> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| anyhow!("no candidates in generateContent response"))?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        return Err(anyhow!("no text in generateContent response"));
    }
    Ok(text)
}

pub fn create_openai(options: &BackendOptions) -> Result<Box<dyn Generator>> {
    Ok(Box::new(HttpGenerator::new(OPENAI_PROVIDER, options)?))
}

pub fn create_deepseek(options: &BackendOptions) -> Result<Box<dyn Generator>> {
    Ok(Box::new(HttpGenerator::new(DEEPSEEK_PROVIDER, options)?))
}

pub fn create_google(options: &BackendOptions) -> Result<Box<dyn Generator>> {
    Ok(Box::new(HttpGenerator::new(GOOGLE_PROVIDER, options)?))
}
