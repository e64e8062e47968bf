//! Output-format contracts sent to the generation backend.

/// Format rules every agent sends.
pub const BASE_PREAMBLE: &str = "Output Structure Instructions:
1. The LLM must adhere strictly to the schema provided.
2. The LLM must use the XML format provided.
";

/// Format rules for agents whose output is parsed as XML.
pub const STRICT_XML_PREAMBLE: &str = "Output Structure Instructions:
1. The LLM must adhere strictly to the schema provided.
2. The LLM must use the XML format provided.
3. The LLM must not use markdown or any other formatting. Use text only.
4. Replace '<' and '>' characters with '&lt;' and '&gt;' respectively.
";

/// Preamble plus agent-specific schema body, fixed once an agent is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputContract {
    text: String,
}

impl OutputContract {
    /// Concatenate `preamble` and `schema`.
    pub fn compose(preamble: &str, schema: &str) -> Self {
        let mut text = String::with_capacity(preamble.len() + schema.len() + 1);
        text.push_str(preamble);
        if !preamble.is_empty() && !preamble.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(schema);
        Self { text }
    }

    /// Replace the whole contract, preamble included.
    pub fn replaced(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
