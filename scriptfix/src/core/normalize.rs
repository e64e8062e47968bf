//! Recover the structured payload from a free-form model response.

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence line tagged `xml`, interior, closing fence on its own line.
static XML_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```xml[ \t\r]*\n(.*?)\r?\n[ \t]*```").expect("xml fence regex")
});

/// Return the trimmed interior of the first ```` ```xml ```` block in `raw`,
/// or `raw` unchanged when there is none.
///
/// Never fails. The interior of a match cannot itself contain a closing
/// fence line, so applying this twice gives the same result as once.
pub fn normalize(raw: &str) -> &str {
    match XML_FENCE_RE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(interior) => interior.as_str().trim(),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_xml_block() {
        let raw = "Here you go:\n```xml\n<actions>\n  <action/>\n</actions>\n```\nThanks!";
        assert_eq!(normalize(raw), "<actions>\n  <action/>\n</actions>");
    }

    #[test]
    fn returns_input_unchanged_without_fence() {
        let raw = "  <actions></actions>\n";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn ignores_fences_with_other_languages() {
        let raw = "```json\n{}\n```";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn takes_the_first_of_several_blocks() {
        let raw = "```xml\n<a/>\n```\ntext\n```xml\n<b/>\n```";
        assert_eq!(normalize(raw), "<a/>");
    }

    #[test]
    fn tolerates_crlf_and_trailing_spaces_on_fences() {
        let raw = "```xml  \r\n<a/>\r\n  ```";
        assert_eq!(normalize(raw), "<a/>");
    }

    #[test]
    fn unterminated_fence_is_left_alone() {
        let raw = "```xml\n<a/>";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "plain text",
            "```xml\n<a/>\n```",
            "```xml\n```xml\n<a/>\n```\n```",
            "prefix ```xml\n  ```xml \n x \n ``` \n```",
            "```xml\n\n```",
            "<root>```xml\n</root>\n```",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(once), once, "input: {input:?}");
        }
    }
}
