//! JSON test documents.
//!
//! Loads tests from disk, parses the generation service's raw reply, and
//! reports non-fatal issues in a test.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::ServiceError;
use crate::model::{GeneratedTest, Test, OPTION_KEYS};

/// Parse a test document from a JSON file.
pub fn parse_test(path: &Path) -> Result<Test> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;

    parse_test_str(&content, path)
}

/// Parse a JSON string into a `Test` and check its invariants.
pub fn parse_test_str(content: &str, source_path: &Path) -> Result<Test> {
    let test: Test = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    test.validate()
        .with_context(|| format!("invalid test: {}", source_path.display()))?;

    Ok(test)
}

/// Write a test document as pretty-printed JSON.
pub fn write_test(test: &Test, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(test)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write test file: {}", path.display()))?;
    Ok(())
}

/// Parse the generation service's reply into a payload.
///
/// The reply is expected to be a JSON object; a fenced ```json block around
/// it is tolerated.
pub fn parse_generated_payload(reply: &str) -> std::result::Result<GeneratedTest, ServiceError> {
    let json = extract_json_block(reply);
    if json.trim().is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    serde_json::from_str(json)
        .map_err(|e| ServiceError::MalformedResponse(format!("test payload: {e}")))
}

/// Extract the JSON body from a possibly markdown-formatted reply.
///
/// Prefers the first ```json block, falls back to the first generic ```
/// block, and otherwise returns the reply unchanged. An unclosed block
/// (truncated reply) runs to the end of the text.
pub fn extract_json_block(reply: &str) -> &str {
    let mut generic: Option<&str> = None;
    let mut rest = reply;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
        let lang = after_fence[..line_end].trim().to_lowercase();
        let body_start = (line_end + 1).min(after_fence.len());
        let body_and_rest = &after_fence[body_start..];
        let (body, next) = match body_and_rest.find("```") {
            Some(close) => (&body_and_rest[..close], &body_and_rest[close + 3..]),
            None => (body_and_rest, ""),
        };

        if lang == "json" {
            return body.trim();
        }
        if lang.is_empty() && generic.is_none() {
            generic = Some(body.trim());
        }
        rest = next;
    }

    generic.unwrap_or(reply)
}

/// A warning from test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a test for issues that do not stop it from being taken.
pub fn validate_test(test: &Test) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for q in &test.questions {
        if q.explanation.as_deref().map_or(true, |e| e.trim().is_empty()) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "no explanation provided".into(),
            });
        }

        let unusual: Vec<&str> = q
            .options
            .keys()
            .map(String::as_str)
            .filter(|k| !OPTION_KEYS.contains(k))
            .collect();
        if !unusual.is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("option keys outside A-D: {}", unusual.join(", ")),
            });
        }
    }

    // A passage is meant to be shared by a group of questions
    let mut passage_use: HashMap<&str, Vec<&str>> = HashMap::new();
    for q in &test.questions {
        if let Some(passage) = q.passage.as_deref().filter(|p| !p.trim().is_empty()) {
            passage_use.entry(passage).or_default().push(q.id.as_str());
        }
    }
    for ids in passage_use.values().filter(|ids| ids.len() == 1) {
        warnings.push(ValidationWarning {
            question_id: Some(ids[0].to_string()),
            message: "passage is not shared with any other question".into(),
        });
    }

    warnings
}
