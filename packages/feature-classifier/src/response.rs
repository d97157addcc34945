//! Response schema validation.
//!
//! Model output goes through two stages: [`parse_tree`] turns raw text into an
//! untyped JSON tree, and [`coerce`] maps that tree onto [`ParsedResponse`].
//! Both stages fail closed with [`ClassifierError::MalformedResponse`]; a
//! partial mapping is never returned.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{ClassifierError, Result};
use crate::types::feature::Answer;

/// Envelope key the classification prompt asks the model to wrap results in.
pub const RESULTS_KEY: &str = "results";

/// One validated per-feature entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub answer: Answer,
    pub reason: String,
}

/// Validated model output keyed by the feature names the model used.
///
/// May contain keys that were never requested; reconciling against the
/// requested feature set is the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    entries: IndexMap<String, ParsedAnswer>,
}

impl ParsedResponse {
    pub fn get(&self, key: &str) -> Option<&ParsedAnswer> {
        self.entries.get(key)
    }

    /// Look up a single feature. See [`ParsedResponse::match_features`].
    pub fn lookup(&self, feature: &str) -> Option<&ParsedAnswer> {
        self.match_features(&[feature]).pop().flatten()
    }

    /// Match every requested feature name to at most one entry.
    ///
    /// Exact and case-insensitive matches are resolved for all names first.
    /// Only then may a leftover name take the first unclaimed key containing
    /// it, and never a key that names another requested feature.
    pub fn match_features(&self, features: &[&str]) -> Vec<Option<&ParsedAnswer>> {
        let keys: Vec<String> = self.entries.keys().map(|k| normalize_key(k)).collect();
        let requested: HashSet<String> = features.iter().map(|f| normalize_key(f)).collect();
        let mut claimed = vec![false; keys.len()];

        let mut matched: Vec<Option<usize>> = features
            .iter()
            .map(|feature| {
                if let Some(index) = self.entries.get_index_of(*feature) {
                    return Some(index);
                }
                let needle = normalize_key(feature);
                if needle.is_empty() {
                    return None;
                }
                keys.iter().position(|k| *k == needle)
            })
            .collect();
        for index in matched.iter().flatten() {
            claimed[*index] = true;
        }

        for (feature, slot) in features.iter().zip(matched.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let needle = normalize_key(feature);
            if needle.is_empty() {
                continue;
            }
            let found = (0..keys.len()).find(|&i| {
                !claimed[i] && !requested.contains(&keys[i]) && keys[i].contains(&needle)
            });
            if let Some(index) = found {
                claimed[index] = true;
                *slot = Some(index);
            }
        }

        matched
            .into_iter()
            .map(|index| index.and_then(|i| self.entries.get_index(i)).map(|(_, v)| v))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse and validate raw model output.
pub fn validate(raw: &str) -> Result<ParsedResponse> {
    let tree = parse_tree(raw)?;
    coerce(tree)
}

/// Stage one: raw text to JSON tree.
///
/// Accepts bare JSON or JSON inside a markdown code fence.
pub fn parse_tree(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClassifierError::malformed("empty response"));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(tree) => Ok(tree),
        Err(err) => {
            let fenced = fenced_block(trimmed)
                .ok_or_else(|| ClassifierError::malformed(format!("invalid JSON: {}", err)))?;
            debug!("parsing JSON from markdown code fence");
            serde_json::from_str(fenced)
                .map_err(|e| ClassifierError::malformed(format!("invalid fenced JSON: {}", e)))
        }
    }
}

/// Stage two: JSON tree to typed response.
pub fn coerce(tree: Value) -> Result<ParsedResponse> {
    let root = match tree {
        Value::Object(map) => unwrap_envelope(map)?,
        other => {
            return Err(ClassifierError::malformed(format!(
                "root is not an object: {}",
                kind(&other)
            )))
        }
    };

    let mut entries = IndexMap::with_capacity(root.len());
    for (key, value) in root {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                debug!(key = %key, kind = kind(&other), "ignoring non-object entry");
                continue;
            }
        };

        let answer = fields
            .get("answer")
            .and_then(Value::as_str)
            .map(Answer::normalize)
            .unwrap_or(Answer::Unsure);
        let reason = fields
            .get("reason")
            .and_then(Value::as_str)
            .map(clean_text)
            .unwrap_or_default();

        entries.insert(key, ParsedAnswer { answer, reason });
    }

    Ok(ParsedResponse { entries })
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Collapse newlines and runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unwrap_envelope(mut map: Map<String, Value>) -> Result<Map<String, Value>> {
    match map.remove(RESULTS_KEY) {
        Some(Value::Object(inner)) => {
            if !map.is_empty() {
                debug!(siblings = map.len(), "ignoring keys next to results envelope");
            }
            Ok(inner)
        }
        Some(other) => Err(ClassifierError::malformed(format!(
            "\"{}\" is not an object: {}",
            RESULTS_KEY,
            kind(&other)
        ))),
        None => Ok(map),
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("fence pattern is valid")
    });
    fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_flat_object() {
        let parsed = validate(
            r#"{"Live Chat": {"answer": "yes", "reason": "24/7 chat widget present"}}"#,
        )
        .unwrap();

        let entry = parsed.get("Live Chat").unwrap();
        assert_eq!(entry.answer, Answer::Yes);
        assert_eq!(entry.reason, "24/7 chat widget present");
    }

    #[test]
    fn test_validate_results_envelope() {
        let parsed = validate(
            r#"{"results": {"Mobile App": {"answer": "NO", "reason": "web only"}}}"#,
        )
        .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("Mobile App").unwrap().answer, Answer::No);
    }

    #[test]
    fn test_results_envelope_with_sibling_keys() {
        let parsed = validate(
            r#"{"results": {"Live Chat": {"answer": "yes", "reason": "widget"}}, "notes": "ok", "confidence": 0.9}"#,
        )
        .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.lookup("Live Chat").unwrap().answer, Answer::Yes);
        assert!(parsed.get("notes").is_none());
    }

    #[test]
    fn test_results_envelope_must_be_object() {
        let err = validate(r#"{"results": ["Mobile App"]}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse { .. }));
    }

    #[test]
    fn test_validate_code_fence() {
        let raw = "Here you go:\n```json\n{\"SSO\": {\"answer\": \"Unsure\", \"reason\": \"vague\"}}\n```";
        let parsed = validate(raw).unwrap();
        assert_eq!(parsed.get("SSO").unwrap().answer, Answer::Unsure);
    }

    #[test]
    fn test_missing_reason_is_empty() {
        let parsed = validate(r#"{"SSO": {"answer": "yes"}}"#).unwrap();
        assert_eq!(parsed.get("SSO").unwrap().reason, "");
    }

    #[test]
    fn test_missing_or_odd_answer_is_unsure() {
        let parsed = validate(
            r#"{"A": {"reason": "r"}, "B": {"answer": "Partially"}, "C": {"answer": true}}"#,
        )
        .unwrap();

        assert_eq!(parsed.get("A").unwrap().answer, Answer::Unsure);
        assert_eq!(parsed.get("B").unwrap().answer, Answer::Unsure);
        assert_eq!(parsed.get("C").unwrap().answer, Answer::Unsure);
    }

    #[test]
    fn test_non_object_entries_ignored() {
        let parsed = validate(r#"{"A": "yes", "B": {"answer": "no"}}"#).unwrap();
        assert!(parsed.get("A").is_none());
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_malformed_inputs_fail_closed() {
        for raw in [
            "",
            "   ",
            "not json at all",
            r#"{"Live Chat": {"answer": "yes", "reas"#,
            r#"["Live Chat"]"#,
            "42",
            "null",
        ] {
            let err = validate(raw).unwrap_err();
            assert!(
                matches!(err, ClassifierError::MalformedResponse { .. }),
                "expected MalformedResponse for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_reason_whitespace_collapsed() {
        let parsed =
            validate(r#"{"A": {"answer": "yes", "reason": "  line one\n  line   two \r "}}"#)
                .unwrap();
        assert_eq!(parsed.get("A").unwrap().reason, "line one line two");
    }

    #[test]
    fn test_lookup_fallbacks() {
        let parsed = validate(
            r#"{"live chat": {"answer": "yes"}, "Mobile App (iOS/Android)": {"answer": "no"}}"#,
        )
        .unwrap();

        assert_eq!(parsed.lookup("Live Chat").unwrap().answer, Answer::Yes);
        assert_eq!(parsed.lookup("Mobile App").unwrap().answer, Answer::No);
        assert!(parsed.lookup("Compliance").is_none());
        assert!(parsed.lookup("").is_none());
    }

    #[test]
    fn test_substring_never_steals_another_features_key() {
        let parsed = validate(r#"{"Live Chat": {"answer": "yes", "reason": "widget"}}"#).unwrap();

        let matched = parsed.match_features(&["Chat", "Live Chat"]);
        assert!(matched[0].is_none());
        assert_eq!(matched[1].unwrap().reason, "widget");
    }

    #[test]
    fn test_exact_matches_resolved_before_substrings() {
        let parsed = validate(
            r#"{"chat (live)": {"answer": "no"}, "CHAT": {"answer": "yes"}, "Mobile App (iOS)": {"answer": "yes"}}"#,
        )
        .unwrap();

        // "Chat" takes its case-insensitive key; "Live" falls back to a substring
        let matched = parsed.match_features(&["Live", "Chat", "Mobile App", "App"]);
        assert_eq!(matched[0].unwrap().answer, Answer::No);
        assert_eq!(matched[1].unwrap().answer, Answer::Yes);
        assert_eq!(matched[2].unwrap().answer, Answer::Yes);
        // The only key containing "app" is already claimed
        assert!(matched[3].is_none());
    }
}
