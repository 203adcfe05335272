//! Query operations and their results.
//!
//! This module provides the request shape the cache link consumes:
//! [`Operation`], its root-definition [`OperationKind`], and the
//! [`QueryResult`] payload that flows back through the chain.
//!
//! The crate deliberately does not parse the query language. Classification
//! and canonicalization are lexical: they track string literals and
//! insignificant whitespace, nothing more.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters that never need a separating gap around them in a canonical
/// document.
const PUNCTUATORS: &[char] = &['{', '}', '(', ')', '[', ']', ':'];

/// The root definition kind of an operation.
///
/// Only [`Query`](Self::Query) operations are cacheable; mutations and
/// subscriptions always pass through untouched.
///
/// # Examples
///
/// ```
/// use swr_link::OperationKind;
///
/// assert_eq!(OperationKind::classify("query Hero { hero { name } }"), OperationKind::Query);
/// assert_eq!(OperationKind::classify("mutation { bump }"), OperationKind::Mutation);
/// assert!(OperationKind::classify("{ hero { name } }").is_cacheable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A read-only query — the only cacheable kind.
    Query,
    /// A mutation — forwarded unconditionally.
    Mutation,
    /// A subscription — forwarded unconditionally.
    Subscription,
}

impl OperationKind {
    /// Classifies a document by its first top-level keyword.
    ///
    /// Scans outside string literals for the first occurrence of `query`,
    /// `mutation`, or `subscription`. A bare selection set (`{` before any
    /// keyword) is shorthand for a query. Anything unrecognized defaults to
    /// [`Query`](Self::Query) — invalid documents fail downstream anyway.
    pub fn classify(document: &str) -> Self {
        let mut chars = document.chars();
        let mut in_string = false;
        let mut word = String::new();

        while let Some(c) = chars.next() {
            if in_string {
                match c {
                    '\\' => {
                        let _ = chars.next();
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                continue;
            }

            match word.as_str() {
                "query" => return Self::Query,
                "mutation" => return Self::Mutation,
                "subscription" => return Self::Subscription,
                _ => word.clear(),
            }

            match c {
                '"' => in_string = true,
                '{' => return Self::Query,
                _ => {}
            }
        }

        match word.as_str() {
            "mutation" => Self::Mutation,
            "subscription" => Self::Subscription,
            _ => Self::Query,
        }
    }

    /// Returns `true` if operations of this kind may be served from the cache.
    pub fn is_cacheable(self) -> bool {
        matches!(self, Self::Query)
    }

    /// Returns the kind as a lowercase string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable intercepted request: a document plus its input variables.
///
/// Built by the caller, read-only to every link in the chain.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use swr_link::{Operation, OperationKind};
///
/// let operation = Operation::new("query Hero($id: ID) { hero(id: $id) { name } }")
///     .variable("id", json!("123"));
///
/// assert_eq!(operation.kind(), OperationKind::Query);
/// assert_eq!(operation.canonical_document(), "query Hero($id:ID){hero(id:$id){name}}");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    document: String,
    variables: Map<String, Value>,
}

impl Operation {
    /// Creates an operation from a document with no variables.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            variables: Map::new(),
        }
    }

    /// Adds an input variable. Later values replace earlier ones with the same name.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Returns the document exactly as supplied.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Returns the input variables.
    ///
    /// `serde_json::Map` is BTreeMap-backed, so serialization order is
    /// name-sorted regardless of insertion order.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Returns the root definition kind of the document.
    pub fn kind(&self) -> OperationKind {
        OperationKind::classify(&self.document)
    }

    /// Returns the document in canonical textual form.
    ///
    /// Outside string literals, whitespace runs and commas collapse into a
    /// single gap, and the gap survives only between two word characters,
    /// never adjacent to `{` `}` `(` `)` `[` `]` `:`. String literals pass
    /// through verbatim, escapes included. Documents differing only in
    /// insignificant whitespace therefore canonicalize identically.
    pub fn canonical_document(&self) -> String {
        let mut out = String::with_capacity(self.document.len());
        let mut chars = self.document.chars();
        let mut in_string = false;
        let mut gap_pending = false;

        while let Some(c) = chars.next() {
            if in_string {
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            if c.is_whitespace() || c == ',' {
                gap_pending = !out.is_empty();
                continue;
            }

            if PUNCTUATORS.contains(&c) {
                out.push(c);
                gap_pending = false;
                continue;
            }

            if gap_pending && !out.ends_with(PUNCTUATORS) {
                out.push(' ');
            }
            gap_pending = false;
            out.push(c);
            if c == '"' {
                in_string = true;
            }
        }

        out
    }
}

/// A single error carried by a [`QueryResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultError {
    /// Human-readable description of what went wrong downstream.
    pub message: String,
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One result yielded by a downstream continuation: a payload, an error
/// list, or both.
///
/// Serializes to the conventional execution-result form (`data` omitted
/// when absent, `errors` omitted when empty) so stored payloads stay
/// compact and stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The response payload, when the backend produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Errors reported by the backend. A non-empty list makes the result
    /// ineligible for caching.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResultError>,
}

impl QueryResult {
    /// Creates an error-free result carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Creates a result carrying a single error and no data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![ResultError {
                message: message.into(),
            }],
        }
    }

    /// Returns `true` if the result carries at least one error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── OperationKind::classify ───────────────────────────────────────────────

    #[test]
    fn classify_named_query() {
        assert_eq!(
            OperationKind::classify("query Hero { hero { name } }"),
            OperationKind::Query
        );
    }

    #[test]
    fn classify_shorthand_query() {
        assert_eq!(OperationKind::classify("{ hero { name } }"), OperationKind::Query);
    }

    #[test]
    fn classify_mutation() {
        assert_eq!(
            OperationKind::classify("mutation Bump { bump }"),
            OperationKind::Mutation
        );
    }

    #[test]
    fn classify_subscription() {
        assert_eq!(
            OperationKind::classify("subscription { ticks }"),
            OperationKind::Subscription
        );
    }

    #[test]
    fn classify_keyword_inside_selection_is_not_a_kind() {
        // "mutation" here is a field name; the shorthand brace decides first.
        assert_eq!(OperationKind::classify("{ mutation }"), OperationKind::Query);
    }

    #[test]
    fn classify_keyword_inside_string_is_ignored() {
        assert_eq!(
            OperationKind::classify(r#"query { field(arg: "mutation") }"#),
            OperationKind::Query
        );
    }

    #[test]
    fn classify_leading_whitespace() {
        assert_eq!(
            OperationKind::classify("\n\t  mutation { bump }"),
            OperationKind::Mutation
        );
    }

    // ── Operation::canonical_document ─────────────────────────────────────────

    #[test]
    fn canonical_collapses_whitespace_and_commas() {
        let sprawling = Operation::new(
            "query  Hero($id: ID) {\n  hero(id: $id) {\n    name,\n    friends\n  }\n}",
        );
        let compact = Operation::new("query Hero($id:ID){hero(id:$id){name friends}}");
        assert_eq!(sprawling.canonical_document(), compact.canonical_document());
    }

    #[test]
    fn canonical_keeps_gap_between_words() {
        let op = Operation::new("query   Hero   {  hero  }");
        assert_eq!(op.canonical_document(), "query Hero{hero}");
    }

    #[test]
    fn canonical_preserves_string_literals() {
        let op = Operation::new(r#"{ field(arg: "a  b, c") }"#);
        assert_eq!(op.canonical_document(), r#"{field(arg:"a  b, c")}"#);
    }

    #[test]
    fn canonical_preserves_escaped_quote_in_literal() {
        let op = Operation::new(r#"{ field(arg: "say \"hi\"  there") }"#);
        assert_eq!(op.canonical_document(), r#"{field(arg:"say \"hi\"  there")}"#);
    }

    #[test]
    fn canonical_trims_ends() {
        let op = Operation::new("  \n{ ping }\n  ");
        assert_eq!(op.canonical_document(), "{ping}");
    }

    // ── QueryResult ───────────────────────────────────────────────────────────

    #[test]
    fn result_serializes_without_empty_fields() {
        let result = QueryResult::ok(json!({}));
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"data":{}}"#);
    }

    #[test]
    fn result_roundtrip() {
        let result = QueryResult::ok(json!({"hero": {"name": "R2-D2"}}));
        let raw = serde_json::to_string(&result).unwrap();
        let back: QueryResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn result_with_errors() {
        let result = QueryResult::error("backend unavailable");
        assert!(result.has_errors());
        let raw = serde_json::to_string(&result).unwrap();
        assert_eq!(raw, r#"{"errors":[{"message":"backend unavailable"}]}"#);
    }

    #[test]
    fn result_deserializes_missing_errors_as_empty() {
        let result: QueryResult = serde_json::from_str(r#"{"data":{"x":1}}"#).unwrap();
        assert!(!result.has_errors());
        assert_eq!(result.data, Some(json!({"x": 1})));
    }

    #[test]
    fn variables_replace_by_name() {
        let op = Operation::new("{ ping }")
            .variable("id", json!(1))
            .variable("id", json!(2));
        assert_eq!(op.variables().get("id"), Some(&json!(2)));
    }
}
