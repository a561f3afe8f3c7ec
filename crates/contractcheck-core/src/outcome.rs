//! Per-case results: actual error entries, failure reasons and outcomes

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Method;
use crate::expected::ExpectedError;
use crate::suite::Suite;
use crate::violation::ViolationKind;

/// One `{code, title, description}` entry from an error response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ErrorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ErrorEntry {
    /// Parse the error entries of a response body.
    ///
    /// Accepts `{"errors": [...]}` or a root object carrying `title`, `code`
    /// or `description`. Anything else yields no entries.
    #[must_use]
    pub fn from_body(body: &Value) -> Vec<Self> {
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            return errors.iter().filter_map(Self::from_object).collect();
        }
        Self::from_object(body).into_iter().collect()
    }

    fn from_object(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };
        let entry = Self {
            code: text("code"),
            title: text("title"),
            description: text("description"),
        };
        (entry != Self::default()).then_some(entry)
    }
}

/// The entry a well-behaved server would send for `expected`.
impl From<&ExpectedError> for ErrorEntry {
    fn from(expected: &ExpectedError) -> Self {
        let message = expected.message.trim();
        let title = if expected.field.is_empty() {
            message.to_string()
        } else {
            format!("{} {message}", expected.field)
        };
        Self {
            code: expected.code.clone(),
            title: Some(title),
            description: None,
        }
    }
}

/// Why a case failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaseFailure {
    #[error("transport error: {cause}")]
    Transport { cause: String },

    #[error("expected status {expected:?}, got {actual}")]
    UnexpectedStatus { expected: Vec<u16>, actual: u16 },

    #[error("{} expected error(s) missing", .missing.len())]
    AssertionMismatch { missing: Vec<ExpectedError> },

    #[error("header {header}: expected '{expected}', got '{}'", .actual.as_deref().unwrap_or("<absent>"))]
    HeaderMismatch {
        header: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("response body violates schema: {}", .errors.join("; "))]
    SchemaViolation { errors: Vec<String> },

    #[error("{message}")]
    StaticCheck { message: String },
}

/// The request a case sent, kept for reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestRecord {
    pub method: Method,
    /// Full URL including query string.
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Result of one executed (or statically checked) case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestOutcome {
    pub id: String,
    pub suite: Suite,
    /// `"POST /widgets"`, or the schema name for static checks.
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<ViolationKind>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub expected_status: Vec<u16>,
    #[serde(default)]
    pub actual_errors: Vec<ErrorEntry>,
    #[serde(default)]
    pub expected_errors: Vec<ExpectedError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CaseFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestRecord>,
    /// Response text, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl TestOutcome {
    /// Outcome of a case with no request attached yet; `passed` until a
    /// failure is set.
    #[must_use]
    pub fn new(id: impl Into<String>, suite: Suite, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            suite,
            endpoint: endpoint.into(),
            method: None,
            violation: None,
            passed: true,
            status: None,
            expected_status: Vec::new(),
            actual_errors: Vec::new(),
            expected_errors: Vec::new(),
            failure: None,
            request: None,
            response_body: None,
            elapsed_ms: 0,
        }
    }

    #[must_use]
    pub fn with_failure(mut self, failure: CaseFailure) -> Self {
        self.passed = false;
        self.failure = Some(failure);
        self
    }
}

/// A planned case that was not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedCase {
    pub suite: Suite,
    pub endpoint: String,
    pub reason: String,
}
