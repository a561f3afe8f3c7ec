//! Scoring a response against its planned expectation
//!
//! No I/O. Checks run in a fixed order and the first failing one decides
//! the outcome: transport, status, expected errors, `Allow`, body schema.

use serde_json::Value;
use tracing::warn;

use contractcheck_core::{CaseFailure, RequestRecord, TestOutcome, match_errors};

use crate::executor::{ExecutionResult, HttpResponse};
use crate::suites::{Expectation, PlannedCase};

/// Schema errors reported per case.
const MAX_SCHEMA_ERRORS: usize = 5;

#[must_use]
pub fn evaluate(case: &PlannedCase, result: ExecutionResult, request: RequestRecord) -> TestOutcome {
    let mut outcome = TestOutcome::new(case.id.as_str(), case.suite, case.endpoint.as_str());
    outcome.method = Some(case.request.method);
    outcome.violation = case.violation.as_ref().map(|v| v.kind());
    outcome.expected_status.clone_from(&case.expectation.statuses);
    outcome.expected_errors.clone_from(&case.expectation.errors);
    outcome.request = Some(request);

    let response = match result {
        ExecutionResult::Success(response) => response,
        ExecutionResult::TransportError { cause } => {
            return outcome.with_failure(CaseFailure::Transport { cause });
        }
    };

    outcome.status = Some(response.status);
    outcome.actual_errors = response.errors();
    outcome.elapsed_ms = u64::try_from(response.elapsed.as_millis()).unwrap_or(u64::MAX);
    if !response.body_text.is_empty() {
        outcome.response_body = Some(response.body_text.clone());
    }

    match check(&case.expectation, &response, &outcome) {
        Some(failure) => outcome.with_failure(failure),
        None => outcome,
    }
}

fn check(
    expectation: &Expectation,
    response: &HttpResponse,
    outcome: &TestOutcome,
) -> Option<CaseFailure> {
    if !expectation.statuses.contains(&response.status) {
        return Some(CaseFailure::UnexpectedStatus {
            expected: expectation.statuses.clone(),
            actual: response.status,
        });
    }

    if !expectation.errors.is_empty() {
        let result = match_errors(&outcome.actual_errors, &expectation.errors);
        if !result.all_expected_present {
            return Some(CaseFailure::AssertionMismatch {
                missing: result.missing,
            });
        }
    }

    if let Some(allowed) = &expectation.allow {
        let expected = allow_list(allowed.iter().map(|m| m.as_str()));
        let actual = response
            .allow
            .as_deref()
            .map(|header| allow_list(header.split(',')));
        if actual.as_ref() != Some(&expected) {
            return Some(CaseFailure::HeaderMismatch {
                header: "Allow".to_string(),
                expected: expected.join(", "),
                actual: response.allow.clone(),
            });
        }
    }

    if let Some(schema) = &expectation.body_schema {
        let errors = schema_errors(schema, response);
        if !errors.is_empty() {
            return Some(CaseFailure::SchemaViolation { errors });
        }
    }

    None
}

/// Sorted, deduplicated, upper-cased method names.
fn allow_list<'a>(methods: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut list: Vec<String> = methods
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| !m.is_empty())
        .collect();
    list.sort();
    list.dedup();
    list
}

/// A schema that does not compile is reported as a violation; the body was
/// never checked.
fn schema_errors(schema: &Value, response: &HttpResponse) -> Vec<String> {
    let Some(body) = response.body.as_ref() else {
        let content_type = response.content_type.as_deref().unwrap_or("none");
        return vec![format!(
            "response body is not valid JSON (content-type: {content_type})"
        )];
    };
    match jsonschema::validator_for(schema) {
        Ok(validator) => validator
            .iter_errors(body)
            .take(MAX_SCHEMA_ERRORS)
            .map(|e| e.to_string())
            .collect(),
        Err(e) => {
            warn!(error = %e, "response schema does not compile");
            vec![format!("response schema does not compile: {e}")]
        }
    }
}
