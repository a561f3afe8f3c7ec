//! Run-scoped values shared by every suite

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use contractcheck_core::{Method, Reference};

use crate::RunError;
use crate::cancel::CancellationToken;
use crate::executor::{CaseRequest, ExecutionResult, Executor};
use crate::retry::{RetryError, RetryPolicy, retry};

/// Fetched reference values and the run's cancellation token.
///
/// Built once before the run and passed by reference to planning and
/// execution.
#[derive(Debug, Clone)]
pub struct TestContext {
    values: BTreeMap<String, String>,
    cancellation: CancellationToken,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(CancellationToken::never())
    }
}

impl TestContext {
    #[must_use]
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            values: BTreeMap::new(),
            cancellation,
        }
    }

    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// GET every reference path until its JSON pointer resolves.
    ///
    /// A reference that never resolves is logged and left out.
    ///
    /// # Errors
    ///
    /// `RunError::Cancelled` if the token fires while fetching.
    pub async fn fetch(
        executor: &Executor,
        references: &[Reference],
        policy: &RetryPolicy,
        cancellation: CancellationToken,
    ) -> Result<Self, RunError> {
        let mut context = Self::new(cancellation);
        for reference in references {
            let request = CaseRequest::new(Method::Get, reference.path.as_str());
            let request = &request;
            let pointer = reference.pointer.as_str();
            let fetched = retry(
                policy,
                &context.cancellation,
                move |_| async move { resolve(executor.execute(request).await, pointer) },
                Option::is_some,
            )
            .await;
            match fetched {
                Ok(Some(value)) => {
                    info!(name = %reference.name, "reference resolved");
                    context.values.insert(reference.name.clone(), value);
                }
                Ok(None) => {}
                Err(RetryError::Cancelled { .. }) => return Err(RunError::Cancelled),
                Err(e @ RetryError::Exhausted { .. }) => {
                    warn!(name = %reference.name, path = %reference.path, error = %e, "reference skipped");
                }
            }
        }
        Ok(context)
    }

    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Replace `{{name}}` placeholders with reference values. Unknown names
    /// are left as written.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let name = rest[start + 2..start + 2 + len].trim();
            out.push_str(&rest[..start]);
            match self.reference(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + len + 4]),
            }
            rest = &rest[start + len + 4..];
        }
        out.push_str(rest);
        out
    }
}

/// Pointer target of a 2xx JSON response, as text.
fn resolve(result: ExecutionResult, pointer: &str) -> Option<String> {
    let ExecutionResult::Success(response) = result else {
        return None;
    };
    if !(200..300).contains(&response.status) {
        return None;
    }
    match response.body?.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
