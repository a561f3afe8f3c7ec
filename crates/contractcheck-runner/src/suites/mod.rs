//! Suite planning: a pure pass from the document to the list of cases
//!
//! Every case is planned before any request is sent, so `contractcheck plan`
//! and `contractcheck run` see the same cases.

mod body;
mod conformance;
mod params;
mod routing;

use std::collections::{BTreeMap, HashSet};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use contractcheck_core::{
    Config, ConstraintViolation, EndpointDescriptor, ExpectedError, Method, RunMode, SchemaDocument,
    SkippedCase, Suite, Synthesizer, TestOutcome, enumerate,
};

use crate::context::TestContext;
use crate::executor::CaseRequest;

/// What a response must look like for a case to pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expectation {
    pub statuses: Vec<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ExpectedError>,
    /// Methods the `Allow` header must list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<Method>>,
    /// JSON Schema the response body must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_schema: Option<Value>,
}

impl Expectation {
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            statuses: vec![status],
            errors: Vec::new(),
            allow: None,
            body_schema: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ExpectedError>) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn with_allow(mut self, allow: Vec<Method>) -> Self {
        self.allow = Some(allow);
        self
    }

    #[must_use]
    pub fn with_body_schema(mut self, schema: Value) -> Self {
        self.body_schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedCase {
    pub id: String,
    pub suite: Suite,
    /// `"POST /widgets"`
    pub endpoint: String,
    pub template: String,
    pub request: CaseRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<ConstraintViolation>,
    pub expectation: Expectation,
}

impl PlannedCase {
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.suite.mode()
    }
}

/// Everything a run will do.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub cases: Vec<PlannedCase>,
    /// Outcomes of static checks, decided at planning time.
    pub checks: Vec<TestOutcome>,
    pub skipped: Vec<SkippedCase>,
}

impl Plan {
    /// Planned cases per suite, in suite order.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for case in &self.cases {
            *counts.entry(case.suite.name()).or_insert(0) += 1;
        }
        for check in &self.checks {
            *counts.entry(check.suite.name()).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Plan: {} cases, {} static checks, {} skipped\n",
            self.cases.len(),
            self.checks.len(),
            self.skipped.len()
        ));
        for (suite, count) in self.counts() {
            lines.push(format!("  {suite}: {count}"));
        }
        if !self.cases.is_empty() {
            lines.push(String::new());
            lines.push("Cases:".to_string());
            for case in &self.cases {
                let query = case
                    .request
                    .query
                    .as_deref()
                    .map_or_else(String::new, |q| format!("?{q}"));
                lines.push(format!(
                    "  [{}] {} {}{query} -> {:?}",
                    case.suite, case.request.method, case.request.path, case.expectation.statuses
                ));
            }
        }
        lines.join("\n")
    }
}

/// Read-only inputs shared by every suite planner.
pub(crate) struct PlanInput<'a> {
    pub(crate) doc: &'a SchemaDocument,
    pub(crate) config: &'a Config,
    pub(crate) context: &'a TestContext,
    pub(crate) synth: Synthesizer<'a>,
}

impl PlanInput<'_> {
    /// Valid body for endpoints that send one, so only the targeted
    /// constraint is wrong.
    fn valid_body(&self, endpoint: &EndpointDescriptor, method: Method) -> Option<Value> {
        if !matches!(method, Method::Post | Method::Put) {
            return None;
        }
        let schema = self.doc.schema(endpoint.request_schema.as_deref()?)?;
        Some(self.synth.valid_value(schema))
    }

    fn request(&self, endpoint: &EndpointDescriptor, path: impl Into<String>) -> CaseRequest {
        let request = CaseRequest::new(endpoint.method, path);
        match self.valid_body(endpoint, endpoint.method) {
            Some(body) => request.with_body(body),
            None => request,
        }
    }
}

/// Accumulates cases, applying `[[skip]]` rules and assigning ids.
pub(crate) struct PlanBuilder<'a> {
    config: &'a Config,
    plan: Plan,
    next_id: usize,
}

impl<'a> PlanBuilder<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            config,
            plan: Plan::default(),
            next_id: 0,
        }
    }

    fn next_id(&mut self, suite: Suite) -> String {
        let id = format!("{suite}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn push(
        &mut self,
        suite: Suite,
        template: &str,
        request: CaseRequest,
        violation: Option<ConstraintViolation>,
        expectation: Expectation,
    ) {
        if self.config.is_skipped(suite, Some(request.method), template) {
            debug!(%suite, method = %request.method, template, "case removed by skip rule");
            return;
        }
        let id = self.next_id(suite);
        self.plan.cases.push(PlannedCase {
            id,
            suite,
            endpoint: format!("{} {template}", request.method),
            template: template.to_string(),
            request,
            violation,
            expectation,
        });
    }

    pub(crate) fn skip(
        &mut self,
        suite: Suite,
        method: Option<Method>,
        template: &str,
        reason: impl Into<String>,
    ) {
        if self.config.is_skipped(suite, method, template) {
            return;
        }
        let endpoint = match method {
            Some(method) => format!("{method} {template}"),
            None => template.to_string(),
        };
        self.plan.skipped.push(SkippedCase {
            suite,
            endpoint,
            reason: reason.into(),
        });
    }

    /// Record a static check outcome; `build` receives the assigned id.
    pub(crate) fn check(
        &mut self,
        suite: Suite,
        subject: &str,
        build: impl FnOnce(String) -> TestOutcome,
    ) {
        if self.config.is_skipped(suite, None, subject) {
            return;
        }
        let id = self.next_id(suite);
        self.plan.checks.push(build(id));
    }

    fn finish(self) -> Plan {
        self.plan
    }
}

/// Plan every enabled suite for `doc`.
#[must_use]
pub fn plan(doc: &SchemaDocument, config: &Config, context: &TestContext) -> Plan {
    let suites = config.enabled_suites();
    let options = config.enumerate_options();
    let mut rng = config
        .seed
        .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
    let input = PlanInput {
        doc,
        config,
        context,
        synth: Synthesizer::new(doc),
    };
    let mut builder = PlanBuilder::new(config);
    let mut method_checked: HashSet<String> = HashSet::new();

    for endpoint in enumerate(doc, &options) {
        for &suite in &suites {
            match suite {
                Suite::InvalidPathParam => params::invalid_path_param(&mut builder, &input, &endpoint),
                Suite::InvalidSelect => {
                    params::query_option(&mut builder, &input, &endpoint, suite, "$select", "select");
                }
                Suite::InvalidOrderBy => {
                    params::query_option(&mut builder, &input, &endpoint, suite, "$orderBy", "orderBy");
                }
                Suite::InvalidFilter => params::filter(&mut builder, &input, &endpoint, &mut rng),
                Suite::Pagination => params::pagination(&mut builder, &input, &endpoint),
                Suite::Unauthorized => routing::unauthorized(&mut builder, &input, &endpoint, &mut rng),
                Suite::NotFound => routing::not_found(&mut builder, &input, &endpoint),
                Suite::MethodNotAllowed => {
                    if method_checked.insert(endpoint.template.clone()) {
                        routing::method_not_allowed(&mut builder, &endpoint);
                    }
                }
                Suite::WhitespaceInPath => routing::whitespace_in_path(&mut builder, &endpoint),
                Suite::ResponseSchema => conformance::response_schema(&mut builder, &input, &endpoint),
                Suite::RequiredNotNullable => {}
                _ => body::plan(&mut builder, &input, &endpoint, suite),
            }
        }
    }

    if suites.contains(&Suite::RequiredNotNullable) {
        conformance::required_not_nullable(&mut builder, doc);
    }
    builder.finish()
}
