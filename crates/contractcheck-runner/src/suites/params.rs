//! Path and query parameter suites

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::Value;

use contractcheck_core::{
    EndpointDescriptor, ExpectedError, Method, SchemaDocument, Suite, expected_errors,
    invalid_path_param as path_case,
};

use super::{Expectation, PlanBuilder, PlanInput};

const GARBAGE: &str = "garbage";

pub(super) fn invalid_path_param(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
) {
    let Some((path, violation)) = path_case(endpoint) else {
        return;
    };
    let errors = expected_errors(&violation, &input.config.messages);
    builder.push(
        Suite::InvalidPathParam,
        &endpoint.template,
        input.request(endpoint, path),
        Some(violation),
        Expectation::status(400).with_errors(errors),
    );
}

/// `name=garbage` for endpoints declaring the OData option `name`.
pub(super) fn query_option(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
    suite: Suite,
    name: &str,
    component: &str,
) {
    if endpoint.method == Method::Delete || !endpoint.declares(name, component) {
        return;
    }
    builder.push(
        suite,
        &endpoint.template,
        input
            .request(endpoint, endpoint.path.as_str())
            .with_query(format!("{name}={GARBAGE}")),
        None,
        Expectation::status(400).with_errors(vec![query_error(name)]),
    );
}

/// A malformed expression, plus `{property} eq` with the operand missing for
/// a property sampled from the response schema.
pub(super) fn filter(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
    rng: &mut SmallRng,
) {
    if endpoint.method != Method::Get || !endpoint.declares("$filter", "filter") {
        return;
    }
    let mut queries = vec![format!("$filter={GARBAGE} eq abc")];
    let properties = endpoint
        .response_schemas
        .get(&200)
        .map(|schema| response_properties(input.doc, schema))
        .unwrap_or_default();
    if !properties.is_empty() {
        let property = &properties[rng.gen_range(0..properties.len())];
        queries.push(format!("$filter={property} eq"));
    }

    for query in queries {
        builder.push(
            Suite::InvalidFilter,
            &endpoint.template,
            input
                .request(endpoint, endpoint.path.as_str())
                .with_query(query),
            None,
            Expectation::status(400).with_errors(vec![query_error("$filter")]),
        );
    }
}

/// Configured out-of-range paging queries against collection GETs.
pub(super) fn pagination(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
) {
    if endpoint.method != Method::Get || endpoint.has_path_params() {
        return;
    }
    for check in &input.config.pagination {
        builder.push(
            Suite::Pagination,
            &endpoint.template,
            input
                .request(endpoint, endpoint.path.as_str())
                .with_query(input.context.render(&check.query)),
            None,
            Expectation::status(400)
                .with_errors(vec![ExpectedError::new("", &check.message, None)]),
        );
    }
}

fn query_error(name: &str) -> ExpectedError {
    ExpectedError::new("", &format!("{name} query parameter"), None)
}

/// Property names of a response item: the object itself, the items of an
/// array, or the items of an envelope's single array property.
fn response_properties(doc: &SchemaDocument, schema: &Value) -> Vec<String> {
    let mut current = doc.follow(schema);
    if let Some(items) = current.get("items") {
        current = doc.follow(items);
    } else if let Some(props) = current.get("properties").and_then(Value::as_object) {
        if props.len() == 1 {
            if let Some(items) = props.values().next().and_then(|p| doc.follow(p).get("items")) {
                current = doc.follow(items);
            }
        }
    }
    current
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}
