//! Request-body suites: one synthesized violation per case

use contractcheck_core::{
    EndpointDescriptor, Method, Suite, SynthesizedBody, expected_errors,
};

use super::{Expectation, PlanBuilder, PlanInput};
use crate::executor::CaseRequest;

pub(super) fn plan(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
    suite: Suite,
) {
    let Some(kind) = suite.body_violation() else {
        return;
    };
    if !matches!(endpoint.method, Method::Post | Method::Put) {
        return;
    }
    let Some(schema) = endpoint.request_schema.as_deref() else {
        if endpoint.inline_request_body {
            builder.skip(
                suite,
                Some(endpoint.method),
                &endpoint.template,
                "inline request body",
            );
        }
        return;
    };

    match input.synth.synthesize(schema, kind) {
        Ok(SynthesizedBody { body, violation }) => {
            let errors = expected_errors(&violation, &input.config.messages);
            builder.push(
                suite,
                &endpoint.template,
                CaseRequest::new(endpoint.method, endpoint.path.as_str()).with_body(body),
                Some(violation),
                Expectation::status(400).with_errors(errors),
            );
        }
        Err(e) => builder.skip(suite, Some(endpoint.method), &endpoint.template, e.to_string()),
    }
}
