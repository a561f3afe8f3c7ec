//! Authentication, routing and method suites

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::json;

use contractcheck_core::{EndpointDescriptor, Method, Suite, substitute_path};

use super::{Expectation, PlanBuilder, PlanInput};
use crate::executor::CaseRequest;

/// Base64url of `{"alg":"HS256","typ":"JWT"}`.
const JWT_HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
const BASE64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// The methods probed for a 405 on every path.
const PROBED: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

/// Id used where a resource cannot exist.
const MISSING_ID: &str = "0";

pub(super) fn unauthorized(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
    rng: &mut SmallRng,
) {
    if !endpoint.secured {
        return;
    }
    let token = forged_token(rng);
    builder.push(
        Suite::Unauthorized,
        &endpoint.template,
        input
            .request(endpoint, endpoint.path.as_str())
            .with_header("Authorization", format!("Bearer {token}")),
        None,
        Expectation::status(401),
    );
}

pub(super) fn not_found(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
) {
    if !endpoint.has_path_params() {
        return;
    }
    builder.push(
        Suite::NotFound,
        &endpoint.template,
        input.request(endpoint, substitute_path(&endpoint.template, MISSING_ID)),
        None,
        Expectation::status(404),
    );
}

/// Every probed method the path item does not declare must answer 405 and
/// list the declared methods in `Allow`.
pub(super) fn method_not_allowed(builder: &mut PlanBuilder<'_>, endpoint: &EndpointDescriptor) {
    let mut declared = endpoint.path_methods.clone();
    declared.sort();
    declared.dedup();

    for method in PROBED {
        if declared.contains(&method) {
            continue;
        }
        let mut request = CaseRequest::new(method, endpoint.path.as_str());
        if method.sends_body() {
            request = request.with_body(json!({}));
        }
        builder.push(
            Suite::MethodNotAllowed,
            &endpoint.template,
            request,
            None,
            Expectation::status(405).with_allow(declared.clone()),
        );
    }
}

/// Trailing whitespace must still route to the collection.
pub(super) fn whitespace_in_path(builder: &mut PlanBuilder<'_>, endpoint: &EndpointDescriptor) {
    if endpoint.method != Method::Get || endpoint.has_path_params() || endpoint.has_required_params()
    {
        return;
    }
    builder.push(
        Suite::WhitespaceInPath,
        &endpoint.template,
        CaseRequest::new(Method::Get, format!("{}/   ", endpoint.path)),
        None,
        Expectation::status(200),
    );
}

/// A syntactically valid bearer token with a signature no server issued.
fn forged_token(rng: &mut SmallRng) -> String {
    let mut segment = |len: usize| -> String {
        (0..len)
            .map(|_| char::from(BASE64URL[rng.gen_range(0..BASE64URL.len())]))
            .collect()
    };
    let payload = segment(48);
    let signature = segment(43);
    format!("{JWT_HEADER}.eyJ{payload}.{signature}")
}
