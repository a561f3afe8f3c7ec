//! Response and document conformance suites

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use contractcheck_core::{CaseFailure, EndpointDescriptor, Method, SchemaDocument, Suite, TestOutcome};

use super::{Expectation, PlanBuilder, PlanInput};

/// Collection GETs must answer 200 with a body matching the declared schema.
pub(super) fn response_schema(
    builder: &mut PlanBuilder<'_>,
    input: &PlanInput<'_>,
    endpoint: &EndpointDescriptor,
) {
    if endpoint.method != Method::Get || endpoint.has_path_params() || endpoint.has_required_params()
    {
        return;
    }
    let Some(schema) = endpoint.response_schemas.get(&200) else {
        return;
    };
    let schema = to_json_schema(&input.doc.bundle(schema));
    builder.push(
        Suite::ResponseSchema,
        &endpoint.template,
        input.request(endpoint, endpoint.path.as_str()),
        None,
        Expectation::status(200).with_body_schema(schema),
    );
}

/// One static check per component schema with required properties.
pub(super) fn required_not_nullable(builder: &mut PlanBuilder<'_>, doc: &SchemaDocument) {
    for (name, schema) in doc.schemas() {
        let (required, properties) = required_and_properties(doc, schema);
        if required.is_empty() {
            continue;
        }
        let nullable: Vec<&str> = required
            .iter()
            .copied()
            .filter(|field| {
                properties
                    .get(*field)
                    .is_some_and(|prop| is_nullable(doc.follow(prop)))
            })
            .collect();

        builder.check(Suite::RequiredNotNullable, name, |id| {
            let outcome = TestOutcome::new(id, Suite::RequiredNotNullable, name);
            if nullable.is_empty() {
                outcome
            } else {
                outcome.with_failure(CaseFailure::StaticCheck {
                    message: format!(
                        "{name}: required properties declared nullable: {}",
                        nullable.join(", ")
                    ),
                })
            }
        });
    }
}

/// Required names and properties of `schema`, merged across `allOf` parts.
fn required_and_properties<'a>(
    doc: &'a SchemaDocument,
    schema: &'a Value,
) -> (Vec<&'a str>, Map<String, Value>) {
    let schema = doc.follow(schema);
    let mut parts = vec![schema];
    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        parts.extend(all_of.iter().map(|part| doc.follow(part)));
    }

    let mut required = Vec::new();
    let mut properties = Map::new();
    for part in parts {
        if let Some(names) = part.get("required").and_then(Value::as_array) {
            required.extend(names.iter().filter_map(Value::as_str));
        }
        if let Some(props) = part.get("properties").and_then(Value::as_object) {
            properties.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    let mut seen = HashSet::new();
    required.retain(|name| seen.insert(*name));
    (required, properties)
}

fn is_nullable(schema: &Value) -> bool {
    schema.get("nullable").and_then(Value::as_bool) == Some(true)
}

/// Rewrite OpenAPI 3.0 `nullable: true` into JSON Schema's `null` type.
pub(crate) fn to_json_schema(schema: &Value) -> Value {
    match schema {
        Value::Array(items) => Value::Array(items.iter().map(to_json_schema).collect()),
        Value::Object(obj) => {
            let nullable = obj.get("nullable").and_then(Value::as_bool);
            let mut out: Map<String, Value> = obj
                .iter()
                .filter(|(k, v)| !(k.as_str() == "nullable" && v.is_boolean()))
                .map(|(k, v)| (k.clone(), to_json_schema(v)))
                .collect();
            if nullable != Some(true) {
                return Value::Object(out);
            }
            if let Some(Value::Array(values)) = out.get_mut("enum") {
                if !values.contains(&Value::Null) {
                    values.push(Value::Null);
                }
            }
            match out.get("type").cloned() {
                Some(Value::String(t)) => {
                    out.insert("type".into(), json!([t, "null"]));
                    Value::Object(out)
                }
                Some(Value::Array(mut types)) => {
                    if !types.iter().any(|t| t.as_str() == Some("null")) {
                        types.push(json!("null"));
                    }
                    out.insert("type".into(), Value::Array(types));
                    Value::Object(out)
                }
                _ => json!({"anyOf": [Value::Object(out), {"type": "null"}]}),
            }
        }
        other => other.clone(),
    }
}
