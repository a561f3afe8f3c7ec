//! Invalid-body synthesis
//!
//! Builds a deterministic valid baseline for a component schema and breaks
//! exactly one constraint in it. Property choice is always the first eligible
//! one in declaration order, so the same document yields the same cases.

use serde_json::{Map, Value, json};

use crate::catalog::{SchemaDocument, schema_type};
use crate::enumerate::{EndpointDescriptor, substitute_path};
use crate::violation::{ConstraintViolation, InvalidType, JsonShape, StripMode, ViolationKind};

/// Maximum recursion depth for schema traversal (circular `$ref` guard).
const MAX_DEPTH: u32 = 20;

/// Fields whose `maxLength` exceeds this are not eligible for over-length
/// synthesis.
const MAX_STRING_LEN: u64 = 10_000;

pub const INVALID_ENUM_VALUE: &str = "__INVALID_ENUM_VALUE__";
pub const INVALID_NUMBER_VALUE: &str = "invalid";
pub const INVALID_STRING_VALUE: i64 = 12_345;
pub const INVALID_DATE_TIME_VALUE: &str = "not-a-date-time";
pub const INVALID_PATH_PARAM_VALUE: &str = "ABC";

static NO_SCHEMA: Value = Value::Null;

/// A request body with exactly one constraint broken.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedBody {
    pub body: Value,
    pub violation: ConstraintViolation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("schema '{0}' is not declared in components.schemas")]
    UnknownSchema(String),
    #[error("schema '{schema}' has no field eligible for {kind}")]
    NoEligibleField { schema: String, kind: ViolationKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    Object,
    Array,
    Other,
}

/// Object schema flattened across `allOf`: properties in declaration order
/// and the union of `required`.
#[derive(Debug, Default)]
struct ObjectShape<'a> {
    properties: Vec<(&'a str, &'a Value)>,
    required: Vec<&'a str>,
}

impl<'a> ObjectShape<'a> {
    fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, schema)| *schema)
    }

    fn insert(&mut self, name: &'a str, schema: &'a Value) {
        match self.properties.iter().position(|(n, _)| *n == name) {
            Some(index) => self.properties[index] = (name, schema),
            None => self.properties.push((name, schema)),
        }
    }

    fn require(&mut self, name: &'a str) {
        if !self.required.contains(&name) {
            self.required.push(name);
        }
    }

    /// Required properties a client is expected to send.
    fn sendable_required(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.required
            .iter()
            .copied()
            .filter(|name| !self.property(name).is_some_and(is_read_only))
    }
}

/// Synthesizes valid and invalid values against one schema document.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    doc: &'a SchemaDocument,
}

impl<'a> Synthesizer<'a> {
    #[must_use]
    pub const fn new(doc: &'a SchemaDocument) -> Self {
        Self { doc }
    }

    /// Build a body for component schema `schema_name` that violates `kind`.
    ///
    /// # Errors
    ///
    /// `UnknownSchema` if the name is not declared; `NoEligibleField` if no
    /// property can carry the requested violation. Both mean "skip this case".
    pub fn synthesize(
        &self,
        schema_name: &str,
        kind: ViolationKind,
    ) -> Result<SynthesizedBody, SynthesisError> {
        let schema = self
            .doc
            .schema(schema_name)
            .ok_or_else(|| SynthesisError::UnknownSchema(schema_name.to_string()))?;
        let no_field = || SynthesisError::NoEligibleField {
            schema: schema_name.to_string(),
            kind,
        };

        let (root, shape) = self.root(schema);
        let prefix = if root == RootKind::Array { "$[0]." } else { "$." };
        let wrap = |obj: Map<String, Value>| match root {
            RootKind::Array => Value::Array(vec![Value::Object(obj)]),
            _ => Value::Object(obj),
        };

        match kind {
            ViolationKind::MissingRequired => {
                let target = shape.sendable_required().next().ok_or_else(no_field)?;
                let mut body = self.baseline(&shape);
                body.remove(target);
                Ok(SynthesizedBody {
                    body: wrap(body),
                    violation: ConstraintViolation::MissingRequired {
                        fields: vec![format!("{prefix}{target}")],
                        mode: StripMode::Single,
                    },
                })
            }
            ViolationKind::NoValidFields => {
                if root == RootKind::Other || shape.properties.is_empty() {
                    return Err(no_field());
                }
                Ok(SynthesizedBody {
                    body: wrap(Map::new()),
                    violation: ConstraintViolation::MissingRequired {
                        fields: shape
                            .sendable_required()
                            .map(|name| format!("{prefix}{name}"))
                            .collect(),
                        mode: StripMode::All,
                    },
                })
            }
            ViolationKind::InvalidType(expected) => {
                let (name, _) = shape
                    .properties
                    .iter()
                    .find(|(_, prop)| accepts_type_violation(prop, expected))
                    .ok_or_else(no_field)?;
                let value = invalid_type_value(expected);
                let mut body = self.baseline(&shape);
                body.insert((*name).to_string(), value.clone());
                Ok(SynthesizedBody {
                    body: wrap(body),
                    violation: ConstraintViolation::InvalidType {
                        expected,
                        field: format!("{prefix}{name}"),
                        value,
                    },
                })
            }
            ViolationKind::BelowMinimum => {
                let (name, minimum, value) = shape
                    .properties
                    .iter()
                    .find_map(|(name, prop)| {
                        below_minimum(prop).map(|(min, value)| (*name, min, value))
                    })
                    .ok_or_else(no_field)?;
                let mut body = self.baseline(&shape);
                body.insert(name.to_string(), value.clone());
                Ok(SynthesizedBody {
                    body: wrap(body),
                    violation: ConstraintViolation::BelowMinimum {
                        field: format!("{prefix}{name}"),
                        minimum,
                        value,
                    },
                })
            }
            ViolationKind::AboveMaxLength => {
                let (name, max_length) = shape
                    .properties
                    .iter()
                    .find_map(|(name, prop)| max_length(prop).map(|n| (*name, n)))
                    .ok_or_else(no_field)?;
                let value = Value::String(over_length_string(max_length));
                let mut body = self.baseline(&shape);
                body.insert(name.to_string(), value.clone());
                Ok(SynthesizedBody {
                    body: wrap(body),
                    violation: ConstraintViolation::AboveMaxLength {
                        field: format!("{prefix}{name}"),
                        max_length,
                        value,
                    },
                })
            }
            ViolationKind::InvalidJsonShape(expected) => {
                let value = match (expected, root) {
                    (JsonShape::Object, RootKind::Object) => json!([]),
                    (JsonShape::Array, RootKind::Array) => json!({}),
                    _ => return Err(no_field()),
                };
                Ok(SynthesizedBody {
                    body: value.clone(),
                    violation: ConstraintViolation::InvalidJsonShape { expected, value },
                })
            }
            ViolationKind::InvalidPathParam => Err(no_field()),
        }
    }

    /// Deterministic value that satisfies `schema`.
    #[must_use]
    pub fn valid_value(&self, schema: &Value) -> Value {
        self.valid_inner(schema, 0)
    }

    fn valid_inner(&self, schema: &Value, depth: u32) -> Value {
        if depth > MAX_DEPTH {
            return Value::Null;
        }
        let schema = self.doc.follow(schema);

        for key in ["example", "default"] {
            if let Some(value) = schema.get(key) {
                return value.clone();
            }
        }
        if let Some(first) = schema
            .get("enum")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
        {
            return first.clone();
        }
        for key in ["oneOf", "anyOf"] {
            if let Some(variant) = schema
                .get(key)
                .and_then(Value::as_array)
                .and_then(|variants| {
                    variants
                        .iter()
                        .find(|v| schema_type(self.doc.follow(v)) != Some("null"))
                })
            {
                return self.valid_inner(variant, depth + 1);
            }
        }

        match schema_type(schema) {
            Some("string") => valid_string(schema),
            Some("integer") => valid_integer(schema),
            Some("number") => valid_number(schema),
            Some("boolean") => Value::Bool(true),
            Some("null") => Value::Null,
            Some("array") => self.valid_array(schema, depth),
            Some("object") => Value::Object(self.valid_object(schema, depth)),
            _ if schema.get("properties").is_some() || schema.get("allOf").is_some() => {
                Value::Object(self.valid_object(schema, depth))
            }
            _ if schema.get("items").is_some() => self.valid_array(schema, depth),
            _ => Value::String("a".to_string()),
        }
    }

    fn valid_array(&self, schema: &Value, depth: u32) -> Value {
        match schema.get("items") {
            Some(items) => Value::Array(vec![self.valid_inner(items, depth + 1)]),
            None => Value::Array(Vec::new()),
        }
    }

    fn valid_object(&self, schema: &Value, depth: u32) -> Map<String, Value> {
        let shape = self.object_shape(schema, depth);
        self.fill_required(&shape, depth)
    }

    fn baseline(&self, shape: &ObjectShape<'_>) -> Map<String, Value> {
        self.fill_required(shape, 0)
    }

    fn fill_required(&self, shape: &ObjectShape<'_>, depth: u32) -> Map<String, Value> {
        shape
            .sendable_required()
            .filter_map(|name| {
                shape
                    .property(name)
                    .map(|prop| (name.to_string(), self.valid_inner(prop, depth + 1)))
            })
            .collect()
    }

    fn root(&self, schema: &'a Value) -> (RootKind, ObjectShape<'a>) {
        let schema = self.doc.follow(schema);
        let is_array = match schema_type(schema) {
            Some("array") => true,
            None => schema.get("items").is_some(),
            Some(_) => false,
        };
        if is_array {
            let items = schema.get("items").unwrap_or(&NO_SCHEMA);
            return (RootKind::Array, self.object_shape(items, 0));
        }
        let is_object = schema_type(schema) == Some("object")
            || schema.get("properties").is_some()
            || schema.get("allOf").is_some();
        if is_object {
            (RootKind::Object, self.object_shape(schema, 0))
        } else {
            (RootKind::Other, ObjectShape::default())
        }
    }

    fn object_shape<'s>(&self, schema: &'s Value, depth: u32) -> ObjectShape<'s>
    where
        'a: 's,
    {
        let mut shape = ObjectShape::default();
        if depth > MAX_DEPTH {
            return shape;
        }
        let schema = self.doc.follow(schema);

        if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
            for part in parts {
                let sub = self.object_shape(part, depth + 1);
                for (name, prop) in sub.properties {
                    shape.insert(name, prop);
                }
                for name in sub.required {
                    shape.require(name);
                }
            }
        }
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop) in props {
                shape.insert(name.as_str(), self.property_schema(prop));
            }
        }
        for name in schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            shape.require(name);
        }
        shape
    }

    /// Property schema with `$ref` and single-element `allOf` wrappers removed.
    fn property_schema<'s>(&self, prop: &'s Value) -> &'s Value
    where
        'a: 's,
    {
        let prop = self.doc.follow(prop);
        match prop.get("allOf").and_then(Value::as_array) {
            Some(parts) if parts.len() == 1 && prop.get("type").is_none() => {
                self.doc.follow(&parts[0])
            }
            _ => prop,
        }
    }
}

/// Build the invalid-integer path case: every path parameter becomes `ABC`.
///
/// Returns `None` when the endpoint has no integer path parameter.
#[must_use]
pub fn invalid_path_param(endpoint: &EndpointDescriptor) -> Option<(String, ConstraintViolation)> {
    let target = endpoint.path_params().find(|p| p.is_integer())?;
    let path = substitute_path(&endpoint.template, INVALID_PATH_PARAM_VALUE);
    Some((
        path,
        ConstraintViolation::InvalidPathParam {
            parameter: target.name.clone(),
            value: INVALID_PATH_PARAM_VALUE.to_string(),
        },
    ))
}

fn is_read_only(schema: &Value) -> bool {
    schema
        .get("readOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn has_enum(schema: &Value) -> bool {
    schema
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| !values.is_empty())
}

fn format_of(schema: &Value) -> Option<&str> {
    schema.get("format").and_then(Value::as_str)
}

fn accepts_type_violation(prop: &Value, expected: InvalidType) -> bool {
    if is_read_only(prop) {
        return false;
    }
    let ty = schema_type(prop);
    match expected {
        InvalidType::Integer => ty == Some("integer") && !has_enum(prop),
        InvalidType::Double => ty == Some("number") && !has_enum(prop),
        InvalidType::String => {
            ty == Some("string")
                && !has_enum(prop)
                && !matches!(format_of(prop), Some("date-time" | "date" | "time"))
        }
        InvalidType::DateTime => ty == Some("string") && format_of(prop) == Some("date-time"),
        InvalidType::Enum => has_enum(prop),
    }
}

fn invalid_type_value(expected: InvalidType) -> Value {
    match expected {
        InvalidType::Integer | InvalidType::Double => json!(INVALID_NUMBER_VALUE),
        InvalidType::String => json!(INVALID_STRING_VALUE),
        InvalidType::DateTime => json!(INVALID_DATE_TIME_VALUE),
        InvalidType::Enum => json!(INVALID_ENUM_VALUE),
    }
}

/// `(minimum, minimum - 1)` for a numeric property that declares a minimum.
fn below_minimum(prop: &Value) -> Option<(Value, Value)> {
    if is_read_only(prop) {
        return None;
    }
    let minimum = prop.get("minimum")?;
    let value = match schema_type(prop)? {
        "integer" => match minimum.as_i64() {
            Some(min) => Value::from(min.checked_sub(1)?),
            None => json!((minimum.as_f64()?.ceil()) - 1.0),
        },
        "number" => json!(minimum.as_f64()? - 1.0),
        _ => return None,
    };
    Some((minimum.clone(), value))
}

fn max_length(prop: &Value) -> Option<u64> {
    if is_read_only(prop) || schema_type(prop) != Some("string") {
        return None;
    }
    prop.get("maxLength")
        .and_then(Value::as_u64)
        .filter(|n| *n <= MAX_STRING_LEN)
}

fn over_length_string(max_length: u64) -> String {
    "a".repeat(usize::try_from(max_length).unwrap_or(0) + 1)
}

fn valid_string(schema: &Value) -> Value {
    let fixed = match format_of(schema) {
        Some("date-time") => Some("2024-01-15T12:00:00Z"),
        Some("date") => Some("2024-01-15"),
        Some("time") => Some("12:00:00"),
        Some("email") => Some("user@example.com"),
        Some("uuid") => Some("123e4567-e89b-12d3-a456-426614174000"),
        Some("uri" | "url") => Some("https://example.com"),
        _ => None,
    };
    if let Some(value) = fixed {
        return Value::String(value.to_string());
    }
    let max_length = schema.get("maxLength").and_then(Value::as_u64);
    let min = schema
        .get("minLength")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| max_length.map_or(1, |max| max.min(1)))
        .min(MAX_STRING_LEN);
    let max = max_length.unwrap_or(u64::MAX).max(min);
    let len = 4_u64.clamp(min, max);
    Value::String("a".repeat(usize::try_from(len).unwrap_or(4)))
}

fn valid_integer(schema: &Value) -> Value {
    if let Some(min) = schema.get("minimum").and_then(Value::as_i64) {
        return Value::from(min);
    }
    match schema.get("maximum").and_then(Value::as_i64) {
        Some(max) if max < 1 => Value::from(max),
        _ => Value::from(1),
    }
}

fn valid_number(schema: &Value) -> Value {
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        return json!(min);
    }
    match schema.get("maximum").and_then(Value::as_f64) {
        Some(max) if max < 1.0 => json!(max),
        _ => json!(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::load;
    use crate::enumerate::{EnumerateOptions, enumerate};

    fn doc(schemas: Value) -> SchemaDocument {
        load(&json!({"components": {"schemas": schemas}})).unwrap()
    }

    fn widget_doc() -> SchemaDocument {
        doc(json!({
            "Widget": {
                "type": "object",
                "required": ["name", "count"],
                "properties": {
                    "id": {"type": "integer", "readOnly": true},
                    "name": {"type": "string", "maxLength": 5},
                    "count": {"type": "integer", "minimum": 3},
                    "price": {"type": "number", "minimum": 0.5},
                    "kind": {"type": "string", "enum": ["small", "large"]},
                    "createdAt": {"type": "string", "format": "date-time"},
                    "owner": {"$ref": "#/components/schemas/Owner"}
                }
            },
            "Owner": {
                "type": "object",
                "required": ["email"],
                "properties": {"email": {"type": "string", "format": "email"}}
            },
            "WidgetList": {
                "type": "array",
                "items": {"$ref": "#/components/schemas/Widget"}
            },
            "Empty": {"type": "object"},
            "Name": {"type": "string"}
        }))
    }

    #[test]
    fn required_name_scenario() {
        let doc = doc(json!({
            "Thing": {
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string", "maxLength": 5}}
            }
        }));
        let synth = Synthesizer::new(&doc);

        let missing = synth.synthesize("Thing", ViolationKind::MissingRequired).unwrap();
        assert_eq!(missing.body, json!({}));

        let long = synth.synthesize("Thing", ViolationKind::AboveMaxLength).unwrap();
        assert_eq!(long.body, json!({"name": "aaaaaa"}));
    }

    #[test]
    fn missing_required_keeps_other_required_fields() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let out = synth.synthesize("Widget", ViolationKind::MissingRequired).unwrap();
        assert_eq!(out.body, json!({"count": 3}));
        assert_eq!(
            out.violation,
            ConstraintViolation::MissingRequired {
                fields: vec!["$.name".into()],
                mode: StripMode::Single
            }
        );
    }

    #[test]
    fn no_valid_fields_strips_everything() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let out = synth.synthesize("Widget", ViolationKind::NoValidFields).unwrap();
        assert_eq!(out.body, json!({}));
        assert_eq!(out.violation.kind(), ViolationKind::NoValidFields);
        assert_eq!(out.violation.fields(), vec!["$.name", "$.count"]);

        let list = synth.synthesize("WidgetList", ViolationKind::NoValidFields).unwrap();
        assert_eq!(list.body, json!([{}]));
    }

    #[test]
    fn invalid_types_target_first_eligible_property() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);

        let int = synth
            .synthesize("Widget", ViolationKind::InvalidType(InvalidType::Integer))
            .unwrap();
        // `id` is readOnly, so `count` is the first integer.
        assert_eq!(int.body["count"], json!("invalid"));
        assert_eq!(int.violation.fields(), vec!["$.count"]);

        let double = synth
            .synthesize("Widget", ViolationKind::InvalidType(InvalidType::Double))
            .unwrap();
        assert_eq!(double.body["price"], json!("invalid"));

        let string = synth
            .synthesize("Widget", ViolationKind::InvalidType(InvalidType::String))
            .unwrap();
        assert_eq!(string.body["name"], json!(12_345));

        let date = synth
            .synthesize("Widget", ViolationKind::InvalidType(InvalidType::DateTime))
            .unwrap();
        assert_eq!(date.body["createdAt"], json!("not-a-date-time"));

        let enumerated = synth
            .synthesize("Widget", ViolationKind::InvalidType(InvalidType::Enum))
            .unwrap();
        assert_eq!(enumerated.body["kind"], json!("__INVALID_ENUM_VALUE__"));
        assert_eq!(enumerated.body["name"], json!("aaaa"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let a = synth.synthesize("Widget", ViolationKind::BelowMinimum).unwrap();
        let b = synth.synthesize("Widget", ViolationKind::BelowMinimum).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn below_minimum_is_minimum_minus_one() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let out = synth.synthesize("Widget", ViolationKind::BelowMinimum).unwrap();
        assert_eq!(out.body["count"], json!(2));
        assert!(matches!(
            out.violation,
            ConstraintViolation::BelowMinimum { ref minimum, .. } if *minimum == json!(3)
        ));

        let priced = self::doc(json!({"P": {"type": "object", "properties": {
            "price": {"type": "number", "minimum": 0.5}
        }}}));
        let out = Synthesizer::new(&priced)
            .synthesize("P", ViolationKind::BelowMinimum)
            .unwrap();
        assert_eq!(out.body["price"], json!(-0.5));
    }

    #[test]
    fn array_bodies_use_indexed_field_paths() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let out = synth
            .synthesize("WidgetList", ViolationKind::AboveMaxLength)
            .unwrap();
        assert_eq!(out.body, json!([{"name": "aaaaaa", "count": 3}]));
        assert_eq!(out.violation.fields(), vec!["$[0].name"]);
    }

    #[test]
    fn json_shape_flips_root() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        let object = synth
            .synthesize("Widget", ViolationKind::InvalidJsonShape(JsonShape::Object))
            .unwrap();
        assert_eq!(object.body, json!([]));
        let array = synth
            .synthesize("WidgetList", ViolationKind::InvalidJsonShape(JsonShape::Array))
            .unwrap();
        assert_eq!(array.body, json!({}));

        let err = synth
            .synthesize("Widget", ViolationKind::InvalidJsonShape(JsonShape::Array))
            .unwrap_err();
        assert!(matches!(err, SynthesisError::NoEligibleField { .. }));
    }

    #[test]
    fn no_eligible_field_is_an_error_not_a_body() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        for kind in [
            ViolationKind::MissingRequired,
            ViolationKind::NoValidFields,
            ViolationKind::BelowMinimum,
            ViolationKind::InvalidType(InvalidType::Enum),
        ] {
            let err = synth.synthesize("Empty", kind).unwrap_err();
            assert_eq!(
                err,
                SynthesisError::NoEligibleField {
                    schema: "Empty".into(),
                    kind
                }
            );
        }
        assert!(synth.synthesize("Name", ViolationKind::NoValidFields).is_err());
    }

    #[test]
    fn unknown_schema_reported() {
        let doc = widget_doc();
        let err = Synthesizer::new(&doc)
            .synthesize("Nope", ViolationKind::MissingRequired)
            .unwrap_err();
        assert_eq!(err, SynthesisError::UnknownSchema("Nope".into()));
    }

    #[test]
    fn huge_max_length_is_not_eligible() {
        let doc = doc(json!({"Big": {"type": "object", "properties": {
            "blob": {"type": "string", "maxLength": 4_294_967_295_u64}
        }}}));
        assert!(
            Synthesizer::new(&doc)
                .synthesize("Big", ViolationKind::AboveMaxLength)
                .is_err()
        );
    }

    #[test]
    fn all_of_properties_are_merged() {
        let doc = doc(json!({
            "Base": {"type": "object", "required": ["id"], "properties": {"id": {"type": "integer"}}},
            "Derived": {"allOf": [
                {"$ref": "#/components/schemas/Base"},
                {"type": "object", "required": ["label"], "properties": {"label": {"type": "string"}}}
            ]}
        }));
        let synth = Synthesizer::new(&doc);
        let out = synth.synthesize("Derived", ViolationKind::MissingRequired).unwrap();
        assert_eq!(out.body, json!({"label": "aaaa"}));
    }

    #[test]
    fn valid_values_respect_formats_and_bounds() {
        let doc = widget_doc();
        let synth = Synthesizer::new(&doc);
        assert_eq!(
            synth.valid_value(&json!({"type": "string", "format": "date-time"})),
            json!("2024-01-15T12:00:00Z")
        );
        assert_eq!(
            synth.valid_value(&json!({"type": "string", "minLength": 6})),
            json!("aaaaaa")
        );
        assert_eq!(
            synth.valid_value(&json!({"type": "string", "maxLength": 2})),
            json!("aa")
        );
        assert_eq!(synth.valid_value(&json!({"type": "integer", "maximum": -4})), json!(-4));
        assert_eq!(
            synth.valid_value(&json!({"$ref": "#/components/schemas/Owner"})),
            json!({"email": "user@example.com"})
        );
        assert_eq!(
            synth.valid_value(&json!({"anyOf": [{"type": "null"}, {"type": "boolean"}]})),
            json!(true)
        );
    }

    #[test]
    fn baseline_strings_respect_length_bounds() {
        assert_eq!(valid_string(&json!({"type": "string"})), json!("aaaa"));
        assert_eq!(valid_string(&json!({"type": "string", "maxLength": 0})), json!(""));
        assert_eq!(valid_string(&json!({"type": "string", "maxLength": 2})), json!("aa"));
        assert_eq!(valid_string(&json!({"type": "string", "minLength": 6})), json!("aaaaaa"));
    }

    #[test]
    fn invalid_path_param_only_for_integer_params() {
        let doc = load(&json!({
            "paths": {
                "/widgets/{id}": {"get": {"parameters": [
                    {"name": "id", "in": "path", "schema": {"type": "integer"}}
                ]}},
                "/orgs/{org}/widgets/{id}": {"get": {"parameters": [
                    {"name": "org", "in": "path", "schema": {"type": "string"}},
                    {"name": "id", "in": "path", "schema": {"type": "integer"}}
                ]}},
                "/tags/{tag}": {"get": {"parameters": [
                    {"name": "tag", "in": "path", "schema": {"type": "string"}}
                ]}}
            },
            "components": {"schemas": {}}
        }))
        .unwrap();
        let options = EnumerateOptions::default();
        let endpoints: Vec<EndpointDescriptor> = enumerate(&doc, &options).collect();

        let (path, violation) = invalid_path_param(&endpoints[0]).unwrap();
        assert_eq!(path, "/widgets/ABC");
        assert_eq!(violation.kind(), ViolationKind::InvalidPathParam);

        let (path, violation) = invalid_path_param(&endpoints[1]).unwrap();
        assert_eq!(path, "/orgs/ABC/widgets/ABC");
        assert_eq!(
            violation,
            ConstraintViolation::InvalidPathParam {
                parameter: "id".into(),
                value: "ABC".into(),
            }
        );

        assert!(invalid_path_param(&endpoints[2]).is_none());
    }
}
