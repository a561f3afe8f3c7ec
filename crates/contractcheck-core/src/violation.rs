//! Constraint violations: which schema rule a synthesized request breaks

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar type a field is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidType {
    Integer,
    Double,
    String,
    DateTime,
    Enum,
}

/// Root JSON shape a body is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JsonShape {
    Object,
    Array,
}

/// How many properties a missing-required violation strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StripMode {
    /// One required property.
    Single,
    /// Every property ("no valid fields").
    All,
}

/// Payload-free tag used to request a synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingRequired,
    NoValidFields,
    InvalidType(InvalidType),
    BelowMinimum,
    AboveMaxLength,
    InvalidJsonShape(JsonShape),
    InvalidPathParam,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingRequired => "missing required field",
            Self::NoValidFields => "no valid fields",
            Self::InvalidType(InvalidType::Integer) => "invalid integer",
            Self::InvalidType(InvalidType::Double) => "invalid double",
            Self::InvalidType(InvalidType::String) => "invalid string",
            Self::InvalidType(InvalidType::DateTime) => "invalid date-time",
            Self::InvalidType(InvalidType::Enum) => "invalid enum",
            Self::BelowMinimum => "below minimum",
            Self::AboveMaxLength => "above max length",
            Self::InvalidJsonShape(JsonShape::Object) => "invalid JSON object",
            Self::InvalidJsonShape(JsonShape::Array) => "invalid JSON array",
            Self::InvalidPathParam => "invalid path parameter",
        };
        f.write_str(s)
    }
}

/// A concrete broken constraint, with the field it targets and the bad value
/// that was sent.
///
/// Field paths are JSON-path-like: `$.name` for object bodies, `$[0].name`
/// for array bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    MissingRequired {
        fields: Vec<String>,
        mode: StripMode,
    },
    InvalidType {
        expected: InvalidType,
        field: String,
        value: Value,
    },
    BelowMinimum {
        field: String,
        minimum: Value,
        value: Value,
    },
    AboveMaxLength {
        field: String,
        max_length: u64,
        value: Value,
    },
    InvalidJsonShape {
        expected: JsonShape,
        value: Value,
    },
    InvalidPathParam {
        parameter: String,
        value: String,
    },
}

impl ConstraintViolation {
    #[must_use]
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::MissingRequired {
                mode: StripMode::Single,
                ..
            } => ViolationKind::MissingRequired,
            Self::MissingRequired {
                mode: StripMode::All,
                ..
            } => ViolationKind::NoValidFields,
            Self::InvalidType { expected, .. } => ViolationKind::InvalidType(*expected),
            Self::BelowMinimum { .. } => ViolationKind::BelowMinimum,
            Self::AboveMaxLength { .. } => ViolationKind::AboveMaxLength,
            Self::InvalidJsonShape { expected, .. } => ViolationKind::InvalidJsonShape(*expected),
            Self::InvalidPathParam { .. } => ViolationKind::InvalidPathParam,
        }
    }

    /// Field paths targeted by this violation (empty for body-level ones).
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingRequired { fields, .. } => fields.iter().map(String::as_str).collect(),
            Self::InvalidType { field, .. }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaxLength { field, .. } => vec![field.as_str()],
            Self::InvalidPathParam { parameter, .. } => vec![parameter.as_str()],
            Self::InvalidJsonShape { .. } => Vec::new(),
        }
    }
}
