//! Expected server errors for each constraint violation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::matcher::strip_field_prefix;
use crate::violation::{ConstraintViolation, InvalidType, JsonShape, StripMode, ViolationKind};

/// Message fragments the server is expected to answer with.
///
/// Every field can be overridden from the `[messages]` configuration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ErrorMessages {
    pub missing_required: String,
    pub no_valid_fields: String,
    pub invalid_integer: String,
    pub invalid_double: String,
    pub invalid_string: String,
    pub invalid_date_time: String,
    pub invalid_enum: String,
    pub below_minimum: String,
    pub above_max_length: String,
    pub invalid_json_object: String,
    pub invalid_json_array: String,
    pub invalid_path_param: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            missing_required: "is a required field".into(),
            no_valid_fields: "No valid fields sent with the request".into(),
            invalid_integer: "is expected to be a valid integer".into(),
            invalid_double: "is expected to be a valid double".into(),
            invalid_string: "is expected to be a valid string".into(),
            invalid_date_time: "is expected to be a valid date-time".into(),
            invalid_enum: "is expected to be a value of [".into(),
            below_minimum: "cannot be less than the minimum value of".into(),
            above_max_length: "exceeds the maximum length of".into(),
            invalid_json_object: "Request body is expected to be a valid JSON object".into(),
            invalid_json_array: "Request body is expected to be a valid JSON array".into(),
            invalid_path_param: "is expected to be a valid integer".into(),
        }
    }
}

/// One error the server must report for a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExpectedError {
    /// Leaf field name with the `$.`/`$[0].` prefix stripped; empty for
    /// body-level errors.
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ViolationKind>,
}

impl ExpectedError {
    #[must_use]
    pub fn new(field: &str, message: &str, code: Option<&str>) -> Self {
        Self {
            field: strip_field_prefix(field.trim()).to_string(),
            message: message.to_string(),
            code: code.map(str::to_string),
            kind: None,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: ViolationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Text an actual title or description must contain, lowercased.
    #[must_use]
    pub fn needle(&self) -> String {
        let message = self.message.trim();
        if self.field.is_empty() {
            message.to_lowercase()
        } else {
            format!("{} {message}", self.field).to_lowercase()
        }
    }
}

/// Derive the expected error set for `violation`.
#[must_use]
pub fn expected_errors(
    violation: &ConstraintViolation,
    messages: &ErrorMessages,
) -> Vec<ExpectedError> {
    let kind = violation.kind();
    let one = |field: &str, message: &str, code: Option<&str>| {
        vec![ExpectedError::new(field, message, code).with_kind(kind)]
    };

    match violation {
        ConstraintViolation::MissingRequired {
            fields,
            mode: StripMode::All,
        } if fields.is_empty() => one("", &messages.no_valid_fields, Some("noValidFields")),
        ConstraintViolation::MissingRequired { fields, .. } => fields
            .iter()
            .map(|field| {
                ExpectedError::new(field, &messages.missing_required, Some("missingRequiredField"))
                    .with_kind(kind)
            })
            .collect(),
        ConstraintViolation::InvalidType {
            expected, field, ..
        } => {
            let (message, code) = match expected {
                InvalidType::Integer => (&messages.invalid_integer, "invalidInteger"),
                InvalidType::Double => (&messages.invalid_double, "invalidDouble"),
                InvalidType::String => (&messages.invalid_string, "invalidString"),
                InvalidType::DateTime => (&messages.invalid_date_time, "invalidDateTime"),
                InvalidType::Enum => (&messages.invalid_enum, "invalidEnum"),
            };
            one(field, message, Some(code))
        }
        ConstraintViolation::BelowMinimum { field, .. } => one(field, &messages.below_minimum, None),
        ConstraintViolation::AboveMaxLength { field, .. } => {
            one(field, &messages.above_max_length, None)
        }
        ConstraintViolation::InvalidJsonShape {
            expected: JsonShape::Object,
            ..
        } => one("", &messages.invalid_json_object, Some("invalidJsonObject")),
        ConstraintViolation::InvalidJsonShape {
            expected: JsonShape::Array,
            ..
        } => one("", &messages.invalid_json_array, Some("invalidJsonArray")),
        ConstraintViolation::InvalidPathParam { .. } => {
            one("", &messages.invalid_path_param, Some("invalidInteger"))
        }
    }
}
