//! Named test suites and how each one is scheduled

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::violation::{InvalidType, JsonShape, ViolationKind};

/// How the cases of a suite are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Unordered fan-out; order of completion is irrelevant.
    Parallel,
    /// Awaited chain, one case after another.
    Sequential,
    /// Checked against the document alone, no request is sent.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    MissingRequired,
    NoValidFields,
    InvalidInteger,
    InvalidDouble,
    InvalidString,
    InvalidDateTime,
    InvalidEnum,
    BelowMinimum,
    AboveMaxLength,
    InvalidJsonObject,
    InvalidJsonArray,
    InvalidPathParam,
    InvalidSelect,
    InvalidOrderBy,
    InvalidFilter,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    Pagination,
    ResponseSchema,
    WhitespaceInPath,
    RequiredNotNullable,
}

impl Suite {
    pub const ALL: [Self; 22] = [
        Self::MissingRequired,
        Self::NoValidFields,
        Self::InvalidInteger,
        Self::InvalidDouble,
        Self::InvalidString,
        Self::InvalidDateTime,
        Self::InvalidEnum,
        Self::BelowMinimum,
        Self::AboveMaxLength,
        Self::InvalidJsonObject,
        Self::InvalidJsonArray,
        Self::InvalidPathParam,
        Self::InvalidSelect,
        Self::InvalidOrderBy,
        Self::InvalidFilter,
        Self::Unauthorized,
        Self::NotFound,
        Self::MethodNotAllowed,
        Self::Pagination,
        Self::ResponseSchema,
        Self::WhitespaceInPath,
        Self::RequiredNotNullable,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MissingRequired => "missing-required",
            Self::NoValidFields => "no-valid-fields",
            Self::InvalidInteger => "invalid-integer",
            Self::InvalidDouble => "invalid-double",
            Self::InvalidString => "invalid-string",
            Self::InvalidDateTime => "invalid-date-time",
            Self::InvalidEnum => "invalid-enum",
            Self::BelowMinimum => "below-minimum",
            Self::AboveMaxLength => "above-max-length",
            Self::InvalidJsonObject => "invalid-json-object",
            Self::InvalidJsonArray => "invalid-json-array",
            Self::InvalidPathParam => "invalid-path-param",
            Self::InvalidSelect => "invalid-select",
            Self::InvalidOrderBy => "invalid-order-by",
            Self::InvalidFilter => "invalid-filter",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not-found",
            Self::MethodNotAllowed => "method-not-allowed",
            Self::Pagination => "pagination",
            Self::ResponseSchema => "response-schema",
            Self::WhitespaceInPath => "whitespace-in-path",
            Self::RequiredNotNullable => "required-not-nullable",
        }
    }

    /// Violation synthesized into the request body, for body suites.
    #[must_use]
    pub const fn body_violation(self) -> Option<ViolationKind> {
        match self {
            Self::MissingRequired => Some(ViolationKind::MissingRequired),
            Self::NoValidFields => Some(ViolationKind::NoValidFields),
            Self::InvalidInteger => Some(ViolationKind::InvalidType(InvalidType::Integer)),
            Self::InvalidDouble => Some(ViolationKind::InvalidType(InvalidType::Double)),
            Self::InvalidString => Some(ViolationKind::InvalidType(InvalidType::String)),
            Self::InvalidDateTime => Some(ViolationKind::InvalidType(InvalidType::DateTime)),
            Self::InvalidEnum => Some(ViolationKind::InvalidType(InvalidType::Enum)),
            Self::BelowMinimum => Some(ViolationKind::BelowMinimum),
            Self::AboveMaxLength => Some(ViolationKind::AboveMaxLength),
            Self::InvalidJsonObject => Some(ViolationKind::InvalidJsonShape(JsonShape::Object)),
            Self::InvalidJsonArray => Some(ViolationKind::InvalidJsonShape(JsonShape::Array)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mode(self) -> RunMode {
        match self {
            Self::Pagination | Self::ResponseSchema => RunMode::Sequential,
            Self::RequiredNotNullable => RunMode::Static,
            _ => RunMode::Parallel,
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|suite| suite.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|s| s.name()).collect();
                format!("unknown suite '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for suite in Suite::ALL {
            assert_eq!(suite.name().parse::<Suite>(), Ok(suite));
        }
    }

    #[test]
    fn serde_name_matches_display() {
        let json = serde_json::to_string(&Suite::InvalidDateTime).unwrap();
        assert_eq!(json, "\"invalid-date-time\"");
    }

    #[test]
    fn unknown_suite_lists_choices() {
        let err = "nope".parse::<Suite>().unwrap_err();
        assert!(err.contains("missing-required"));
    }

    #[test]
    fn ordering_sensitive_suites_run_sequentially() {
        assert_eq!(Suite::Pagination.mode(), RunMode::Sequential);
        assert_eq!(Suite::ResponseSchema.mode(), RunMode::Sequential);
        assert_eq!(Suite::InvalidEnum.mode(), RunMode::Parallel);
        assert_eq!(Suite::RequiredNotNullable.mode(), RunMode::Static);
    }

    #[test]
    fn only_body_suites_carry_a_violation() {
        let body: Vec<Suite> = Suite::ALL
            .into_iter()
            .filter(|s| s.body_violation().is_some())
            .collect();
        assert_eq!(body.len(), 11);
        assert!(Suite::InvalidPathParam.body_violation().is_none());
    }
}
