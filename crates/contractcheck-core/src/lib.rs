//! contractcheck-core: schema-driven negative test logic for OpenAPI contracts
//!
//! This crate holds everything that does not touch the network: loading an
//! OpenAPI document into a catalog, enumerating concrete endpoints,
//! synthesizing request bodies that break exactly one constraint, deriving
//! the errors a server should answer with, and scoring actual errors
//! against them.

pub mod catalog;
pub mod config;
pub mod enumerate;
pub mod expected;
pub mod http_file;
pub mod matcher;
pub mod outcome;
pub mod report;
pub mod schema;
pub mod suite;
pub mod synth;
pub mod violation;

pub use catalog::{Method, ParamLocation, Parameter, SchemaDocument, SchemaLoadError, load};
pub use config::{Config, ConfigError, PaginationCheck, Reference, RetrySettings, SkipRule};
pub use enumerate::{
    EndpointDescriptor, Endpoints, EnumerateOptions, enumerate, substitute_path, substitute_path_by,
};
pub use expected::{ErrorMessages, ExpectedError, expected_errors};
pub use http_file::to_http_file;
pub use matcher::{MatchResult, match_errors, normalize_title, strip_field_prefix};
pub use outcome::{CaseFailure, ErrorEntry, RequestRecord, SkippedCase, TestOutcome};
pub use report::{Reporter, RunReport, Summary};
pub use suite::{RunMode, Suite};
pub use synth::{SynthesisError, SynthesizedBody, Synthesizer, invalid_path_param};
pub use violation::{ConstraintViolation, InvalidType, JsonShape, StripMode, ViolationKind};
