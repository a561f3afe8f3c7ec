//! contractcheck-runner: async execution of planned contract test cases
//!
//! Sends the cases planned from an OpenAPI document to a live server, scores
//! each response and folds the outcomes into a [`contractcheck_core::Reporter`].

pub mod cancel;
pub mod checks;
pub mod context;
pub mod engine;
pub mod executor;
pub mod retry;
pub mod suites;

pub use cancel::{CancellationSource, CancellationToken};
pub use context::TestContext;
pub use engine::Engine;
pub use executor::{CaseRequest, ExecutionResult, Executor, HttpResponse};
pub use retry::{RetryError, RetryPolicy, retry};
pub use suites::{Expectation, Plan, PlannedCase};

use contractcheck_core::{ConfigError, SchemaLoadError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("run cancelled")]
    Cancelled,
}
