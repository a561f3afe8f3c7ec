//! JSON Schema for the run report interchange format

use crate::report::RunReport;

/// Generate JSON Schema for `RunReport`.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
