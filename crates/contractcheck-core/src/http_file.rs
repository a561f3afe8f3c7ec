//! HTTP file generator - converts failed cases to .http format

use crate::outcome::{RequestRecord, TestOutcome};

/// Generate .http file content from the failed outcomes that sent a request.
///
/// URLs starting with `base_url` are rewritten to use `{{base_url_var}}`.
#[must_use]
pub fn to_http_file(outcomes: &[TestOutcome], base_url: &str, base_url_var: &str) -> String {
    let failures: Vec<(&TestOutcome, &RequestRecord)> = outcomes
        .iter()
        .filter(|o| !o.passed)
        .filter_map(|o| o.request.as_ref().map(|r| (o, r)))
        .collect();

    let mut lines = Vec::new();
    lines.push(format!(
        "# Auto-generated reproduction cases ({} failures)",
        failures.len()
    ));
    lines.push(format!("@{base_url_var} = {base_url}"));
    lines.push(String::new());

    for (idx, (outcome, request)) in failures.iter().enumerate() {
        let status = outcome
            .status
            .map_or_else(|| "no response".to_string(), |s| s.to_string());
        lines.push(format!("### [{idx}] {} - {}", outcome.suite, status));
        lines.push(format!("# ID: {}", outcome.id));
        if let Some(failure) = &outcome.failure {
            lines.push(format!("# {failure}"));
        }

        let url = match request.url.strip_prefix(base_url.trim_end_matches('/')) {
            Some(rest) if !base_url.is_empty() => format!("{{{{{base_url_var}}}}}{rest}"),
            _ => request.url.clone(),
        };
        lines.push(format!("{} {url}", request.method));

        for (key, value) in &request.headers {
            if !matches!(key.to_lowercase().as_str(), "host" | "content-length") {
                lines.push(format!("{key}: {value}"));
            }
        }

        if let Some(body) = &request.body {
            lines.push(String::new());
            lines.push(body.clone());
        }

        lines.push(String::new());
    }

    lines.join("\n")
}
