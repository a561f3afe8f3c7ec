//! Request executor: sends one planned request and captures the response
//!
//! Never fails: connection, timeout and body-read problems come back as
//! [`ExecutionResult::TransportError`], every HTTP status as `Success`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use contractcheck_core::{ErrorEntry, Method, RequestRecord};

use crate::RunError;

/// Response text kept for reporting.
pub const MAX_BODY_BYTES: usize = 4096;

/// One request as planned by a suite. Headers here override the executor's
/// uniform set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRequest {
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl CaseRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Raw query string without the leading `?`.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response text, truncated to [`MAX_BODY_BYTES`] on a char boundary.
    pub body_text: String,
    /// Parsed body when the text is JSON.
    pub body: Option<Value>,
    pub allow: Option<String>,
    pub content_type: Option<String>,
    pub elapsed: Duration,
}

impl HttpResponse {
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorEntry> {
        self.body
            .as_ref()
            .map(ErrorEntry::from_body)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success(HttpResponse),
    TransportError { cause: String },
}

/// Shared HTTP client plus the headers every request carries.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    base_url: String,
    headers: BTreeMap<String, String>,
}

impl Executor {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        headers: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, RunError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Copy of this executor with every uniform header value passed through
    /// `render`.
    #[must_use]
    pub fn render_headers(&self, render: impl Fn(&str) -> String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), render(v)))
                .collect(),
        }
    }

    /// Spaces in the path are sent percent-encoded, trailing ones included.
    #[must_use]
    pub fn url_for(&self, request: &CaseRequest) -> String {
        let path = request.path.replace(' ', "%20");
        match &request.query {
            Some(query) => format!("{}{path}?{query}", self.base_url),
            None => format!("{}{path}", self.base_url),
        }
    }

    /// Uniform headers, `Content-Type`, then the request's overrides.
    /// Names compare case-insensitively; the later value wins.
    #[must_use]
    pub fn effective_headers(&self, request: &CaseRequest) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        let defaults = std::iter::once(("Content-Type", "application/json"));
        let layers = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(defaults.filter(|(k, _)| {
                !self.headers.keys().any(|h| h.eq_ignore_ascii_case(k))
            }))
            .chain(request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        for (name, value) in layers {
            headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.to_string(), value.to_string());
        }
        headers
    }

    /// What [`Executor::execute`] would send, for reports.
    #[must_use]
    pub fn record(&self, request: &CaseRequest) -> RequestRecord {
        RequestRecord {
            method: request.method,
            url: self.url_for(request),
            headers: self.effective_headers(request),
            body: body_text(request),
        }
    }

    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &CaseRequest) -> ExecutionResult {
        let url = self.url_for(request);
        let mut builder = self.client.request(to_reqwest(request.method), &url);
        for (name, value) in self.effective_headers(request) {
            // Values that are not valid in HTTP never reach the server.
            if reqwest::header::HeaderValue::from_str(&value).is_ok() {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = body_text(request) {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "request failed");
                return ExecutionResult::TransportError {
                    cause: e.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let allow = header("allow");
        let content_type = header("content-type");

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(%url, error = %e, "failed to read response body");
                return ExecutionResult::TransportError {
                    cause: e.to_string(),
                };
            }
        };
        let elapsed = start.elapsed();
        debug!(status, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "response received");

        ExecutionResult::Success(HttpResponse {
            status,
            body: serde_json::from_str(&text).ok(),
            body_text: truncate(&text, MAX_BODY_BYTES),
            allow,
            content_type,
            elapsed,
        })
    }
}

/// Serialized body, omitted for GET and DELETE.
fn body_text(request: &CaseRequest) -> Option<String> {
    if !request.method.sends_body() {
        return None;
    }
    request.body.as_ref().map(Value::to_string)
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Truncate to at most `max` bytes, walking back to a char boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &text[..end], text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor() -> Executor {
        Executor::new(
            "http://localhost:8080/",
            BTreeMap::from([("Authorization".to_string(), "Bearer abc".to_string())]),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let exec = executor();
        let request = CaseRequest::new(Method::Get, "/widgets").with_query("$select=garbage");
        assert_eq!(exec.url_for(&request), "http://localhost:8080/widgets?$select=garbage");
        let padded = CaseRequest::new(Method::Get, "/widgets/  ");
        assert_eq!(exec.url_for(&padded), "http://localhost:8080/widgets/%20%20");
    }

    #[test]
    fn overrides_replace_uniform_headers_case_insensitively() {
        let exec = executor();
        let request =
            CaseRequest::new(Method::Get, "/widgets").with_header("authorization", "Bearer other");
        let headers = exec.effective_headers(&request);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer other"));
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn body_omitted_for_get_and_delete() {
        let exec = executor();
        let get = CaseRequest::new(Method::Get, "/w").with_body(json!({"a": 1}));
        let delete = CaseRequest::new(Method::Delete, "/w").with_body(json!({"a": 1}));
        let post = CaseRequest::new(Method::Post, "/w").with_body(json!({"a": 1}));
        assert_eq!(exec.record(&get).body, None);
        assert_eq!(exec.record(&delete).body, None);
        assert_eq!(exec.record(&post).body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn render_headers_expands_values() {
        let exec = executor().render_headers(|v| v.replace("abc", "xyz"));
        let headers = exec.effective_headers(&CaseRequest::new(Method::Get, "/"));
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer xyz"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let text = "é".repeat(10);
        let cut = truncate(&text, 5);
        assert!(cut.starts_with("éé…"));
        assert!(cut.ends_with("(20 bytes total)"));
    }

    #[test]
    fn response_errors_parse_body() {
        let response = HttpResponse {
            status: 404,
            body_text: String::new(),
            body: Some(json!({"errors": [{"title": "Not Found"}]})),
            allow: None,
            content_type: None,
            elapsed: Duration::ZERO,
        };
        assert_eq!(response.errors()[0].title.as_deref(), Some("Not Found"));
    }
}
