//! Project configuration for contract test runs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::catalog::Method;
use crate::enumerate::EnumerateOptions;
use crate::expected::ErrorMessages;
use crate::suite::Suite;

/// Project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// OpenAPI document path (JSON or YAML)
    pub spec: PathBuf,

    /// Base URL of the server under test
    pub base_url: String,

    /// Headers sent with every request. Values may use `{{reference}}`
    /// placeholders.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Methods to test (default: get, post, put, delete)
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<Method>,

    /// Path templates to skip; a trailing `*` matches a prefix
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,

    /// Value substituted for every path parameter
    #[serde(default = "default_sentinel")]
    pub path_param_sentinel: String,

    /// Suites to run (empty: all)
    #[serde(default)]
    pub suites: Vec<Suite>,

    /// Maximum in-flight requests for parallel suites
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between cases of sequential suites, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Seed for generated tokens and sampled properties
    #[serde(default)]
    pub seed: Option<u64>,

    /// Backoff for reference fetching
    #[serde(default)]
    pub retry: RetrySettings,

    /// Values fetched from the server before the run
    #[serde(default)]
    pub references: Vec<Reference>,

    /// Invalid pagination queries and the message each must produce
    #[serde(default)]
    pub pagination: Vec<PaginationCheck>,

    /// Cases to leave out
    #[serde(default)]
    pub skip: Vec<SkipRule>,

    /// Expected message fragments
    #[serde(default)]
    pub messages: ErrorMessages,
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// A value read from a GET response and exposed as `{{name}}`.
///
/// ```toml
/// [[references]]
/// name = "tenant"
/// path = "/whoami"
/// pointer = "/tenant/id"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub name: String,
    pub path: String,
    /// JSON pointer into the response body
    pub pointer: String,
}

/// A query suffix that must be rejected with a message containing `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaginationCheck {
    /// Appended to the URL, e.g. `$top=-1`
    pub query: String,
    pub message: String,
}

/// Leaves out matching cases; omitted fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SkipRule {
    #[serde(default)]
    pub suite: Option<Suite>,
    #[serde(default)]
    pub method: Option<Method>,
    /// Path template; a trailing `*` matches a prefix
    #[serde(default)]
    pub path: Option<String>,
}

impl SkipRule {
    #[must_use]
    pub fn matches(&self, suite: Suite, method: Option<Method>, template: &str) -> bool {
        let suite_ok = self.suite.is_none_or(|s| s == suite);
        let method_ok = self.method.is_none_or(|m| method == Some(m));
        let path_ok = self.path.as_deref().is_none_or(|p| match p.strip_suffix('*') {
            Some(prefix) => template.starts_with(prefix),
            None => template == p,
        });
        suite_ok && method_ok && path_ok
    }
}

fn default_methods() -> Vec<Method> {
    EnumerateOptions::default().allowed_methods
}

fn default_excluded_paths() -> Vec<String> {
    EnumerateOptions::default().excluded_paths
}

fn default_sentinel() -> String {
    EnumerateOptions::default().path_param_sentinel
}

const fn default_concurrency() -> usize {
    8
}

const fn default_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: PathBuf::from("openapi.yaml"),
            base_url: "http://localhost:8080".to_string(),
            headers: BTreeMap::new(),
            allowed_methods: default_methods(),
            excluded_paths: default_excluded_paths(),
            path_param_sentinel: default_sentinel(),
            suites: Vec::new(),
            concurrency: default_concurrency(),
            delay_ms: 0,
            timeout_secs: default_timeout(),
            seed: None,
            retry: RetrySettings::default(),
            references: Vec::new(),
            pagination: Vec::new(),
            skip: Vec::new(),
            messages: ErrorMessages::default(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from default location (.contractcheck.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be loaded
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [
            ".contractcheck.toml",
            ".contractcheck.json",
            "contractcheck.toml",
        ];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Reject settings the run cannot work with.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.path_param_sentinel.contains(['{', '}']) {
            return Err(ConfigError::Invalid(
                "path_param_sentinel must not contain '{' or '}'".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            allowed_methods: self.allowed_methods.clone(),
            excluded_paths: self.excluded_paths.clone(),
            path_param_sentinel: self.path_param_sentinel.clone(),
        }
    }

    /// Configured suites, or every suite when none are listed.
    #[must_use]
    pub fn enabled_suites(&self) -> Vec<Suite> {
        if self.suites.is_empty() {
            Suite::ALL.to_vec()
        } else {
            Suite::ALL
                .into_iter()
                .filter(|s| self.suites.contains(s))
                .collect()
        }
    }

    #[must_use]
    pub fn is_skipped(&self, suite: Suite, method: Option<Method>, template: &str) -> bool {
        self.skip
            .iter()
            .any(|rule| rule.matches(suite, method, template))
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# contractcheck configuration

# OpenAPI document (local JSON or YAML file)
spec = "openapi.yaml"

# Server to test
base_url = "http://localhost:8080"

# Methods and paths to test
# allowed_methods = ["get", "post", "put", "delete"]
# excluded_paths = ["/version", "/whoami", "/internal/*"]
# path_param_sentinel = "1"

# Suites to run (default: all)
# suites = ["missing-required", "invalid-path-param", "not-found"]

# Scheduling
# concurrency = 8
# delay_ms = 0
# timeout_secs = 10
# seed = 42

# HTTP headers sent with every request; {{name}} expands references
[headers]
Authorization = "Bearer your-token-here"
# X-Tenant = "{{tenant}}"

# Values fetched once before the run (retried with backoff)
# [[references]]
# name = "tenant"
# path = "/whoami"
# pointer = "/tenant/id"

# [retry]
# max_attempts = 5
# base_delay_ms = 500
# max_delay_ms = 8000

# Pagination queries that must be rejected
# [[pagination]]
# query = "$top=-1"
# message = "$top query parameter"

# Cases to leave out
# [[skip]]
# suite = "method-not-allowed"
# path = "/health"

# Override expected message fragments
# [messages]
# missing_required = "is a required field"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.spec, PathBuf::from("openapi.yaml"));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
spec = "api.yaml"
base_url = "http://localhost:3000"
suites = ["missing-required", "not-found"]
allowed_methods = ["GET", "post"]

[headers]
Authorization = "Bearer token123"

[[references]]
name = "tenant"
path = "/whoami"
pointer = "/tenant/id"

[[pagination]]
query = "$top=-1"
message = "$top query parameter"

[[skip]]
suite = "not-found"
method = "get"

[messages]
missing_required = "must be provided"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.spec, PathBuf::from("api.yaml"));
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(
            config.headers.get("Authorization"),
            Some(&"Bearer token123".to_string())
        );
        assert_eq!(config.allowed_methods, vec![Method::Get, Method::Post]);
        assert_eq!(config.suites, vec![Suite::MissingRequired, Suite::NotFound]);
        assert_eq!(config.references[0].pointer, "/tenant/id");
        assert_eq!(config.pagination[0].query, "$top=-1");
        assert_eq!(config.skip[0].suite, Some(Suite::NotFound));
        assert_eq!(config.messages.missing_required, "must be provided");
        assert_eq!(config.messages.no_valid_fields, "No valid fields sent with the request");
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.path_param_sentinel, "1");
    }

    #[test]
    fn example_config_parses_and_validates() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.headers.len(), 1);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = Config {
            path_param_sentinel: "{id}".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            base_url: "  ".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_suites_follow_declaration_order() {
        let config = Config {
            suites: vec![Suite::NotFound, Suite::MissingRequired],
            ..Config::default()
        };
        assert_eq!(
            config.enabled_suites(),
            vec![Suite::MissingRequired, Suite::NotFound]
        );
        assert_eq!(Config::default().enabled_suites().len(), Suite::ALL.len());
    }

    #[test]
    fn skip_rules_match_optional_fields() {
        let rule = SkipRule {
            suite: Some(Suite::MethodNotAllowed),
            method: None,
            path: Some("/admin/*".into()),
        };
        assert!(rule.matches(Suite::MethodNotAllowed, Some(Method::Put), "/admin/users"));
        assert!(!rule.matches(Suite::NotFound, Some(Method::Put), "/admin/users"));
        assert!(!rule.matches(Suite::MethodNotAllowed, None, "/widgets"));
        assert!(SkipRule::default().matches(Suite::Unauthorized, None, "/anything"));
    }

    #[test]
    fn load_json_and_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("contractcheck.toml");
        std::fs::write(&toml_path, "spec = \"a.yaml\"\nbase_url = \"http://x\"\n").unwrap();
        assert_eq!(Config::load(&toml_path).unwrap().base_url, "http://x");

        let json_path = dir.path().join("contractcheck.json");
        std::fs::write(
            &json_path,
            r#"{"spec": "a.json", "base_url": "http://y", "concurrency": 2}"#,
        )
        .unwrap();
        let config = Config::load(&json_path).unwrap();
        assert_eq!(config.concurrency, 2);

        let invalid = dir.path().join("bad.toml");
        std::fs::write(&invalid, "spec = \"a\"\nbase_url = \"\"\n").unwrap();
        assert!(matches!(Config::load(&invalid), Err(ConfigError::Invalid(_))));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io(..))));
    }
}
