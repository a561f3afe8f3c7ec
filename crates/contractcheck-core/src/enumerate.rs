//! Path enumeration: concrete endpoints from the catalog, filtered by method
//! and exclusion rules, with path parameters replaced by a sentinel.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::{Method, Operation, ParamLocation, Parameter, PathItem, SchemaDocument};

/// Filters and substitution applied while enumerating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerateOptions {
    pub allowed_methods: Vec<Method>,
    /// Exact templates, or prefixes when ending in `*`.
    pub excluded_paths: Vec<String>,
    /// Value substituted for every `{param}` segment.
    pub path_param_sentinel: String,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            allowed_methods: vec![Method::Get, Method::Post, Method::Put, Method::Delete],
            excluded_paths: vec!["/version".to_string(), "/whoami".to_string()],
            path_param_sentinel: "1".to_string(),
        }
    }
}

impl EnumerateOptions {
    #[must_use]
    pub fn is_excluded(&self, template: &str) -> bool {
        self.excluded_paths
            .iter()
            .any(|pattern| match pattern.strip_suffix('*') {
                Some(prefix) => template.starts_with(prefix),
                None => template == pattern,
            })
    }
}

/// A concrete, testable endpoint.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub template: String,
    /// Template with every path parameter replaced by the sentinel.
    pub path: String,
    pub method: Method,
    pub request_schema: Option<String>,
    /// JSON body declared inline rather than as a component reference.
    pub inline_request_body: bool,
    pub parameters: Vec<Parameter>,
    pub secured: bool,
    pub responses: Vec<u16>,
    pub response_schemas: BTreeMap<u16, Value>,
    /// Every method the path item declares, including filtered ones.
    pub path_methods: Vec<Method>,
}

impl EndpointDescriptor {
    fn new(item: &PathItem, op: &Operation, sentinel: &str) -> Self {
        Self {
            template: item.template.clone(),
            path: substitute_path(&item.template, sentinel),
            method: op.method,
            request_schema: op.request_schema.clone(),
            inline_request_body: op.inline_request_body,
            parameters: op.parameters.clone(),
            secured: op.secured,
            responses: op.responses.clone(),
            response_schemas: op.response_schemas.clone(),
            path_methods: item.methods(),
        }
    }

    /// `"GET /widgets/{id}"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.template)
    }

    #[must_use]
    pub fn has_path_params(&self) -> bool {
        self.template.contains('{')
    }

    pub fn path_params(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
    }

    /// Required parameters other than path segments.
    #[must_use]
    pub fn has_required_params(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.required && p.location != ParamLocation::Path)
    }

    /// Declares a parameter by name or by `#/components/parameters/{component}`.
    #[must_use]
    pub fn declares(&self, name: &str, component: &str) -> bool {
        self.parameters.iter().any(|p| p.is(name, component))
    }
}

/// Lazy, restartable walk over a document's endpoints in declaration order.
///
/// Cloning the iterator restarts from the clone's position.
#[derive(Debug, Clone)]
pub struct Endpoints<'a> {
    doc: &'a SchemaDocument,
    options: &'a EnumerateOptions,
    path: usize,
    op: usize,
}

/// Enumerate the endpoints of `doc` that pass `options`.
#[must_use]
pub fn enumerate<'a>(doc: &'a SchemaDocument, options: &'a EnumerateOptions) -> Endpoints<'a> {
    Endpoints {
        doc,
        options,
        path: 0,
        op: 0,
    }
}

impl Iterator for Endpoints<'_> {
    type Item = EndpointDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.doc.paths().get(self.path)?;
            if self.options.is_excluded(&item.template) {
                self.path += 1;
                self.op = 0;
                continue;
            }
            let Some(op) = item.operations.get(self.op) else {
                self.path += 1;
                self.op = 0;
                continue;
            };
            self.op += 1;
            if self.options.allowed_methods.contains(&op.method) {
                return Some(EndpointDescriptor::new(
                    item,
                    op,
                    &self.options.path_param_sentinel,
                ));
            }
        }
    }
}

/// Replace every `{...}` segment of `template` with `value`.
///
/// An unterminated `{` swallows the rest of the template, so the result never
/// contains a `{` unless `value` does.
#[must_use]
pub fn substitute_path(template: &str, value: &str) -> String {
    substitute_path_by(template, |_| value.to_string())
}

/// Replace every `{name}` segment with `value_for(name)`.
pub fn substitute_path_by(template: &str, value_for: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let (name, next) = match tail.find('}') {
            Some(end) => (&tail[..end], &tail[end + 1..]),
            None => (tail, ""),
        };
        out.push_str(&value_for(name));
        rest = next;
    }
    out.push_str(rest);
    out
}
