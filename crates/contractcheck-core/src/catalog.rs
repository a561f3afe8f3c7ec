//! Schema catalog: an OpenAPI document parsed into ordered path, operation
//! and component-schema records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
pub(crate) const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";

/// Maximum `$ref` nesting followed during resolution (guards circular refs).
const MAX_DEPTH: u32 = 20;

/// HTTP method of an OpenAPI operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "PATCH")]
    Patch,
    #[serde(alias = "DELETE")]
    Delete,
}

impl Method {
    /// Verbs looked up on every path item, in lookup order.
    pub const ALL: [Self; 5] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Key of the operation inside an OpenAPI path item.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(s.trim()))
    }

    /// GET and DELETE requests never carry a body.
    #[must_use]
    pub const fn sends_body(self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    /// Parameter schema, with a top-level component `$ref` already followed.
    pub schema: Value,
    pub required: bool,
    /// `#/components/parameters/...` reference this parameter came from.
    pub reference: Option<String>,
}

impl Parameter {
    #[must_use]
    pub fn schema_type(&self) -> Option<&str> {
        schema_type(&self.schema)
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.schema_type() == Some("integer")
    }

    /// True if the parameter is declared under `name`, or referenced as
    /// `#/components/parameters/{component}`.
    #[must_use]
    pub fn is(&self, name: &str, component: &str) -> bool {
        self.name == name
            || self
                .reference
                .as_deref()
                .and_then(|r| r.strip_prefix(PARAMETER_REF_PREFIX))
                == Some(component)
    }
}

/// One operation (path template + method) of the document.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    /// Path-level parameters merged with operation-level ones (the latter win).
    pub parameters: Vec<Parameter>,
    /// Component schema named by the JSON request body `$ref`.
    pub request_schema: Option<String>,
    /// The operation declares a JSON body that is not a component reference.
    pub inline_request_body: bool,
    /// Declared response statuses, in declaration order.
    pub responses: Vec<u16>,
    /// Raw (unresolved) JSON response schemas per status.
    pub response_schemas: BTreeMap<u16, Value>,
    /// Operation (or the document root) declares a security requirement.
    pub secured: bool,
}

#[derive(Debug, Clone)]
pub struct PathItem {
    pub template: String,
    pub operations: Vec<Operation>,
}

impl PathItem {
    /// Every method declared on this path, regardless of filters.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.operations.iter().map(|op| op.method).collect()
    }
}

/// Parsed OpenAPI document. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    paths: Vec<PathItem>,
    schemas: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("components.schemas is missing")]
    MissingSchemas,
    #[error("Malformed document: {0}")]
    Malformed(&'static str),
}

/// Build a catalog from an already parsed OpenAPI document.
///
/// # Errors
///
/// Fails if `components.schemas` is absent or not an object, or if `paths`
/// is present but not an object.
pub fn load(document: &Value) -> Result<SchemaDocument, SchemaLoadError> {
    let schemas = match document.pointer("/components/schemas") {
        Some(Value::Object(schemas)) => schemas.clone(),
        Some(_) => {
            return Err(SchemaLoadError::Malformed(
                "components.schemas must be an object",
            ));
        }
        None => return Err(SchemaLoadError::MissingSchemas),
    };
    let parameters = document
        .pointer("/components/parameters")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let root_secured = is_secured(document).unwrap_or(false);

    let paths = match document.get("paths") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(paths)) => paths
            .iter()
            .map(|(template, item)| PathItem {
                template: template.clone(),
                operations: parse_operations(item, &schemas, &parameters, root_secured),
            })
            .collect(),
        Some(_) => return Err(SchemaLoadError::Malformed("paths must be an object")),
    };

    Ok(SchemaDocument { paths, schemas })
}

impl SchemaDocument {
    /// Read and load a JSON or YAML document from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or loaded.
    pub fn from_path(path: &Path) -> Result<Self, SchemaLoadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchemaLoadError::Io(path.to_path_buf(), e.to_string()))?;
        let document = parse_document(path, &content)?;
        load(&document)
    }

    /// Path items in document declaration order.
    #[must_use]
    pub fn paths(&self) -> &[PathItem] {
        &self.paths
    }

    /// Component schemas in declaration order.
    pub fn schemas(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schemas.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Look up a `#/components/schemas/...` reference.
    #[must_use]
    pub fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        reference
            .strip_prefix(SCHEMA_REF_PREFIX)
            .and_then(|name| self.schemas.get(name))
    }

    /// Follow `$ref` links at the top of `schema` until a concrete schema is
    /// reached. Unresolvable refs are returned as-is.
    #[must_use]
    pub fn follow<'a>(&'a self, schema: &'a Value) -> &'a Value {
        let mut current = schema;
        for _ in 0..MAX_DEPTH {
            match current
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| self.resolve_ref(r))
            {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// A self-contained schema for `jsonschema`: `schema` as written, with
    /// the document's component schemas attached under `components.schemas`
    /// so `#/components/schemas/...` refs (cyclic ones included) resolve
    /// against the root.
    #[must_use]
    pub fn bundle(&self, schema: &Value) -> Value {
        let Value::Object(root) = schema else {
            return schema.clone();
        };
        let mut root = root.clone();
        let mut components = root
            .remove("components")
            .and_then(|c| match c {
                Value::Object(c) => Some(c),
                _ => None,
            })
            .unwrap_or_default();
        components.insert("schemas".into(), Value::Object(self.schemas.clone()));
        root.insert("components".into(), Value::Object(components));
        Value::Object(root)
    }
}

/// Parse an OpenAPI document from JSON or YAML.
///
/// Extension decides first (`.json`, `.yaml`/`.yml`); otherwise a leading
/// `{` means JSON and anything else is read as YAML.
///
/// # Errors
///
/// Returns `SchemaLoadError::Parse` if the content is not valid for the
/// detected format.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, SchemaLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let as_json = |content: &str| {
        serde_json::from_str::<Value>(content)
            .map_err(|e| SchemaLoadError::Parse(format!("Invalid JSON: {e}")))
    };
    let as_yaml = |content: &str| {
        serde_yml::from_str::<Value>(content)
            .map_err(|e| SchemaLoadError::Parse(format!("Invalid YAML: {e}")))
    };

    match ext.as_str() {
        "json" => as_json(content),
        "yaml" | "yml" => as_yaml(content),
        _ if content.trim_start().starts_with('{') => as_json(content),
        _ => as_yaml(content),
    }
}

/// First non-`null` entry of a schema's `type` (OpenAPI 3.1 allows a list).
#[must_use]
pub fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn is_secured(node: &Value) -> Option<bool> {
    node.get("security")
        .and_then(Value::as_array)
        .map(|reqs| !reqs.is_empty())
}

fn parse_operations(
    item: &Value,
    schemas: &Map<String, Value>,
    components: &Map<String, Value>,
    root_secured: bool,
) -> Vec<Operation> {
    let shared: Vec<Parameter> = item
        .get("parameters")
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .filter_map(|p| parse_parameter(p, schemas, components))
                .collect()
        })
        .unwrap_or_default();

    let mut operations = Vec::new();
    for method in Method::ALL {
        let Some(op) = item.get(method.key()).filter(|op| op.is_object()) else {
            continue;
        };

        let mut parameters = shared.clone();
        for param in op
            .get("parameters")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|p| parse_parameter(p, schemas, components))
        {
            match parameters
                .iter()
                .position(|p| p.name == param.name && p.location == param.location)
            {
                Some(index) => parameters[index] = param,
                None => parameters.push(param),
            }
        }

        let body_schema = op.pointer("/requestBody/content/application~1json/schema");
        let request_schema = body_schema.and_then(body_schema_name);

        let mut responses = Vec::new();
        let mut response_schemas = BTreeMap::new();
        if let Some(declared) = op.get("responses").and_then(Value::as_object) {
            for (status, response) in declared {
                let Ok(status) = status.parse::<u16>() else {
                    continue;
                };
                responses.push(status);
                if let Some(schema) = response.pointer("/content/application~1json/schema") {
                    response_schemas.insert(status, schema.clone());
                }
            }
        }

        operations.push(Operation {
            method,
            parameters,
            inline_request_body: body_schema.is_some() && request_schema.is_none(),
            request_schema,
            responses,
            response_schemas,
            secured: is_secured(op).unwrap_or(root_secured),
        });
    }
    operations
}

/// Component name of a body schema: its own `$ref`, or for array bodies the
/// `$ref` of its items.
fn body_schema_name(schema: &Value) -> Option<String> {
    let target = match schema.get("items") {
        Some(items) if schema_type(schema) == Some("array") => items,
        _ => schema,
    };
    target
        .get("$ref")?
        .as_str()?
        .strip_prefix(SCHEMA_REF_PREFIX)
        .map(String::from)
}

fn parse_parameter(
    param: &Value,
    schemas: &Map<String, Value>,
    components: &Map<String, Value>,
) -> Option<Parameter> {
    if let Some(reference) = param.get("$ref").and_then(Value::as_str) {
        let key = reference.strip_prefix(PARAMETER_REF_PREFIX)?;
        return match components.get(key) {
            Some(resolved) => parse_parameter(resolved, schemas, components).map(|mut p| {
                p.reference = Some(reference.to_string());
                p
            }),
            // Keep unresolved component refs so `$select`-style detection
            // still sees them.
            None => Some(Parameter {
                name: key.to_string(),
                location: ParamLocation::Query,
                schema: Value::Object(Map::new()),
                required: false,
                reference: Some(reference.to_string()),
            }),
        };
    }

    let name = param.get("name")?.as_str()?.to_string();
    let location = match param.get("in")?.as_str()? {
        "path" => ParamLocation::Path,
        "query" => ParamLocation::Query,
        "header" => ParamLocation::Header,
        "cookie" => ParamLocation::Cookie,
        _ => return None,
    };
    let mut schema = param
        .get("schema")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({"type": "string"}));
    if let Some(resolved) = schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
        .and_then(|name| schemas.get(name))
    {
        schema = resolved.clone();
    }
    let required = location == ParamLocation::Path
        || param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);

    Some(Parameter {
        name,
        location,
        schema,
        required,
        reference: None,
    })
}
