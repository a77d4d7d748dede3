//! Typed tool input schemas.
//!
//! A schema is a flat mapping from parameter name to a primitive type plus a
//! required/optional flag. On the wire (tool host, model API) it travels as the
//! equivalent JSON Schema object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Primitive type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Declared with a non-primitive or missing type; any value is accepted.
    Any,
}

impl ParamKind {
    fn from_json_type(ty: Option<&str>) -> Self {
        match ty {
            Some("string") => ParamKind::String,
            Some("integer") => ParamKind::Integer,
            Some("number") => ParamKind::Number,
            Some("boolean") => ParamKind::Boolean,
            _ => ParamKind::Any,
        }
    }

    fn json_type(&self) -> Option<&'static str> {
        match self {
            ParamKind::String => Some("string"),
            ParamKind::Integer => Some("integer"),
            ParamKind::Number => Some("number"),
            ParamKind::Boolean => Some("boolean"),
            ParamKind::Any => None,
        }
    }
}

/// Read a whole number that fits in an `i64`, accepting `3.0` as well as `3`.
pub fn as_whole_i64(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if value.is_u64() {
        return None;
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required argument '{0}'")]
    MissingRequired(String),

    #[error("argument '{param}' must be {expected}, got {found}")]
    WrongType {
        param: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("argument '{0}' is out of range for a 64-bit integer")]
    OutOfRange(String),

    #[error("argument '{param}' is invalid: {reason}")]
    Invalid { param: String, reason: String },

    #[error("invalid input schema: {0}")]
    InvalidSchema(String),
}

/// The input schema of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.with_param(name, kind, true, description)
    }

    /// Add an optional parameter.
    pub fn optional(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.with_param(name, kind, false, description)
    }

    fn with_param(mut self, name: &str, kind: ParamKind, required: bool, description: &str) -> Self {
        self.params.retain(|p| p.name != name);
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Parse the object-schema subset used by tool declarations.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let obj = schema
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema(format!("expected object, got {}", describe(schema))))?;

        if let Some(ty) = obj.get("type").and_then(Value::as_str) {
            if ty != "object" {
                return Err(SchemaError::InvalidSchema(format!(
                    "top-level type must be 'object', got '{ty}'"
                )));
            }
        }

        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut params = Vec::new();
        if let Some(props) = obj.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                SchemaError::InvalidSchema("'properties' must be an object".into())
            })?;
            for (name, prop) in props {
                params.push(ParamSpec {
                    name: name.clone(),
                    kind: ParamKind::from_json_type(prop.get("type").and_then(Value::as_str)),
                    required: required.contains(&name.as_str()),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }

        for name in &required {
            if !params.iter().any(|p| p.name == *name) {
                params.push(ParamSpec {
                    name: name.to_string(),
                    kind: ParamKind::Any,
                    required: true,
                    description: None,
                });
            }
        }

        Ok(Self { params })
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = Map::new();
            if let Some(ty) = p.kind.json_type() {
                prop.insert("type".into(), json!(ty));
            }
            if let Some(desc) = &p.description {
                prop.insert("description".into(), json!(desc));
            }
            properties.insert(p.name.clone(), Value::Object(prop));
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check call arguments against the schema.
    ///
    /// `null` is treated as an empty argument object, and `null` values as
    /// absent. Unknown arguments are ignored.
    pub fn validate(&self, arguments: &Value) -> Result<(), SchemaError> {
        let args: Map<String, Value> = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            other => return Err(SchemaError::NotAnObject(describe(other))),
        };
        let args = Value::Object(args);

        let validator = jsonschema::Validator::new(&self.to_json_schema())
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        if let Some(error) = validator.iter_errors(&args).next() {
            return Err(self.schema_error(&error));
        }

        // JSON Schema calls 1e20 an integer; a tool cannot use it as one
        for p in self.params.iter().filter(|p| p.kind == ParamKind::Integer) {
            if let Some(value) = args.get(&p.name) {
                if as_whole_i64(value).is_none() {
                    return Err(SchemaError::OutOfRange(p.name.clone()));
                }
            }
        }
        Ok(())
    }

    fn schema_error(&self, error: &jsonschema::ValidationError<'_>) -> SchemaError {
        if let jsonschema::error::ValidationErrorKind::Required { property } = &error.kind {
            let name = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            return SchemaError::MissingRequired(name);
        }

        let path = error.instance_path.to_string();
        let name = path.trim_start_matches('/').split('/').next().unwrap_or_default();
        match self.param(name) {
            Some(p) if matches!(error.kind, jsonschema::error::ValidationErrorKind::Type { .. }) => {
                SchemaError::WrongType {
                    param: p.name.clone(),
                    expected: p.kind.json_type().unwrap_or("any"),
                    found: describe(&error.instance),
                }
            }
            _ => SchemaError::Invalid {
                param: name.to_string(),
                reason: error.to_string(),
            },
        }
    }
}

impl TryFrom<Value> for InputSchema {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json_schema(&value)
    }
}

impl From<InputSchema> for Value {
    fn from(schema: InputSchema) -> Self {
        schema.to_json_schema()
    }
}
