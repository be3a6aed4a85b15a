//! Field-conditional response schema for structured commit messages.
//!
//! The schema always requires `type` and `description`. Each optional field
//! (`scope`, `body`, `footer`) is part of the accepted shape only when its
//! inclusion flag was set; otherwise it must be absent from the output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::AiError;

/// Which optional commit-message fields the model may populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldFlags {
    pub scope: bool,
    pub body: bool,
    pub footer: bool,
}

impl Default for FieldFlags {
    fn default() -> Self {
        Self {
            scope: true,
            body: true,
            footer: true,
        }
    }
}

impl FieldFlags {
    pub fn includes(&self, field: OptionalField) -> bool {
        match field {
            OptionalField::Scope => self.scope,
            OptionalField::Body => self.body,
            OptionalField::Footer => self.footer,
        }
    }
}

/// The optional fields of a structured commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalField {
    Scope,
    Body,
    Footer,
}

impl OptionalField {
    pub const ALL: [OptionalField; 3] = [
        OptionalField::Scope,
        OptionalField::Body,
        OptionalField::Footer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OptionalField::Scope => "scope",
            OptionalField::Body => "body",
            OptionalField::Footer => "footer",
        }
    }
}

/// A validated structured commit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCommitMessage {
    #[serde(rename = "type")]
    pub commit_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// Schema for one structured generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    allowed: Vec<OptionalField>,
}

/// Composes the base schema with per-field extensions.
#[derive(Debug, Default)]
pub struct ResponseSchemaBuilder {
    allowed: Vec<OptionalField>,
}

impl ResponseSchemaBuilder {
    /// Permit an optional field (string, null, or absent).
    pub fn allow(mut self, field: OptionalField) -> Self {
        if !self.allowed.contains(&field) {
            self.allowed.push(field);
        }
        self
    }

    pub fn build(mut self) -> ResponseSchema {
        // Keep wire output stable regardless of allow() call order.
        self.allowed
            .sort_by_key(|field| OptionalField::ALL.iter().position(|f| f == field));
        ResponseSchema {
            allowed: self.allowed,
        }
    }
}

impl ResponseSchema {
    pub fn builder() -> ResponseSchemaBuilder {
        ResponseSchemaBuilder::default()
    }

    pub fn for_fields(fields: FieldFlags) -> Self {
        OptionalField::ALL
            .into_iter()
            .filter(|field| fields.includes(*field))
            .fold(Self::builder(), ResponseSchemaBuilder::allow)
            .build()
    }

    pub fn allows(&self, field: OptionalField) -> bool {
        self.allowed.contains(&field)
    }

    /// JSON Schema for OpenAI-compatible `response_format`.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("type".into(), json!({ "type": "string" }));
        properties.insert("description".into(), json!({ "type": "string" }));
        for field in &self.allowed {
            properties.insert(field.name().into(), json!({ "type": ["string", "null"] }));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": ["type", "description"],
            "additionalProperties": false,
        })
    }

    /// OpenAPI-subset schema for Gemini `responseSchema`.
    pub fn to_gemini_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("type".into(), json!({ "type": "STRING" }));
        properties.insert("description".into(), json!({ "type": "STRING" }));
        for field in &self.allowed {
            properties.insert(
                field.name().into(),
                json!({ "type": "STRING", "nullable": true }),
            );
        }

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": ["type", "description"],
        })
    }

    /// Validate raw model output against this schema.
    ///
    /// Unknown keys are dropped. A disallowed optional field holding `null`
    /// is treated as absent; any other value for it is a validation error.
    pub fn validate(&self, value: &Value) -> Result<StructuredCommitMessage, AiError> {
        let object = value
            .as_object()
            .ok_or_else(|| AiError::SchemaValidation("expected a JSON object".to_string()))?;

        let commit_type = required_string(object, "type")?;
        let description = required_string(object, "description")?;

        let mut optional = [None, None, None];
        for (slot, field) in optional.iter_mut().zip(OptionalField::ALL) {
            *slot = self.optional_string(object, field)?;
        }
        let [scope, body, footer] = optional;

        Ok(StructuredCommitMessage {
            commit_type,
            description,
            scope,
            body,
            footer,
        })
    }

    fn optional_string(
        &self,
        object: &Map<String, Value>,
        field: OptionalField,
    ) -> Result<Option<String>, AiError> {
        let name = field.name();
        match object.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) if !self.allows(field) => Err(AiError::SchemaValidation(format!(
                "field '{name}' was not requested and must be omitted"
            ))),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(AiError::SchemaValidation(format!(
                "field '{name}' must be a string or null, got {}",
                json_type(other)
            ))),
        }
    }
}

fn required_string(object: &Map<String, Value>, name: &str) -> Result<String, AiError> {
    match object.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(AiError::SchemaValidation(format!(
            "field '{name}' must not be empty"
        ))),
        Some(other) => Err(AiError::SchemaValidation(format!(
            "field '{name}' must be a string, got {}",
            json_type(other)
        ))),
        None => Err(AiError::SchemaValidation(format!(
            "missing required field '{name}'"
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
