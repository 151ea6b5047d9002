// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use smith_model::ToolSchema;

/// A callable (or declarative-only) tool an agent may use.
///
/// `parameters` is a property map (`name -> JSON schema fragment`); every
/// declared key is required when the tool is exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Capability adapter id (`"builtin:sha256"` or `"sha256"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl ToolDefinition {
    /// A tool with no implementation or endpoint; dispatch returns a mock result.
    pub fn declarative(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Map::new(),
            implementation: None,
            api_endpoint: None,
            documentation_url: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, schema: Value) -> Self {
        self.parameters.insert(key.into(), schema);
        self
    }

    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(implementation.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn is_executable(&self) -> bool {
        present(&self.implementation).is_some() || present(&self.api_endpoint).is_some()
    }

    /// The non-blank implementation string, if any.
    pub fn implementation(&self) -> Option<&str> {
        present(&self.implementation)
    }

    pub fn endpoint(&self) -> Option<&str> {
        present(&self.api_endpoint)
    }

    /// JSON Schema for the model's tool-calling interface.
    pub fn input_schema(&self) -> Value {
        let required: Vec<&String> = self.parameters.keys().collect();
        json!({
            "type": "object",
            "properties": self.parameters,
            "required": required,
        })
    }

    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Strip everything but ASCII letters and digits.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Accept either a bare property map or a full object schema
/// (`{type, properties, required}`) and return the property map.
pub fn normalize_parameters(v: Option<&Value>) -> Map<String, Value> {
    let Some(Value::Object(obj)) = v else {
        return Map::new();
    };
    if let Some(Value::Object(props)) = obj.get("properties") {
        return props.clone();
    }
    if obj.get("type").and_then(Value::as_str) == Some("object") {
        return Map::new();
    }
    obj.clone()
}

/// Literal `"null"` and blank strings count as absent.
pub fn optional_field(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if s.trim().is_empty() || s.trim() == "null" => None,
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_is_every_declared_key() {
        let t = ToolDefinition::declarative("weather", "forecast")
            .with_parameter("city", json!({"type": "string"}))
            .with_parameter("days", json!({"type": "integer"}));
        let schema = t.input_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&"city"));
        assert!(required.contains(&"days"));
        assert_eq!(schema["properties"]["city"]["type"], "string");
    }

    #[test]
    fn executable_requires_non_blank_field() {
        let t = ToolDefinition::declarative("x", "y");
        assert!(!t.is_executable());
        assert!(!t.clone().with_endpoint("  ").is_executable());
        assert!(t.clone().with_implementation("builtin:echo").is_executable());
        assert!(t.with_endpoint("https://api.x.com").is_executable());
    }

    #[test]
    fn sanitize_keeps_alphanumerics() {
        assert_eq!(sanitize_name("Google Sheets!"), "GoogleSheets");
        assert_eq!(sanitize_name("slack-api_v2"), "slackapiv2");
    }

    #[test]
    fn normalize_unwraps_full_schema() {
        let full = json!({"type": "object", "properties": {"q": {"type": "string"}}, "required": ["q"]});
        let m = normalize_parameters(Some(&full));
        assert_eq!(m.len(), 1);
        assert!(m.contains_key("q"));

        let bare = json!({"q": {"type": "string"}});
        assert_eq!(normalize_parameters(Some(&bare)).len(), 1);
        assert!(normalize_parameters(Some(&json!({"type": "object"}))).is_empty());
        assert!(normalize_parameters(Some(&json!("nope"))).is_empty());
        assert!(normalize_parameters(None).is_empty());
    }

    #[test]
    fn null_string_is_absent() {
        assert_eq!(optional_field(Some(&json!("null"))), None);
        assert_eq!(optional_field(Some(&json!(null))), None);
        assert_eq!(optional_field(Some(&json!("https://a"))).as_deref(), Some("https://a"));
    }

    #[test]
    fn serde_uses_camel_case() {
        let t = ToolDefinition::declarative("n", "d").with_endpoint("https://e");
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["apiEndpoint"], "https://e");
        assert!(v.get("implementation").is_none());
        let back: ToolDefinition = serde_json::from_value(json!({"name": "a", "description": "b"})).unwrap();
        assert!(back.parameters.is_empty());
    }
}
