// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::{json, Value};

use super::{Capability, InvocationContext};
use crate::DispatchError;

/// Renders `input.template`, replacing `{{key}}` with `input.key`.
/// Unknown keys are left in place.
pub struct TemplateCapability;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex is valid"))
}

pub fn render(template: &str, vars: &Value) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[async_trait]
impl Capability for TemplateCapability {
    fn id(&self) -> &str {
        "template"
    }

    fn description(&self) -> &str {
        "Render input.template with {{key}} placeholders filled from the input"
    }

    async fn invoke(&self, input: &Value, _ctx: &InvocationContext) -> Result<Value, DispatchError> {
        let template = input
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::Capability("missing 'template'".into()))?;
        Ok(json!({ "text": render(template, input) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_strings_and_json() {
        let vars = json!({"name": "Ada", "n": 3});
        assert_eq!(render("Hi {{name}}, {{ n }} new", &vars), "Hi Ada, 3 new");
    }

    #[test]
    fn unknown_keys_stay() {
        assert_eq!(render("{{missing}}!", &json!({})), "{{missing}}!");
    }

    #[tokio::test]
    async fn missing_template_is_a_capability_error() {
        let err = TemplateCapability
            .invoke(&json!({"name": "x"}), &InvocationContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "capability");
    }
}
