// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smith_model::{CompletionRequest, ModelProvider};
use tracing::{debug, warn};

use crate::extract::extract_json;
use crate::{prompts, PipelineError, ResponseParseError};

const PARSE_MAX_TOKENS: u32 = 1000;
const SYSTEM_PROMPT_MAX_TOKENS: u32 = 1500;
const DEFAULT_DESCRIPTION: &str = "AI Agent";

/// Structured reading of a free-form agent request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDescription {
    pub description: String,
    pub requirements: Vec<String>,
    pub constraints: Vec<String>,
    /// Tools the user named.  Only names that occur in the source text.
    pub mentioned_tools: Vec<String>,
    /// General abilities; never a vendor tool name.
    pub implied_capabilities: Vec<String>,
}

impl AgentDescription {
    /// Build from the model's JSON, checking the fields against `source`.
    ///
    /// Missing fields take defaults.  A mentioned tool that does not occur in
    /// the source text is dropped, as is an implied capability that names a
    /// tool the model reported.
    pub fn from_model_output(obj: &Map<String, Value>, source: &str) -> Self {
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        let reported_tools = string_list(obj.get("mentionedTools"));
        let haystack = source.to_lowercase();
        let mut mentioned_tools: Vec<String> = Vec::new();
        for tool in &reported_tools {
            if !haystack.contains(&tool.to_lowercase()) {
                warn!(tool = %tool, "dropping tool not named in the description");
                continue;
            }
            if !mentioned_tools.iter().any(|t| t.eq_ignore_ascii_case(tool)) {
                mentioned_tools.push(tool.clone());
            }
        }

        let implied_capabilities = string_list(obj.get("impliedCapabilities"))
            .into_iter()
            .filter(|cap| {
                let lower = cap.to_lowercase();
                let names_tool = reported_tools.iter().any(|t| lower.contains(&t.to_lowercase()));
                if names_tool {
                    debug!(capability = %cap, "dropping capability that names a tool");
                }
                !names_tool
            })
            .collect();

        Self {
            description,
            requirements: string_list(obj.get("requirements")),
            constraints: string_list(obj.get("constraints")),
            mentioned_tools,
            implied_capabilities,
        }
    }
}

/// Trimmed, non-empty strings from a JSON array; anything else is ignored.
fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Turns free text into an [`AgentDescription`] and writes system prompts.
pub struct DescriptionParser {
    model: Arc<dyn ModelProvider>,
}

impl DescriptionParser {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }

    pub async fn parse(&self, text: &str) -> Result<AgentDescription, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::DescriptionParse(ResponseParseError::new(
                "description is empty",
                text,
            )));
        }
        let req = CompletionRequest::prompt(None, prompts::description_prompt(text))
            .with_max_tokens(PARSE_MAX_TOKENS);
        let resp = self
            .model
            .complete(req)
            .await
            .map_err(|e| PipelineError::external("llm", &e))?;
        let raw = resp.joined_text();
        let obj = extract_json(&raw).map_err(PipelineError::DescriptionParse)?;
        let parsed = AgentDescription::from_model_output(&obj, text);
        debug!(
            tools = parsed.mentioned_tools.len(),
            requirements = parsed.requirements.len(),
            "parsed agent description"
        );
        Ok(parsed)
    }

    /// Natural-language system prompt for an agent matching `desc`.
    pub async fn synthesize_system_prompt(&self, desc: &AgentDescription) -> Result<String, PipelineError> {
        let req = CompletionRequest::prompt(None, prompts::system_prompt_prompt(desc))
            .with_max_tokens(SYSTEM_PROMPT_MAX_TOKENS);
        let resp = self
            .model
            .complete(req)
            .await
            .map_err(|e| PipelineError::external("llm", &e))?;
        Ok(resp.joined_text().trim().to_string())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;
    use smith_model::{MockReply, ScriptedMockProvider};

    use super::*;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn missing_fields_take_defaults() {
        let d = AgentDescription::from_model_output(&obj(json!({})), "anything");
        assert_eq!(d.description, "AI Agent");
        assert!(d.requirements.is_empty());
        assert!(d.mentioned_tools.is_empty());
    }

    #[test]
    fn tools_not_in_source_are_dropped() {
        let d = AgentDescription::from_model_output(
            &obj(json!({"mentionedTools": ["Zendesk", "Pinecone", "zendesk"]})),
            "Pull tickets from zendesk every morning",
        );
        assert_eq!(d.mentioned_tools, vec!["Zendesk"]);
    }

    #[test]
    fn capabilities_naming_tools_are_dropped() {
        let d = AgentDescription::from_model_output(
            &obj(json!({
                "mentionedTools": ["Slack"],
                "impliedCapabilities": ["post to Slack", "summarisation", ""]
            })),
            "Summarise threads and post to Slack",
        );
        assert_eq!(d.implied_capabilities, vec!["summarisation"]);
    }

    #[test]
    fn non_string_items_are_ignored() {
        let d = AgentDescription::from_model_output(
            &obj(json!({"requirements": ["a", 3, null, " b "]})),
            "",
        );
        assert_eq!(d.requirements, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn parse_reads_fenced_json() {
        let reply = "```json\n{\"description\": \"Ticket helper\", \"mentionedTools\": [\"Zendesk\"]}\n```";
        let p = DescriptionParser::new(Arc::new(ScriptedMockProvider::always_text(reply)));
        let d = p.parse("Help with Zendesk tickets").await.unwrap();
        assert_eq!(d.description, "Ticket helper");
        assert_eq!(d.mentioned_tools, vec!["Zendesk"]);
    }

    #[tokio::test]
    async fn parse_failure_is_a_request_error() {
        let p = DescriptionParser::new(Arc::new(ScriptedMockProvider::always_text("Sorry, no idea.")));
        let err = p.parse("do things").await.unwrap_err();
        assert!(matches!(err, PipelineError::DescriptionParse(_)));
    }

    #[tokio::test]
    async fn model_outage_is_a_dependency_error() {
        let model = ScriptedMockProvider::new(vec![MockReply::error("503 overloaded")]);
        let p = DescriptionParser::new(Arc::new(model));
        let err = p.parse("do things").await.unwrap_err();
        assert!(err.is_dependency_failure());
    }

    #[tokio::test]
    async fn empty_text_never_reaches_the_model() {
        let model = Arc::new(ScriptedMockProvider::new(vec![]));
        let p = DescriptionParser::new(model.clone());
        assert!(p.parse("   ").await.is_err());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn system_prompt_is_trimmed() {
        let p = DescriptionParser::new(Arc::new(ScriptedMockProvider::always_text(
            "\n  You are a helpful support agent.  \n",
        )));
        let prompt = p.synthesize_system_prompt(&AgentDescription::default()).await.unwrap();
        assert_eq!(prompt, "You are a helpful support agent.");
    }
}
