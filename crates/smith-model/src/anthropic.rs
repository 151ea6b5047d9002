// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{CompletionRequest, CompletionResponse, ContentBlock, Role, Usage};

pub struct AnthropicProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".into()),
            max_tokens: max_tokens.unwrap_or(4096),
            temperature: temperature.unwrap_or(0.2),
            timeout: Duration::from_secs(120),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": req.max_tokens.unwrap_or(self.max_tokens),
            "temperature": self.temperature,
        });
        if let Some(system) = req.system.as_deref().filter(|s| !s.is_empty()) {
            body["system"] = json!(system);
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }
        body
    }
}

#[async_trait]
impl crate::ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let key = self.api_key.as_deref().context("ANTHROPIC_API_KEY not set")?;
        let body = self.build_body(&req);

        debug!(model = %self.model, tools = req.tools.len(), "sending anthropic request");

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("Anthropic request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Anthropic error {status}: {text}");
        }

        let v: Value = resp.json().await.context("decoding Anthropic response")?;
        parse_anthropic_response(&v)
    }
}

/// Decode a Messages API response body.  Unknown block types (thinking,
/// server tool results) are skipped.
pub(crate) fn parse_anthropic_response(v: &Value) -> anyhow::Result<CompletionResponse> {
    if v["type"].as_str() == Some("error") {
        let msg = v["error"]["message"].as_str().unwrap_or("unknown error");
        bail!("Anthropic error: {msg}");
    }
    let blocks = v["content"]
        .as_array()
        .context("Anthropic response has no content array")?;

    let content = blocks
        .iter()
        .filter_map(|b| match b["type"].as_str()? {
            "text" => Some(ContentBlock::text(b["text"].as_str().unwrap_or(""))),
            "tool_use" => Some(ContentBlock::ToolUse {
                id: b["id"].as_str().unwrap_or("").to_string(),
                name: b["name"].as_str().unwrap_or("").to_string(),
                input: b.get("input").cloned().unwrap_or_else(|| json!({})),
            }),
            _ => None,
        })
        .collect();

    Ok(CompletionResponse {
        content,
        stop_reason: v["stop_reason"].as_str().map(str::to_string),
        usage: Usage {
            input_tokens: v["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: v["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        },
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, ToolSchema};

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("claude-test".into(), Some("k".into()), None, Some(100), None)
    }

    #[test]
    fn body_carries_system_and_tools() {
        let req = CompletionRequest {
            system: Some("be brief".into()),
            messages: vec![Message::user("hello")],
            tools: vec![ToolSchema {
                name: "slack".into(),
                description: "post".into(),
                input_schema: json!({"type": "object"}),
            }],
            max_tokens: None,
        };
        let body = provider().build_body(&req);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["tools"][0]["name"], "slack");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn request_max_tokens_overrides_default() {
        let req = CompletionRequest::prompt(None, "x").with_max_tokens(7);
        let body = provider().build_body(&req);
        assert_eq!(body["max_tokens"], 7);
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let v = json!({
            "type": "message",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "tu_1", "name": "weather", "input": {"city": "Oslo"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 8}
        });
        let r = parse_anthropic_response(&v).unwrap();
        assert_eq!(r.content.len(), 2);
        assert_eq!(r.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(r.usage.output_tokens, 8);
        let uses = r.tool_uses();
        assert_eq!(uses[0].1, "weather");
        assert_eq!(uses[0].2["city"], "Oslo");
    }

    #[test]
    fn error_body_is_an_error() {
        let v = json!({"type": "error", "error": {"type": "overloaded_error", "message": "busy"}});
        let err = parse_anthropic_response(&v).unwrap_err();
        assert!(err.to_string().contains("busy"));
    }
}
