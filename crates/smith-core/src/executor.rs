// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smith_config::ExecutorConfig;
use smith_model::{CompletionRequest, ContentBlock, Message, ModelProvider, ToolSchema};
use smith_tools::{DispatchError, InvocationContext, ToolDefinition, ToolDispatcher, ToolRegistry};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{AgentConfig, ExecutionEvent};

const MIN_SYSTEM_PROMPT_CHARS: usize = 10;

/// Per-session state carried across turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub session_id: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Tool results keyed by tool-call id.
    #[serde(default)]
    pub tool_results: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tools_used: Vec<String>,
    /// Tools whose dispatch returned an error payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_failures: Vec<String>,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Runs agents against a model, dispatching the tool calls it makes.
pub struct ExecutionEngine {
    model: Arc<dyn ModelProvider>,
    dispatcher: Arc<ToolDispatcher>,
    registry: ToolRegistry,
    cfg: ExecutorConfig,
    events: Option<mpsc::Sender<ExecutionEvent>>,
}

impl ExecutionEngine {
    pub fn new(model: Arc<dyn ModelProvider>, dispatcher: Arc<ToolDispatcher>, cfg: ExecutorConfig) -> Self {
        Self { model, dispatcher, registry: ToolRegistry::new(), cfg, events: None }
    }

    /// Send [`ExecutionEvent`]s to `tx`.  A closed receiver is ignored.
    pub fn with_events(mut self, tx: mpsc::Sender<ExecutionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Register a tool.  A later registration under the same name wins.
    pub fn register_tool(&mut self, tool: ToolDefinition) {
        if self.registry.register(tool).is_some() {
            debug!("tool re-registered; previous definition replaced");
        }
    }

    pub fn register_tools(&mut self, tools: impl IntoIterator<Item = ToolDefinition>) {
        for t in tools {
            self.register_tool(t);
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn create_context(&self, session_id: impl Into<String>, user_id: Option<String>) -> ExecutionContext {
        ExecutionContext {
            session_id: session_id.into(),
            user_id,
            ..ExecutionContext::default()
        }
    }

    /// Structural checks against the current registry.  All problems are
    /// reported, not just the first.
    pub fn validate(&self, agent: &AgentConfig) -> ValidationReport {
        let mut errors = Vec::new();
        if agent.system_prompt.chars().count() < MIN_SYSTEM_PROMPT_CHARS {
            errors.push(format!(
                "System prompt is required and must be at least {MIN_SYSTEM_PROMPT_CHARS} characters"
            ));
        }
        for tool in &agent.tools {
            if !self.registry.contains(&tool.name) {
                errors.push(format!("Tool '{}' is not registered", tool.name));
            }
            if tool.description.trim().is_empty() {
                errors.push(format!("Tool '{}' missing description", tool.name));
            }
        }
        if agent.capabilities.is_empty() {
            errors.push("Agent must have at least one capability defined".to_string());
        }
        ValidationReport { valid: errors.is_empty(), errors }
    }

    /// Run one user turn.  Failures are reported in the result, never raised.
    pub async fn execute(&self, agent: &AgentConfig, message: &str, ctx: &mut ExecutionContext) -> ExecutionResult {
        let start = Instant::now();
        self.emit(ExecutionEvent::ExecutionStarted {
            agent_id: agent.id.clone(),
            session_id: ctx.session_id.clone(),
        })
        .await;

        let tools: Vec<ToolSchema> = agent
            .tools
            .iter()
            .filter(|t| self.registry.contains(&t.name))
            .map(ToolDefinition::to_schema)
            .collect();

        let mut messages = vec![Message::user(message)];
        let mut response = String::new();
        let mut tools_used = Vec::new();
        let mut tool_failures = Vec::new();
        let rounds = self.cfg.max_tool_rounds.max(1);

        for round in 1..=rounds {
            let req = CompletionRequest {
                system: Some(agent.system_prompt.clone()),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: Some(self.cfg.max_tokens),
            };
            let resp = match self.model.complete(req).await {
                Ok(r) => r,
                Err(e) => {
                    let error = format!("{e:#}");
                    let elapsed = elapsed_ms(start);
                    warn!(agent = %agent.id, error = %error, "execution failed");
                    self.emit(ExecutionEvent::ExecutionFailed {
                        agent_id: agent.id.clone(),
                        session_id: ctx.session_id.clone(),
                        error: error.clone(),
                        execution_time_ms: elapsed,
                    })
                    .await;
                    return ExecutionResult {
                        success: false,
                        error: Some(error),
                        tools_used,
                        tool_failures,
                        execution_time_ms: elapsed,
                        ..ExecutionResult::default()
                    };
                }
            };

            let mut results = Vec::new();
            for block in &resp.content {
                match block {
                    ContentBlock::Text { text } => response.push_str(text),
                    ContentBlock::ToolUse { id, name, input } => {
                        let (payload, is_error) = self.invoke_tool(name, input, &ctx.session_id).await;
                        tools_used.push(name.clone());
                        if is_error {
                            tool_failures.push(name.clone());
                        }
                        ctx.tool_results.insert(id.clone(), payload.clone());
                        self.emit(ExecutionEvent::ToolExecuted {
                            tool_name: name.clone(),
                            call_id: id.clone(),
                            input: input.clone(),
                            result: payload.clone(),
                            is_error,
                            session_id: ctx.session_id.clone(),
                        })
                        .await;
                        results.push(ContentBlock::ToolResult {
                            tool_use_id: id.clone(),
                            content: payload.to_string(),
                            is_error,
                        });
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            if results.is_empty() || round == rounds {
                break;
            }
            messages.push(Message::assistant(resp.content));
            messages.push(Message::tool_results(results));
        }

        let elapsed = elapsed_ms(start);
        info!(agent = %agent.id, tools = tools_used.len(), ms = elapsed, "execution complete");
        self.emit(ExecutionEvent::ExecutionCompleted {
            agent_id: agent.id.clone(),
            session_id: ctx.session_id.clone(),
            execution_time_ms: elapsed,
            tools_used: tools_used.clone(),
        })
        .await;
        ExecutionResult {
            success: true,
            response: Some(response),
            error: None,
            tools_used,
            tool_failures,
            execution_time_ms: elapsed,
        }
    }

    async fn invoke_tool(&self, name: &str, input: &Value, session_id: &str) -> (Value, bool) {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "model called an unregistered tool");
            return (DispatchError::UnknownTool(name.to_string()).to_payload(name), true);
        };
        let ctx = InvocationContext {
            tool: name.to_string(),
            session_id: session_id.to_string(),
        };
        self.dispatcher.dispatch_to_payload(tool, input, &ctx).await
    }

    async fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
