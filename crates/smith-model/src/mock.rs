// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CompletionRequest, CompletionResponse, ContentBlock};

/// Deterministic mock provider for tests.  Echoes the last user message
/// back as the assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::Role::User))
            .and_then(|m| m.as_text())
            .unwrap_or_else(|| "[no input]".to_string());
        Ok(CompletionResponse::text(format!("MOCK: {reply}")))
    }
}

/// One scripted reply of a [`ScriptedMockProvider`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(CompletionResponse),
    /// The call fails with this message, as a transport error would.
    Error(String),
    /// Sleep, then produce the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Response(CompletionResponse::text(text))
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::Response(CompletionResponse {
            content: vec![ContentBlock::ToolUse { id: id.into(), name: name.into(), input }],
            stop_reason: Some("tool_use".into()),
            ..Default::default()
        })
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delayed(delay, Box::new(inner))
    }
}

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// reply from the front of the queue.  This lets tests specify exact
/// completions, including tool calls, failures and slow responses, without
/// network access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<VecDeque<MockReply>>>,
    /// Reply used once the queue is empty.
    fallback: MockReply,
    /// Every `CompletionRequest` seen by this provider, in call order.
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<MockReply>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            fallback: MockReply::text("[no more scripts]"),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: provider that always returns the same text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![]).with_fallback(MockReply::text(reply))
    }

    /// Convenience: provider that returns a tool call followed by a text reply.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            MockReply::tool_use(tool_id, tool_name, input),
            MockReply::text(final_text),
        ])
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// The last `CompletionRequest` seen, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req);
        let mut reply = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        loop {
            match reply {
                MockReply::Response(r) => return Ok(r),
                MockReply::Error(msg) => anyhow::bail!(msg),
                MockReply::Delayed(d, inner) => {
                    tokio::time::sleep(d).await;
                    reply = *inner;
                }
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
