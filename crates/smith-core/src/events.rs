// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::Serialize;
use serde_json::Value;

/// Events emitted by the execution engine while running an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A turn began
    ExecutionStarted { agent_id: String, session_id: String },

    /// A tool call finished, successfully or not
    ToolExecuted {
        tool_name: String,
        call_id: String,
        input: Value,
        result: Value,
        is_error: bool,
        session_id: String,
    },

    ExecutionCompleted {
        agent_id: String,
        session_id: String,
        execution_time_ms: u64,
        tools_used: Vec<String>,
    },

    /// The turn failed; no further events follow for it
    ExecutionFailed {
        agent_id: String,
        session_id: String,
        error: String,
        execution_time_ms: u64,
    },
}
