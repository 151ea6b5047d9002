// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a single tool invocation.  Never escapes the execution loop:
/// it is rendered into the tool's result payload with [`DispatchError::to_payload`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("tool '{0}' is not registered")]
    UnknownTool(String),
    #[error("implementation '{0}' is not an enabled capability")]
    CapabilityDenied(String),
    #[error("capability failed: {0}")]
    Capability(String),
    #[error("endpoint '{0}' is not permitted by policy")]
    EndpointDenied(String),
    #[error("api call failed: {0}")]
    Http(String),
    #[error("api call timed out after {0} ms")]
    Timeout(u128),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::CapabilityDenied(_) => "capability_denied",
            Self::Capability(_) => "capability",
            Self::EndpointDenied(_) => "endpoint_denied",
            Self::Http(_) => "http",
            Self::Timeout(_) => "timeout",
        }
    }

    pub fn to_payload(&self, tool: &str) -> Value {
        json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "tool": tool,
        })
    }
}
