// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smith_tools::ToolDefinition;
use uuid::Uuid;

use crate::AgentDescription;

/// A synthesised agent: prompt, tools and declared capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentConfig {
    /// Assemble an agent from a parsed description.  Capabilities are the
    /// requirements, or the implied capabilities when there are none.
    pub fn from_description(
        id: impl Into<String>,
        desc: &AgentDescription,
        system_prompt: String,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        let capabilities = if desc.requirements.is_empty() {
            desc.implied_capabilities.clone()
        } else {
            desc.requirements.clone()
        };
        let now = Utc::now();
        Self {
            id: id.into(),
            name: agent_name(&desc.description),
            description: desc.description.clone(),
            system_prompt,
            tools,
            capabilities,
            constraints: desc.constraints.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Display name from the first three words, e.g. "Customer Support Agent".
pub fn agent_name(description: &str) -> String {
    let words: Vec<String> = description
        .split_whitespace()
        .take(3)
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Agent".to_string()
    } else {
        format!("{} Agent", words.join(" "))
    }
}
