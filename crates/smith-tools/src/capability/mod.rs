// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Statically compiled capability adapters.
//!
//! A tool's `implementation` names one of these adapters instead of carrying
//! code.  Only adapters enabled in `tools.capabilities` can be resolved;
//! anything else is refused, never evaluated.

mod echo;
mod http_fetch;
mod sha256;
mod template;
mod timestamp;

pub use echo::EchoCapability;
pub use http_fetch::HttpFetchCapability;
pub use sha256::Sha256Capability;
pub use template::TemplateCapability;
pub use timestamp::TimestampCapability;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use smith_config::ToolsConfig;

use crate::{DispatchError, EndpointPolicy};

/// Who is invoking a capability.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub tool: String,
    pub session_id: String,
}

#[async_trait]
pub trait Capability: Send + Sync {
    fn id(&self) -> &str;
    fn description(&self) -> &str;
    async fn invoke(&self, input: &Value, ctx: &InvocationContext) -> Result<Value, DispatchError>;
}

/// The allow-listed set of adapters a dispatcher may run.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    adapters: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every compiled-in adapter whose id appears in `cfg.capabilities`.
    pub fn from_config(cfg: &ToolsConfig, client: reqwest::Client, policy: Arc<EndpointPolicy>) -> Self {
        let compiled: Vec<Arc<dyn Capability>> = vec![
            Arc::new(EchoCapability),
            Arc::new(Sha256Capability),
            Arc::new(TemplateCapability),
            Arc::new(TimestampCapability),
            Arc::new(
                HttpFetchCapability::new(client, policy, cfg.fetch_max_chars)
                    .with_timeout(Duration::from_secs(cfg.api_timeout_secs)),
            ),
        ];
        let mut table = Self::new();
        for cap in compiled {
            if cfg.capabilities.iter().any(|c| c == cap.id()) {
                table.insert(cap);
            }
        }
        table
    }

    pub fn insert(&mut self, cap: Arc<dyn Capability>) {
        self.adapters.insert(cap.id().to_string(), cap);
    }

    /// Look up the adapter named by a tool's `implementation` string.
    pub fn resolve(&self, implementation: &str) -> Result<Arc<dyn Capability>, DispatchError> {
        let id = implementation.trim();
        let id = id.strip_prefix("builtin:").unwrap_or(id).trim();
        self.adapters
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::CapabilityDenied(implementation.trim().to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }
}
