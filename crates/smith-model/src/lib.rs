// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod provider;
mod openai;
mod anthropic;
mod mock;
pub mod registry;

pub use types::*;
pub use provider::ModelProvider;
pub use openai::OpenAiProvider;
pub use anthropic::AnthropicProvider;
pub use mock::{MockProvider, MockReply, ScriptedMockProvider};

use std::time::Duration;

use anyhow::bail;
use smith_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] from configuration.
///
/// Provider selection:
/// - `"anthropic"` → [`AnthropicProvider`]
/// - `"openai"` → [`OpenAiProvider`]
/// - `"mock"` → [`MockProvider`] (echo-back)
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    let key = resolve_api_key(cfg);
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let name = model_name(cfg);
    match cfg.provider.as_str() {
        "anthropic" => Ok(Box::new(
            AnthropicProvider::new(
                name,
                key,
                cfg.base_url.clone(),
                cfg.max_tokens,
                cfg.temperature,
            )
            .with_timeout(timeout),
        )),
        "openai" => Ok(Box::new(
            OpenAiProvider::new(
                name,
                key,
                cfg.base_url.clone(),
                cfg.max_tokens,
                cfg.temperature,
            )
            .with_timeout(timeout),
        )),
        "mock" => Ok(Box::new(MockProvider)),
        other => bail!("unknown model provider: {other}"),
    }
}

/// The configured model, or the driver's default when `model.name` is blank.
fn model_name(cfg: &ModelConfig) -> String {
    let name = cfg.name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    registry::get_driver(&cfg.provider)
        .map(|d| d.default_model.to_string())
        .unwrap_or_default()
}

/// Explicit key, then the configured env var, then the driver's default env var.
fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    registry::get_driver(&cfg.provider)
        .and_then(|d| d.default_api_key_env)
        .and_then(|env| std::env::var(env).ok())
}
