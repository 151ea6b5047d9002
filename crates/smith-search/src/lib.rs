// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Web search: provider trait, Exa driver, offline mock, and the ranking
//! used to pick documentation for a tool.

mod exa;
mod mock;
pub mod ranking;
mod types;
mod web;

pub use exa::ExaProvider;
pub use mock::StaticSearchProvider;
pub use types::*;
pub use web::WebSearch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use smith_config::SearchConfig;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query.  Results are in provider rank order.
    async fn search(&self, req: &SearchRequest) -> anyhow::Result<Vec<SearchHit>>;
}

/// Build the search facade from configuration.
///
/// The API key is resolved here, once: explicit key, then `api_key_env`,
/// then `EXA_API_KEY`.
pub fn from_config(cfg: &SearchConfig) -> anyhow::Result<WebSearch> {
    let provider: Arc<dyn SearchProvider> = match cfg.provider.as_str() {
        "exa" => {
            let env = cfg.api_key_env.as_deref().unwrap_or("EXA_API_KEY");
            let key = cfg.api_key.clone().or_else(|| std::env::var(env).ok());
            Arc::new(ExaProvider::new(
                key,
                cfg.base_url.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )?)
        }
        "mock" => Arc::new(StaticSearchProvider::new()),
        other => bail!("unknown search provider: {other}"),
    };
    Ok(WebSearch::new(
        provider,
        cfg.tool_domains.clone(),
        cfg.best_practice_domains.clone(),
    ))
}
