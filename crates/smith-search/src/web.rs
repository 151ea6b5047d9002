// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use tracing::debug;

use crate::{ranking, SearchProvider, SearchRequest, SearchResult};

/// Domain-aware search facade used by the pipeline stages.
#[derive(Clone)]
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    tool_domains: Vec<String>,
    best_practice_domains: Vec<String>,
}

impl WebSearch {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        tool_domains: Vec<String>,
        best_practice_domains: Vec<String>,
    ) -> Self {
        Self { provider, tool_domains, best_practice_domains }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Search the documentation allow-list for `query` and rank the hits.
    ///
    /// The provider query is expanded with API/SDK terms; ranking uses the
    /// caller's query as given.
    pub async fn search_tools(&self, query: &str, count: usize) -> anyhow::Result<Vec<SearchResult>> {
        let req = SearchRequest {
            query: format!("{query} API documentation SDK integration"),
            num_results: count,
            include_domains: self.tool_domains.clone(),
            with_text: true,
        };
        let hits = self.provider.search(&req).await?;
        debug!(query, hits = hits.len(), "tool search");
        Ok(ranking::rank(hits, query))
    }

    /// Implementation guidance for `topic` in the context of `use_case`,
    /// in provider order.
    pub async fn search_best_practices(
        &self,
        topic: &str,
        use_case: &str,
        count: usize,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let query = format!("{topic} best practices {use_case} tutorial guide");
        let req = SearchRequest {
            query: query.clone(),
            num_results: count,
            include_domains: self.best_practice_domains.clone(),
            with_text: true,
        };
        let hits = self.provider.search(&req).await?;
        debug!(topic, hits = hits.len(), "best-practice search");
        Ok(hits.into_iter().map(|h| ranking::score_hit(h, &query)).collect())
    }
}
