// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{SearchHit, SearchProvider, SearchRequest};

enum Rule {
    Hits(Vec<SearchHit>),
    Fail(String),
}

/// Offline search provider with canned hits keyed by query substring.
///
/// Rules are matched in insertion order, case-insensitively; the first rule
/// whose needle occurs in the query wins.  Unmatched queries return no hits.
#[derive(Default)]
pub struct StaticSearchProvider {
    rules: Vec<(String, Rule)>,
    /// Every request seen, in call order.
    pub requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl StaticSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.rules.push((needle.into().to_lowercase(), Rule::Hits(hits)));
        self
    }

    /// Queries containing `needle` fail with `message`.
    pub fn failing_on(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into().to_lowercase(), Rule::Fail(message.into())));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.query.clone())
            .collect()
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, req: &SearchRequest) -> anyhow::Result<Vec<SearchHit>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());
        let query = req.query.to_lowercase();
        match self.rules.iter().find(|(needle, _)| query.contains(needle.as_str())) {
            Some((_, Rule::Hits(hits))) => Ok(hits.iter().take(req.num_results).cloned().collect()),
            Some((_, Rule::Fail(msg))) => anyhow::bail!("{msg}"),
            None => Ok(Vec::new()),
        }
    }
}
