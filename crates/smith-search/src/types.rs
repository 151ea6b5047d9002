// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// A query sent to a [`crate::SearchProvider`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub num_results: usize,
    /// Restrict results to these domains; empty means unrestricted
    pub include_domains: Vec<String>,
    /// Ask the provider to return the full extracted page text
    pub with_text: bool,
}

/// One raw hit as returned by a provider, before ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Full extracted page text, when requested and available
    pub text: Option<String>,
    /// Provider-native relevance score
    pub score: Option<f64>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into(), ..Default::default() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Api,
    Library,
    Service,
    Documentation,
}

/// A ranked, categorised result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub relevance_score: f64,
    #[serde(rename = "type")]
    pub kind: ResultKind,
}

impl SearchResult {
    /// Full text when present and non-empty, else the snippet.
    pub fn best_text(&self) -> &str {
        match self.text.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.snippet,
        }
    }
}
