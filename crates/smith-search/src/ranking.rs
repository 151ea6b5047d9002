// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Composite relevance scoring and result categorisation.

use std::cmp::Ordering;

use crate::{ResultKind, SearchHit, SearchResult};

const API_KEYWORDS: &[&str] = &["api", "sdk", "rest", "graphql", "webhook", "integration"];
const DOC_KEYWORDS: &[&str] = &["documentation", "docs", "guide", "tutorial", "reference"];

const SNIPPET_CHARS: usize = 300;

/// First 300 characters of the extracted text plus `"..."`, or empty.
pub fn snippet(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => {
            let head: String = t.chars().take(SNIPPET_CHARS).collect();
            format!("{head}...")
        }
        _ => String::new(),
    }
}

/// Keyword score of `content` against `query`: 2 per API term, 1.5 per
/// documentation term, 1 per query term present.
pub fn relevance_score(content: &str, query: &str) -> f64 {
    let content = content.to_lowercase();
    let query = query.to_lowercase();
    let mut score = 0.0;
    for kw in API_KEYWORDS {
        if content.contains(kw) {
            score += 2.0;
        }
    }
    for kw in DOC_KEYWORDS {
        if content.contains(kw) {
            score += 1.5;
        }
    }
    for term in query.split_whitespace() {
        if content.contains(term) {
            score += 1.0;
        }
    }
    score
}

pub fn categorize(url: &str, content: &str) -> ResultKind {
    let url = url.to_lowercase();
    let content = content.to_lowercase();
    if url.contains("github.com") || content.contains("library") || content.contains("package") {
        ResultKind::Library
    } else if content.contains("documentation") || content.contains("docs") || url.contains("/docs/") {
        ResultKind::Documentation
    } else if content.contains("api") || content.contains("endpoint") || content.contains("rest") {
        ResultKind::Api
    } else {
        ResultKind::Service
    }
}

/// Turn one raw hit into a scored result.  A non-zero provider score wins
/// over the keyword score.
pub fn score_hit(hit: SearchHit, query: &str) -> SearchResult {
    let snippet = snippet(hit.text.as_deref());
    let content = format!("{} {}", hit.title, snippet);
    let relevance_score = match hit.score {
        Some(s) if s != 0.0 && s.is_finite() => s,
        _ => relevance_score(&content, query),
    };
    SearchResult {
        kind: categorize(&hit.url, &content),
        title: hit.title,
        url: hit.url,
        snippet,
        text: hit.text,
        relevance_score,
    }
}

/// Score every hit and sort by descending relevance.  Ties keep provider order.
pub fn rank(hits: Vec<SearchHit>, query: &str) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = hits.into_iter().map(|h| score_hit(h, query)).collect();
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    results
}
