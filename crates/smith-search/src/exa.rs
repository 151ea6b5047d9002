// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{SearchHit, SearchProvider, SearchRequest};

/// Exa neural search (`POST /search`).
pub struct ExaProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl ExaProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("agentsmith/0.3")
            .build()?;
        Ok(Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.exa.ai".into()),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, req: &SearchRequest) -> anyhow::Result<Vec<SearchHit>> {
        let key = self.api_key.as_deref().context("EXA_API_KEY not set")?;

        let mut body = json!({
            "query": req.query,
            "num_results": req.num_results,
            "text": req.with_text,
        });
        if !req.include_domains.is_empty() {
            body["include_domains"] = json!(req.include_domains);
        }

        debug!(query = %req.query, n = req.num_results, "exa search");

        let resp = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", key)
            .json(&body)
            .send()
            .await
            .context("Exa request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Exa returned status {status}: {text}");
        }

        let v: Value = resp.json().await.context("decoding Exa response")?;
        Ok(parse_exa_results(&v))
    }
}

pub(crate) fn parse_exa_results(v: &Value) -> Vec<SearchHit> {
    let Some(results) = v.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .map(|r| SearchHit {
            title: r.get("title").and_then(Value::as_str).unwrap_or("").to_string(),
            url: r.get("url").and_then(Value::as_str).unwrap_or("").to_string(),
            text: r.get("text").and_then(Value::as_str).map(str::to_string),
            score: r.get("score").and_then(Value::as_f64),
        })
        .collect()
}
