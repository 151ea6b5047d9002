// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{Capability, InvocationContext};
use crate::{DispatchError, EndpointPolicy};

/// GET `input.url` through the endpoint policy.  HTML is converted to plain
/// text, JSON is pretty-printed, and output is capped at `max_chars`.
pub struct HttpFetchCapability {
    client: reqwest::Client,
    policy: Arc<EndpointPolicy>,
    max_chars: usize,
    timeout: Duration,
}

impl HttpFetchCapability {
    pub fn new(client: reqwest::Client, policy: Arc<EndpointPolicy>, max_chars: usize) -> Self {
        Self { client, policy, max_chars, timeout: Duration::from_secs(30) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Capability for HttpFetchCapability {
    fn id(&self) -> &str {
        "http_fetch"
    }

    fn description(&self) -> &str {
        "Fetch input.url and return its content as text"
    }

    async fn invoke(&self, input: &Value, ctx: &InvocationContext) -> Result<Value, DispatchError> {
        let url = input
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::Capability("missing 'url'".into()))?;
        if !self.policy.permits(url) {
            return Err(DispatchError::EndpointDenied(url.to_string()));
        }

        debug!(url, tool = %ctx.tool, "http_fetch capability");

        let (status, content_type, body) = crate::dispatch::with_deadline(self.timeout, async {
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            let content_type = resp
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_lowercase();
            let body = resp.text().await?;
            Ok((status, content_type, body))
        })
        .await?;
        if !status.is_success() {
            return Err(DispatchError::Http(format!("status {status}")));
        }

        let content = if content_type.contains("html") {
            html2text::from_read(body.as_bytes(), 100)
        } else if content_type.contains("json") {
            match serde_json::from_str::<Value>(&body) {
                Ok(v) => serde_json::to_string_pretty(&v).unwrap_or(body),
                Err(_) => body,
            }
        } else {
            body
        };

        let total = content.chars().count();
        let truncated = total > self.max_chars;
        let content: String = if truncated {
            content.chars().take(self.max_chars).collect()
        } else {
            content
        };
        Ok(json!({
            "url": url,
            "status": status.as_u16(),
            "content": content,
            "truncated": truncated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refuses_denied_url_without_network() {
        let policy = EndpointPolicy::new(&["https://*".to_string()], &["*://localhost*".to_string()]);
        let cap = HttpFetchCapability::new(reqwest::Client::new(), Arc::new(policy), 100);
        let err = cap
            .invoke(&json!({"url": "https://localhost/secret"}), &InvocationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::EndpointDenied(_)));
    }

    #[tokio::test]
    async fn requires_url() {
        let cap = HttpFetchCapability::new(
            reqwest::Client::new(),
            Arc::new(EndpointPolicy::new(&[], &[])),
            100,
        );
        let err = cap.invoke(&json!({}), &InvocationContext::default()).await.unwrap_err();
        assert_eq!(err.kind(), "capability");
    }
}
