// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde_json::{json, Value};
use smith_config::ToolsConfig;
use tracing::{debug, warn};

use crate::{http_client, CapabilityTable, DispatchError, EndpointPolicy, InvocationContext, ToolDefinition};

/// Runs one tool invocation.
///
/// Policy, tried in order:
/// 1. `implementation` → the named capability adapter
/// 2. `apiEndpoint` → `POST` of the input as JSON, bounded by the API timeout
/// 3. otherwise → a labelled mock result
pub struct ToolDispatcher {
    capabilities: CapabilityTable,
    policy: Arc<EndpointPolicy>,
    client: reqwest::Client,
    api_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(
        capabilities: CapabilityTable,
        policy: Arc<EndpointPolicy>,
        client: reqwest::Client,
        api_timeout: Duration,
    ) -> Self {
        Self { capabilities, policy, client, api_timeout }
    }

    pub fn from_config(cfg: &ToolsConfig) -> anyhow::Result<Self> {
        let policy = Arc::new(EndpointPolicy::from_config(cfg));
        let client = http_client(policy.clone(), &cfg.user_agent).context("building tool HTTP client")?;
        let capabilities = CapabilityTable::from_config(cfg, client.clone(), policy.clone());
        Ok(Self::new(
            capabilities,
            policy,
            client,
            Duration::from_secs(cfg.api_timeout_secs),
        ))
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub async fn dispatch(
        &self,
        tool: &ToolDefinition,
        input: &Value,
        ctx: &InvocationContext,
    ) -> Result<Value, DispatchError> {
        if let Some(implementation) = tool.implementation() {
            let cap = self.capabilities.resolve(implementation)?;
            debug!(tool = %tool.name, capability = cap.id(), "dispatching to capability");
            return cap.invoke(input, ctx).await;
        }
        if let Some(endpoint) = tool.endpoint() {
            return self.call_endpoint(endpoint, input).await;
        }
        Ok(mock_result(&tool.name, input))
    }

    /// Like [`dispatch`](Self::dispatch), but failures become the structured
    /// error payload.  The flag is `true` when the payload is an error.
    pub async fn dispatch_to_payload(
        &self,
        tool: &ToolDefinition,
        input: &Value,
        ctx: &InvocationContext,
    ) -> (Value, bool) {
        match self.dispatch(tool, input, ctx).await {
            Ok(v) => (v, false),
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "tool dispatch failed");
                (e.to_payload(&tool.name), true)
            }
        }
    }

    async fn call_endpoint(&self, endpoint: &str, input: &Value) -> Result<Value, DispatchError> {
        if !self.policy.permits(endpoint) {
            return Err(DispatchError::EndpointDenied(endpoint.to_string()));
        }
        debug!(endpoint, "calling tool api");
        let (status, body) = with_deadline(self.api_timeout, async {
            let resp = self.client.post(endpoint).json(input).send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok((status, body))
        })
        .await?;
        if !status.is_success() {
            return Err(DispatchError::Http(format!("status {status}: {body}")));
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

/// The result reported for tools that have neither implementation nor endpoint.
pub fn mock_result(tool: &str, input: &Value) -> Value {
    json!({
        "tool": tool,
        "input": input,
        "result": format!("Mock result for {tool}"),
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Await an HTTP exchange, mapping elapsed deadlines to [`DispatchError::Timeout`]
/// and redirects refused by the policy to [`DispatchError::EndpointDenied`].
pub(crate) async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, DispatchError>
where
    F: Future<Output = Result<T, reqwest::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) if e.is_redirect() => {
            let target = std::error::Error::source(&e).map(ToString::to_string).unwrap_or_default();
            Err(DispatchError::EndpointDenied(target))
        }
        Ok(Err(e)) => Err(DispatchError::Http(e.to_string())),
        Err(_) => Err(DispatchError::Timeout(timeout.as_millis())),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn loopback_dispatcher(timeout: Duration) -> ToolDispatcher {
        let cfg = ToolsConfig::default();
        let policy = Arc::new(
            EndpointPolicy::new(&["http://127.0.0.1:*".to_string()], &["*://localhost*".to_string()])
                .with_private_addresses(true),
        );
        let client = http_client(policy.clone(), &cfg.user_agent).unwrap();
        let caps = CapabilityTable::from_config(&cfg, client.clone(), policy.clone());
        ToolDispatcher::new(caps, policy, client, timeout)
    }

    /// Accept one connection and answer with a 307 to `location`.
    async fn redirect_once(location: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 307 Temporary Redirect\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            let _ = stream.write_all(resp.as_bytes()).await;
        });
        port
    }

    /// Accept one connection, read the request, reply with `body` (or never
    /// reply when `body` is `None`).
    async fn serve_once(body: Option<&'static str>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = stream.read(&mut buf).await;
            match body {
                Some(b) => {
                    let resp = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        b.len(),
                        b
                    );
                    let _ = stream.write_all(resp.as_bytes()).await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        port
    }

    #[tokio::test]
    async fn declarative_tool_gets_mock_result() {
        let d = ToolDispatcher::from_config(&ToolsConfig::default()).unwrap();
        let tool = ToolDefinition::declarative("crm", "customer records");
        let out = d
            .dispatch(&tool, &json!({"id": 7}), &InvocationContext::default())
            .await
            .unwrap();
        assert_eq!(out["result"], "Mock result for crm");
        assert_eq!(out["input"]["id"], 7);
        assert_eq!(out["tool"], "crm");
    }

    #[tokio::test]
    async fn implementation_wins_over_endpoint() {
        let d = ToolDispatcher::from_config(&ToolsConfig::default()).unwrap();
        let tool = ToolDefinition::declarative("hash", "h")
            .with_implementation("builtin:sha256")
            .with_endpoint("https://never.called.example");
        let out = d
            .dispatch(&tool, &json!({"text": "abc"}), &InvocationContext::default())
            .await
            .unwrap();
        assert!(out["sha256"].as_str().unwrap().starts_with("ba7816bf"));
    }

    #[tokio::test]
    async fn unknown_implementation_is_a_payload_not_a_panic() {
        let d = ToolDispatcher::from_config(&ToolsConfig::default()).unwrap();
        let tool = ToolDefinition::declarative("evil", "e").with_implementation("process.exit(1)");
        let (payload, is_error) = d
            .dispatch_to_payload(&tool, &json!({}), &InvocationContext::default())
            .await;
        assert!(is_error);
        assert_eq!(payload["kind"], "capability_denied");
        assert_eq!(payload["tool"], "evil");
    }

    #[tokio::test]
    async fn denied_endpoint_is_refused_before_any_request() {
        let d = ToolDispatcher::from_config(&ToolsConfig::default()).unwrap();
        let tool = ToolDefinition::declarative("meta", "m")
            .with_endpoint("http://169.254.169.254/latest/meta-data");
        let err = d
            .dispatch(&tool, &json!({}), &InvocationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::EndpointDenied(_)));
    }

    #[tokio::test]
    async fn endpoint_json_is_returned_raw() {
        let port = serve_once(Some(r#"{"ok":true,"items":[1,2]}"#)).await;
        let d = loopback_dispatcher(Duration::from_secs(5));
        let tool = ToolDefinition::declarative("api", "a")
            .with_endpoint(format!("http://127.0.0.1:{port}/run"));
        let out = d
            .dispatch(&tool, &json!({"q": 1}), &InvocationContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true, "items": [1, 2]}));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let port = serve_once(None).await;
        let d = loopback_dispatcher(Duration::from_millis(200));
        let tool = ToolDefinition::declarative("slow", "s")
            .with_endpoint(format!("http://127.0.0.1:{port}/"));
        let err = d
            .dispatch(&tool, &json!({}), &InvocationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(200)));
    }

    #[tokio::test]
    async fn redirect_to_permitted_host_is_followed() {
        let target = serve_once(Some(r#"{"moved":true}"#)).await;
        let hop = redirect_once(format!("http://127.0.0.1:{target}/new")).await;
        let d = loopback_dispatcher(Duration::from_secs(5));
        let tool = ToolDefinition::declarative("api", "a").with_endpoint(format!("http://127.0.0.1:{hop}/old"));
        let out = d
            .dispatch(&tool, &json!({}), &InvocationContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"moved": true}));
    }

    #[tokio::test]
    async fn redirect_to_denied_host_is_refused() {
        let secret = serve_once(Some(r#"{"secret":"internal-data"}"#)).await;
        let hop = redirect_once(format!("http://localhost:{secret}/secret")).await;
        let d = loopback_dispatcher(Duration::from_secs(5));
        let tool = ToolDefinition::declarative("api", "a").with_endpoint(format!("http://127.0.0.1:{hop}/"));
        let err = d
            .dispatch(&tool, &json!({}), &InvocationContext::default())
            .await
            .unwrap_err();
        match err {
            DispatchError::EndpointDenied(target) => assert!(target.contains("localhost"), "{target}"),
            other => panic!("expected EndpointDenied, got {other:?}"),
        }
    }
}
