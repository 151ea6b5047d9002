// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Wire-format tests: spin up a one-shot HTTP/1.1 server on loopback, point a
//! driver at it, and assert both the request the driver sent and the
//! `CompletionResponse` it decoded.  No API keys or external network needed.

use std::collections::HashMap;

use serde_json::{json, Value};
use smith_config::ModelConfig;
use smith_model::{from_config, CompletionRequest, ToolSchema};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

// ── One-shot HTTP server ──────────────────────────────────────────────────────

#[derive(Debug)]
struct CapturedRequest {
    path: String,
    headers: HashMap<String, String>,
    body: Value,
}

async fn serve_once(
    status: u16,
    resp_body: Value,
) -> (u16, tokio::sync::oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await.unwrap();
        let path = request_line.split(' ').nth(1).unwrap_or("").to_string();

        let mut headers = HashMap::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((k, v)) = trimmed.split_once(": ") {
                let key = k.to_lowercase();
                if key == "content-length" {
                    content_length = v.parse().unwrap_or(0);
                }
                headers.insert(key, v.to_string());
            }
        }

        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).await.unwrap();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        let _ = tx.send(CapturedRequest { path, headers, body });

        let payload = resp_body.to_string();
        let http_resp = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            payload.len(),
            payload,
        );
        let _ = write_half.write_all(http_resp.as_bytes()).await;
    });

    (port, rx)
}

fn config(provider: &str, port: u16, base_path: &str) -> ModelConfig {
    ModelConfig {
        provider: provider.into(),
        name: "test-model".into(),
        api_key: Some("test-key".into()),
        base_url: Some(format!("http://127.0.0.1:{port}{base_path}")),
        max_tokens: Some(64),
        ..ModelConfig::default()
    }
}

// ── Anthropic ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anthropic_sends_messages_request_and_decodes_blocks() {
    let (port, rx) = serve_once(
        200,
        json!({
            "type": "message",
            "content": [
                {"type": "text", "text": "checking"},
                {"type": "tool_use", "id": "tu_1", "name": "weather", "input": {"city": "Oslo"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 2}
        }),
    )
    .await;

    let provider = from_config(&config("anthropic", port, "")).unwrap();
    let mut req = CompletionRequest::prompt(Some("be brief".into()), "weather in Oslo?");
    req.tools.push(ToolSchema {
        name: "weather".into(),
        description: "current weather".into(),
        input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    });
    let resp = provider.complete(req).await.unwrap();

    let captured = rx.await.unwrap();
    assert_eq!(captured.path, "/v1/messages");
    assert_eq!(captured.headers.get("x-api-key").map(String::as_str), Some("test-key"));
    assert_eq!(captured.body["system"], "be brief");
    assert_eq!(captured.body["max_tokens"], 64);
    assert_eq!(captured.body["tools"][0]["input_schema"]["type"], "object");

    assert_eq!(resp.joined_text(), "checking");
    assert_eq!(resp.tool_uses()[0].1, "weather");
}

#[tokio::test]
async fn anthropic_non_success_status_is_an_error() {
    let (port, _rx) = serve_once(529, json!({"type": "error", "error": {"message": "overloaded"}})).await;
    let provider = from_config(&config("anthropic", port, "")).unwrap();
    let err = provider
        .complete(CompletionRequest::prompt(None, "hi"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("529"));
}

// ── OpenAI ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_sends_bearer_auth_and_decodes_text() {
    let (port, rx) = serve_once(
        200,
        json!({
            "choices": [{"message": {"content": "hello there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 2}
        }),
    )
    .await;

    let provider = from_config(&config("openai", port, "/v1")).unwrap();
    let resp = provider
        .complete(CompletionRequest::prompt(Some("sys".into()), "hi"))
        .await
        .unwrap();

    let captured = rx.await.unwrap();
    assert_eq!(captured.path, "/v1/chat/completions");
    assert_eq!(
        captured.headers.get("authorization").map(String::as_str),
        Some("Bearer test-key")
    );
    assert_eq!(captured.body["messages"][0]["role"], "system");
    assert_eq!(captured.body["max_completion_tokens"], 64);

    assert_eq!(resp.joined_text(), "hello there");
    assert_eq!(resp.stop_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let cfg = ModelConfig {
        provider: "anthropic".into(),
        api_key: None,
        api_key_env: Some("AGENTSMITH_TEST_DEFINITELY_UNSET_42".into()),
        ..ModelConfig::default()
    };
    let provider = from_config(&cfg).unwrap();
    let err = provider
        .complete(CompletionRequest::prompt(None, "hi"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
}
