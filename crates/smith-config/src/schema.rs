// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub tester: TesterConfig,
}

// ─── LLM ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "anthropic" | "openai" | "mock".
    /// Run `agentsmith list-providers` for the full list.
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Environment variable that holds the API key.  When unset the driver
    /// registry's default variable is used (e.g. `ANTHROPIC_API_KEY`).
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    pub api_key: Option<String>,
    /// Base URL override for proxies and compatible gateways.
    pub base_url: Option<String>,
    /// Default maximum output tokens for a single completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    pub temperature: Option<f32>,
    /// Request timeout for one completion call, in seconds
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            name: "claude-3-5-sonnet-20241022".into(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

// ─── Web search ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search backend: "exa" | "mock"
    pub provider: String,
    /// Environment variable holding the search API key (default `EXA_API_KEY`)
    pub api_key_env: Option<String>,
    /// Explicit search API key
    pub api_key: Option<String>,
    /// Base URL override for the search endpoint
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Domains searched when looking up tool documentation
    pub tool_domains: Vec<String>,
    /// Domains searched when researching implementation best practices
    pub best_practice_domains: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "exa".into(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            timeout_secs: 20,
            tool_domains: [
                "github.com",
                "docs.anthropic.com",
                "openai.com",
                "api.slack.com",
                "developers.google.com",
                "docs.microsoft.com",
                "developer.twitter.com",
                "api.stripe.com",
                "docs.aws.amazon.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            best_practice_domains: [
                "stackoverflow.com",
                "dev.to",
                "medium.com",
                "github.com",
                "docs.python.org",
                "nodejs.org",
                "reactjs.org",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

// ─── Tool dispatch ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Timeout in seconds for a single outbound tool API call
    pub api_timeout_secs: u64,
    /// Endpoints matching these glob patterns may be called
    pub endpoint_allow_patterns: Vec<String>,
    /// Endpoints matching these glob patterns are always refused (wins over allow)
    pub endpoint_deny_patterns: Vec<String>,
    /// Permit loopback, private and link-local addresses.  Off by default.
    pub allow_private_addresses: bool,
    /// Capability adapters that tool implementations may name.
    /// Adapters not listed here are refused even if compiled in.
    pub capabilities: Vec<String>,
    /// Maximum characters returned by the `http_fetch` capability
    pub fetch_max_chars: usize,
    /// User-Agent sent on outbound tool calls
    pub user_agent: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: 30,
            endpoint_allow_patterns: vec!["https://*".into()],
            endpoint_deny_patterns: vec![
                "*://localhost*".into(),
                "*://127.*".into(),
                "*://0.0.0.0*".into(),
                "*://169.254.*".into(),
                "*://[::1]*".into(),
            ],
            allow_private_addresses: false,
            capabilities: ["echo", "sha256", "template", "http_fetch", "timestamp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fetch_max_chars: 20_000,
            user_agent: "agentsmith/0.3".into(),
        }
    }
}

// ─── Pipeline stages ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Number of search results requested per tool name
    pub search_results: usize,
    /// Number of search results requested when looking for alternatives
    pub alternative_search_results: usize,
    /// Characters of documentation text passed to the LLM
    pub documentation_chars: usize,
    /// Maximum number of alternative tool names returned
    pub max_alternatives: usize,
    /// Maximum number of tool names resolved concurrently
    pub concurrency: usize,
    /// When the LLM's tool schema cannot be parsed, emit a declarative
    /// definition built from the search hit instead of dropping the tool.
    pub fallback_on_parse_error: bool,
    /// Output token budget for one schema synthesis call
    pub max_tokens: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_results: 5,
            alternative_search_results: 10,
            documentation_chars: 3000,
            max_alternatives: 5,
            concurrency: 4,
            fallback_on_parse_error: true,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Best-practice results concatenated into the planning prompt
    pub context_results: usize,
    /// Best-practice results concatenated into the step enhancement prompt
    pub enhance_context_results: usize,
    /// Output token budget for plan synthesis
    pub max_tokens: u32,
    /// Output token budget for step enhancement
    pub enhance_max_tokens: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            context_results: 3,
            enhance_context_results: 2,
            max_tokens: 3000,
            enhance_max_tokens: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Model round-trips per `execute` call.  1 dispatches the tools of a
    /// single completion; higher values feed tool results back to the model.
    pub max_tool_rounds: u32,
    /// Output token budget for one execution completion
    pub max_tokens: u32,
    /// Capacity of the execution event channel
    pub event_buffer: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 1,
            max_tokens: 4000,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    pub capability_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub edge_case_timeout_secs: u64,
    /// Mean latency above which a performance recommendation is emitted
    pub slow_threshold_ms: u64,
    pub benchmark_iterations: u32,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: 30,
            tool_timeout_secs: 45,
            edge_case_timeout_secs: 15,
            slow_threshold_ms: 10_000,
            benchmark_iterations: 5,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
