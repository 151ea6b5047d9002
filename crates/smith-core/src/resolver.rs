// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Tool resolution: search for a named tool's documentation and have the
//! model turn it into a [`ToolDefinition`].

use std::sync::{Arc, OnceLock};

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde_json::{Map, Value};
use smith_config::ResolverConfig;
use smith_model::{CompletionRequest, ModelProvider};
use smith_search::{SearchResult, WebSearch};
use smith_tools::{normalize_parameters, optional_field, sanitize_name, ToolDefinition};
use tracing::{debug, info, warn};

use crate::extract::extract_json;
use crate::{prompts, PipelineError, ToolResolutionError};

pub struct ToolResolver {
    model: Arc<dyn ModelProvider>,
    search: WebSearch,
    cfg: ResolverConfig,
}

impl ToolResolver {
    pub fn new(model: Arc<dyn ModelProvider>, search: WebSearch, cfg: ResolverConfig) -> Self {
        Self { model, search, cfg }
    }

    /// Resolve every name, at most `concurrency` at a time.
    ///
    /// Output keeps input order.  Names without search results or whose
    /// resolution fails are left out; only an empty input is an error.
    pub async fn resolve_tools(
        &self,
        names: &[String],
        use_case: &str,
    ) -> Result<Vec<ToolDefinition>, PipelineError> {
        if names.is_empty() {
            return Err(PipelineError::EmptyToolList);
        }
        let outcomes: Vec<_> = stream::iter(names)
            .map(|name| self.resolve_tool(name, use_case))
            .buffered(self.cfg.concurrency.max(1))
            .collect()
            .await;

        let mut tools = Vec::with_capacity(names.len());
        for (name, outcome) in names.iter().zip(outcomes) {
            match outcome {
                Ok(Some(tool)) => tools.push(tool),
                Ok(None) => info!(tool = %name, "no documentation found; tool omitted"),
                Err(e) => warn!(error = %e, "tool omitted"),
            }
        }
        debug!(requested = names.len(), resolved = tools.len(), "tool resolution done");
        Ok(tools)
    }

    /// Resolve one name.  `Ok(None)` when the search finds nothing.
    pub async fn resolve_tool(
        &self,
        name: &str,
        use_case: &str,
    ) -> Result<Option<ToolDefinition>, ToolResolutionError> {
        let fail = |reason: String| ToolResolutionError { tool: name.to_string(), reason };

        let results = self
            .search
            .search_tools(name, self.cfg.search_results)
            .await
            .map_err(|e| fail(format!("search failed: {e:#}")))?;
        let Some(best) = results.first() else {
            return Ok(None);
        };

        let documentation = documentation_excerpt(name, best, self.cfg.documentation_chars);
        let prompt = prompts::tool_definition_prompt(name, use_case, &best.url, &documentation);
        let resp = self
            .model
            .complete(CompletionRequest::prompt(None, prompt).with_max_tokens(self.cfg.max_tokens))
            .await
            .map_err(|e| fail(format!("model call failed: {e:#}")))?;

        match extract_json(&resp.joined_text()) {
            Ok(obj) => Ok(Some(definition_from_model(&obj, name, &best.url))),
            Err(e) if self.cfg.fallback_on_parse_error => {
                warn!(tool = %name, error = %e, "unusable tool definition; using declarative fallback");
                Ok(Some(fallback_definition(name, use_case, &best.url)))
            }
            Err(e) => Err(fail(e.reason)),
        }
    }

    /// Names of tools that could stand in for `original`.
    pub async fn find_alternatives(&self, original: &str, use_case: &str) -> Result<Vec<String>, PipelineError> {
        let query = format!("alternative to {original} {use_case}");
        let results = self
            .search
            .search_tools(query.trim(), self.cfg.alternative_search_results)
            .await
            .map_err(|e| PipelineError::external("search", &e))?;

        let original = original.to_lowercase();
        let mut names: Vec<String> = Vec::new();
        for r in results
            .iter()
            .filter(|r| !r.title.to_lowercase().contains(&original))
            .take(self.cfg.max_alternatives)
        {
            let name = extract_tool_name(&r.title, &r.snippet);
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

fn documentation_excerpt(name: &str, best: &SearchResult, max_chars: usize) -> String {
    let text = best.best_text();
    if text.is_empty() {
        format!("{name} tool documentation")
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn definition_from_model(obj: &Map<String, Value>, requested: &str, source_url: &str) -> ToolDefinition {
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name(requested));
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{requested} integration"));
    ToolDefinition {
        name,
        description,
        parameters: normalize_parameters(obj.get("parameters")),
        implementation: optional_field(obj.get("implementation")),
        api_endpoint: optional_field(obj.get("apiEndpoint")),
        documentation_url: Some(source_url.to_string()),
    }
}

fn fallback_definition(requested: &str, use_case: &str, source_url: &str) -> ToolDefinition {
    let mut tool = ToolDefinition::declarative(
        fallback_name(requested),
        format!("{requested} integration for {use_case}"),
    );
    tool.documentation_url = Some(source_url.to_string());
    tool
}

fn fallback_name(requested: &str) -> String {
    let name = sanitize_name(requested);
    if name.is_empty() {
        "tool".to_string()
    } else {
        name
    }
}

fn product_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(\w+)\s+api", r"(\w+)\s+sdk", r"(\w+)\s+service", r"(\w+)\s+library"]
            .iter()
            .map(|p| Regex::new(p).expect("product pattern is valid"))
            .collect()
    })
}

/// Guess a product name from a search hit: the word before "api", "sdk",
/// "service" or "library", title before snippet for each pattern.  Empty
/// when nothing matches.
pub fn extract_tool_name(title: &str, snippet: &str) -> String {
    let title = title.to_lowercase();
    let snippet = snippet.to_lowercase();
    for re in product_patterns() {
        for text in [&title, &snippet] {
            if let Some(caps) = re.captures(text) {
                return caps[1].to_string();
            }
        }
    }
    String::new()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;
    use smith_model::{MockReply, ScriptedMockProvider};
    use smith_search::{SearchHit, StaticSearchProvider};

    use super::*;

    fn web(provider: StaticSearchProvider) -> WebSearch {
        WebSearch::new(Arc::new(provider), vec![], vec![])
    }

    fn resolver(model: ScriptedMockProvider, search: StaticSearchProvider) -> ToolResolver {
        ToolResolver::new(Arc::new(model), web(search), ResolverConfig::default())
    }

    fn hit(title: &str, url: &str) -> SearchHit {
        SearchHit::new(title, url).with_text(format!("{title} REST API reference"))
    }

    #[test]
    fn extract_tool_name_prefers_title() {
        assert_eq!(extract_tool_name("Freshdesk API overview", "zendesk sdk"), "freshdesk");
        assert_eq!(extract_tool_name("Helpdesk tools compared", "The Freshdesk SDK is..."), "freshdesk");
        assert_eq!(extract_tool_name("Top 10 helpdesks", "nothing here"), "");
    }

    #[test]
    fn pattern_order_beats_position() {
        // "api" is tried before "service", even though "service" comes first
        assert_eq!(extract_tool_name("Acme service with Foo API", ""), "foo");
    }

    #[test]
    fn model_fields_are_normalised() {
        let obj = json!({
            "name": "zendesk-tickets!",
            "description": "",
            "parameters": {"type": "object", "properties": {"query": {"type": "string"}}},
            "implementation": "null",
            "apiEndpoint": "https://example.zendesk.com/api/v2/search"
        });
        let t = definition_from_model(obj.as_object().unwrap(), "Zendesk", "https://developer.zendesk.com");
        assert_eq!(t.name, "zendesktickets");
        assert_eq!(t.description, "Zendesk integration");
        assert!(t.parameters.contains_key("query"));
        assert_eq!(t.implementation, None);
        assert_eq!(t.api_endpoint.as_deref(), Some("https://example.zendesk.com/api/v2/search"));
        assert_eq!(t.documentation_url.as_deref(), Some("https://developer.zendesk.com"));
    }

    #[tokio::test]
    async fn empty_name_list_is_an_error() {
        let r = resolver(ScriptedMockProvider::new(vec![]), StaticSearchProvider::new());
        assert!(matches!(r.resolve_tools(&[], "x").await, Err(PipelineError::EmptyToolList)));
    }

    #[tokio::test]
    async fn tool_without_results_is_omitted() {
        let model = Arc::new(ScriptedMockProvider::new(vec![]));
        let r = ToolResolver::new(model.clone(), web(StaticSearchProvider::new()), ResolverConfig::default());
        let tools = r.resolve_tools(&["Nonexistent".into()], "x").await.unwrap();
        assert!(tools.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_definition_falls_back() {
        let search = StaticSearchProvider::new().on("slack", vec![hit("Slack Web API", "https://api.slack.com")]);
        let r = resolver(ScriptedMockProvider::always_text("I cannot help with that"), search);
        let tools = r.resolve_tools(&["Slack".into()], "notify the team").await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "Slack");
        assert_eq!(tools[0].description, "Slack integration for notify the team");
        assert!(tools[0].parameters.is_empty());
        assert_eq!(tools[0].documentation_url.as_deref(), Some("https://api.slack.com"));
    }

    #[tokio::test]
    async fn parse_failure_without_fallback_omits_tool() {
        let search = StaticSearchProvider::new().on("slack", vec![hit("Slack Web API", "https://api.slack.com")]);
        let cfg = ResolverConfig { fallback_on_parse_error: false, ..ResolverConfig::default() };
        let r = ToolResolver::new(Arc::new(ScriptedMockProvider::always_text("nope")), web(search), cfg);
        assert!(r.resolve_tools(&["Slack".into()], "x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_search_drops_only_that_tool() {
        let search = StaticSearchProvider::new()
            .failing_on("jira", "rate limited")
            .on("github", vec![hit("GitHub REST API", "https://docs.github.com/rest")]);
        let model = ScriptedMockProvider::always_text(r#"{"name": "github", "description": "Repos"}"#);
        let r = resolver(model, search);
        let tools = r
            .resolve_tools(&["Jira".into(), "GitHub".into()], "track work")
            .await
            .unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "github");
    }

    #[tokio::test]
    async fn model_outage_is_a_resolution_error() {
        let search = StaticSearchProvider::new().on("stripe", vec![hit("Stripe API", "https://stripe.com/docs/api")]);
        let r = resolver(ScriptedMockProvider::new(vec![]).with_fallback(MockReply::error("down")), search);
        let err = r.resolve_tool("Stripe", "billing").await.unwrap_err();
        assert_eq!(err.tool, "Stripe");
        assert!(err.reason.contains("model call failed"));
    }

    #[tokio::test]
    async fn documentation_is_truncated_before_prompting() {
        let long = "x".repeat(5000);
        let search = StaticSearchProvider::new()
            .on("notion", vec![SearchHit::new("Notion API", "https://developers.notion.com").with_text(long)]);
        let model = Arc::new(ScriptedMockProvider::always_text(r#"{"name": "notion"}"#));
        let cfg = ResolverConfig { documentation_chars: 100, ..ResolverConfig::default() };
        let r = ToolResolver::new(model.clone(), web(search), cfg);
        r.resolve_tool("Notion", "notes").await.unwrap();
        let prompt = model.last_request().unwrap().messages[0].as_text().unwrap();
        assert!(prompt.contains(&"x".repeat(100)));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[tokio::test]
    async fn alternatives_skip_the_original_and_dedupe() {
        let search = StaticSearchProvider::new().on(
            "alternative to zendesk",
            vec![
                SearchHit::new("Zendesk pricing", "https://a.example"),
                SearchHit::new("Freshdesk API docs", "https://b.example"),
                SearchHit::new("Freshdesk API guide", "https://c.example"),
                SearchHit::new("Help Scout service", "https://d.example"),
                SearchHit::new("Ten helpdesk picks", "https://e.example"),
            ],
        );
        let r = resolver(ScriptedMockProvider::new(vec![]), search);
        let alts = r.find_alternatives("Zendesk", "support tickets").await.unwrap();
        assert_eq!(alts, vec!["freshdesk", "scout"]);
    }

    #[tokio::test]
    async fn alternatives_search_failure_propagates() {
        let search = StaticSearchProvider::new().failing_on("alternative", "quota");
        let r = resolver(ScriptedMockProvider::new(vec![]), search);
        let err = r.find_alternatives("Zendesk", "").await.unwrap_err();
        assert!(err.is_dependency_failure());
    }
}
