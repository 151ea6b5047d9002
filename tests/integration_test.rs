/// Integration tests across the agentsmith crates using the mock providers.
use std::sync::Arc;

use serde_json::json;
use smith_config::{Config, ResolverConfig};
use smith_core::{
    AgentBuilder, AgentTester, DescriptionParser, ExecutionEngine, ExecutionEvent, PipelineError,
    PlanGenerator, ToolResolver, Verdict,
};
use smith_model::{MockProvider, MockReply, ModelProvider, ScriptedMockProvider};
use smith_search::{SearchHit, StaticSearchProvider, WebSearch};
use smith_tools::{ToolDefinition, ToolDispatcher};
use tokio::sync::mpsc;

fn dispatcher(cfg: &Config) -> Arc<ToolDispatcher> {
    Arc::new(ToolDispatcher::from_config(&cfg.tools).unwrap())
}

#[test]
fn config_defaults_are_valid() {
    let cfg = Config::default();
    assert_eq!(cfg.model.provider, "anthropic");
    assert_eq!(cfg.executor.max_tool_rounds, 1);
    assert_eq!(cfg.resolver.documentation_chars, 3000);
    assert!(cfg.tools.capabilities.iter().any(|c| c == "sha256"));
}

#[test]
fn explicit_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agentsmith.toml");
    std::fs::write(
        &path,
        "[model]\nprovider = \"mock\"\n\n[tester]\nbenchmark_iterations = 2\n",
    )
    .unwrap();
    let cfg = smith_config::load(Some(&path)).unwrap();
    assert_eq!(cfg.model.provider, "mock");
    assert_eq!(cfg.tester.benchmark_iterations, 2);
    // Untouched keys in the same table keep their defaults
    assert_eq!(cfg.tester.capability_timeout_secs, 30);
}

#[tokio::test]
async fn echo_model_output_is_not_a_description() {
    let model: Arc<dyn ModelProvider> = Arc::new(MockProvider);
    let err = DescriptionParser::new(model).parse("A bot for Slack").await.unwrap_err();
    assert!(matches!(err, PipelineError::DescriptionParse(_)));
    assert!(err.to_string().contains("could not understand the request"));
}

#[tokio::test]
async fn created_agent_runs_its_builtin_tool() {
    let cfg = Config::default();

    // Build: parse, one tool, system prompt, plan
    let build_model = Arc::new(ScriptedMockProvider::new(vec![
        MockReply::text(
            json!({
                "description": "Fingerprints documents with GitHub checksums",
                "requirements": ["hash documents"],
                "mentionedTools": ["GitHub"],
            })
            .to_string(),
        ),
        MockReply::text(
            json!({
                "name": "hasher",
                "description": "Computes SHA-256 digests",
                "parameters": {"text": {"type": "string"}},
                "implementation": "builtin:sha256",
            })
            .to_string(),
        ),
        MockReply::text("You fingerprint documents and report their digests."),
        MockReply::text(
            json!({
                "steps": [{"id": "hash", "title": "Hash", "description": "Hash input", "estimatedTime": "5 minutes"}],
                "totalEstimatedTime": "5 minutes"
            })
            .to_string(),
        ),
    ]));
    let search = StaticSearchProvider::new().on(
        "github",
        vec![SearchHit::new("GitHub REST API", "https://docs.github.com/rest").with_text("REST API docs")],
    );
    let web = WebSearch::new(Arc::new(search), vec![], vec![]);
    let builder = AgentBuilder::new(
        DescriptionParser::new(build_model.clone()),
        ToolResolver::new(build_model.clone(), web.clone(), ResolverConfig::default()),
        PlanGenerator::new(build_model, web, cfg.planner.clone()),
    );
    let out = builder.build("Fingerprint documents with GitHub", None).await.unwrap();
    assert_eq!(out.agent.tools[0].implementation.as_deref(), Some("builtin:sha256"));
    assert_eq!(out.plan.steps[0].id, "hash");

    // Execute: the model calls the tool once
    let run_model = Arc::new(ScriptedMockProvider::new(vec![MockReply::tool_use(
        "call-1",
        "hasher",
        json!({"text": "abc"}),
    )]));
    let (tx, mut rx) = mpsc::channel(16);
    let mut engine = ExecutionEngine::new(run_model, dispatcher(&cfg), cfg.executor.clone()).with_events(tx);
    engine.register_tools(out.agent.tools.clone());
    assert!(engine.validate(&out.agent).valid);

    let mut ctx = engine.create_context("session-1", Some("user-1".into()));
    let result = engine.execute(&out.agent, "hash abc", &mut ctx).await;
    assert!(result.success);
    assert_eq!(result.tools_used, vec!["hasher"]);
    assert_eq!(
        ctx.tool_results["call-1"]["sha256"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let mut tool_events = 0;
    while let Ok(ev) = rx.try_recv() {
        if let ExecutionEvent::ToolExecuted { tool_name, is_error, .. } = ev {
            assert_eq!(tool_name, "hasher");
            assert!(!is_error);
            tool_events += 1;
        }
    }
    assert_eq!(tool_events, 1);
}

#[tokio::test]
async fn refused_capability_does_not_fail_the_turn() {
    let cfg = Config::default();
    let tool = ToolDefinition::declarative("shell", "runs commands")
        .with_implementation("require('child_process').execSync('id')");
    let model = Arc::new(ScriptedMockProvider::tool_then_text("c1", "shell", json!({}), "unused"));
    let mut engine = ExecutionEngine::new(model, dispatcher(&cfg), cfg.executor.clone());
    engine.register_tool(tool);

    let agent = smith_core::AgentConfig::from_description(
        "a1",
        &smith_core::AgentDescription {
            description: "Runs things".into(),
            requirements: vec!["run things".into()],
            ..Default::default()
        },
        "You run things carefully.".into(),
        vec![],
    );
    let mut ctx = engine.create_context("s", None);
    let result = engine.execute(&agent, "run id", &mut ctx).await;
    assert!(result.success);
    assert_eq!(result.tool_failures, vec!["shell"]);
    assert_eq!(ctx.tool_results["c1"]["kind"], "capability_denied");
}

#[tokio::test]
async fn mock_model_agent_passes_its_suite() {
    let cfg = Config::default();
    let model: Arc<dyn ModelProvider> = Arc::new(MockProvider);
    let engine = ExecutionEngine::new(model, dispatcher(&cfg), cfg.executor.clone());
    let mut tester = AgentTester::new(engine, cfg.tester.clone());

    let agent = smith_core::AgentConfig::from_description(
        "a2",
        &smith_core::AgentDescription {
            description: "Greets people".into(),
            requirements: vec!["greet".into()],
            ..Default::default()
        },
        "You greet people warmly.".into(),
        vec![ToolDefinition::declarative("calendar", "reads events")],
    );
    let v = tester.run_tests(&agent, None).await;
    assert_eq!(v.results.len(), 4);
    assert_eq!(v.overall, Verdict::Pass);
    assert_eq!(v.recommendations, vec!["All tests passed successfully! Agent is ready for deployment."]);
    assert!(tester.validate_config(&agent).valid);
}
