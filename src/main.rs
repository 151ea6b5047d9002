mod cli;

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, TextInput};
use smith_config::Config;
use smith_core::{
    AgentBuilder, AgentConfig, AgentDescription, AgentPlan, AgentTester, DescriptionParser,
    ExecutionEngine, PlanGenerator, TestCase, ToolResolver,
};
use smith_model::ModelProvider;
use smith_search::WebSearch;
use smith_tools::{ToolDefinition, ToolDispatcher};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        println!("{}", json!({ "error": format!("{e:#}") }));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need no configuration
    match &cli.command {
        Commands::Completions { shell } => {
            cli::print_completions(*shell);
            return Ok(());
        }
        Commands::ListProviders { detailed, json } => return list_providers_cmd(*detailed, *json),
        _ => {}
    }

    let config = smith_config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Health => health_cmd(&config),
        Commands::Parse { input } => {
            let text = read_text(&input)?;
            let parser = DescriptionParser::new(model(&config)?);
            print_json(&parser.parse(&text).await?)?;
        }
        Commands::ResearchTools { tools, use_case } => {
            let resolver = resolver(&config)?;
            let tools = resolver.resolve_tools(&tools, &use_case).await?;
            print_json(&json!({ "tools": tools }))?;
        }
        Commands::Plan { description, tools, agent_id } => {
            let desc: AgentDescription = read_json(&description)?;
            let tools: Vec<ToolDefinition> = match tools {
                Some(path) => unwrap_field(read_json(&path)?, "tools")?,
                None => Vec::new(),
            };
            let planner = PlanGenerator::new(model(&config)?, search(&config)?, config.planner.clone());
            let plan = match agent_id {
                Some(id) => planner.generate_plan_for(&id, &desc, &tools).await,
                None => planner.generate_plan(&desc, &tools).await,
            };
            print_json(&plan)?;
        }
        Commands::Create { input, tools } => {
            let text = read_text(&input)?;
            let builder = builder(&config)?;
            let cancel = cancel_on_ctrl_c();
            let overrides = (!tools.is_empty()).then_some(tools);
            print_json(&builder.build_with_cancel(&text, overrides, &cancel).await?)?;
        }
        Commands::Execute { agent, message, session_id, user_id, events } => {
            let agent = load_agent(&agent)?;
            execute_cmd(&config, &agent, &message, session_id, user_id, events).await?;
        }
        Commands::Alternatives { tool, use_case } => {
            let alternatives = resolver(&config)?.find_alternatives(&tool, &use_case).await?;
            print_json(&json!({ "alternatives": alternatives }))?;
        }
        Commands::EnhanceStep { plan, step } => {
            let plan: AgentPlan = unwrap_field(read_json(&plan)?, "plan")?;
            let planner = PlanGenerator::new(model(&config)?, search(&config)?, config.planner.clone());
            let step = planner.enhance_step(&plan, &step).await?;
            print_json(&json!({ "step": step }))?;
        }
        Commands::Test { agent, cases } => {
            let agent = load_agent(&agent)?;
            let cases: Option<Vec<TestCase>> = cases.map(|p| read_json(&p)).transpose()?;
            let mut tester = AgentTester::new(engine(&config)?, config.tester.clone());
            print_json(&tester.run_tests(&agent, cases).await)?;
        }
        Commands::Validate { agent, register } => {
            let agent = load_agent(&agent)?;
            let mut engine = engine(&config)?;
            if register {
                engine.register_tools(agent.tools.iter().cloned());
            }
            let report = engine.validate(&agent);
            print_json(&report)?;
            if !report.valid {
                std::process::exit(2);
            }
        }
        Commands::Benchmark { agent, iterations } => {
            let agent = load_agent(&agent)?;
            let mut tester = AgentTester::new(engine(&config)?, config.tester.clone());
            print_json(&tester.benchmark(&agent, iterations).await)?;
        }
        Commands::Completions { .. } | Commands::ListProviders { .. } => {}
    }
    Ok(())
}

// ── Component construction ────────────────────────────────────────────────────

fn model(config: &Config) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let model = smith_model::from_config(&config.model)
        .with_context(|| format!("building model provider '{}'", config.model.provider))?;
    debug!(provider = model.name(), model = model.model_name(), "model provider ready");
    Ok(Arc::from(model))
}

fn search(config: &Config) -> anyhow::Result<WebSearch> {
    smith_search::from_config(&config.search)
        .with_context(|| format!("building search provider '{}'", config.search.provider))
}

fn resolver(config: &Config) -> anyhow::Result<ToolResolver> {
    Ok(ToolResolver::new(model(config)?, search(config)?, config.resolver.clone()))
}

fn builder(config: &Config) -> anyhow::Result<AgentBuilder> {
    let model = model(config)?;
    let search = search(config)?;
    Ok(AgentBuilder::new(
        DescriptionParser::new(model.clone()),
        ToolResolver::new(model.clone(), search.clone(), config.resolver.clone()),
        PlanGenerator::new(model, search, config.planner.clone()),
    ))
}

fn engine(config: &Config) -> anyhow::Result<ExecutionEngine> {
    let dispatcher = Arc::new(ToolDispatcher::from_config(&config.tools)?);
    Ok(ExecutionEngine::new(model(config)?, dispatcher, config.executor.clone()))
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn execute_cmd(
    config: &Config,
    agent: &AgentConfig,
    message: &str,
    session_id: Option<String>,
    user_id: Option<String>,
    print_events: bool,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(config.executor.event_buffer.max(1));
    let mut engine = engine(config)?.with_events(tx);
    engine.register_tools(agent.tools.iter().cloned());

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if print_events {
                match serde_json::to_string(&event) {
                    Ok(line) => eprintln!("{line}"),
                    Err(e) => warn!("unprintable event: {e}"),
                }
            }
        }
    });

    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut ctx = engine.create_context(session_id, user_id);
    let result = engine.execute(agent, message, &mut ctx).await;
    // Dropping the engine closes the event channel
    drop(engine);
    let _ = printer.await;

    print_json(&json!({ "result": result, "context": ctx }))?;
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn health_cmd(config: &Config) {
    let status = |r: anyhow::Result<String>| match r {
        Ok(name) => json!({ "status": "ok", "provider": name }),
        Err(e) => json!({ "status": "unavailable", "error": format!("{e:#}") }),
    };
    let model = status(model(config).map(|m| m.name().to_string()));
    let search = status(search(config).map(|s| s.provider_name().to_string()));
    let healthy = model["status"] == "ok" && search["status"] == "ok";
    let report = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": { "model": model, "search": search },
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
}

fn list_providers_cmd(detailed: bool, as_json: bool) -> anyhow::Result<()> {
    let drivers = smith_model::registry::list_drivers();

    if as_json {
        #[derive(Serialize)]
        struct ProviderJson {
            id: &'static str,
            name: &'static str,
            description: &'static str,
            default_api_key_env: Option<&'static str>,
            default_base_url: Option<&'static str>,
            default_model: &'static str,
            requires_api_key: bool,
        }
        let rows: Vec<ProviderJson> = drivers
            .iter()
            .map(|d| ProviderJson {
                id: d.id,
                name: d.name,
                description: d.description,
                default_api_key_env: d.default_api_key_env,
                default_base_url: d.default_base_url,
                default_model: d.default_model,
                requires_api_key: d.requires_api_key,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Supported Model Providers ({} total)\n", drivers.len());
    for d in drivers {
        if detailed {
            println!("  {} ({})", d.id, d.name);
            println!("    {}", d.description);
            if let Some(env) = d.default_api_key_env {
                println!("    API key env : {env}");
            }
            if let Some(url) = d.default_base_url {
                println!("    Default URL : {url}");
            }
            println!("    Model       : {}", d.default_model);
            if !d.requires_api_key {
                println!("    Auth        : none required");
            }
            println!();
        } else {
            println!("  {:12} {}", d.id, d.description);
        }
    }
    Ok(())
}

// ── Input and output ──────────────────────────────────────────────────────────

fn read_text(input: &TextInput) -> anyhow::Result<String> {
    let text = match (&input.text, &input.file) {
        (Some(t), _) => t.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading description file {}", path.display()))?,
        (None, None) => {
            if io::stdin().is_terminal() {
                bail!("Description is required: pass it as an argument, with --file, or on stdin");
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading description from stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("Description is required");
    }
    Ok(text)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Accept either the bare value or an object wrapping it under `field`, so the
/// output of one command can be fed to the next.
fn unwrap_field<T: DeserializeOwned>(v: Value, field: &str) -> anyhow::Result<T> {
    let inner = match v {
        Value::Object(mut obj) if obj.contains_key(field) => obj.remove(field).unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(inner).with_context(|| format!("expected {field} JSON"))
}

fn load_agent(path: &Path) -> anyhow::Result<AgentConfig> {
    unwrap_field(read_json(path)?, "agent")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A token cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
