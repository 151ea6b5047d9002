// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "agentsmith",
    about = "Turn a plain-language agent description into a runnable, tool-calling agent",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (layered on top of auto-discovered files)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Free text given inline, from a file, or on stdin when neither is set.
#[derive(clap::Args, Debug, Clone)]
pub struct TextInput {
    /// The agent description
    #[arg(value_name = "DESCRIPTION", conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the description from a file
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a description into its structured form
    Parse {
        #[command(flatten)]
        input: TextInput,
    },

    /// Resolve tool names into tool definitions via search and the model
    ResearchTools {
        /// Tool names, e.g. Zendesk Confluence
        #[arg(required = true)]
        tools: Vec<String>,
        /// What the agent will use the tools for
        #[arg(long, short = 'u', default_value = "")]
        use_case: String,
    },

    /// Generate an implementation plan from a parsed description
    Plan {
        /// Parsed description JSON, as printed by `parse`
        #[arg(long, short = 'd', value_name = "PATH")]
        description: PathBuf,
        /// Tool definitions JSON, as printed by `research-tools`
        #[arg(long, short = 't', value_name = "PATH")]
        tools: Option<PathBuf>,
        /// Agent id to bind the plan to (default: a new id)
        #[arg(long)]
        agent_id: Option<String>,
    },

    /// Run the whole pipeline: parse, resolve tools, write the system prompt, plan
    Create {
        #[command(flatten)]
        input: TextInput,
        /// Tool to resolve instead of those found in the description.
        /// May be repeated: --tool Zendesk --tool Slack
        #[arg(long = "tool", value_name = "NAME")]
        tools: Vec<String>,
    },

    /// Run one message through an agent
    Execute {
        /// Agent JSON, or the full output of `create`
        #[arg(long, short = 'a', value_name = "PATH")]
        agent: PathBuf,
        /// The user message
        #[arg(long, short = 'm')]
        message: String,
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Print execution events as JSON lines on stderr
        #[arg(long)]
        events: bool,
    },

    /// Suggest alternatives to a tool
    Alternatives {
        tool: String,
        #[arg(long, short = 'u', default_value = "")]
        use_case: String,
    },

    /// Expand one plan step into detailed guidance
    EnhanceStep {
        /// Plan JSON, or the full output of `create`
        #[arg(long, short = 'p', value_name = "PATH")]
        plan: PathBuf,
        /// Id of the step to enhance
        #[arg(long, short = 's')]
        step: String,
    },

    /// Run the generated test suite against an agent and score it
    Test {
        /// Agent JSON, or the full output of `create`
        #[arg(long, short = 'a', value_name = "PATH")]
        agent: PathBuf,
        /// Test cases JSON to run instead of the generated suite
        #[arg(long, value_name = "PATH")]
        cases: Option<PathBuf>,
    },

    /// Check an agent's structure without calling the model.
    /// Exits non-zero when the agent is invalid.
    Validate {
        /// Agent JSON, or the full output of `create`
        #[arg(long, short = 'a', value_name = "PATH")]
        agent: PathBuf,
        /// Register the agent's own tools before checking
        #[arg(long)]
        register: bool,
    },

    /// Run the agent's main capability repeatedly and report timing
    Benchmark {
        /// Agent JSON, or the full output of `create`
        #[arg(long, short = 'a', value_name = "PATH")]
        agent: PathBuf,
        /// Number of runs (default from config)
        #[arg(long, short = 'n')]
        iterations: Option<u32>,
    },

    /// Report whether the configured model and search providers can be built
    Health,

    /// Print the effective configuration and exit
    ShowConfig,

    /// List all supported model providers.
    ///
    /// Use the provider id in your config file under `model.provider`.
    ListProviders {
        /// Show detailed information for each provider
        #[arg(long)]
        detailed: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "agentsmith", &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repeated_tool_flags_collect() {
        let cli = Cli::parse_from(["agentsmith", "create", "a bot", "--tool", "Slack", "--tool", "Jira"]);
        match cli.command {
            Commands::Create { input, tools } => {
                assert_eq!(input.text.as_deref(), Some("a bot"));
                assert_eq!(tools, vec!["Slack", "Jira"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["agentsmith", "health", "-vv", "--config", "x.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
