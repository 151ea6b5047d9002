// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    AgentConfig, AgentDescription, AgentPlan, DescriptionParser, PipelineError, PlanGenerator,
    ToolResolver,
};

/// Everything produced for one agent request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub agent: AgentConfig,
    pub plan: AgentPlan,
    pub parsed_description: AgentDescription,
}

/// Runs the synthesis stages in order: parse, resolve tools, write the system
/// prompt, plan.
pub struct AgentBuilder {
    parser: DescriptionParser,
    resolver: ToolResolver,
    planner: PlanGenerator,
}

impl AgentBuilder {
    pub fn new(parser: DescriptionParser, resolver: ToolResolver, planner: PlanGenerator) -> Self {
        Self { parser, resolver, planner }
    }

    pub fn parser(&self) -> &DescriptionParser {
        &self.parser
    }

    pub fn resolver(&self) -> &ToolResolver {
        &self.resolver
    }

    pub fn planner(&self) -> &PlanGenerator {
        &self.planner
    }

    pub async fn build(&self, text: &str, tools: Option<Vec<String>>) -> Result<BuildOutput, PipelineError> {
        self.build_with_cancel(text, tools, &CancellationToken::new()).await
    }

    /// Like [`build`](Self::build), abandoning in-flight calls as soon as
    /// `cancel` fires.
    ///
    /// `tools` overrides the tool names found in the description.
    pub async fn build_with_cancel(
        &self,
        text: &str,
        tools: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<BuildOutput, PipelineError> {
        let parsed = guard(cancel, self.parser.parse(text)).await?;

        let names = tools
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| parsed.mentioned_tools.clone());
        let resolved = if names.is_empty() {
            Vec::new()
        } else {
            guard(cancel, self.resolver.resolve_tools(&names, &parsed.description)).await?
        };

        let system_prompt = guard(cancel, self.parser.synthesize_system_prompt(&parsed)).await?;

        let agent_id = AgentConfig::new_id();
        let plan = guard(cancel, async {
            Ok(self.planner.generate_plan_for(&agent_id, &parsed, &resolved).await)
        })
        .await?;

        let agent = AgentConfig::from_description(agent_id, &parsed, system_prompt, resolved);
        info!(agent = %agent.name, tools = agent.tools.len(), steps = plan.steps.len(), "agent built");
        Ok(BuildOutput { agent, plan, parsed_description: parsed })
    }
}

async fn guard<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        r = fut => r,
    }
}
