// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use serde::Deserialize;
use smith_config::PlannerConfig;
use smith_model::{CompletionRequest, ModelProvider};
use smith_search::{SearchResult, WebSearch};
use smith_tools::ToolDefinition;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::extract::extract_as;
use crate::plan::fallback_plan;
use crate::{prompts, AgentDescription, AgentPlan, PipelineError, PlanStep, StepStatus};

/// Step shape accepted from the model.  Status is always reset to pending.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelStep {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required_tools: Vec<String>,
    #[serde(default)]
    estimated_time: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPlan {
    steps: Vec<ModelStep>,
    #[serde(default)]
    total_estimated_time: Option<String>,
}

pub struct PlanGenerator {
    model: Arc<dyn ModelProvider>,
    search: WebSearch,
    cfg: PlannerConfig,
}

impl PlanGenerator {
    pub fn new(model: Arc<dyn ModelProvider>, search: WebSearch, cfg: PlannerConfig) -> Self {
        Self { model, search, cfg }
    }

    /// Plan for a fresh agent id.
    pub async fn generate_plan(&self, desc: &AgentDescription, tools: &[ToolDefinition]) -> AgentPlan {
        self.generate_plan_for(&Uuid::new_v4().to_string(), desc, tools).await
    }

    /// Always yields a valid plan: any failure along the way, including an
    /// unreachable model, ends in the fallback plan.
    pub async fn generate_plan_for(
        &self,
        agent_id: &str,
        desc: &AgentDescription,
        tools: &[ToolDefinition],
    ) -> AgentPlan {
        let context = self
            .research(&desc.description, "implementation", self.cfg.context_results, "\n\n")
            .await;
        let prompt = prompts::plan_prompt(desc, tools, &context);
        let tool_names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();

        let resp = match self
            .model
            .complete(CompletionRequest::prompt(None, prompt).with_max_tokens(self.cfg.max_tokens))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "plan generation failed; using fallback plan");
                return fallback_plan(agent_id, &desc.description, &tool_names);
            }
        };

        let parsed = match extract_as::<ModelPlan>(&resp.joined_text()) {
            Ok(p) if !p.steps.is_empty() => p,
            Ok(_) => {
                warn!("model returned an empty plan; using fallback plan");
                return fallback_plan(agent_id, &desc.description, &tool_names);
            }
            Err(e) => {
                warn!(error = %e, "unusable plan; using fallback plan");
                return fallback_plan(agent_id, &desc.description, &tool_names);
            }
        };

        let steps = parsed
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, s)| PlanStep {
                id: s
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("step-{}", i + 1)),
                title: s.title,
                description: s.description,
                required_tools: s.required_tools,
                estimated_time: s.estimated_time.unwrap_or_else(|| "unspecified".into()),
                dependencies: s.dependencies,
                status: StepStatus::Pending,
            })
            .collect();
        let total = parsed.total_estimated_time.unwrap_or_else(|| "unspecified".into());

        match AgentPlan::new(agent_id, steps, total) {
            Ok(plan) => {
                debug!(steps = plan.steps.len(), "plan generated");
                plan
            }
            Err(e) => {
                warn!(error = %e, "plan failed validation; using fallback plan");
                fallback_plan(agent_id, &desc.description, &tool_names)
            }
        }
    }

    /// A copy of the step with a more detailed description.  Falls back to
    /// the step unchanged when the model cannot be reached.
    pub async fn enhance_step(&self, plan: &AgentPlan, step_id: &str) -> Result<PlanStep, PipelineError> {
        let step = plan
            .step(step_id)
            .ok_or_else(|| PipelineError::StepNotFound(step_id.to_string()))?;
        let research = self
            .research(&step.title, "implementation tutorial", self.cfg.enhance_context_results, "\n")
            .await;
        let req = CompletionRequest::prompt(None, prompts::enhance_step_prompt(step, &research))
            .with_max_tokens(self.cfg.enhance_max_tokens);

        let mut enhanced = step.clone();
        match self.model.complete(req).await {
            Ok(resp) => {
                let text = resp.joined_text();
                if !text.trim().is_empty() {
                    enhanced.description = text.trim().to_string();
                }
            }
            Err(e) => warn!(step = step_id, error = %format!("{e:#}"), "step enhancement failed"),
        }
        Ok(enhanced)
    }

    /// Best-practice context as `"title: snippet"` lines.  Empty when the
    /// search fails.
    async fn research(&self, topic: &str, use_case: &str, count: usize, sep: &str) -> String {
        match self.search.search_best_practices(topic, use_case, count).await {
            Ok(results) => format_context(&results, count, sep),
            Err(e) => {
                warn!(topic, error = %format!("{e:#}"), "best-practice search failed");
                String::new()
            }
        }
    }
}

fn format_context(results: &[SearchResult], count: usize, sep: &str) -> String {
    results
        .iter()
        .take(count)
        .map(|r| format!("{}: {}", r.title, r.snippet))
        .collect::<Vec<_>>()
        .join(sep)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
