// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub required_tools: Vec<String>,
    /// Free-form, e.g. "30 minutes".
    pub estimated_time: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: StepStatus,
}

/// An ordered implementation plan whose steps form a DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPlan {
    pub id: String,
    pub agent_id: String,
    pub steps: Vec<PlanStep>,
    pub total_estimated_time: String,
    pub created_at: DateTime<Utc>,
}

impl AgentPlan {
    /// Assemble a plan, rejecting duplicate ids, dangling dependencies and
    /// cycles.
    pub fn new(
        agent_id: impl Into<String>,
        steps: Vec<PlanStep>,
        total_estimated_time: impl Into<String>,
    ) -> Result<Self, PlanError> {
        validate_steps(&steps)?;
        Ok(Self::assemble(agent_id.into(), steps, total_estimated_time.into()))
    }

    pub(crate) fn assemble(agent_id: String, steps: Vec<PlanStep>, total_estimated_time: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id,
            steps,
            total_estimated_time,
            created_at: Utc::now(),
        }
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Step ids in an order where every step follows its dependencies.
    /// Ties keep plan order.
    pub fn execution_order(&self) -> Result<Vec<&str>, PlanError> {
        topological_order(&self.steps)
    }
}

pub fn validate_steps(steps: &[PlanStep]) -> Result<(), PlanError> {
    topological_order(steps).map(|_| ())
}

fn topological_order(steps: &[PlanStep]) -> Result<Vec<&str>, PlanError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
    for (i, s) in steps.iter().enumerate() {
        if index.insert(s.id.as_str(), i).is_some() {
            return Err(PlanError::DuplicateStepId(s.id.clone()));
        }
    }
    for s in steps {
        for dep in &s.dependencies {
            if !index.contains_key(dep.as_str()) {
                return Err(PlanError::UnknownDependency {
                    step: s.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Kahn's algorithm, always taking the earliest ready step
    let deps: Vec<HashSet<&str>> = steps
        .iter()
        .map(|s| s.dependencies.iter().map(String::as_str).collect())
        .collect();
    let mut done = vec![false; steps.len()];
    let mut order = Vec::with_capacity(steps.len());
    while order.len() < steps.len() {
        let ready = (0..steps.len()).find(|&i| !done[i] && deps[i].iter().all(|d| done[index[d]]));
        let Some(next) = ready else {
            let stuck = (0..steps.len()).find(|&i| !done[i]).unwrap_or(0);
            return Err(PlanError::Cycle(steps[stuck].id.clone()));
        };
        done[next] = true;
        order.push(steps[next].id.as_str());
    }
    Ok(order)
}

/// The plan used when the model's plan is unusable: five linear steps.
pub fn fallback_plan(agent_id: &str, description: &str, tool_names: &[String]) -> AgentPlan {
    let tools = tool_names.to_vec();
    let integrate = if tool_names.is_empty() {
        "none".to_string()
    } else {
        tool_names.join(", ")
    };
    let step = |id: &str, title: &str, desc: String, required: Vec<String>, time: &str, after: Option<&str>| PlanStep {
        id: id.to_string(),
        title: title.to_string(),
        description: desc,
        required_tools: required,
        estimated_time: time.to_string(),
        dependencies: after.map(|d| vec![d.to_string()]).unwrap_or_default(),
        status: StepStatus::Pending,
    };
    let steps = vec![
        step(
            "setup-environment",
            "Setup Development Environment",
            "Initialize project structure and install dependencies".into(),
            vec![],
            "15 minutes",
            None,
        ),
        step(
            "integrate-tools",
            "Integrate Required Tools",
            format!("Implement and test integration with: {integrate}"),
            tools.clone(),
            "45 minutes",
            Some("setup-environment"),
        ),
        step(
            "implement-logic",
            "Implement Agent Logic",
            format!("Build core agent functionality: {description}"),
            tools.clone(),
            "60 minutes",
            Some("integrate-tools"),
        ),
        step(
            "error-handling",
            "Add Error Handling",
            "Implement robust error handling and validation".into(),
            vec![],
            "20 minutes",
            Some("implement-logic"),
        ),
        step(
            "test-validate",
            "Test and Validate",
            "Run comprehensive tests and validate agent behavior".into(),
            tools,
            "30 minutes",
            Some("error-handling"),
        ),
    ];
    AgentPlan::assemble(agent_id.to_string(), steps, "2.5 hours".to_string())
}
