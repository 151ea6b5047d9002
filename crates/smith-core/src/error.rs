// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Model output that could not be reduced to a JSON object.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct ResponseParseError {
    pub reason: String,
    /// The model text as received, for diagnostics
    pub raw: String,
}

impl ResponseParseError {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self { reason: reason.into(), raw: raw.into() }
    }
}

/// Structural problems in a plan's step graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },
    #[error("dependency cycle involving step '{0}'")]
    Cycle(String),
}

/// Failure to resolve a single tool name.  Caught by the resolver; the tool
/// is dropped and resolution of the remaining names continues.
#[derive(Debug, Clone, Error)]
#[error("resolving tool '{tool}': {reason}")]
pub struct ToolResolutionError {
    pub tool: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not understand the model response: {reason}")]
    ResponseParse { reason: String, raw: String },

    #[error("could not understand the request: {0}")]
    DescriptionParse(#[source] ResponseParseError),

    #[error("no tool names were given to resolve")]
    EmptyToolList,

    #[error("step '{0}' not found in plan")]
    StepNotFound(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("could not reach {service}: {message}")]
    ExternalService { service: String, message: String },

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Wrap a failed call to an external dependency (`"llm"`, `"search"`).
    pub fn external(service: &str, err: &anyhow::Error) -> Self {
        Self::ExternalService {
            service: service.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// `true` when the failure lies with a dependency rather than with the
    /// request or the model's output.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }
}

impl From<ResponseParseError> for PipelineError {
    fn from(e: ResponseParseError) -> Self {
        Self::ResponseParse { reason: e.reason, raw: e.raw }
    }
}
