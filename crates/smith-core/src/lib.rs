mod error;
pub mod extract;
pub mod prompts;
mod description;
mod resolver;
mod plan;
mod planner;
mod agent;
mod events;
mod executor;
mod tester;
mod builder;

pub use error::{PipelineError, PlanError, ResponseParseError, ToolResolutionError};
pub use description::{AgentDescription, DescriptionParser};
pub use resolver::{extract_tool_name, ToolResolver};
pub use plan::{fallback_plan, validate_steps, AgentPlan, PlanStep, StepStatus};
pub use planner::PlanGenerator;
pub use agent::{agent_name, AgentConfig};
pub use events::ExecutionEvent;
pub use executor::{ExecutionContext, ExecutionEngine, ExecutionResult, ValidationReport};
pub use tester::{
    recommendations, score, AgentTester, BenchmarkReport, TestCase, TestKind, TestResult,
    ValidationResult, Verdict,
};
pub use builder::{AgentBuilder, BuildOutput};
