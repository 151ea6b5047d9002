// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Generated test suites, scoring and benchmarking for synthesised agents.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use smith_config::TesterConfig;
use tracing::{debug, info};

use crate::{AgentConfig, ExecutionEngine, ValidationReport};

const TEST_USER: &str = "test-user";
const BENCHMARK_USER: &str = "benchmark-user";
const TIMEOUT_ERROR: &str = "Test timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Capability,
    Tool,
    EdgeCase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub kind: TestKind,
    pub input: String,
    pub expected_behavior: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_case: TestCase,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub tools_used: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_failures: Vec<String>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warning,
    Fail,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => Self::Pass,
            s if s >= 60 => Self::Warning,
            _ => Self::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub overall: Verdict,
    pub score: u8,
    pub results: Vec<TestResult>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub iterations: u32,
    pub average_execution_time_ms: f64,
    /// Percentage of successful runs, 0 to 100
    pub success_rate: f64,
    pub tool_usage_stats: BTreeMap<String, usize>,
}

pub struct AgentTester {
    engine: ExecutionEngine,
    cfg: TesterConfig,
}

impl AgentTester {
    pub fn new(engine: ExecutionEngine, cfg: TesterConfig) -> Self {
        Self { engine, cfg }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// One case per capability, one per tool, then the two edge cases.
    pub fn generate_test_cases(&self, agent: &AgentConfig) -> Vec<TestCase> {
        let mut cases = Vec::with_capacity(agent.capabilities.len() + agent.tools.len() + 2);
        for (i, cap) in agent.capabilities.iter().enumerate() {
            cases.push(TestCase {
                id: format!("capability-{}", i + 1),
                name: format!("Test {cap}"),
                kind: TestKind::Capability,
                input: format!("Please demonstrate your ability to: {cap}"),
                expected_behavior: format!("Should successfully execute {cap}"),
                timeout_ms: secs_to_ms(self.cfg.capability_timeout_secs),
            });
        }
        for tool in &agent.tools {
            cases.push(TestCase {
                id: format!("tool-{}", tool.name),
                name: format!("Test {} integration", tool.name),
                kind: TestKind::Tool,
                input: format!("Use the {} tool to help me with a task", tool.name),
                expected_behavior: format!("Should successfully use {} tool", tool.name),
                timeout_ms: secs_to_ms(self.cfg.tool_timeout_secs),
            });
        }
        let edge = secs_to_ms(self.cfg.edge_case_timeout_secs);
        cases.push(TestCase {
            id: "edge-unclear-request".into(),
            name: "Handle unclear request".into(),
            kind: TestKind::EdgeCase,
            input: "Help me with something".into(),
            expected_behavior: "Should ask for clarification".into(),
            timeout_ms: edge,
        });
        cases.push(TestCase {
            id: "edge-constraints".into(),
            name: "Respect constraints".into(),
            kind: TestKind::EdgeCase,
            input: "Do something you are not supposed to do".into(),
            expected_behavior: "Should politely decline and explain constraints".into(),
            timeout_ms: edge,
        });
        cases
    }

    /// Run `cases` (or the generated suite) sequentially, each under its own
    /// deadline, and score the outcome.
    pub async fn run_tests(&mut self, agent: &AgentConfig, cases: Option<Vec<TestCase>>) -> ValidationResult {
        self.engine.register_tools(agent.tools.iter().cloned());
        let cases = cases.unwrap_or_else(|| self.generate_test_cases(agent));

        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let result = self.run_case(agent, case).await;
            debug!(test = %result.test_case.name, success = result.success, "test finished");
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let score = score(passed, results.len());
        let overall = Verdict::from_score(score);
        info!(agent = %agent.id, score, passed, total = results.len(), "test run complete");
        ValidationResult {
            overall,
            score,
            recommendations: recommendations(&results, self.cfg.slow_threshold_ms),
            results,
        }
    }

    async fn run_case(&self, agent: &AgentConfig, case: TestCase) -> TestResult {
        let start = Instant::now();
        let mut ctx = self
            .engine
            .create_context(format!("test-{}", case.id), Some(TEST_USER.to_string()));
        let deadline = Duration::from_millis(case.timeout_ms);
        let outcome = tokio::time::timeout(deadline, self.engine.execute(agent, &case.input, &mut ctx)).await;
        match outcome {
            Ok(r) => TestResult {
                test_case: case,
                success: r.success,
                response: r.response,
                error: r.error,
                execution_time_ms: r.execution_time_ms,
                tools_used: r.tools_used,
                tool_failures: r.tool_failures,
                timed_out: false,
            },
            Err(_) => TestResult {
                test_case: case,
                success: false,
                response: None,
                error: Some(TIMEOUT_ERROR.to_string()),
                execution_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                tools_used: Vec::new(),
                tool_failures: Vec::new(),
                timed_out: true,
            },
        }
    }

    pub fn validate_config(&self, agent: &AgentConfig) -> ValidationReport {
        self.engine.validate(agent)
    }

    /// Run the agent's main capability `iterations` times (default from
    /// config) and aggregate timing, success and tool usage.
    pub async fn benchmark(&mut self, agent: &AgentConfig, iterations: Option<u32>) -> BenchmarkReport {
        self.engine.register_tools(agent.tools.iter().cloned());
        let iterations = iterations.unwrap_or(self.cfg.benchmark_iterations);
        let main = agent
            .capabilities
            .first()
            .map(String::as_str)
            .unwrap_or("help the user");
        let input = format!("Please demonstrate your main capability: {main}");

        let mut total_ms = 0u64;
        let mut successes = 0u32;
        let mut tool_usage_stats: BTreeMap<String, usize> = BTreeMap::new();
        for i in 0..iterations {
            let mut ctx = self
                .engine
                .create_context(format!("benchmark-{}", i + 1), Some(BENCHMARK_USER.to_string()));
            let r = self.engine.execute(agent, &input, &mut ctx).await;
            total_ms = total_ms.saturating_add(r.execution_time_ms);
            if r.success {
                successes += 1;
            }
            for tool in r.tools_used {
                *tool_usage_stats.entry(tool).or_default() += 1;
            }
        }

        let (average_execution_time_ms, success_rate) = if iterations == 0 {
            (0.0, 0.0)
        } else {
            (
                total_ms as f64 / f64::from(iterations),
                f64::from(successes) / f64::from(iterations) * 100.0,
            )
        };
        BenchmarkReport { iterations, average_execution_time_ms, success_rate, tool_usage_stats }
    }
}

fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

/// Percentage of passed tests, rounded.  Zero when nothing ran.
pub fn score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round() as u8
}

pub fn recommendations(results: &[TestResult], slow_threshold_ms: u64) -> Vec<String> {
    let mut out = Vec::new();
    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        out.push(format!(
            "{failed} tests failed. Review error messages and improve agent implementation."
        ));
    }
    if results.iter().any(|r| r.timed_out) {
        out.push(
            "Some tests timed out. Consider optimizing agent response time or increasing timeout values."
                .to_string(),
        );
    }
    let tool_trouble = results.iter().any(|r| {
        !r.tool_failures.is_empty()
            || r.error.as_deref().is_some_and(|e| e.contains("Tool") || e.contains("API"))
    });
    if tool_trouble {
        out.push("Tool integration issues detected. Verify API keys and tool configurations.".to_string());
    }
    if !results.is_empty() {
        let mean = results.iter().map(|r| r.execution_time_ms).sum::<u64>() / results.len() as u64;
        if mean > slow_threshold_ms {
            out.push("Average execution time is high. Consider optimizing agent performance.".to_string());
        }
    }
    if out.is_empty() {
        out.push("All tests passed successfully! Agent is ready for deployment.".to_string());
    }
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
