// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Prompt templates for every model call the pipeline makes.
//!
//! Each builder is a pure function of its inputs so the exact wording can be
//! asserted in tests and tuned in one place.

use smith_tools::ToolDefinition;

use crate::{AgentDescription, PlanStep};

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

fn comma_list_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

pub fn description_prompt(text: &str) -> String {
    format!(
        r#"Analyze this description of an AI agent and extract its structure.

Description:
"{text}"

Return a single JSON object with exactly these fields:
{{
  "description": "a clear one-sentence summary of what the agent does",
  "requirements": ["concrete functional requirements"],
  "constraints": ["limitations, policies or rules the agent must respect"],
  "mentionedTools": ["every tool, service, platform or API the user names"],
  "impliedCapabilities": ["general abilities the agent needs"]
}}

Rules for "mentionedTools":
- Include every named product, platform or API that appears in the description
  (for example Zendesk, Confluence, Slack, Stripe, GitHub).
- Be liberal in what you detect, but never add a tool the user did not name.

Rules for "impliedCapabilities":
- Describe abilities only (for example "ticket search" or "summarisation").
- Never name a specific tool or vendor here.

Respond with JSON only."#
    )
}

pub fn system_prompt_prompt(desc: &AgentDescription) -> String {
    format!(
        r#"Write the system prompt for an AI agent with this profile.

Description: {description}

Requirements:
{requirements}

Constraints:
{constraints}

Mentioned tools: {tools}

Capabilities needed: {capabilities}

The system prompt must:
1. State the agent's role and purpose.
2. Describe what it can and cannot do.
3. Explain when and how to use its tools.
4. Set expectations for tone and behaviour.
5. Include every constraint above.

Return only the system prompt text, with no preamble."#,
        description = desc.description,
        requirements = if desc.requirements.is_empty() {
            "None".to_string()
        } else {
            bullet_list(&desc.requirements)
        },
        constraints = if desc.constraints.is_empty() {
            "None".to_string()
        } else {
            bullet_list(&desc.constraints)
        },
        tools = comma_list_or(&desc.mentioned_tools, "None specified"),
        capabilities = comma_list_or(&desc.implied_capabilities, "None specified"),
    )
}

pub fn tool_definition_prompt(tool: &str, use_case: &str, source_url: &str, documentation: &str) -> String {
    format!(
        r#"Create a tool definition for an AI agent from this documentation.

Tool name: {tool}
Use case: {use_case}
Source: {source_url}

Documentation excerpt:
{documentation}

Return a single JSON object:
{{
  "name": "identifierSafeToolName",
  "description": "what the tool does for this use case",
  "parameters": {{
    "type": "object",
    "properties": {{ "paramName": {{ "type": "string", "description": "..." }} }},
    "required": ["paramName"]
  }},
  "implementation": null,
  "apiEndpoint": "HTTPS endpoint if the documentation gives one, else null",
  "documentationUrl": "{source_url}"
}}

Do not write code.  Respond with JSON only."#
    )
}

pub fn plan_prompt(desc: &AgentDescription, tools: &[ToolDefinition], best_practices: &str) -> String {
    let researched = if tools.is_empty() {
        "No specific tools resolved; use a general implementation".to_string()
    } else {
        tools
            .iter()
            .map(|t| format!("{}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mentioned = if desc.mentioned_tools.is_empty() {
        "No specific tools mentioned by the user".to_string()
    } else {
        format!("The user specifically mentioned: {}", desc.mentioned_tools.join(", "))
    };
    format!(
        r#"Create an implementation plan for this AI agent.

Agent: {description}
Requirements: {requirements}
Constraints: {constraints}

{mentioned}
Researched tools: {researched}
Capabilities needed: {capabilities}

Implementation best practices:
{best_practices}

Plan around the tools the user named.  Do not introduce generic frameworks
or databases the user did not ask for.

Return a single JSON object:
{{
  "steps": [
    {{
      "id": "unique-step-id",
      "title": "short step title",
      "description": "what to do and how",
      "requiredTools": ["tool names used in this step"],
      "estimatedTime": "e.g. 30 minutes",
      "dependencies": ["ids of steps that must finish first"],
      "status": "pending"
    }}
  ],
  "totalEstimatedTime": "e.g. 3 hours"
}}

Respond with JSON only."#,
        description = desc.description,
        requirements = desc.requirements.join(", "),
        constraints = comma_list_or(&desc.constraints, "None"),
        capabilities = desc.implied_capabilities.join(", "),
    )
}

pub fn enhance_step_prompt(step: &PlanStep, research: &str) -> String {
    format!(
        r#"Expand this implementation step into detailed guidance.

Step: {title}
Description: {description}
Required tools: {tools}

Research:
{research}

Cover:
1. Concrete sub-steps.
2. Code patterns or examples worth following.
3. Common pitfalls.
4. How to tell the step is done.

Return only the enhanced description text."#,
        title = step.title,
        description = step.description,
        tools = comma_list_or(&step.required_tools, "None"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> AgentDescription {
        AgentDescription {
            description: "Answers support tickets".into(),
            requirements: vec!["read tickets".into()],
            constraints: vec![],
            mentioned_tools: vec!["Zendesk".into(), "Confluence".into()],
            implied_capabilities: vec!["summarisation".into()],
        }
    }

    #[test]
    fn system_prompt_prompt_marks_empty_sections() {
        let p = system_prompt_prompt(&desc());
        assert!(p.contains("- read tickets"));
        assert!(p.contains("Constraints:\nNone"));
        assert!(p.contains("Mentioned tools: Zendesk, Confluence"));
    }

    #[test]
    fn plan_prompt_lists_mentioned_and_researched_tools() {
        let tools = vec![ToolDefinition::declarative("Zendesk", "ticket api")];
        let p = plan_prompt(&desc(), &tools, "Guide: do it well");
        assert!(p.contains("The user specifically mentioned: Zendesk, Confluence"));
        assert!(p.contains("Researched tools: Zendesk: ticket api"));
        assert!(p.contains("Guide: do it well"));
    }

    #[test]
    fn plan_prompt_without_tools() {
        let mut d = desc();
        d.mentioned_tools.clear();
        let p = plan_prompt(&d, &[], "");
        assert!(p.contains("No specific tools mentioned by the user"));
        assert!(p.contains("No specific tools resolved"));
    }

    #[test]
    fn tool_prompt_carries_source_url() {
        let p = tool_definition_prompt("Slack", "notify team", "https://api.slack.com", "docs");
        assert!(p.contains("Source: https://api.slack.com"));
        assert!(p.contains(r#""documentationUrl": "https://api.slack.com""#));
    }
}
