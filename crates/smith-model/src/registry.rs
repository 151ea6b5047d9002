// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Static metadata for the model drivers `from_config` can build.

/// One supported model driver.
#[derive(Debug, Clone)]
pub struct DriverMeta {
    /// Value of `model.provider` that selects this driver.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Consulted when neither `api_key` nor `api_key_env` is configured.
    pub default_api_key_env: Option<&'static str>,
    pub default_base_url: Option<&'static str>,
    /// Model used when `model.name` is blank.
    pub default_model: &'static str,
    pub requires_api_key: bool,
}

pub static DRIVERS: &[DriverMeta] = &[
    DriverMeta {
        id: "anthropic",
        name: "Anthropic",
        description: "Claude models via the Messages API",
        default_api_key_env: Some("ANTHROPIC_API_KEY"),
        default_base_url: Some("https://api.anthropic.com"),
        default_model: "claude-3-5-sonnet-20241022",
        requires_api_key: true,
    },
    DriverMeta {
        id: "openai",
        name: "OpenAI",
        description: "GPT models via chat completions, or any compatible server via base_url",
        default_api_key_env: Some("OPENAI_API_KEY"),
        default_base_url: Some("https://api.openai.com/v1"),
        default_model: "gpt-4o",
        requires_api_key: true,
    },
    DriverMeta {
        id: "mock",
        name: "Mock",
        description: "Offline echo provider for dry runs",
        default_api_key_env: None,
        default_base_url: None,
        default_model: "mock",
        requires_api_key: false,
    },
];

pub fn list_drivers() -> &'static [DriverMeta] {
    DRIVERS
}

pub fn get_driver(id: &str) -> Option<&'static DriverMeta> {
    DRIVERS.iter().find(|d| d.id == id)
}
