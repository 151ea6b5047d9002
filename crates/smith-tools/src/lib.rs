// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod capability;
mod definition;
mod dispatch;
mod error;
mod policy;
mod registry;

pub use capability::{
    Capability, CapabilityTable, EchoCapability, HttpFetchCapability, InvocationContext,
    Sha256Capability, TemplateCapability, TimestampCapability,
};
pub use definition::{normalize_parameters, optional_field, sanitize_name, ToolDefinition};
pub use dispatch::{mock_result, ToolDispatcher};
pub use error::DispatchError;
pub use policy::{http_client, EndpointPolicy};
pub use registry::ToolRegistry;
