// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::Value;

use super::{Capability, InvocationContext};
use crate::DispatchError;

/// Returns its input unchanged.
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    fn id(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the input object unchanged"
    }

    async fn invoke(&self, input: &Value, _ctx: &InvocationContext) -> Result<Value, DispatchError> {
        Ok(input.clone())
    }
}
