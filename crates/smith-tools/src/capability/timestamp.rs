// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::{Capability, InvocationContext};
use crate::DispatchError;

pub struct TimestampCapability;

#[async_trait]
impl Capability for TimestampCapability {
    fn id(&self) -> &str {
        "timestamp"
    }

    fn description(&self) -> &str {
        "Current UTC time as RFC 3339 and Unix seconds"
    }

    async fn invoke(&self, _input: &Value, _ctx: &InvocationContext) -> Result<Value, DispatchError> {
        let now = Utc::now();
        Ok(json!({
            "iso8601": now.to_rfc3339(),
            "unix": now.timestamp(),
        }))
    }
}
