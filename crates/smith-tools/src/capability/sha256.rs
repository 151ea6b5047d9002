// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{Capability, InvocationContext};
use crate::DispatchError;

/// Hex SHA-256 of `input.text`, or of the serialised input when there is no
/// `text` field.
pub struct Sha256Capability;

#[async_trait]
impl Capability for Sha256Capability {
    fn id(&self) -> &str {
        "sha256"
    }

    fn description(&self) -> &str {
        "Hash input.text (or the whole input) with SHA-256"
    }

    async fn invoke(&self, input: &Value, _ctx: &InvocationContext) -> Result<Value, DispatchError> {
        let data = match input.get("text").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => input.to_string(),
        };
        let digest = hex::encode(Sha256::digest(data.as_bytes()));
        Ok(json!({ "sha256": digest }))
    }
}
