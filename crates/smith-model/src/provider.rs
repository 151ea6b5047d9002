use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse};

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for logs and status output.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send a completion request and wait for the full response.
    ///
    /// Transport failures, non-success HTTP statuses and undecodable bodies
    /// all surface as `Err`; callers decide whether that is fatal.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse>;
}
