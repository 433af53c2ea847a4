//! ChatClient trait definition

use async_trait::async_trait;

use super::LlmError;

/// Stateless chat-completion client - each call is independent
///
/// This is the call capability the dispatcher works against. One instance is
/// bound to one endpoint (model + credential); issuing a completion either
/// succeeds with the raw answer text or fails with an [`LlmError`]. Retry and
/// failover policy live entirely outside the client, in the dispatcher.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a single completion request and return the answer content
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
