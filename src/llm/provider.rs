use async_trait::async_trait;

use crate::errors::DeskPilotResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunk, ToolDef};

/// Receives stream chunks as they arrive. The interactive transcript
/// prints them; tests collect them.
pub trait ChunkSink: Send + Sync {
    fn emit(&self, chunk: &StreamChunk);
}

/// Sink that discards every chunk (non-interactive calls).
pub struct NullSink;

impl ChunkSink for NullSink {
    fn emit(&self, _chunk: &StreamChunk) {}
}

/// Unified LLM provider trait. All providers implement this trait.
/// New providers only need to implement this trait and register in config.toml.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// Sends one chat completion request. Chunks are forwarded to `sink`
    /// while the accumulated response is returned to the caller.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDef>,
        cfg: &CallConfig,
        sink: &dyn ChunkSink,
    ) -> DeskPilotResult<LlmResponse>;

    /// Lightweight reachability probe used once at startup before the
    /// interactive loop. Implementations map connection failures to
    /// `DeskPilotError::ModelUnavailable`.
    async fn probe(&self) -> DeskPilotResult<()>;
}
