use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;

/// Raw bytes of a streamed completion, in the provider's own chunk format
pub type ByteStream = BoxStream<'static, Result<Bytes, ProviderError>>;

/// Base trait for AI providers (Mistral, OpenAI, ...)
///
/// Implementations report transport failures and non-success statuses as
/// [`ProviderError`], never as stream content.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message in a single response
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError>;

    /// Start a streamed completion and return its raw chunk bytes
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ByteStream, ProviderError>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        (**self).complete(messages, tools).await
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ByteStream, ProviderError> {
        (**self).stream(messages, tools).await
    }
}
