use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use super::base::{ByteStream, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{create_request, openai_response_to_message};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;

/// Provider for any chat-completions endpoint (OpenAI, Mistral, ...)
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiProviderConfig {
        &self.config
    }

    async fn post(&self, payload: &Value) -> Result<Response, ProviderError> {
        let url = self.config.completions_url();
        tracing::info!(model = %self.config.model, %url, "sending request to provider");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "received response from provider");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "provider api error");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let payload = create_request(&self.config, messages, tools, false);
        let response = self.post(&payload).await?;

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("invalid response body: {}", e)))?;
        openai_response_to_message(value)
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ByteStream, ProviderError> {
        let payload = create_request(&self.config, messages, tools, true);
        let response = self.post(&payload).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::Stream(e.to_string())));

        match self.config.idle_timeout {
            Some(idle) => Ok(with_idle_timeout(bytes, idle)),
            None => Ok(bytes.boxed()),
        }
    }
}

/// Fail the stream once no bytes arrive for `idle`
pub(crate) fn with_idle_timeout<S>(stream: S, idle: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, ProviderError>> + Send + 'static,
{
    tokio_stream::StreamExt::timeout(stream, idle)
        .map(move |item| item.unwrap_or(Err(ProviderError::Timeout(idle))))
        .boxed()
}
