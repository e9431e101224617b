use async_trait::async_trait;
use std::sync::Mutex;

use agentline::errors::ProviderError;
use agentline::models::message::Message;
use agentline::models::tool::ToolDefinition;
use agentline::providers::base::{ByteStream, Provider};

/// Replays canned complete responses, then fails like an unavailable service
pub struct MockProvider {
    responses: Mutex<Vec<Message>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::Status {
                status: 503,
                body: "no more responses".to_string(),
            });
        }
        Ok(responses.remove(0))
    }

    async fn stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ByteStream, ProviderError> {
        Err(ProviderError::Stream(
            "the mock provider only answers complete requests".to_string(),
        ))
    }
}
