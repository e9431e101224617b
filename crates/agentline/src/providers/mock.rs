use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;
use crate::providers::base::{ByteStream, Provider};

/// One scripted provider response
pub enum MockReply {
    /// Returned by `complete`
    Message(Message),
    /// Raw stream bytes returned by `stream`, one item per transport chunk
    Stream(Vec<Result<Bytes, ProviderError>>),
    /// Returned from either call before any output
    Fail(ProviderError),
}

/// A mock provider that returns pre-configured responses for testing
///
/// Every call also records the history it was given.
pub struct MockProvider {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Histories seen by each call, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, messages: &[Message]) -> Option<MockReply> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        match self.next_reply(messages) {
            // Empty response if no more pre-configured responses
            None => Ok(Message::assistant_empty()),
            Some(MockReply::Message(message)) => Ok(message),
            Some(MockReply::Fail(err)) => Err(err),
            Some(MockReply::Stream(_)) => Err(ProviderError::Decode(
                "mock: stream reply requested through complete".to_string(),
            )),
        }
    }

    async fn stream(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ByteStream, ProviderError> {
        match self.next_reply(messages) {
            None => Ok(futures::stream::empty().boxed()),
            Some(MockReply::Stream(parts)) => Ok(futures::stream::iter(parts).boxed()),
            Some(MockReply::Fail(err)) => Err(err),
            Some(MockReply::Message(_)) => Err(ProviderError::Decode(
                "mock: message reply requested through stream".to_string(),
            )),
        }
    }
}
