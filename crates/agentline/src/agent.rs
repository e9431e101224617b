use std::sync::Arc;
use tracing::Span;

use crate::accumulator::{accumulate, ChunkAccumulator};
use crate::errors::{AgentError, AgentResult, ToolError};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolDefinition};
use crate::protocol::{DiscardSink, Emitter, EventSink, ToolOutput};
use crate::providers::base::Provider;
use crate::tool::{Tool, ToolRegistry};

/// Model calls allowed for one user input before the cycle is stopped
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 25;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ask the provider for a streamed response instead of a complete one
    pub streaming: bool,
    /// `None` lets the model call tools for as long as it wants
    pub max_round_trips: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            max_round_trips: Some(DEFAULT_MAX_ROUND_TRIPS),
        }
    }
}

/// Agent integrates a foundational LLM with the tools it can call.
///
/// The agent owns the conversation history. Each call to [`Agent::chat`]
/// appends the user input once, then alternates between the model and the
/// requested tools until the model answers without tool calls.
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: ToolRegistry,
    config: AgentConfig,
    history: Vec<Message>,
    span: Span,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
            history: Vec::new(),
            span: Span::none(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Record the agent's logs under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Result<Self, ToolError> {
        self.add_tool(Arc::new(tool))?;
        Ok(self)
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Add a tool to the agent
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        self.tools.register(tool)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Answer one user input, streaming every event into `sink`.
    ///
    /// The stream ends with a single `[DONE]` frame. Returns the final
    /// assistant message. On a provider or sink failure an `error` event is
    /// written if the sink still accepts it, and the history keeps whatever
    /// was appended before the failure.
    pub async fn chat(&mut self, input: &str, sink: &mut dyn EventSink) -> AgentResult<Message> {
        let mut emitter = Emitter::new(sink);
        match self.run_cycle(input, &mut emitter).await {
            Ok(message) => {
                emitter.done().await?;
                Ok(message)
            }
            Err(err) => {
                tracing::error!(parent: &self.span, error = %err, "agent cycle failed");
                if !matches!(err, AgentError::Sink(_)) {
                    let reported = match emitter.error(&err.to_string()).await {
                        Ok(()) => emitter.done().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = reported {
                        tracing::debug!(parent: &self.span, error = %e, "could not report failure");
                    }
                }
                Err(err)
            }
        }
    }

    /// Answer one user input without streaming events anywhere
    pub async fn reply(&mut self, input: &str) -> AgentResult<Message> {
        self.chat(input, &mut DiscardSink).await
    }

    async fn run_cycle(&mut self, input: &str, emitter: &mut Emitter<'_>) -> AgentResult<Message> {
        self.history.push(Message::user(input));
        let definitions = self.tools.definitions();
        let mut round_trips = 0;

        loop {
            if let Some(limit) = self.config.max_round_trips {
                if round_trips >= limit {
                    return Err(AgentError::RoundTripLimit(limit));
                }
            }
            round_trips += 1;

            let reply = self.next_reply(&definitions, emitter).await?;
            self.history.push(reply.clone());

            if !reply.has_tool_calls() {
                tracing::info!(parent: &self.span, round_trips, "agent cycle complete");
                return Ok(reply);
            }

            // Each result is in the history before the next call starts
            for call in reply.tool_calls() {
                let message = self.dispatch_tool_call(call, emitter).await?;
                self.history.push(message);
            }
        }
    }

    /// Get the next assistant message, streaming its events
    async fn next_reply(
        &self,
        definitions: &[ToolDefinition],
        emitter: &mut Emitter<'_>,
    ) -> AgentResult<Message> {
        tracing::debug!(
            parent: &self.span,
            messages = self.history.len(),
            streaming = self.config.streaming,
            "calling provider"
        );
        if self.config.streaming {
            let stream = self.provider.stream(&self.history, definitions).await?;
            accumulate(stream, emitter, &self.span).await
        } else {
            let message = self.provider.complete(&self.history, definitions).await?;
            let mut accumulator = ChunkAccumulator::new().with_span(self.span.clone());
            accumulator.ingest_message(&message, emitter).await?;
            accumulator.complete_turn(emitter).await?;
            Ok(accumulator.finish())
        }
    }

    /// Run a single tool call; tool failures become the tool's answer
    async fn dispatch_tool_call(
        &self,
        call: &ToolCall,
        emitter: &mut Emitter<'_>,
    ) -> AgentResult<Message> {
        let name = &call.function.name;
        tracing::info!(parent: &self.span, tool = %name, tool_call_id = %call.id, "calling tool");

        let (output, content) = match self.tools.call(name, &call.function.arguments).await {
            Ok(result) => (ToolOutput::Result(result.clone()), result),
            Err(err) => {
                tracing::warn!(parent: &self.span, tool = %name, error = %err, "tool call failed");
                (ToolOutput::Error(err.to_string()), err.to_content())
            }
        };

        emitter.tool_output_available(&call.id, output).await?;
        Ok(Message::tool(&call.id, content))
    }
}
