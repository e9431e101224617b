//! Turns the fragmented output of one model turn into normalized events and
//! the finalized assistant message.
//!
//! Providers stream chat-completions chunks as server-sent-event lines. Each
//! chunk may carry a piece of text, pieces of one or more tool calls, and a
//! finish reason. Tool call pieces reference their call by position index;
//! the index is assumed stable for the whole turn, while the call id may be
//! sent late or not at all.

use std::collections::{BTreeMap, HashSet};

use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::Span;
use uuid::Uuid;

use crate::errors::{AgentError, SinkError};
use crate::models::message::Message;
use crate::models::tool::{FunctionCall, ToolCall};
use crate::protocol::{Emitter, DATA_PREFIX, DONE_SENTINEL};
use crate::providers::base::ByteStream;

/// Random 16 hex digit identifier for messages and text blocks
pub fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    /// Some providers omit the index when every call arrives whole in one
    /// chunk; the position in the chunk is used instead.
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// One meaningful line of a provider stream
#[derive(Debug, Clone)]
pub enum ProviderLine {
    Chunk(StreamChunk),
    Done,
}

/// Interpret one line of provider output.
///
/// Lines without the `data:` marker (comments, `event:` fields, blank
/// separators) and bodies that are not a chunk are skipped.
pub fn parse_line(line: &str, span: &Span) -> Option<ProviderLine> {
    let body = line
        .strip_prefix(DATA_PREFIX)
        .or_else(|| line.strip_prefix(DATA_PREFIX.trim_end()))?
        .trim();
    if body == DONE_SENTINEL {
        return Some(ProviderLine::Done);
    }
    match serde_json::from_str::<StreamChunk>(body) {
        Ok(chunk) => Some(ProviderLine::Chunk(chunk)),
        Err(e) => {
            tracing::debug!(parent: span, error = %e, body, "skipping undecodable provider chunk");
            None
        }
    }
}

/// Splits raw provider bytes into lines, whatever the transport chunking.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line completed by them, without the
    /// line terminator
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Take whatever trails the last line terminator
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        Some(line.trim_end_matches('\r').to_string())
    }
}

/// A tool call under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedToolCall {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub arguments: String,
    announced: bool,
}

impl AccumulatedToolCall {
    /// The structured input, or the raw argument text when it is not valid json
    pub fn input(&self, span: &Span) -> Value {
        match serde_json::from_str(&self.arguments) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    parent: span,
                    tool_call_id = %self.id,
                    error = %e,
                    arguments = %self.arguments,
                    "tool input is not valid json, passing the raw text"
                );
                Value::String(self.arguments.clone())
            }
        }
    }

    fn to_tool_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            kind: self.kind.clone(),
            function: FunctionCall {
                name: self.name.clone(),
                arguments: self.arguments.clone(),
            },
        }
    }
}

/// State of one model turn.
///
/// Call [`ChunkAccumulator::ingest`] for each chunk in arrival order, then
/// [`ChunkAccumulator::complete_turn`] and [`ChunkAccumulator::finish`].
/// A chunk carrying a finish reason completes the turn by itself.
#[derive(Debug)]
pub struct ChunkAccumulator {
    span: Span,
    message_id: String,
    text_id: String,
    started: bool,
    text_open: bool,
    completed: bool,
    text: String,
    tool_calls: BTreeMap<u32, AccumulatedToolCall>,
}

impl Default for ChunkAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self {
            span: Span::none(),
            message_id: generate_id(),
            text_id: generate_id(),
            started: false,
            text_open: false,
            completed: false,
            text: String::new(),
            tool_calls: BTreeMap::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    async fn begin(&mut self, emitter: &mut Emitter<'_>) -> Result<(), SinkError> {
        if !self.started {
            self.started = true;
            emitter.start(Some(self.message_id.clone())).await?;
        }
        Ok(())
    }

    /// Feed one provider chunk
    pub async fn ingest(
        &mut self,
        chunk: &StreamChunk,
        emitter: &mut Emitter<'_>,
    ) -> Result<(), SinkError> {
        self.begin(emitter).await?;

        // Only the first choice is ever requested
        let Some(choice) = chunk.choices.first() else {
            return Ok(());
        };
        if self.completed {
            tracing::debug!(parent: &self.span, "ignoring chunk after the turn finished");
            return Ok(());
        }

        if let Some(content) = choice.delta.content.as_deref().filter(|c| !c.is_empty()) {
            if !self.text_open {
                self.text_open = true;
                emitter.text_start(&self.text_id).await?;
            }
            self.text.push_str(content);
            emitter.text_delta(&self.text_id, content).await?;
        }

        for (position, delta) in choice.delta.tool_calls.iter().flatten().enumerate() {
            let index = delta.index.unwrap_or(position as u32);
            self.ingest_tool_call(index, delta, emitter).await?;
        }

        if let Some(reason) = &choice.finish_reason {
            tracing::debug!(parent: &self.span, finish_reason = %reason, "provider finished turn");
            self.complete_turn(emitter).await?;
        }
        Ok(())
    }

    async fn ingest_tool_call(
        &mut self,
        index: u32,
        delta: &ToolCallDelta,
        emitter: &mut Emitter<'_>,
    ) -> Result<(), SinkError> {
        let call = self.tool_calls.entry(index).or_default();

        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            if call.id.is_empty() {
                call.id = id.to_string();
            }
        }
        if let Some(kind) = delta.kind.as_deref().filter(|k| !k.is_empty()) {
            if call.kind.is_empty() {
                call.kind = kind.to_string();
            }
        }

        let function = delta.function.as_ref();
        if let Some(name) = function
            .and_then(|f| f.name.as_deref())
            .filter(|n| !n.is_empty())
        {
            if call.name.is_empty() {
                call.name = name.to_string();
            }
        }

        if !call.announced && !call.id.is_empty() && !call.name.is_empty() {
            call.announced = true;
            emitter.tool_input_start(&call.id, &call.name).await?;
        }

        if let Some(arguments) = function
            .and_then(|f| f.arguments.as_deref())
            .filter(|a| !a.is_empty())
        {
            call.arguments.push_str(arguments);
            emitter.tool_input_delta(&call.id, arguments).await?;
        }
        Ok(())
    }

    /// Feed a complete, non-streamed assistant message as a single chunk
    pub async fn ingest_message(
        &mut self,
        message: &Message,
        emitter: &mut Emitter<'_>,
    ) -> Result<(), SinkError> {
        let tool_calls: Vec<ToolCallDelta> = message
            .tool_calls()
            .iter()
            .enumerate()
            .map(|(index, call)| ToolCallDelta {
                index: Some(index as u32),
                id: Some(call.id.clone()),
                kind: Some(call.kind.clone()),
                function: Some(FunctionDelta {
                    name: Some(call.function.name.clone()),
                    arguments: Some(call.function.arguments.clone()),
                }),
            })
            .collect();
        let finish_reason = if tool_calls.is_empty() {
            "stop"
        } else {
            "tool_calls"
        };
        let chunk = StreamChunk {
            choices: vec![StreamChoice {
                delta: StreamDelta {
                    content: message.content.clone(),
                    tool_calls: Some(tool_calls),
                },
                finish_reason: Some(finish_reason.to_string()),
            }],
        };
        self.ingest(&chunk, emitter).await
    }

    /// Close the turn: end the text block, resolve every tool call in index
    /// order and emit `finish`. Later calls do nothing.
    pub async fn complete_turn(&mut self, emitter: &mut Emitter<'_>) -> Result<(), SinkError> {
        if self.completed {
            return Ok(());
        }
        self.begin(emitter).await?;
        self.completed = true;

        if self.text_open {
            emitter.text_end(&self.text_id).await?;
        }

        let mut taken: HashSet<String> = self
            .tool_calls
            .values()
            .filter(|call| !call.id.is_empty())
            .map(|call| call.id.clone())
            .collect();
        let span = &self.span;
        for (index, call) in self.tool_calls.iter_mut() {
            if call.id.is_empty() {
                let mut id = format!("call_{}", index);
                while taken.contains(&id) {
                    id = format!("call_{}", generate_id());
                }
                taken.insert(id.clone());
                call.id = id;
                tracing::debug!(parent: span, index, id = %call.id, "provider sent no tool call id");
            }
            if call.kind.is_empty() {
                call.kind = "function".to_string();
            }
            let input = call.input(span);
            emitter
                .tool_input_available(&call.id, &call.name, input)
                .await?;
        }

        emitter.finish().await
    }

    /// The assistant message built from everything ingested
    pub fn finish(self) -> Message {
        let mut message = Message::assistant_empty().with_text(self.text);
        for call in self.tool_calls.values() {
            message = message.with_tool_call(call.to_tool_call());
        }
        message
    }
}

/// Drive a provider byte stream through a fresh accumulator.
///
/// The turn is completed even if the provider never sends a finish reason.
/// A read failure ends the turn with a provider error.
pub async fn accumulate(
    mut stream: ByteStream,
    emitter: &mut Emitter<'_>,
    span: &Span,
) -> Result<Message, AgentError> {
    let mut accumulator = ChunkAccumulator::new().with_span(span.clone());
    let mut lines = SseLineBuffer::new();
    let mut done = false;
    let mut chunks = 0usize;

    while let Some(bytes) = stream.next().await {
        let bytes = bytes?;
        for line in lines.push(&bytes) {
            match parse_line(&line, span) {
                Some(ProviderLine::Chunk(chunk)) => {
                    chunks += 1;
                    accumulator.ingest(&chunk, emitter).await?;
                }
                Some(ProviderLine::Done) => {
                    done = true;
                    break;
                }
                None => {}
            }
        }
        if done {
            break;
        }
    }

    if !done {
        if let Some(ProviderLine::Chunk(chunk)) = lines.finish().and_then(|l| parse_line(&l, span)) {
            chunks += 1;
            accumulator.ingest(&chunk, emitter).await?;
        }
    }

    accumulator.complete_turn(emitter).await?;
    let message = accumulator.finish();
    tracing::info!(
        parent: span,
        chunks,
        content_length = message.text().len(),
        tool_calls = message.tool_calls().len(),
        "stream completed"
    );
    Ok(message)
}
