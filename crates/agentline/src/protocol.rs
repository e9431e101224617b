//! Normalized streaming event protocol.
//!
//! Every event travels as one self-delimited frame: `data: <json>\n\n`. The json body
//! carries a `type` discriminator plus the fields relevant to that event, matching the
//! UI message stream understood by AI SDK style front ends. The end of the stream is
//! signalled by the literal frame `data: [DONE]\n\n`, which is never parsed as json.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::SinkError;

/// Marker that prefixes the body of every frame
pub const DATA_PREFIX: &str = "data: ";
/// Separator between two frames
pub const FRAME_DELIMITER: &str = "\n\n";
/// Body of the end-of-stream frame
pub const DONE_SENTINEL: &str = "[DONE]";

/// One normalized streaming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputDelta {
        tool_call_id: String,
        input_text_delta: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable {
        tool_call_id: String,
        output: ToolOutput,
    },
    Finish,
    #[serde(rename_all = "camelCase")]
    Error {
        error_text: String,
    },
}

/// Payload of a `tool-output-available` event: `{"result": ..}` or `{"error": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutput {
    Result(String),
    Error(String),
}

/// A decoded frame: either a structured event or the end-of-stream sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(Event),
    Done,
}

/// Encode one event as a complete frame, delimiter included
pub fn encode_frame(event: &Event) -> String {
    let body = serde_json::to_string(event).unwrap_or_else(|e| {
        // Only reachable with non-string map keys inside a tool input
        serde_json::json!({"type": "error", "errorText": format!("encode event: {}", e)})
            .to_string()
    });
    format!("{}{}{}", DATA_PREFIX, body, FRAME_DELIMITER)
}

/// The end-of-stream frame
pub fn done_frame() -> String {
    format!("{}{}{}", DATA_PREFIX, DONE_SENTINEL, FRAME_DELIMITER)
}

/// Decode a single frame.
///
/// The input may or may not include the trailing delimiter. Frames without a `data:`
/// line or with an unparseable body yield `None`; callers skip them and carry on.
pub fn decode_frame(raw: &str) -> Option<Frame> {
    let mut body: Option<String> = None;
    for line in raw.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        match body.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(data);
            }
            None => body = Some(data.to_string()),
        }
    }

    let body = body?;
    if body.trim() == DONE_SENTINEL {
        return Some(Frame::Done);
    }

    match serde_json::from_str::<Event>(&body) {
        Ok(event) => Some(Frame::Event(event)),
        Err(e) => {
            tracing::debug!(error = %e, body = %body, "skipping undecodable frame");
            None
        }
    }
}

/// Destination for encoded frames.
#[async_trait]
pub trait EventSink: Send {
    /// Write one complete frame
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<Bytes> {
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkError> {
        mpsc::Sender::send(self, frame)
            .await
            .map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl EventSink for Vec<u8> {
    async fn send(&mut self, frame: Bytes) -> Result<(), SinkError> {
        self.extend_from_slice(&frame);
        Ok(())
    }
}

/// A sink that drops every frame, for callers that only want the final history
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

#[async_trait]
impl EventSink for DiscardSink {
    async fn send(&mut self, _frame: Bytes) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes typed events to a sink, one frame per call
pub struct Emitter<'a> {
    sink: &'a mut dyn EventSink,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a mut dyn EventSink) -> Self {
        Self { sink }
    }

    pub async fn emit(&mut self, event: Event) -> Result<(), SinkError> {
        self.sink.send(Bytes::from(encode_frame(&event))).await
    }

    pub async fn start(&mut self, message_id: Option<String>) -> Result<(), SinkError> {
        self.emit(Event::Start { message_id }).await
    }

    pub async fn text_start(&mut self, id: &str) -> Result<(), SinkError> {
        self.emit(Event::TextStart { id: id.to_string() }).await
    }

    pub async fn text_delta(&mut self, id: &str, delta: &str) -> Result<(), SinkError> {
        self.emit(Event::TextDelta {
            id: id.to_string(),
            delta: delta.to_string(),
        })
        .await
    }

    pub async fn text_end(&mut self, id: &str) -> Result<(), SinkError> {
        self.emit(Event::TextEnd { id: id.to_string() }).await
    }

    pub async fn tool_input_start(
        &mut self,
        tool_call_id: &str,
        tool_name: &str,
    ) -> Result<(), SinkError> {
        self.emit(Event::ToolInputStart {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
        })
        .await
    }

    pub async fn tool_input_delta(
        &mut self,
        tool_call_id: &str,
        input_text_delta: &str,
    ) -> Result<(), SinkError> {
        self.emit(Event::ToolInputDelta {
            tool_call_id: tool_call_id.to_string(),
            input_text_delta: input_text_delta.to_string(),
        })
        .await
    }

    pub async fn tool_input_available(
        &mut self,
        tool_call_id: &str,
        tool_name: &str,
        input: Value,
    ) -> Result<(), SinkError> {
        self.emit(Event::ToolInputAvailable {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            input,
        })
        .await
    }

    pub async fn tool_output_available(
        &mut self,
        tool_call_id: &str,
        output: ToolOutput,
    ) -> Result<(), SinkError> {
        self.emit(Event::ToolOutputAvailable {
            tool_call_id: tool_call_id.to_string(),
            output,
        })
        .await
    }

    pub async fn finish(&mut self) -> Result<(), SinkError> {
        self.emit(Event::Finish).await
    }

    pub async fn error(&mut self, error_text: &str) -> Result<(), SinkError> {
        self.emit(Event::Error {
            error_text: error_text.to_string(),
        })
        .await
    }

    /// Write the end-of-stream sentinel
    pub async fn done(&mut self) -> Result<(), SinkError> {
        self.sink.send(Bytes::from(done_frame())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_events() -> Vec<Event> {
        vec![
            Event::Start {
                message_id: Some("a1b2c3d4e5f60718".to_string()),
            },
            Event::Start { message_id: None },
            Event::TextStart {
                id: "t1".to_string(),
            },
            Event::TextDelta {
                id: "t1".to_string(),
                delta: "line one\nline \"two\"".to_string(),
            },
            Event::TextEnd {
                id: "t1".to_string(),
            },
            Event::ToolInputStart {
                tool_call_id: "call_1".to_string(),
                tool_name: "get_weather".to_string(),
            },
            Event::ToolInputDelta {
                tool_call_id: "call_1".to_string(),
                input_text_delta: "{\"loc".to_string(),
            },
            Event::ToolInputAvailable {
                tool_call_id: "call_1".to_string(),
                tool_name: "get_weather".to_string(),
                input: json!({"location": "Paris"}),
            },
            Event::ToolInputAvailable {
                tool_call_id: "call_2".to_string(),
                tool_name: "get_weather".to_string(),
                input: json!("{bad"),
            },
            Event::ToolOutputAvailable {
                tool_call_id: "call_1".to_string(),
                output: ToolOutput::Result("sunny".to_string()),
            },
            Event::ToolOutputAvailable {
                tool_call_id: "call_2".to_string(),
                output: ToolOutput::Error("tool not found: nope".to_string()),
            },
            Event::Finish,
            Event::Error {
                error_text: "api error 500: boom".to_string(),
            },
        ]
    }

    #[test]
    fn test_round_trip_every_variant() {
        for event in all_events() {
            let frame = encode_frame(&event);
            assert!(frame.starts_with(DATA_PREFIX));
            assert!(frame.ends_with(FRAME_DELIMITER));
            assert_eq!(decode_frame(&frame), Some(Frame::Event(event)));
        }
    }

    #[test]
    fn test_wire_shape() {
        let frame = encode_frame(&Event::ToolInputStart {
            tool_call_id: "call_1".to_string(),
            tool_name: "get_weather".to_string(),
        });
        let body: Value =
            serde_json::from_str(frame.trim_start_matches(DATA_PREFIX).trim_end()).unwrap();
        assert_eq!(
            body,
            json!({"type": "tool-input-start", "toolCallId": "call_1", "toolName": "get_weather"})
        );

        assert_eq!(encode_frame(&Event::Finish), "data: {\"type\":\"finish\"}\n\n");
        assert_eq!(
            encode_frame(&Event::Start { message_id: None }),
            "data: {\"type\":\"start\"}\n\n"
        );

        let output = encode_frame(&Event::ToolOutputAvailable {
            tool_call_id: "call_1".to_string(),
            output: ToolOutput::Error("boom".to_string()),
        });
        assert!(output.contains("\"output\":{\"error\":\"boom\"}"));
    }

    #[test]
    fn test_done_sentinel() {
        assert_eq!(done_frame(), "data: [DONE]\n\n");
        assert_eq!(decode_frame(&done_frame()), Some(Frame::Done));
        assert_eq!(decode_frame("data: [DONE]"), Some(Frame::Done));
    }

    #[test]
    fn test_malformed_frames_are_skipped() {
        assert_eq!(decode_frame("data: {not json\n\n"), None);
        assert_eq!(decode_frame("data: {\"type\":\"reasoning\"}\n\n"), None);
        assert_eq!(decode_frame(": keep-alive\n\n"), None);
        assert_eq!(decode_frame(""), None);

        // A bad frame does not affect decoding of the next one
        let good = encode_frame(&Event::Finish);
        assert_eq!(decode_frame(&good), Some(Frame::Event(Event::Finish)));
    }

    #[test]
    fn test_decode_without_space_after_marker() {
        assert_eq!(
            decode_frame("data:{\"type\":\"finish\"}"),
            Some(Frame::Event(Event::Finish))
        );
    }

    #[tokio::test]
    async fn test_emitter_writes_one_frame_per_event() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut emitter = Emitter::new(&mut sink);
            emitter.start(Some("m1".to_string())).await.unwrap();
            emitter.text_start("t1").await.unwrap();
            emitter.text_delta("t1", "hello").await.unwrap();
            emitter.text_end("t1").await.unwrap();
            emitter.finish().await.unwrap();
            emitter.done().await.unwrap();
        }

        let text = String::from_utf8(sink).unwrap();
        let frames: Vec<&str> = text.split_terminator(FRAME_DELIMITER).collect();
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[0], "data: {\"type\":\"start\",\"messageId\":\"m1\"}");
        assert_eq!(frames[2], "data: {\"type\":\"text-delta\",\"id\":\"t1\",\"delta\":\"hello\"}");
        assert_eq!(frames[5], "data: [DONE]");
    }

    #[tokio::test]
    async fn test_closed_channel_is_a_sink_error() {
        let (mut tx, rx) = mpsc::channel::<Bytes>(1);
        drop(rx);
        let mut emitter = Emitter::new(&mut tx);
        assert!(matches!(emitter.finish().await, Err(SinkError::Closed)));
    }
}
