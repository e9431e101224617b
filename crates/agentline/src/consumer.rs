//! Client side of the event protocol: rebuilds frames from an arbitrarily
//! chunked byte stream and hands them to a handler.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;

use crate::errors::SinkError;
use crate::protocol::{decode_frame, EventSink, Frame, FRAME_DELIMITER};

/// Incremental frame splitter.
///
/// Bytes are buffered until a delimiter is seen, so a frame (or a multi-byte
/// character) split across transport chunks is decoded whole.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    // Everything before this offset is known not to start a delimiter
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every frame they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);
        let delimiter = FRAME_DELIMITER.as_bytes();
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer[self.scanned..]
            .windows(delimiter.len())
            .position(|window| window == delimiter)
            .map(|pos| pos + self.scanned)
        {
            let raw: Vec<u8> = self.buffer.drain(..pos + delimiter.len()).collect();
            self.scanned = 0;
            if let Some(frame) = decode_frame(&String::from_utf8_lossy(&raw[..pos])) {
                frames.push(frame);
            }
        }
        self.scanned = self.buffer.len().saturating_sub(delimiter.len() - 1);
        frames
    }

    /// Decode whatever is left without a trailing delimiter, line by line
    pub fn flush(&mut self) -> Vec<Frame> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        String::from_utf8_lossy(&rest)
            .lines()
            .filter_map(decode_frame)
            .collect()
    }

    /// Bytes waiting for a delimiter
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Presentation side of a stream. Handlers must ignore events they cannot
/// place (a delta for a text block never opened, an unknown tool call id).
pub trait EventHandler {
    fn handle(&mut self, frame: &Frame);

    /// Called once after the last frame
    fn finish(&mut self) {}
}

/// Collects frames, mostly useful in tests
impl EventHandler for Vec<Frame> {
    fn handle(&mut self, frame: &Frame) {
        self.push(frame.clone());
    }
}

/// Couples a [`FrameDecoder`] with an [`EventHandler`].
///
/// Usable as the sink of an agent running in the same process, or as an
/// [`io::Write`] for bytes read from elsewhere.
#[derive(Debug, Default)]
pub struct StreamConsumer<H> {
    decoder: FrameDecoder,
    handler: H,
}

impl<H: EventHandler> StreamConsumer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Decode and dispatch a chunk of bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        for frame in self.decoder.push(bytes) {
            self.handler.handle(&frame);
        }
    }

    /// Dispatch anything still buffered and tell the handler the stream ended
    pub fn finish(&mut self) {
        for frame in self.decoder.flush() {
            self.handler.handle(&frame);
        }
        self.handler.finish();
    }
}

#[async_trait]
impl<H: EventHandler + Send> EventSink for StreamConsumer<H> {
    async fn send(&mut self, bytes: Bytes) -> Result<(), SinkError> {
        self.feed(&bytes);
        Ok(())
    }
}

impl<H: EventHandler> io::Write for StreamConsumer<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf);
        Ok(buf.len())
    }

    /// Frames are dispatched as soon as they complete; an unterminated tail
    /// is only processed by [`StreamConsumer::finish`]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
