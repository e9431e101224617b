//! These models represent the objects passed around by the agent
//!
//! The conversation history uses the chat-completions message shape directly, since
//! every provider we talk to speaks a dialect of it. Streaming events sent to the
//! interface live in [`crate::protocol`] instead.
pub mod message;
pub mod tool;
