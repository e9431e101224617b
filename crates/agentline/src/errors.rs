use thiserror::Error;

/// Failures of the provider transport. These abort the current turn.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("api error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Stream(String),

    #[error("no data received for {0:?}")]
    Timeout(std::time::Duration),

    #[error("decode response: {0}")]
    Decode(String),
}

/// Failures while resolving or running a single tool call.
///
/// These never abort the loop: they are rendered into the tool-role message
/// so the model can see them and react.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    Execution(String),

    #[error("duplicate tool name: {0}")]
    Duplicate(String),
}

impl ToolError {
    /// Text stored as the tool message content for this failure.
    pub fn to_content(&self) -> String {
        format!("error: {}", self)
    }
}

/// Failures writing frames to the output sink.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("event sink closed")]
    Closed,

    #[error("write event: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end an external input cycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("stopped after {0} model round trips")]
    RoundTripLimit(usize),
}

pub type AgentResult<T> = Result<T, AgentError>;
