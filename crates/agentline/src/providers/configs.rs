use std::time::Duration;

pub const MISTRAL_HOST: &str = "https://api.mistral.ai";
pub const MISTRAL_MODEL: &str = "mistral-small-latest";
pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";

/// Longest silence tolerated while reading a streamed response
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Mistral(OpenAiProviderConfig),
}

/// Settings for any endpoint speaking the chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// `None` waits forever for the next chunk
    pub idle_timeout: Option<Duration>,
}

impl OpenAiProviderConfig {
    pub fn openai<S: Into<String>>(api_key: S) -> Self {
        Self::with_defaults(OPENAI_HOST, OPENAI_MODEL, api_key.into())
    }

    pub fn mistral<S: Into<String>>(api_key: S) -> Self {
        Self::with_defaults(MISTRAL_HOST, MISTRAL_MODEL, api_key.into())
    }

    fn with_defaults(host: &str, model: &str, api_key: String) -> Self {
        Self {
            host: host.to_string(),
            api_key,
            model: model.to_string(),
            temperature: None,
            max_tokens: None,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.host.trim_end_matches('/'))
    }
}
