use crate::error::{to_env_var, ConfigError};
use agentline::agent::{AgentConfig, DEFAULT_MAX_ROUND_TRIPS};
use agentline::providers::configs::{OpenAiProviderConfig, ProviderConfig};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidAddress {
                addr: addr.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Mistral,
    OpenAi,
}

impl ProviderKind {
    /// Conventional variable holding this provider's key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::Mistral => "MISTRAL_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    /// Seconds without a streamed chunk before giving up, 0 waits forever
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

impl ProviderSettings {
    // Convert to the agentline ProviderConfig
    pub fn into_config(self) -> Result<ProviderConfig, ConfigError> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(self.kind.api_key_var()).ok())
            .ok_or_else(|| ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            })?;

        let mut config = match self.kind {
            ProviderKind::Mistral => OpenAiProviderConfig::mistral(api_key),
            ProviderKind::OpenAi => OpenAiProviderConfig::openai(api_key),
        };
        if let Some(host) = self.host {
            config = config.with_host(host);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        config.temperature = self.temperature;
        config.max_tokens = self.max_tokens;
        match self.idle_timeout_secs {
            Some(0) => config.idle_timeout = None,
            Some(secs) => config.idle_timeout = Some(Duration::from_secs(secs)),
            None => {}
        }

        Ok(match self.kind {
            ProviderKind::Mistral => ProviderConfig::Mistral(config),
            ProviderKind::OpenAi => ProviderConfig::OpenAi(config),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    pub streaming: bool,
    /// 0 lets the model call tools without limit
    pub max_round_trips: usize,
}

impl AgentSettings {
    pub fn into_config(self) -> AgentConfig {
        AgentConfig {
            streaming: self.streaming,
            max_round_trips: (self.max_round_trips > 0).then_some(self.max_round_trips),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.type", "mistral")?
            // Agent defaults
            .set_default("agent.streaming", true)?
            .set_default("agent.max_round_trips", DEFAULT_MAX_ROUND_TRIPS as u64)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("AGENTLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match &err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                },
                _ => ConfigError::Other(err),
            }
        })
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("AGENTLINE_") {
                env::remove_var(&key);
            }
        }
        env::remove_var("MISTRAL_API_KEY");
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("AGENTLINE_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 4096);
        assert_eq!(settings.provider.kind, ProviderKind::Mistral);
        assert!(settings.agent.streaming);
        assert_eq!(settings.agent.max_round_trips, DEFAULT_MAX_ROUND_TRIPS);

        let ProviderConfig::Mistral(config) = settings.provider.into_config().unwrap() else {
            panic!("Expected Mistral provider");
        };
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "mistral-small-latest");
        assert_eq!(config.host, "https://api.mistral.ai");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("AGENTLINE_SERVER__PORT", "8080");
        env::set_var("AGENTLINE_PROVIDER__TYPE", "openai");
        env::set_var("AGENTLINE_PROVIDER__API_KEY", "test-key");
        env::set_var("AGENTLINE_PROVIDER__HOST", "https://custom.openai.com");
        env::set_var("AGENTLINE_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("AGENTLINE_PROVIDER__TEMPERATURE", "0.8");
        env::set_var("AGENTLINE_PROVIDER__IDLE_TIMEOUT_SECS", "0");
        env::set_var("AGENTLINE_AGENT__STREAMING", "false");
        env::set_var("AGENTLINE_AGENT__MAX_ROUND_TRIPS", "0");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);

        let agent = settings.agent.into_config();
        assert!(!agent.streaming);
        assert_eq!(agent.max_round_trips, None);

        let ProviderConfig::OpenAi(config) = settings.provider.into_config().unwrap() else {
            panic!("Expected OpenAI provider");
        };
        assert_eq!(config.host, "https://custom.openai.com");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, Some(0.8));
        assert_eq!(config.idle_timeout, None);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_provider_key_fallback() {
        clean_env();
        env::set_var("MISTRAL_API_KEY", "from-mistral-var");

        let settings = Settings::new().unwrap();
        let ProviderConfig::Mistral(config) = settings.provider.into_config().unwrap() else {
            panic!("Expected Mistral provider");
        };
        assert_eq!(config.api_key, "from-mistral-var");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();

        let settings = Settings::new().unwrap();
        match settings.provider.into_config() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "AGENTLINE_PROVIDER__API_KEY");
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        assert_eq!(
            server_settings.socket_addr().unwrap().to_string(),
            "127.0.0.1:3000"
        );

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }
}
