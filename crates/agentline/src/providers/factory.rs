use super::{base::Provider, configs::ProviderConfig, openai::OpenAiProvider};
use crate::errors::ProviderError;

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        // Mistral speaks the same chat-completions dialect
        ProviderConfig::Mistral(mistral_config) => {
            Ok(Box::new(OpenAiProvider::new(mistral_config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::OpenAiProviderConfig;

    #[test]
    fn test_get_provider_for_each_config() {
        assert!(get_provider(ProviderConfig::Mistral(OpenAiProviderConfig::mistral("key"))).is_ok());
        assert!(get_provider(ProviderConfig::OpenAi(OpenAiProviderConfig::openai("key"))).is_ok());
    }
}
