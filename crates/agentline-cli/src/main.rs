use std::env;
use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agentline::agent::{Agent, AgentConfig, DEFAULT_MAX_ROUND_TRIPS};
use agentline::builtin;
use agentline::providers::base::Provider;
use agentline::providers::configs::{OpenAiProviderConfig, ProviderConfig};
use agentline::providers::factory::get_provider;
use agentline::tool::ToolRegistry;

mod prompt;
mod renderer;
mod session;
mod spinner;

use prompt::rustyline::RustylinePrompt;
use renderer::ConsoleHandler;
use session::Session;
use spinner::Spinner;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider to talk to
    #[arg(short, long, value_enum, default_value = "mistral")]
    provider: ProviderVariant,

    /// API key (can also be set via MISTRAL_API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use instead of the provider's default
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the chat-completions endpoint
    #[arg(long)]
    host: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Wait for complete responses instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// Model calls allowed per message, 0 for no limit
    #[arg(long, default_value_t = DEFAULT_MAX_ROUND_TRIPS)]
    max_round_trips: usize,

    /// Print the input each tool is called with
    #[arg(long)]
    show_tool_input: bool,

    /// Log more, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProviderVariant {
    Mistral,
    #[value(name = "openai")]
    OpenAi,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let provider: Arc<dyn Provider> = Arc::from(get_provider(provider_config(&cli)?)?);
    let tools = ToolRegistry::new().with(builtin::weather())?;
    let config = AgentConfig {
        streaming: !cli.no_stream,
        max_round_trips: (cli.max_round_trips > 0).then_some(cli.max_round_trips),
    };
    let provider_variant = cli.provider;
    let new_agent = move || {
        Agent::new(Box::new(provider.clone()))
            .with_config(config.clone())
            .with_span(tracing::info_span!("agent", provider = ?provider_variant))
            .with_tools(tools.clone())
    };

    if io::stdin().is_terminal() {
        let console = ConsoleHandler::new(io::stdout(), Spinner::stderr())
            .with_tool_input(cli.show_tool_input);
        let mut session = Session::new(new_agent, Box::new(RustylinePrompt::new()?), console);
        session.start().await
    } else {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        let input = input.trim();
        if input.is_empty() {
            bail!("no input on stdin");
        }
        let console = ConsoleHandler::new(io::stdout(), Spinner::hidden())
            .with_tool_input(cli.show_tool_input);
        let mut session = Session::new(new_agent, Box::new(NoPrompt), console);
        session.headless_start(input).await
    }
}

/// Piped sessions answer once and never ask for more
struct NoPrompt;

impl prompt::Prompt for NoPrompt {
    fn get_input(&mut self) -> Result<prompt::Input> {
        Ok(prompt::Input::command(prompt::InputType::Exit))
    }
}

fn provider_config(cli: &Cli) -> Result<ProviderConfig> {
    let (env_key, mut config) = match cli.provider {
        ProviderVariant::Mistral => ("MISTRAL_API_KEY", OpenAiProviderConfig::mistral("")),
        ProviderVariant::OpenAi => ("OPENAI_API_KEY", OpenAiProviderConfig::openai("")),
    };
    config.api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var(env_key).ok())
        .with_context(|| {
            format!(
                "API key must be provided via --api-key or {} environment variable",
                env_key
            )
        })?;
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(host) = &cli.host {
        config = config.with_host(host);
    }
    config.temperature = cli.temperature;

    Ok(match cli.provider {
        ProviderVariant::Mistral => ProviderConfig::Mistral(config),
        ProviderVariant::OpenAi => ProviderConfig::OpenAi(config),
    })
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["agentline", "--api-key", "secret"]);
        let ProviderConfig::Mistral(config) = provider_config(&cli).unwrap() else {
            panic!("expected the mistral provider");
        };
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, "mistral-small-latest");
        assert_eq!(cli.max_round_trips, DEFAULT_MAX_ROUND_TRIPS);
        assert!(!cli.no_stream);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "agentline",
            "-p",
            "openai",
            "--api-key",
            "secret",
            "-m",
            "gpt-4o-mini",
            "--host",
            "http://localhost:8080",
            "--no-stream",
        ]);
        let ProviderConfig::OpenAi(config) = provider_config(&cli).unwrap() else {
            panic!("expected the openai provider");
        };
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert!(cli.no_stream);
    }
}
