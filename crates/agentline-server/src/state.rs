use std::sync::Arc;

use agentline::agent::{Agent, AgentConfig};
use agentline::providers::base::Provider;
use agentline::tool::ToolRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    agent_config: AgentConfig,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, agent_config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            agent_config,
        }
    }

    /// A fresh agent with an empty history, sharing the provider connection
    pub fn agent(&self) -> Agent {
        Agent::new(Box::new(self.provider.clone()))
            .with_config(self.agent_config.clone())
            .with_tools(self.tools.clone())
    }
}
