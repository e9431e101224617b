use std::io::ErrorKind;
use std::sync::Arc;

use agentline::{builtin, providers::base::Provider, providers::factory, tool::ToolRegistry};
use anyhow::bail;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod configuration;
mod error;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let provider: Arc<dyn Provider> =
        Arc::from(factory::get_provider(settings.provider.into_config()?)?);
    let tools = ToolRegistry::new().with(builtin::weather())?;
    let state = state::AppState::new(provider, tools, settings.agent.into_config());

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => bail!(
            "port {} is already in use, stop the process holding it or set AGENTLINE_SERVER__PORT",
            addr.port()
        ),
        Err(e) => return Err(e.into()),
    };
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
