mod api;
mod bootstrap;
mod health;
mod ollama;

use anyhow::Result;
use concierge_core::config::{AppConfig, LoadOptions};
use concierge_router::engines::EngineOptions;

fn init_logging(config: &AppConfig) {
    use concierge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    let api_state = api::ApiState {
        orchestrator: app.orchestrator.clone(),
        engines: app.engines.clone(),
        chat_options: EngineOptions {
            temperature: app.config.llm.temperature,
            num_ctx: app.config.llm.num_ctx,
        },
    };

    let router = api::router(api_state)
        .merge(health::router(app.probe_http.clone(), app.config.llm.base_url.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        model = app.config.llm.model.as_str(),
        "concierge-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(event_name = "system.server.stopping", "concierge-server stopping");
    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
