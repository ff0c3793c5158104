use std::sync::Arc;
use std::time::Duration;

use concierge_core::config::{AppConfig, ConfigError, LoadOptions};
use concierge_router::engines::EngineCache;
use concierge_router::orchestrator::RoutingOrchestrator;
use thiserror::Error;
use tracing::info;

use crate::ollama::OllamaEngineFactory;

pub struct Application {
    pub config: AppConfig,
    pub engines: Arc<EngineCache>,
    pub orchestrator: Arc<RoutingOrchestrator>,
    pub probe_http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let factory = OllamaEngineFactory::from_config(&config).map_err(BootstrapError::HttpClient)?;
    let engines = Arc::new(EngineCache::new(config.engines.capacity, Arc::new(factory)));
    let orchestrator = Arc::new(RoutingOrchestrator::new(Arc::clone(&engines), &config));

    let probe_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    info!(
        event_name = "system.bootstrap.engines_ready",
        model = config.llm.model.as_str(),
        safety_model = %config.llm.safety_model,
        capacity = config.engines.capacity,
        "engine cache initialized"
    );

    Ok(Application { config, engines, orchestrator, probe_http })
}

#[cfg(test)]
mod tests {
    use concierge_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[test]
    fn bootstrap_succeeds_with_default_configuration() {
        let app = bootstrap(LoadOptions::default()).expect("defaults should bootstrap");
        assert_eq!(app.config.llm.model.as_str(), "mistral");
        assert_eq!(app.config.engines.capacity, 4);
    }

    #[test]
    fn bootstrap_fails_fast_on_invalid_configuration() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                log_level: Some("verbose".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("invalid log level should fail").to_string();
        assert!(message.contains("logging.level"));
    }
}
