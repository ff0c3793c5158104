use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub engines: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: ModelId,
    pub safety_model: String,
    pub temperature: f32,
    pub num_ctx: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub capacity: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Known general-purpose model identifiers. Anything outside this set is
/// rejected at the serde/config boundary and never reaches the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelId {
    Mistral,
    GptOss,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mistral => "mistral",
            Self::GptOss => "gpt-oss",
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::Mistral
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<ModelId>,
    pub retrieval_endpoint: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: ModelId::default(),
                safety_model: "llama-guard3".to_string(),
                temperature: 0.0,
                num_ctx: 2048,
                timeout_secs: 30,
            },
            retrieval: RetrievalConfig {
                endpoint: "http://localhost:8020".to_string(),
                timeout_secs: 60,
            },
            engines: EngineConfig { capacity: 4 },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for ModelId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mistral" => Ok(Self::Mistral),
            "gpt-oss" => Ok(Self::GptOss),
            other => Err(ConfigError::Validation(format!(
                "unsupported model id `{other}` (expected mistral|gpt-oss)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(safety_model) = llm.safety_model {
                self.llm.safety_model = safety_model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(num_ctx) = llm.num_ctx {
                self.llm.num_ctx = num_ctx;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(endpoint) = retrieval.endpoint {
                self.retrieval.endpoint = endpoint;
            }
            if let Some(timeout_secs) = retrieval.timeout_secs {
                self.retrieval.timeout_secs = timeout_secs;
            }
        }

        if let Some(engines) = patch.engines {
            if let Some(capacity) = engines.capacity {
                self.engines.capacity = capacity;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_MODEL") {
            self.llm.model = value.parse()?;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_SAFETY_MODEL") {
            self.llm.safety_model = value;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CONCIERGE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_NUM_CTX") {
            self.llm.num_ctx = parse_u32("CONCIERGE_LLM_NUM_CTX", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CONCIERGE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_RETRIEVAL_ENDPOINT") {
            self.retrieval.endpoint = value;
        }
        if let Some(value) = read_env("CONCIERGE_RETRIEVAL_TIMEOUT_SECS") {
            self.retrieval.timeout_secs = parse_u64("CONCIERGE_RETRIEVAL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_ENGINES_CAPACITY") {
            self.engines.capacity = parse_u32("CONCIERGE_ENGINES_CAPACITY", &value)? as usize;
        }

        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_PORT") {
            self.server.port = parse_u16("CONCIERGE_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("CONCIERGE_LOGGING_LEVEL").or_else(|| read_env("CONCIERGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CONCIERGE_LOGGING_FORMAT").or_else(|| read_env("CONCIERGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(retrieval_endpoint) = overrides.retrieval_endpoint {
            self.retrieval.endpoint = retrieval_endpoint;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_retrieval(&self.retrieval)?;
        validate_engines(&self.engines)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !is_http_url(&llm.base_url) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.safety_model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.safety_model must not be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.num_ctx == 0 {
        return Err(ConfigError::Validation(
            "llm.num_ctx must be greater than zero".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if !is_http_url(&retrieval.endpoint) {
        return Err(ConfigError::Validation(
            "retrieval.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if retrieval.timeout_secs == 0 || retrieval.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "retrieval.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_engines(engines: &EngineConfig) -> Result<(), ConfigError> {
    if engines.capacity == 0 || engines.capacity > 64 {
        return Err(ConfigError::Validation(
            "engines.capacity must be in range 1..=64".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
        ));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    retrieval: Option<RetrievalPatch>,
    engines: Option<EnginePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<ModelId>,
    safety_model: Option<String>,
    temperature: Option<f32>,
    num_ctx: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
