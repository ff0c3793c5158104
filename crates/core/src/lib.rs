pub mod config;
pub mod domain;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, ModelId};
pub use domain::decision::{ResponsePayload, RoutingDecision};
pub use domain::intent::{IntentLabel, IntentResult};
pub use domain::moderation::{ModerationResult, SafetySeverity, SafetyVerdict};
