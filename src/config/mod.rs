//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, GuidanceConfig, GuidanceProviderKind, LogFormat, LoggingConfig, ServerConfig,
    WorkflowConfig,
};
