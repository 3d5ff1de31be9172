use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub guidance: GuidanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Location of the workflow definition document
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    pub path: String,
}

/// Guidance document store to consult for step help
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceProviderKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub provider: GuidanceProviderKind,

    /// YAML/JSON list of documents for the in-memory provider
    pub documents_path: Option<String>,

    pub database_url: Option<String>,

    pub table_name: String,

    /// Upper bound for a single lookup; on expiry the turn continues without help
    pub timeout_ms: u64,

    pub max_help_chars: usize,

    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_capacity: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            path: "workflows/export_batteries_MY_to_HK_v1.yaml".to_string(),
        }
    }
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            provider: GuidanceProviderKind::default(),
            documents_path: None,
            database_url: None,
            table_name: "documents".to_string(),
            timeout_ms: 3000,
            max_help_chars: 400,
            cache_enabled: true,
            cache_ttl_secs: 300,
            cache_max_capacity: 1000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
