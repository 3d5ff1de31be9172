use thiserror::Error;

/// Errors raised by external collaborators (document stores, caches)
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let error = DomainError::configuration("guidance.database_url is required");
        assert_eq!(
            error.to_string(),
            "Configuration error: guidance.database_url is required"
        );
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("postgres", "connection refused");
        assert_eq!(
            error.to_string(),
            "Provider error: postgres - connection refused"
        );
    }}
