//! CLI module for the guided workflow service
//!
//! Subcommands:
//! - `serve`: HTTP API
//! - `validate`: check a workflow document and print its outline
//! - `session`: walk through a workflow in the terminal

pub mod serve;
pub mod session;
pub mod validate;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Guided Workflow - declarative question/answer workflows with guidance
#[derive(Parser)]
#[command(name = "pmp-guided-workflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Load and validate a workflow document
    Validate(validate::ValidateArgs),

    /// Run an interactive session in the terminal
    Session(session::SessionArgs),
}

/// Load `.env` and the layered configuration, failing on malformed sources
pub fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::load().context("Failed to load configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_rejects_malformed_values() {
        // SAFETY: no other test reads APP__SERVER__PORT
        unsafe { std::env::set_var("APP__SERVER__PORT", "not-a-port") };
        let result = load_config();
        unsafe { std::env::remove_var("APP__SERVER__PORT") };

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
