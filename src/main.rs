use clap::Parser;
use pmp_guided_workflow::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Validate(args) => cli::validate::run(args).await,
        Command::Session(args) => cli::session::run(args).await,
    }
}
