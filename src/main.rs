use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use orch::presentation::cli::commands::{
    AgentCommand, CreateCommand, DestroyCommand, ListCommand, StartCommand, StatusCommand,
    StopCommand, TailCommand,
};
use orch::presentation::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("orch=debug,info")
    } else {
        EnvFilter::new("orch=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Agent {
            bind,
            name,
            cpu,
            io,
            memory,
        } => {
            AgentCommand::execute(&cli.etcd, &cli.namespace, bind, name, *cpu, *io, *memory).await
        }
        Commands::Create { name, file } => {
            CreateCommand::execute(&cli.etcd, &cli.namespace, name, file).await
        }
        Commands::Destroy { name } => DestroyCommand::execute(&cli.etcd, &cli.namespace, name).await,
        Commands::List { name } => {
            ListCommand::execute(&cli.etcd, &cli.namespace, name.as_deref()).await
        }
        Commands::Status => StatusCommand::execute(&cli.etcd, &cli.namespace).await,
        Commands::Start { name } => StartCommand::execute(&cli.etcd, &cli.namespace, name).await,
        Commands::Stop { name } => StopCommand::execute(&cli.etcd, &cli.namespace, name).await,
        Commands::Tail { name, count } => {
            TailCommand::execute(&cli.etcd, &cli.namespace, name, *count).await
        }
    }
}
