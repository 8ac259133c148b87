use clap::Parser;
use model_lifecycle_service::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Serve => cli::serve::run(config).await,
        Command::Rest => cli::rest::run(config).await,
        Command::Grpc => cli::grpc::run(config).await,
    }
}
