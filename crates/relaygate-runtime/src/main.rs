//! relaygate: host binary for the module gateway.
//! Builds a gateway from a JSON configuration file and keeps it running.

use clap::Parser;

mod builtin;
mod cli;
mod config;
mod run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("RELAYGATE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Run(opts) => {
            tracing::info!("relaygate starting");
            run::run(&opts.config).await?;
        }
        cli::Command::Check(opts) => {
            run::check(&opts.config, opts.json)?;
        }
    }

    Ok(())
}
