//! The Metaverse full node binary: loads configuration, wires up the
//! store/organizer/network stack, and runs until signaled to stop.

mod cli;
mod config;
mod node;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::NodeConfig;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::GenerateConfig { output } => {
            let config = NodeConfig::default();
            std::fs::write(&output, config.to_toml()?)?;
            println!("wrote default config to {}", output.display());
            Ok(())
        }
        Command::Start { config } => {
            let config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };

            init_tracing(&config.log_filter);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(node::run(config))
        }
    }
}

fn init_tracing(filter: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
