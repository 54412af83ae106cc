//! Command-line surface.
//!
//! Grounded on the `clap::Parser`/`Subcommand` derive pattern other node
//! binaries elsewhere use for themselves; see `DESIGN.md` for the
//! reasoning behind picking `clap` here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(name = "mvsd", about = "Metaverse full node", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the node: open the store, start serving peers, run until
    /// signaled to stop.
    Start {
        /// Path to a TOML config file. Defaults are used if omitted.
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
    /// Write out a default config file and exit.
    GenerateConfig {
        /// Where to write the generated config.
        #[clap(short, long, default_value = "mvsd.toml")]
        output: PathBuf,
    },
}
