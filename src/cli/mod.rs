//! CLI module for Evopath
//!
//! Provides commands:
//! - `search`: answer a query with Pareto path search
//! - `config`: print the effective configuration

use clap::{Parser, Subcommand};

pub mod config;
pub mod search;

/// Evopath Pareto path search CLI
#[derive(Parser, Debug)]
#[command(name = "evopath")]
#[command(about = "Evolve answer strategies and return the best answer")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query
    Search(search::SearchArgs),
    /// Print the effective configuration as TOML
    Config {
        /// Print the embedded defaults instead
        #[arg(long)]
        defaults: bool,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Search(args)) => search::run(args).await,
        Some(Commands::Config { defaults }) => config::run(defaults),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
