//! Marksite - A static site generator for markdown content.

mod build;
mod cli;
mod compiler;
mod config;
mod logger;
mod output;
mod serve;
mod utils;
mod watch;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use output::OutputGate;
use serve::serve_site;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(cli)?));
    let gate: &'static OutputGate = Box::leak(Box::new(OutputGate::new(&config.paths())));

    match &cli.command {
        Commands::Build => build_site(config, gate).map(|_| ()),
        Commands::Serve { .. } => {
            build_site(config, gate).context("Initial build failed")?;
            serve_site(config, gate)
        }
    }
}
