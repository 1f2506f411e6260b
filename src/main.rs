//! Vignette - open graph preview cards and html enrichment for static sites.

mod build;
mod capture;
mod cli;
mod config;
mod preview;
mod site;
mod style;
mod transform;
mod utils;

use anyhow::{Result, bail};
use build::{build_site, capture_site, generate_stage};
use capture::open_browser;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use std::path::Path;
use transform::transform_output;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Generate => generate_stage(&config).map(|_| ()),
        Commands::Transform { paths } => transform_output(&config, paths).map(|_| ()),
        Commands::Capture { .. } => capture_site(&config, open_browser).map(|_| ()),
        Commands::Build { .. } => build_site(&config, open_browser).map(|_| ()),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }

    let mut config = SiteConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
