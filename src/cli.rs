//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vignette: open graph preview cards and html enrichment for static sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: vignette.toml)
    #[arg(short = 'C', long, default_value = "vignette.toml")]
    pub config: PathBuf,

    /// Rendered site directory (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content inventory file (relative to project root)
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Production build: keep preview pages out of the navigable site
    #[arg(short, long)]
    pub production: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared capture arguments for Capture and Build commands
#[derive(clap::Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Milliseconds to wait for web fonts after navigation
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// CSS selector of the captured element
    #[arg(long)]
    pub selector: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize preview pages and write `og_image` into the content inventory
    Generate,

    /// Rewrite rendered html (image links, heading anchors)
    Transform {
        /// Html files to rewrite; defaults to every html file in the output directory
        paths: Vec<PathBuf>,
    },

    /// Screenshot every preview page whose image is missing, then publish the images
    Capture {
        #[command(flatten)]
        capture_args: CaptureArgs,
    },

    /// Generate, transform and capture in one run
    Build {
        #[command(flatten)]
        capture_args: CaptureArgs,
    },
}

impl Cli {
    pub fn capture_args(&self) -> Option<&CaptureArgs> {
        match &self.command {
            Commands::Capture { capture_args } | Commands::Build { capture_args } => {
                Some(capture_args)
            }
            _ => None,
        }
    }
}
