use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "locpix")]
#[command(author, version, about = "Image ingestion and serving for map locations")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Populate missing images from legacy file references
    Backfill {
        /// Show what would be written without writing
        #[arg(long)]
        dry_run: bool,

        /// Directory legacy image paths are resolved against (overrides config)
        #[arg(long)]
        legacy_root: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config or defaults if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
