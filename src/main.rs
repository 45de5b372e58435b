mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use lp_core::config::Config;
use lp_media::{CompressionSettings, Compressor};
use lp_pipeline::{run_backfill, BackfillOptions, FallbackAsset, FsResolver};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults based on the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "locpix=trace,lp_core=trace,lp_media=trace,lp_pipeline=trace,lp_server=trace,lp_db=debug,tower_http=debug".to_string()
        } else {
            "locpix=info,lp_media=info,lp_pipeline=info,lp_server=info,lp_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(lp_server::start(config))?;
            Ok(())
        }
        Commands::Backfill {
            dry_run,
            legacy_root,
        } => backfill(cli.config.as_deref(), dry_run, legacy_root.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("locpix {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Strict when the file exists, defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.exists() => {
            Config::load(p).with_context(|| format!("Failed to load config {}", p.display()))
        }
        other => Ok(Config::load_or_default(other)),
    }
}

fn backfill(config_path: Option<&Path>, dry_run: bool, legacy_root: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = config.server.db_path.to_string_lossy();
    let pool = lp_db::pool::init_pool(&db_path)
        .with_context(|| format!("Failed to open database {db_path}"))?;

    let root = legacy_root.unwrap_or(config.images.legacy_root.as_path());
    let resolver = FsResolver::new(root);
    let compressor = Compressor::new(CompressionSettings::from(&config.images));
    let fallback = FallbackAsset::load(&config.images);

    tracing::info!("Resolving legacy images under {}", root.display());
    let report = run_backfill(
        &pool,
        &compressor,
        &resolver,
        &fallback,
        BackfillOptions { dry_run },
    )?;

    println!("{report}");
    if report.fallback_applied > 0 {
        println!("  Fallback applied: {}", report.fallback_applied);
    }
    if report.failed > 0 {
        anyhow::bail!("{} records could not be written", report.failed);
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p).with_context(|| format!("Failed to load config {}", p.display()))?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!(
        "  Images: quality {}, max {}px, thumbnails {}px",
        config.images.quality, config.images.max_dimension, config.images.thumbnail_size
    );
    println!("  Legacy root: {}", config.images.legacy_root.display());

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
