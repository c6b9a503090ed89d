//! Vitrine Daemon - Main entry point
//!
//! Serves the product catalog API, 3D model reports and the web viewer.

mod api;
mod config;
mod server;
mod state;
mod ws;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vitrine_core::{Catalog, ProductDraft};

#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(about = "Product catalog and 3D model viewer daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vitrine.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Import a JSON array of product drafts into the catalog and exit
    #[arg(long, value_name = "PATH")]
    seed: Option<PathBuf>,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Vitrine v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        catalog = %config.catalog.path,
        models = %config.assets.models,
        "Configuration loaded"
    );

    if let Some(seed) = args.seed {
        let count = seed_catalog(Path::new(&config.catalog.path), &seed)?;
        println!("Imported {} products into {}", count, config.catalog.path);
        return Ok(());
    }

    let state = state::AppState::new(config.clone())?;
    server::run(state, &config.daemon.bind, config.daemon.tls.as_ref()).await?;

    Ok(())
}

/// Import product drafts from a JSON file; nothing is written if any is invalid
fn seed_catalog(catalog_path: &Path, seed: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(seed)
        .with_context(|| format!("Failed to read seed file {}", seed.display()))?;
    let drafts: Vec<ProductDraft> = serde_json::from_str(&content)
        .with_context(|| format!("Seed file {} is not a JSON array of products", seed.display()))?;

    let mut catalog = Catalog::load_or_create(catalog_path)?;
    let imported = catalog.import_drafts(drafts)?;
    Ok(imported.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("seed.json");
        let catalog_path = dir.path().join("data").join("products.json");
        std::fs::write(
            &seed,
            r#"[
                {"name": "Chair", "price": 120, "category": "furniture", "model3d": "chair.glb"},
                {"name": "Drone", "price": 499.99, "category": "electronics", "model3d": "drone.glb"}
            ]"#,
        )
        .unwrap();

        assert_eq!(seed_catalog(&catalog_path, &seed).unwrap(), 2);
        assert_eq!(Catalog::load_or_create(&catalog_path).unwrap().len(), 2);
    }

    #[test]
    fn test_seed_rejects_invalid_batch() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("seed.json");
        let catalog_path = dir.path().join("products.json");
        std::fs::write(
            &seed,
            r#"[
                {"name": "Chair", "price": 120, "model3d": "chair.glb"},
                {"name": "", "price": 1, "model3d": "x.glb"}
            ]"#,
        )
        .unwrap();

        assert!(seed_catalog(&catalog_path, &seed).is_err());
        assert!(Catalog::load_or_create(&catalog_path).unwrap().is_empty());
    }
}
