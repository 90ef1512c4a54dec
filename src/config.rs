//! Command-line configuration for the terminal frontend.

use std::path::PathBuf;

use clap::Parser;

use crate::{PlaygroundConfig, Result};

/// Command-line arguments for the playground
#[derive(Debug, Clone, Parser)]
#[command(name = "codelab")]
#[command(about = "HTML/CSS/JS playground with a sandboxed live preview")]
#[command(version)]
pub struct Args {
    /// Storage file holding the snapshot
    #[arg(long, help = "Path of the JSON storage file")]
    pub store: Option<PathBuf>,

    /// Key the snapshot is stored under
    #[arg(long, help = "Storage key (default: minimalist-code-lab-final)")]
    pub key: Option<String>,

    /// Keep the snapshot in memory only
    #[arg(long, conflicts_with = "store")]
    pub memory: bool,

    /// Copy into an in-process clipboard instead of the system one
    #[arg(long)]
    pub no_clipboard: bool,

    #[arg(long, help = "Timeout for preview scripts in milliseconds")]
    pub script_timeout_ms: Option<u64>,

    /// Log filter; falls back to RUST_LOG, then "warn"
    #[arg(long, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Render the preview without running scripts
    #[arg(long)]
    pub no_scripts: bool,
}

impl PlaygroundConfig {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(&Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = PlaygroundConfig::default();
        if let Some(path) = &args.store {
            config.store_path = path.clone();
        }
        if let Some(key) = &args.key {
            config.storage_key = key.clone();
        }
        if let Some(ms) = args.script_timeout_ms {
            config.script_timeout_ms = ms;
        }
        if args.no_scripts {
            config.sandbox.allow_scripts = false;
        }
        config.validate()?;
        Ok(config)
    }
}
