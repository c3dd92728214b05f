use clap::{Parser, Subcommand};

/// discuss — a multi-model discussion orchestrator.
#[derive(Debug, Parser)]
#[command(name = "discuss", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Print version information.
    Version,
}

/// Load configuration from the path named by `DISCUSS_CONFIG` (or
/// `config.toml` by default), falling back to built-in defaults when the
/// file is absent. Shared by `serve` and `doctor`.
pub fn load_config() -> anyhow::Result<(discuss_domain::config::Config, String)> {
    let config_path = std::env::var("DISCUSS_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let path = std::path::Path::new(&config_path);
    let config = discuss_domain::config::Config::load(Some(path))
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;
    Ok((config, config_path))
}
