mod api;
mod bootstrap;
mod cli;
mod doctor;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use discuss_domain::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = Cli::parse();

    match parsed.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            let passed = doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("discuss {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,discuss_gateway=debug")))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("discuss gateway starting");

    let state = bootstrap::build_app_state(config.clone()).context("building application state")?;
    bootstrap::spawn_background_tasks(&state);
    let shutdown_state = state.clone();

    let app = api::router().layer(CorsLayer::permissive()).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding to {}", config.server.bind_addr))?;

    tracing::info!(addr = %config.server.bind_addr, "discuss gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received, flushing active discussions to disk");
            let active = shutdown_state.orchestrator.active_discussions();
            shutdown_state.store.autosave(&active);
        })
        .await
        .context("axum server error")?;

    tracing::info!("discuss gateway stopped");
    Ok(())
}
