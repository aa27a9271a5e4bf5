// ocular-server/src/main.rs
mod cli;
mod commands;
mod logging;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use ocular_core::{OcularConfig, ToolRegistry};
use rmcp::{transport::io, ServiceExt};
use std::io::stdout;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands};
use crate::server::OcularServer;

async fn serve(config: &OcularConfig, registry: ToolRegistry) -> Result<()> {
    let server = OcularServer::new(config.server.name.clone(), registry);
    let ct = CancellationToken::new();

    info!(name = %config.server.name, "Starting MCP server on stdio");
    let running = server
        .serve_with_ct(io::stdio(), ct.clone())
        .await
        .context("Failed to start MCP server")?;

    let shutdown = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    let reason = running.waiting().await.context("MCP server task failed")?;
    info!(?reason, "MCP server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Config comes first: it decides the log level and directory.
    let (config, config_path) = match OcularConfig::discover(cli.config.as_deref()) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let (_guard, log_path) = match logging::init(cli.verbose, &config.logging) {
        Ok(initialized) => initialized,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    info!("Logging to stderr and {}", log_path.display());
    match &config_path {
        Some(path) => info!("Using configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let registry = ToolRegistry::from_config(&config);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, registry).await.map(|_| true),
        Commands::Run { tool, args, quiet } => {
            commands::run_once(&registry, &tool, &args, quiet, &mut stdout()).await
        }
        Commands::List { json } => commands::list_tools(&registry, json, &mut stdout()).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("Tool run finished with errors");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
