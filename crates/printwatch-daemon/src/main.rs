// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printwatchd: printer fleet health daemon.
//
// Entry point. Parses the command line, initialises logging, loads the
// configuration, and dispatches to a command handler.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use printwatch_core::error::Result;

use services::config_path;
use services::monitor_services::MonitorServices;

#[derive(Debug, Parser)]
#[command(name = "printwatchd", version, about = "Printer fleet health daemon")]
struct Cli {
    /// Configuration file (JSON).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `info,printwatch_monitor=trace`.
    /// Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Monitor the fleet until interrupted (default).
    Run,
    /// Run one reconciliation cycle and print device reports as JSON.
    Status {
        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,
    },
    /// Run one keep-warm pass now and print the outcome per device.
    KeepWarm,
    /// Validate the configuration and list the devices it defines.
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "printwatchd failed");
            eprintln!("printwatchd: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(flag: Option<&str>) {
    let filter = match flag {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let path = config_path::resolve(cli.config.as_deref());
    let services = MonitorServices::init(&path)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(services).await,
        Command::Status { pretty } => status(services, pretty).await,
        Command::KeepWarm => keep_warm(services).await,
        Command::CheckConfig => check_config(&services),
    }
}

async fn run(services: MonitorServices) -> Result<()> {
    info!(devices = services.fleet().len(), "printwatchd starting");
    let running = services.start();
    info!(keep_warm = running.keep_warm_running(), "schedulers started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; waiting for work in flight");
    running.shutdown().await;
    Ok(())
}

async fn status(services: MonitorServices, pretty: bool) -> Result<()> {
    let output = services.status_once().await?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");
    Ok(())
}

async fn keep_warm(services: MonitorServices) -> Result<()> {
    let pass = services.keep_warm_once().await?;
    if pass.results.is_empty() {
        info!("no device supports keep-warm");
    }
    println!("{}", serde_json::to_string_pretty(&pass)?);
    Ok(())
}

fn check_config(services: &MonitorServices) -> Result<()> {
    let listings = services.listings();
    println!(
        "configuration OK: {} device(s), update every {:?}",
        listings.len(),
        services.config().update_interval()
    );
    for device in listings {
        println!(
            "  {}  job_cleanup={} keep_warm={}",
            device.name, device.capabilities.job_cleanup, device.capabilities.keep_warm
        );
    }
    Ok(())
}
