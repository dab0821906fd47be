// server/src/cli.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use models::medical::Role;
use rest_api::config::load_app_config;

// CLI entry point for the clinic visit server
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(version = "0.1.0")]
#[command(about = "Clinic visit scheduling and workflow server")]
pub struct CliArgs {
    /// YAML configuration file; `CLINIC_*` environment variables override it.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true, env = "CLINIC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the REST API
    Serve {
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,
    },
    /// Issue an access token for a staff member
    Token {
        #[arg(long = "sub", value_name = "STAFF_ID")]
        sub: String,
        #[arg(long = "username")]
        username: Option<String>,
        #[arg(long = "role", value_parser = parse_role)]
        role: Role,
        #[arg(long = "ttl-hours", default_value_t = security::DEFAULT_TOKEN_TTL_HOURS)]
        ttl_hours: i64,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal.");
}

pub async fn start_cli() -> Result<()> {
    run(CliArgs::parse()).await
}

pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = load_app_config(args.config.as_deref())?;

    match args.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.rest.port = port;
            }
            rest_api::start_server(config, shutdown_signal()).await
        }
        Commands::Token {
            sub,
            username,
            role,
            ttl_hours,
        } => {
            let token = security::issue_token(
                config.rest.jwt_secret.as_bytes(),
                &sub,
                username.as_deref(),
                role,
                chrono::Duration::hours(ttl_hours),
            )
            .context("Failed to issue token")?;
            println!("{}", token);
            Ok(())
        }
    }
}
