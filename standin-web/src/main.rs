//! Standin Web Server
//!
//! Serves the authentication emulation layer over HTTP.

use clap::Parser;
use standin_core::{init_logging, StandinConfig};
use standin_web::StandinServerBuilder;
use std::path::PathBuf;

/// Standin Web Server - local authentication emulation
#[derive(Parser)]
#[command(name = "standin-web")]
#[command(about = "Local stand-in for a hosted identity provider")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode (selects mock identities for non-production hosts)
    #[arg(long)]
    dev: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = StandinConfig::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging)?;

    let mut builder = StandinServerBuilder::new(config);
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if args.dev {
        builder = builder.dev_mode(true);
    }

    let server = builder.build()?;
    server.start().await?;
    Ok(())
}
