//! Standin CLI - inspect identity selection without running the server
//!
//! Shows which identity source a host would get, what each mock identity
//! resolves to, and the effective configuration.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use standin_auth::{
    ClientPrincipal, EnvironmentSwitch, Identity, MockMode, RoleAssignment, RoleResolver,
    SourceMode,
};
use standin_core::{init_logging, LoggingConfig, StandinConfig, StandinResult};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "standin")]
#[command(about = "Inspect the local authentication stand-in")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which identity source serves a host
    Mode {
        /// Request host, with or without port
        #[arg(long)]
        host: String,

        /// Treat the process as running in development mode
        #[arg(long)]
        dev: bool,
    },

    /// Print a mock identity and its role assignment
    Whoami {
        /// Mock mode; defaults to the configured or compiled default
        #[arg(long)]
        mode: Option<MockMode>,
    },

    /// Encode a provider principal header value for manual testing
    Principal {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        details: Option<String>,

        /// Role names, comma separated
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        #[arg(long, default_value = "aad")]
        provider: String,
    },

    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Debug, Serialize)]
struct ModeReport {
    host: String,
    mode: SourceMode,
    production_host: bool,
    dev_mode: bool,
    force_mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct WhoAmI {
    mock_mode: MockMode,
    identity: Identity,
    assignment: RoleAssignment,
    principal: Option<ClientPrincipal>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig {
        level: "warn".to_string(),
        filter_directives: Vec::new(),
        ..LoggingConfig::default()
    };
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config).context("Failed to initialize logging")?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mode { host, dev } => {
            let report = mode_report(&config, &host, dev)?;
            print_json(&report)?;
        }
        Commands::Whoami { mode } => {
            let report = whoami(&config, mode).await?;
            print_json(&report)?;
        }
        Commands::Principal {
            user_id,
            details,
            roles,
            provider,
        } => {
            let principal = ClientPrincipal {
                identity_provider: provider,
                user_details: details.unwrap_or_else(|| user_id.clone()),
                user_id,
                user_roles: roles,
            };
            println!("{}", principal.encode()?);
        }
        Commands::Config { format } => match format {
            ConfigFormat::Toml => println!("{}", toml::to_string_pretty(&config)?),
            ConfigFormat::Json => print_json(&config)?,
        },
    }

    Ok(())
}

/// Explicit path, else the first default location that exists, else
/// defaults plus environment.
fn load_config(config_path: Option<&Path>) -> StandinResult<StandinConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return StandinConfig::load(Some(path));
    }

    let default_paths = [
        Some(PathBuf::from("standin.toml")),
        dirs::config_dir().map(|d| d.join("standin").join("config.toml")),
    ];
    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return StandinConfig::load(Some(path));
        }
    }

    StandinConfig::load(None)
}

fn mode_report(config: &StandinConfig, host: &str, dev: bool) -> StandinResult<ModeReport> {
    let switch = EnvironmentSwitch::from_config(config)?;
    let host = host_without_port(host);

    let mut signals = EnvironmentSwitch::signals(config, Some(&host));
    signals.dev_flag |= dev;

    Ok(ModeReport {
        mode: switch.select_mode(&signals),
        production_host: switch.is_production_host(&host),
        host,
        dev_mode: signals.dev_flag,
        force_mode: config.environment.force_mode.clone(),
    })
}

async fn whoami(config: &StandinConfig, mode: Option<MockMode>) -> StandinResult<WhoAmI> {
    let mock_mode = match mode {
        Some(mode) => mode,
        None => config
            .mock
            .mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(standin_auth::MockModeResolver::COMPILED_DEFAULT),
    };

    let identity = mock_mode.identity();
    let assignment = RoleResolver::from_config(config)?
        .resolve_role(&identity)
        .await;

    Ok(WhoAmI {
        mock_mode,
        principal: identity.to_principal(),
        identity,
        assignment,
    })
}

fn host_without_port(host: &str) -> String {
    let ctx = standin_auth::RequestContext::new().with_host(host);
    ctx.host().unwrap_or(host).to_string()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use standin_auth::{ResolvedVia, Role};

    fn config() -> StandinConfig {
        let mut config = StandinConfig::default();
        config.environment.production_hosts = vec!["*.example.net".to_string()];
        config.server.dev_mode = true;
        config
    }

    #[test]
    fn mode_for_local_and_production_hosts() {
        let report = mode_report(&config(), "localhost:4280", false).unwrap();
        assert_eq!(report.host, "localhost");
        assert_eq!(report.mode, SourceMode::Mock);
        assert!(!report.production_host);

        let report = mode_report(&config(), "[::1]:4280", false).unwrap();
        assert_eq!(report.host, "::1");

        let report = mode_report(&config(), "app.example.net", true).unwrap();
        assert_eq!(report.mode, SourceMode::Provider);
        assert!(report.production_host);
        assert!(report.dev_mode);
    }

    #[test]
    fn configured_production_hosts_need_dev_flag_for_mock() {
        let mut config = config();
        config.server.dev_mode = false;

        let report = mode_report(&config, "localhost", false).unwrap();
        assert_eq!(report.mode, SourceMode::Provider);
        assert!(!report.production_host);

        let report = mode_report(&config, "localhost", true).unwrap();
        assert_eq!(report.mode, SourceMode::Mock);
    }

    #[tokio::test]
    async fn whoami_admin() {
        let report = whoami(&config(), Some(MockMode::Admin)).await.unwrap();
        assert_eq!(report.assignment.role, Role::Admin);
        assert_eq!(report.assignment.resolved_via, ResolvedVia::Header);
        assert_eq!(
            report.principal.unwrap().user_details,
            MockMode::ADMIN_EMAIL
        );
    }

    #[tokio::test]
    async fn whoami_falls_back_to_configured_mode() {
        let mut config = config();
        config.mock.mode = Some("user".to_string());
        let report = whoami(&config, None).await.unwrap();
        assert_eq!(report.mock_mode, MockMode::User);

        let report = whoami(&StandinConfig::default(), None).await.unwrap();
        assert_eq!(report.mock_mode, MockMode::Anonymous);
        assert!(report.principal.is_none());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["standin", "mode", "--host", "localhost", "--dev"]);
        assert!(matches!(cli.command, Commands::Mode { dev: true, .. }));

        let cli = Cli::parse_from(["standin", "whoami", "--mode", "admin"]);
        assert!(matches!(
            cli.command,
            Commands::Whoami {
                mode: Some(MockMode::Admin)
            }
        ));

        let cli = Cli::parse_from([
            "standin", "principal", "--user-id", "u1", "--roles", "admin,user",
        ]);
        match cli.command {
            Commands::Principal { roles, .. } => assert_eq!(roles, vec!["admin", "user"]),
            _ => panic!("expected principal"),
        }
    }
}
