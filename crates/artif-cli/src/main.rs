//! Artif CLI
//!
//! Resolve, fetch, publish and tag build artifacts in a binary-artifact
//! repository, and run the plugin components against a config bag.

mod commands;
mod config;

use anyhow::Result;
use artif_core::browse::DEFAULT_MAX_DEPTH;
use artif_core::{Environment, ServerConfig};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use commands::Session;
use config::SettingsManager;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "artif")]
#[command(author, version, about = "Artif - resolve and publish build artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Repository API address, e.g. https://server.com:8081/artifactory/api
    #[arg(long, global = true)]
    server: Option<String>,

    /// Access token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the latest artifact whose name contains NAME
    Resolve {
        name: String,

        /// Extension to match (default .vmxt)
        #[arg(short = 't', long)]
        file_type: Option<String>,

        /// Release channel, required as a `channel` property
        #[arg(short, long)]
        channel: Option<String>,

        /// Required property, repeatable
        #[arg(short, long = "property", value_name = "KEY=VALUE")]
        properties: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find repository paths whose name contains NAME
    #[command(name = "find-path")]
    FindPath {
        name: String,

        /// Deepest folder level searched below a repository root
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// List repositories
    Repos,

    /// List the contents of a repository folder
    Children {
        /// Item path, e.g. images/win22
        path: String,
    },

    /// Read, assign or remove artifact properties
    Props {
        #[command(subcommand)]
        action: PropsAction,
    },

    /// Download an artifact
    Download {
        /// Download URI
        uri: String,

        /// Destination directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Upload a file into a repository folder
    Upload {
        /// Local file
        source: PathBuf,

        /// Repository folder, e.g. /images/win22/
        target: String,

        /// Inserted before the extension as name-SUFFIX.ext
        #[arg(short, long)]
        suffix: Option<String>,
    },

    /// Delete an artifact
    Delete {
        /// Download URI or storage URI
        uri: String,
    },

    /// Run a data source or post-processor
    Run {
        /// Component name (default: source-image)
        component: Option<String>,

        /// YAML or JSON config bag
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List available components
    Components,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PropsAction {
    /// Show properties, optionally only the given keys
    Get { uri: String, keys: Vec<String> },
    /// Assign KEY=VALUE pairs
    Set {
        uri: String,
        #[arg(required = true, value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
    /// Remove keys
    Delete {
        uri: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the repository API address
    SetServer { url: String },
    /// Save the access token
    SetToken { token: String },
    /// Set the per-request timeout in seconds
    SetTimeout { secs: u64 },
    /// Set the default download directory
    SetOutputDir { dir: String },
    /// Set the default log level
    SetLogLevel { level: String },
    /// Show current configuration
    Show,
    /// Reset to default configuration
    Reset,
}

/// `--verbose`, then the config bag, then the environment, then settings
fn log_level(verbose: bool, configured: &[Option<&str>]) -> String {
    if verbose {
        return "debug".to_string();
    }
    configured
        .iter()
        .flatten()
        .map(|l| l.trim().to_lowercase())
        .find(|l| !l.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn log_filter(level: &str) -> EnvFilter {
    let directives = format!("warn,artif={0},artif_core={0},artif_adapters={0}", level);
    EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new("warn,artif=info,artif_core=info,artif_adapters=info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = Environment::capture();
    let settings = SettingsManager::load()?;

    // The run command's config bag may carry its own log level
    let mut run_config = None;
    if let Commands::Run { config, .. } = &cli.command {
        run_config = Some(commands::run::load_config(config.as_deref())?);
    }
    let bag_level = run_config.as_ref().and_then(commands::run::config_log_level);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&log_level(
            cli.verbose,
            &[
                bag_level.as_deref(),
                env.log_level(),
                Some(settings.log_level.as_str()),
            ],
        )))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Starting artif");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let mut flags = ServerConfig::new(
        cli.connection.server.unwrap_or_default(),
        cli.connection.token.unwrap_or_default(),
    );
    flags.timeout_secs = cli.connection.timeout;
    let session = Session::new(flags, env, settings, cancel);

    let result = match cli.command {
        Commands::Resolve {
            name,
            file_type,
            channel,
            properties,
            json,
        } => {
            commands::resolve::run(
                &session,
                commands::resolve::ResolveOptions {
                    name,
                    file_type,
                    channel,
                    properties,
                    json,
                },
            )
            .await
        }
        Commands::FindPath { name, max_depth } => {
            commands::browse::find_path(&session, &name, max_depth).await
        }
        Commands::Repos => commands::browse::repos(&session).await,
        Commands::Children { path } => commands::browse::children(&session, &path).await,
        Commands::Props { action } => match action {
            PropsAction::Get { uri, keys } => commands::props::get(&session, &uri, &keys).await,
            PropsAction::Set { uri, properties } => {
                commands::props::set(&session, &uri, &properties).await
            }
            PropsAction::Delete { uri, keys } => {
                commands::props::delete(&session, &uri, &keys).await
            }
        },
        Commands::Download { uri, output_dir } => {
            commands::transfer::download(&session, &uri, output_dir).await
        }
        Commands::Upload {
            source,
            target,
            suffix,
        } => commands::transfer::upload(&session, source, &target, suffix).await,
        Commands::Delete { uri } => commands::transfer::delete(&session, &uri).await,
        Commands::Run { component, .. } => {
            let raw = run_config.unwrap_or_else(|| serde_json::Value::Object(Default::default()));
            commands::run::execute(&session, component.as_deref(), raw).await
        }
        Commands::Components => commands::components::list(),
        Commands::Config { action } => match action {
            ConfigAction::SetServer { url } => commands::config::set_server(&url).await,
            ConfigAction::SetToken { token } => commands::config::set_token(&token).await,
            ConfigAction::SetTimeout { secs } => commands::config::set_timeout(secs).await,
            ConfigAction::SetOutputDir { dir } => commands::config::set_output_dir(&dir).await,
            ConfigAction::SetLogLevel { level } => commands::config::set_log_level(&level).await,
            ConfigAction::Show => commands::config::show().await,
            ConfigAction::Reset => commands::config::reset().await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "artif", "resolve", "win22", "-t", "ova", "-p", "release=1", "--server", "http://h/api",
        ])
        .unwrap();
        assert_eq!(cli.connection.server.as_deref(), Some("http://h/api"));
        let Commands::Resolve {
            name, properties, ..
        } = cli.command
        else {
            panic!("expected resolve");
        };
        assert_eq!(name, "win22");
        assert_eq!(properties, vec!["release=1"]);
    }

    #[test]
    fn test_parse_delete() {
        let cli = Cli::try_parse_from(["artif", "delete", "http://h/artifactory/images/a.ova"])
            .unwrap();
        let Commands::Delete { uri } = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(uri, "http://h/artifactory/images/a.ova");

        assert!(Cli::try_parse_from(["artif", "delete"]).is_err());
    }

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(log_level(true, &[Some("error")]), "debug");
        assert_eq!(log_level(false, &[None, Some("ERROR"), Some("debug")]), "error");
        assert_eq!(log_level(false, &[None, Some(" ")]), "info");
    }
}
