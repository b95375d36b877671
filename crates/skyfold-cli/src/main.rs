//! Skyfold CLI - Command-line interface for the Skyfold sync engine
//!
//! Provides commands for:
//! - Browsing and fetching remote items
//! - Uploading, creating, moving and deleting remote items
//! - Inspecting pending changes and retrying failed uploads
//! - Managing the local file cache

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skyfold_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod session;

use commands::{
    cache::CacheCommand, get::GetCommand, ls::LsCommand, mkdir::MkdirCommand, mv::MvCommand,
    put::PutCommand, retry::RetryCommand, rm::RmCommand, status::StatusCommand,
};
use output::{get_formatter, OutputFormat};
use session::Session;

#[derive(Debug, Parser)]
#[command(name = "skyfold", version, about = "File provider sync engine")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List a remote folder
    Ls(LsCommand),
    /// Fetch a remote file into the local cache
    Get(GetCommand),
    /// Upload a local file
    Put(PutCommand),
    /// Create a remote folder
    Mkdir(MkdirCommand),
    /// Delete remote items
    Rm(RmCommand),
    /// Move or rename a remote item
    Mv(MvCommand),
    /// Show pending changes and cache usage
    Status(StatusCommand),
    /// Inspect and prune the local file cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Retry failed uploads
    Retry(RetryCommand),
}

impl Commands {
    /// Commands that only read local state skip resuming interrupted work
    fn resumes_pending(&self) -> bool {
        !matches!(self, Commands::Status(_) | Commands::Cache(_))
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };
    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok(config)
}

fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    match (verbose, quiet) {
        (0, true) => "error".to_string(),
        (0, false) => configured.to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // Setup tracing
    let filter = log_filter(cli.verbose, cli.quiet, &config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(format, cli.quiet);

    let session = Session::open(config).await?;
    if cli.command.resumes_pending() {
        session.resume().await?;
    }

    let result = match &cli.command {
        Commands::Ls(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Get(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Put(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Mkdir(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Rm(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Mv(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Status(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Cache(cmd) => cmd.execute(&session, format, &*formatter).await,
        Commands::Retry(cmd) => cmd.execute(&session, format, &*formatter).await,
    };
    if let Err(e) = result {
        formatter.error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["skyfold", "ls", "/docs", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ls(cmd) => assert_eq!(cmd.path, "/docs"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_defaults_to_root() {
        let cli = Cli::try_parse_from(["skyfold", "put", "notes.txt"]).unwrap();
        match cli.command {
            Commands::Put(cmd) => {
                assert_eq!(cmd.folder, "/");
                assert!(cmd.name.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cache_prune_flags() {
        let cli = Cli::try_parse_from(["skyfold", "cache", "prune", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheCommand::Prune { force: true })
        ));
        assert!(!cli.command.resumes_pending());
    }

    #[test]
    fn test_rm_requires_a_path() {
        assert!(Cli::try_parse_from(["skyfold", "rm"]).is_err());
    }

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(log_filter(0, false, "warn"), "warn");
        assert_eq!(log_filter(0, true, "warn"), "error");
        assert_eq!(log_filter(1, true, "warn"), "debug");
        assert_eq!(log_filter(3, false, "warn"), "trace");
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "transfers:\n  max_parallel_uploads: 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err().to_string();
        assert!(err.contains("transfers.max_parallel_uploads"), "{err}");
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "remote:\n  page_size: 25\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.remote.page_size, 25);
        assert_eq!(config.transfers.max_parallel_uploads, 2);
    }
}
