//! Command-line client for the network management API.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod render;

use std::io::{self, Write};
use std::process::ExitCode;

use chrono::Local;
use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueEnum};
use nbctl_api::{DEFAULT_API_URL, ManagementApi, Namespace};
use nbctl_api_http::HttpClient;
use nbctl_migrate::duration::{self, SETUP_KEY_BOUNDS};
use nbctl_migrate::{MigrationTask, MigrationUnit, Mode, Options, Outcome, execute, plan};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client construction error
    #[error(transparent)]
    Api(#[from] nbctl_api::Error),

    /// Migration error
    #[error(transparent)]
    Migrate(#[from] nbctl_migrate::Error),

    /// Writing to stdout failed
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    /// Encoding the JSON report failed
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "nbctl", version, about, long_about = None)]
struct Args {
    /// Log more (-v info, -vv debug). `RUST_LOG` takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move a peer, or every peer of a group, to another account
    Migrate(MigrateArgs),
}

/// Report format
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Human-readable blocks
    Text,

    /// One JSON document
    Json,
}

#[derive(Debug, clap::Args)]
#[command(group(ArgGroup::new("unit").required(true).args(["peer", "group"])))]
struct MigrateArgs {
    /// API token of the account the peer is leaving
    #[arg(long, env = "NBCTL_SOURCE_TOKEN", hide_env_values = true)]
    source_token: String,

    /// API token of the account the peer is joining
    #[arg(long, env = "NBCTL_DEST_TOKEN", hide_env_values = true)]
    dest_token: String,

    /// ID of the peer to migrate
    #[arg(long)]
    peer: Option<String>,

    /// Name or ID of a source group whose peers are all migrated
    #[arg(long)]
    group: Option<String>,

    /// Source API endpoint
    #[arg(long, default_value = DEFAULT_API_URL, env = "NBCTL_SOURCE_URL")]
    source_url: Url,

    /// Destination API endpoint
    #[arg(long, default_value = DEFAULT_API_URL, env = "NBCTL_DEST_URL")]
    dest_url: Url,

    /// Create groups missing from the destination
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    create_groups: bool,

    /// Setup key lifetime, e.g. 24h or 7d
    #[arg(long, default_value = "24h", env = "NBCTL_KEY_EXPIRY")]
    key_expiry: String,

    /// Remind about removing the source peers. Nothing is deleted
    #[arg(long)]
    cleanup: bool,

    /// Look everything up without creating groups or keys
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl MigrateArgs {
    fn unit(&self) -> Result<MigrationUnit, nbctl_migrate::Error> {
        match (self.peer.as_deref(), self.group.as_deref()) {
            (Some(id), None) if !id.trim().is_empty() => Ok(MigrationUnit::Peer(id.to_string())),
            (None, Some(group)) if !group.trim().is_empty() => {
                Ok(MigrationUnit::Group(group.to_string()))
            }
            _ => Err(nbctl_migrate::Error::Validation(
                "exactly one non-empty --peer or --group is required".to_string(),
            )),
        }
    }

    fn validate_tokens(&self) -> Result<(), nbctl_migrate::Error> {
        for (flag, token) in [
            ("--source-token", &self.source_token),
            ("--dest-token", &self.dest_token),
        ] {
            if token.trim().is_empty() {
                return Err(nbctl_migrate::Error::Validation(format!(
                    "{flag} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn migrate(args: &MigrateArgs) -> Result<Outcome, Error> {
    // Everything that can be checked locally is checked before the first request.
    let expires_in_seconds = duration::parse(&args.key_expiry, Some(SETUP_KEY_BOUNDS))?;
    let unit = args.unit()?;
    args.validate_tokens()?;

    let source = HttpClient::new(Namespace::new(args.source_url.clone(), &args.source_token))?;
    let destination = HttpClient::new(Namespace::new(args.dest_url.clone(), &args.dest_token))?;

    let peers = plan(&source, &unit)?;
    info!(peers = peers.len(), "planned migration");

    let options = Options {
        mode: Mode::from(&unit),
        create_groups: args.create_groups,
        expires_in_seconds,
        date: Local::now().date_naive(),
        dry_run: args.dry_run,
    };
    let tasks = peers.into_iter().map(MigrationTask::new).collect();
    let report = execute(tasks, source.namespace(), &destination, &options)?;

    let mut out = io::stdout().lock();
    match args.output {
        OutputFormat::Text => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            render::text(&mut out, &report, args.cleanup)?;
        }
        OutputFormat::Json => render::json(&mut out, &report, args.cleanup)?,
    }
    out.flush()?;

    Ok(report.outcome())
}

const fn exit_status(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Completed | Outcome::DryRun => 0,
        Outcome::PartialFailure => 2,
        Outcome::Failed => 1,
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Migrate(args) => match migrate(&args) {
            Ok(outcome) => ExitCode::from(exit_status(outcome)),
            Err(e) => {
                debug!(error = ?e, "migration aborted");
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec![
            "nbctl",
            "migrate",
            "--source-token",
            "src",
            "--dest-token",
            "dst",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    fn migrate_args(extra: &[&str]) -> MigrateArgs {
        match parse(extra).unwrap().command {
            Command::Migrate(args) => args,
        }
    }

    #[test]
    fn test_defaults() {
        let args = migrate_args(&["--peer", "p1"]);

        assert!(args.create_groups);
        assert!(!args.cleanup);
        assert_eq!(args.key_expiry, "24h");
        assert_eq!(args.dest_url.as_str().trim_end_matches('/'), DEFAULT_API_URL);
        assert_eq!(args.output, OutputFormat::Text);
        assert_eq!(args.unit().unwrap(), MigrationUnit::Peer("p1".to_string()));
    }

    #[test]
    fn test_peer_and_group_are_exclusive() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--peer", "p1", "--group", "eng"]).is_err());
    }

    #[test]
    fn test_explicit_flags() {
        let args = migrate_args(&[
            "--group",
            "eng",
            "--create-groups",
            "false",
            "--key-expiry",
            "7d",
            "--dest-url",
            "https://mgmt.example.com/api",
            "--output",
            "json",
            "--cleanup",
        ]);

        assert!(!args.create_groups);
        assert!(args.cleanup);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.unit().unwrap(), MigrationUnit::Group("eng".to_string()));
    }

    #[test]
    fn test_bare_create_groups_flag() {
        let args = migrate_args(&["--peer", "p1", "--create-groups"]);
        assert!(args.create_groups);

        let args = migrate_args(&["--create-groups", "--peer", "p1"]);
        assert!(args.create_groups);
        assert_eq!(args.unit().unwrap(), MigrationUnit::Peer("p1".to_string()));

        let args = migrate_args(&["--peer", "p1", "--create-groups", "false"]);
        assert!(!args.create_groups);
    }

    #[test]
    fn test_local_validation_happens_first() {
        let args = migrate_args(&["--peer", "p1", "--key-expiry", "30m"]);
        assert!(matches!(
            migrate(&args),
            Err(Error::Migrate(nbctl_migrate::Error::Validation(_)))
        ));

        let args = migrate_args(&["--peer", " "]);
        assert!(matches!(
            migrate(&args),
            Err(Error::Migrate(nbctl_migrate::Error::Validation(_)))
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_status(Outcome::Completed), 0);
        assert_eq!(exit_status(Outcome::DryRun), 0);
        assert_eq!(exit_status(Outcome::PartialFailure), 2);
        assert_eq!(exit_status(Outcome::Failed), 1);
    }
}
