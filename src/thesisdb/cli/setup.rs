use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "THESISDB_LOG";
pub const HOME_ENV: &str = "THESISDB_HOME";

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2026-10-19 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "thesisdb", bin_name = "thesisdb", version = get_version())]
#[command(about = "Inspect and maintain a thesisdb data directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (defaults to $THESISDB_HOME, then the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose diagnostics on stderr (-vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and any missing resource files
    Init,

    /// Health of every resource: records, read source, backups, lock
    Status,

    /// Print a resource as JSON
    Show {
        /// Resource name (students, teachers, courses, thesis, defended, notifications)
        resource: String,
    },

    /// List backup snapshots of a resource, newest first
    Backups { resource: String },

    /// Rewrite a corrupt resource from its newest readable backup
    Recover { resource: String },

    /// Reset a resource to empty (previous content is kept as a backup)
    Purge {
        resource: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Record a notification
    Notify {
        event: String,

        /// JSON object payload
        #[arg(long)]
        payload: Option<String>,

        /// debug, info, warn, error or success
        #[arg(long)]
        level: Option<String>,

        #[arg(long)]
        actor: Option<String>,

        #[arg(long)]
        topic: Option<String>,
    },

    /// Show recent notifications, newest last
    Notifications {
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,

        /// Only this event
        #[arg(long)]
        event: Option<String>,
    },

    /// Copy a file into the attachment store
    Attach {
        file: PathBuf,

        /// Stored file name (defaults to the source name)
        #[arg(long)]
        name: Option<String>,

        /// Always store a new copy, even if identical content exists
        #[arg(long)]
        no_dedupe: bool,
    },
}

/// Install the stderr `tracing` subscriber.
///
/// Priority: `THESISDB_LOG` > `RUST_LOG` > `-v`/`-q` > `warn`.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = build_env_filter(verbose, quiet);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .without_time()
        .compact();
    // A second init (tests driving `run` twice) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

fn build_env_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = level_for(verbose, quiet);
    EnvFilter::new(level.as_str())
}

fn level_for(verbose: u8, quiet: bool) -> Level {
    match (verbose, quiet) {
        (0, true) => Level::ERROR,
        (0, false) => Level::WARN,
        (1, _) => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_purge_with_yes() {
        let cli = Cli::parse_from(["thesisdb", "--data-dir", "/tmp/x", "purge", "thesis", "-y"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Purge { resource, yes } => {
                assert_eq!(resource, "thesis");
                assert!(yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_notify_options() {
        let cli = Cli::parse_from([
            "thesisdb", "notify", "approved", "--payload", "{}", "--level", "success", "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Notify { ref level, .. } if level.as_deref() == Some("success")
        ));
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0, false), Level::WARN);
        assert_eq!(level_for(0, true), Level::ERROR);
        assert_eq!(level_for(1, false), Level::DEBUG);
        assert_eq!(level_for(3, false), Level::TRACE);
    }
}
