//! Configuration management

use crate::hash::HashAlgorithm;
use crate::types::{Operation, SyncError};
use camino::Utf8PathBuf;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Connection settings shared read-only by every worker.
///
/// Each worker builds its own session from these.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransferSettings {
    /// Server endpoint, e.g. `https://webdav.example.com`
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for TransferSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Run configuration for davsync
#[derive(Debug, Clone)]
pub struct Config {
    /// Source root (local for uploads, remote for downloads)
    pub source: Utf8PathBuf,

    /// Destination root (remote for uploads, local for downloads)
    pub destination: Utf8PathBuf,

    /// Direction of the run
    pub operation: Operation,

    /// Remote connection settings
    pub settings: TransferSettings,

    /// Number of workers, one remote connection each
    pub workers: usize,

    /// Digest compared against remote entity tags
    pub hash: HashAlgorithm,

    /// Where the failure list is written
    pub failures_dir: PathBuf,

    /// Only enumerate and print the task list
    pub dry_run: bool,

    /// Draw a progress bar while transferring
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: Utf8PathBuf::new(),
            destination: Utf8PathBuf::from("/"),
            operation: Operation::Upload,
            settings: TransferSettings::default(),
            workers: default_workers(),
            hash: HashAlgorithm::default(),
            failures_dir: PathBuf::from("."),
            dry_run: false,
            show_progress: true,
        }
    }
}

/// Two workers per available core; transfers are mostly network bound.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

impl Config {
    /// Capacity of the task queue feeding the workers
    pub fn task_queue_capacity(&self) -> usize {
        self.workers.max(1) * 100
    }

    /// Capacity of the queue feeding the result aggregator
    pub fn result_queue_capacity(&self) -> usize {
        self.workers.max(1)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.source.as_str().is_empty() {
            return Err(SyncError::Config("Source path is required".to_string()));
        }

        if self.destination.as_str().is_empty() {
            return Err(SyncError::Config("Destination path is required".to_string()));
        }

        if self.settings.host.is_empty() {
            return Err(SyncError::Config("Remote host is required".to_string()));
        }

        if self.workers == 0 {
            return Err(SyncError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }

        if self.operation == Operation::Upload && !Path::new(self.source.as_str()).exists() {
            return Err(SyncError::Config(format!(
                "Source path does not exist: {}",
                self.source
            )));
        }

        Ok(())
    }
}

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "davsync", version, about = "Synchronize a local tree with a WebDAV server")]
pub struct Cli {
    /// File or directory to transfer
    #[arg(long)]
    pub from: Option<String>,

    /// Directory the source is placed under
    #[arg(long, default_value = "/")]
    pub to: String,

    /// Server endpoint URL
    #[arg(long)]
    pub host: Option<String>,

    /// Account name
    #[arg(long)]
    pub user: Option<String>,

    /// Account password
    #[arg(long, env = "DAVSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Upload the local source to the server
    #[arg(long)]
    pub upload: bool,

    /// Download the remote source to the local machine
    #[arg(long)]
    pub download: bool,

    /// Number of parallel workers
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Digest compared against the server's entity tags
    #[arg(long, value_enum)]
    pub hash: Option<HashAlgorithm>,

    /// TOML file with connection settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the failure list is written to
    #[arg(long, default_value = ".")]
    pub failures_dir: PathBuf,

    /// Print the task list without transferring anything
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Settings that can be kept in a TOML file instead of on the command line
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    pub workers: Option<usize>,
    pub hash: Option<HashAlgorithm>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| SyncError::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let operation = match (cli.upload, cli.download) {
            (true, false) => Operation::Upload,
            (false, true) => Operation::Download,
            (true, true) => {
                return Err(SyncError::Config(
                    "--upload and --download are mutually exclusive".to_string(),
                ))
            }
            (false, false) => {
                return Err(SyncError::Config(
                    "One of --upload or --download is required".to_string(),
                ))
            }
        };

        let settings = TransferSettings {
            host: cli.host.or(file.connection.host).unwrap_or_default(),
            user: cli.user.or(file.connection.user).unwrap_or_default(),
            password: cli.password.or(file.connection.password).unwrap_or_default(),
        };

        let config = Config {
            source: Utf8PathBuf::from(cli.from.unwrap_or_default()),
            destination: Utf8PathBuf::from(cli.to),
            operation,
            settings,
            workers: cli.workers.or(file.workers).unwrap_or_else(default_workers),
            hash: cli.hash.or(file.hash).unwrap_or_default(),
            failures_dir: cli.failures_dir,
            dry_run: cli.dry_run,
            show_progress: !cli.no_progress,
        };

        config.validate()?;
        Ok(config)
    }
}
