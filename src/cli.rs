use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::errors::ConfigError;
use crate::fs::LocalOptions;
use crate::model::SizeMetric;
use crate::sizer::DEFAULT_MAX_WORKERS;

pub const MAX_WORKERS: usize = 512;

#[derive(Debug, Parser)]
#[command(name = "dirsizer", version)]
#[command(about = "Total size and file count of a directory tree, computed in parallel")]
pub struct Cli {
    /// Root directory to size
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Number of worker threads
    #[arg(short, long, default_value_t = DEFAULT_MAX_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Byte count to report for each file
    #[arg(long, value_enum, default_value_t = MetricArg::Apparent)]
    pub metric: MetricArg,

    /// Follow symbolic links during traversal
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub follow_symlinks: bool,

    /// Stay on the same filesystem/mount
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub one_file_system: bool,

    /// Include hidden files and directories
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub show_hidden: bool,

    /// Print the raw byte count instead of a human-readable size
    #[arg(long)]
    pub bytes: bool,

    /// Show a spinner on stderr while sizing
    #[arg(short, long)]
    pub progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Allocated,
    Apparent,
}

impl MetricArg {
    pub fn into_metric(self) -> SizeMetric {
        match self {
            Self::Allocated => SizeMetric::Allocated,
            Self::Apparent => SizeMetric::Apparent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub local: LocalOptions,
    pub raw_bytes: bool,
    pub progress: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.workers == 0 || cli.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: cli.workers,
                max: MAX_WORKERS,
            });
        }

        let timeout = cli
            .timeout
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| ConfigError::InvalidTimeout { secs })
            })
            .transpose()?;

        let root = std::fs::canonicalize(&cli.path).map_err(|source| ConfigError::Root {
            path: cli.path.clone(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory { path: root });
        }

        Ok(Self {
            root,
            workers: cli.workers,
            timeout,
            local: LocalOptions {
                metric: cli.metric.into_metric(),
                follow_symlinks: cli.follow_symlinks,
                one_file_system: cli.one_file_system,
                show_hidden: cli.show_hidden,
            },
            raw_bytes: cli.bytes,
            progress: cli.progress,
            verbose: cli.verbose,
        })
    }
}
