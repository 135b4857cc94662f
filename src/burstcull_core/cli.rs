use crate::burstcull_core::config::{CullConfig, MediaFilter, OrderingMode};
use crate::burstcull_core::state::SessionStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Group burst photos by capture time and cull each burst down to its keepers")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable file logging to burstcull.log
    #[arg(long = "log", global = true)]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the batches a folder would be split into
    Batches {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Cull each batch by comparing photos two at a time.
    ///
    /// For every pair, keep the left (1) or right (2) one, or keep both (b).
    /// Losers are moved into the _culled folder when the batch ends. Nothing
    /// is ever deleted.
    Cull {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        session: SessionArgs,

        /// Seed for the pair shuffle (for reproducible sessions)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Cull each batch one item at a time (suited to videos)
    Strip {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Move every file this tool quarantined in a folder back to where it was
    Restore {
        /// Folder that was culled
        #[arg(required = true)]
        dir: PathBuf,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Show quarantine size and saved progress for a folder
    Status {
        /// Folder to inspect
        #[arg(required = true)]
        dir: PathBuf,

        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Options that control scanning and batching.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Folder containing the photos or videos
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Include subfolders
    #[arg(long, short)]
    pub recursive: bool,

    /// Which files to pick up
    #[arg(long, value_enum, default_value_t = MediaFilter::Images)]
    pub media: MediaFilter,

    /// Largest time gap in seconds between neighbours of one batch
    #[arg(long, default_value_t = 2.0)]
    pub max_gap: f64,

    /// Smaller groups are skipped
    #[arg(long, default_value_t = 2)]
    pub min_batch: usize,

    /// Larger groups are split
    #[arg(long, default_value_t = 30)]
    pub max_batch: usize,

    /// How items are ordered before batching
    #[arg(long, value_enum, default_value_t = OrderingMode::Chronological)]
    pub order: OrderingMode,

    /// Do not read embedded metadata (use filenames and file times only)
    #[arg(long)]
    pub no_exif: bool,
}

impl ScanArgs {
    pub fn config(&self) -> CullConfig {
        CullConfig {
            max_gap_seconds: self.max_gap,
            min_batch_size: self.min_batch,
            max_batch_size: self.max_batch,
            ordering: self.order,
            media: self.media,
            recursive: self.recursive,
            use_metadata: !self.no_exif,
        }
        .normalized()
    }
}

/// Options for saved progress.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Session store file (defaults to the user data directory)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Ignore saved progress and start over
    #[arg(long)]
    pub fresh: bool,
}

impl SessionArgs {
    pub fn store_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(SessionStore::default_path)
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Detailed table format
    Table,
    /// JSON batch summaries
    Json,
    /// One file path per line
    Paths,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cull_args() {
        let cli = Cli::try_parse_from([
            "burstcull", "cull", "/photos", "--max-gap", "5", "--no-exif", "--seed", "7", "--fresh",
        ])
        .unwrap();
        match cli.command {
            Commands::Cull { scan, session, seed } => {
                let config = scan.config();
                assert_eq!(config.max_gap_seconds, 5.0);
                assert!(!config.use_metadata);
                assert_eq!(config.max_batch_size, 30);
                assert_eq!(seed, Some(7));
                assert!(session.fresh);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_log_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["burstcull", "status", "/photos", "--log", "--log-level", "info"]).unwrap();
        assert!(cli.log);
        assert_eq!(cli.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_state_file_override() {
        let args = SessionArgs {
            state_file: Some(PathBuf::from("/tmp/s.json")),
            fresh: false,
        };
        assert_eq!(args.store_path(), PathBuf::from("/tmp/s.json"));
    }
}
