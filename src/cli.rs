//! Command-line interface definition using clap.
//!
//! This module defines [`Args`], the CLI argument structure, and how it is
//! folded into a [`BackupConfig`]: values from `--config` are loaded first,
//! then every flag given on the command line overrides its counterpart.
//!
//! ```rust
//! use chatvault::cli::Args;
//! use clap::Parser;
//!
//! let args = Args::parse_from(["chatvault", "--dump", "dump.json", "-t", "My Chat", "--photos"]);
//! let config = args.backup_config().unwrap();
//! assert_eq!(config.targets, vec!["My Chat"]);
//! assert!(config.media.photos);
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::config::BackupConfig;
use crate::error::Result;

/// Archive the full history of selected conversations into JSONL files.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatvault")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatvault --dump dump.json
    chatvault --dump dump.json -t \"My Chat\" -t Family -o ./archive
    chatvault --dump dump.json --limit 1000 --photos --documents
    chatvault --dump dump.json --config chatvault.toml --list")]
pub struct Args {
    /// JSON dump to read conversations from
    #[arg(long, value_name = "FILE")]
    pub dump: PathBuf,

    /// Backup directory [default: ./json]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Back up conversations whose name contains NAME (repeatable)
    #[arg(short = 't', long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// Messages requested per page [default: 100]
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Pause after every page, in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub request_delay_ms: Option<u64>,

    /// Pause after every media download, in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub media_delay_ms: Option<u64>,

    /// Maximum messages per conversation, 0 for unlimited [default: 0]
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Download photos
    #[arg(long)]
    pub photos: bool,

    /// Download documents, videos and audio
    #[arg(long)]
    pub documents: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only list the conversations that would be backed up
    #[arg(long)]
    pub list: bool,
}

impl Args {
    /// Builds the run configuration from `--config` and the flags.
    pub fn backup_config(&self) -> Result<BackupConfig> {
        let mut config = match &self.config {
            Some(path) => BackupConfig::from_file(path)?,
            None => BackupConfig::default(),
        };

        if !self.targets.is_empty() {
            config.targets.clone_from(&self.targets);
        }
        if let Some(dir) = &self.output {
            config.backup_dir.clone_from(dir);
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(ms) = self.request_delay_ms {
            config.request_delay_ms = ms;
        }
        if let Some(ms) = self.media_delay_ms {
            config.media_delay_ms = ms;
        }
        if let Some(limit) = self.limit {
            config.history_limit = limit;
        }
        config.media.photos |= self.photos;
        config.media.documents |= self.documents;

        config.validate()?;
        Ok(config)
    }
}
