//! Command line argument parsing for the Pilum tools using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::storage::AccessStrategy;

/// Verbosity flags shared by both tools.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Verbosity {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Verbosity {
    /// Get the effective verbosity level
    pub fn level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// pilum-load - Generate synthetic documents into a Pilum index
#[derive(Parser, Debug, Clone)]
#[command(name = "pilum-load")]
#[command(about = "Generate synthetic documents into a Pilum index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct LoadArgs {
    /// Path to the index directory
    #[arg(long = "index-path", short = 'i', default_value = "tmp-codec")]
    pub index_path: PathBuf,

    /// Number of documents to generate
    #[arg(long = "num-docs", short = 'n', default_value = "100")]
    pub num_docs: u64,

    /// Append a new segment to an existing index instead of recreating it
    #[arg(long)]
    pub update: bool,

    /// Stored-fields codec
    #[arg(long, default_value = "plain")]
    pub codec: CodecKind,

    /// Documents per compressed block (compressing codec only)
    #[arg(long = "block-size", default_value = "128")]
    pub block_size: u32,

    /// RNG seed for reproducible documents
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// pilum-query - Benchmark reads against a Pilum index
///
/// Flags left unset fall back to the `--config` file, then to the defaults
/// shown in their help.
#[derive(Parser, Debug, Clone)]
#[command(name = "pilum-query")]
#[command(about = "Benchmark reads against a Pilum index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct QueryArgs {
    /// Path to the index directory or a segment file (default: tmp-codec)
    #[arg(long = "index-path", short = 'i')]
    pub index_path: Option<PathBuf>,

    /// Field for range searches (default: foo)
    #[arg(long)]
    pub field: Option<String>,

    /// Operation each worker performs (default: random-fetch)
    #[arg(long, short = 'o')]
    pub operation: Option<OperationKind>,

    /// Concurrent workers; 0 uses one per CPU (default: 1)
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Segment access strategy (default: mmap)
    #[arg(long, short = 'a')]
    pub access: Option<AccessStrategy>,

    /// Share one reader across all workers
    #[arg(long = "shared-reader")]
    pub shared_reader: bool,

    /// Random fetches per worker; 0 or less fetches once per document (default: 10000)
    #[arg(long = "fetch-count", allow_hyphen_values = true)]
    pub fetch_count: Option<i64>,

    /// Open/close iterations per worker (default: 1000)
    #[arg(long = "open-close-count")]
    pub open_close_count: Option<u64>,

    /// Exclusive lower bound for range searches (default: 100000)
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<i32>,

    /// Pause before timed random fetches, in milliseconds (default: 10000)
    #[arg(long = "warmup-ms")]
    pub warmup_ms: Option<u64>,

    /// Per-worker deadline in milliseconds (random fetch starts it after the warm-up)
    #[arg(long = "deadline-ms")]
    pub deadline_ms: Option<u64>,

    /// RNG seed for random fetches
    #[arg(long)]
    pub seed: Option<u64>,

    /// Benchmark configuration file (JSON)
    #[arg(long, short = 'c', value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Skip the "drop cache" prompt
    #[arg(long = "no-wait")]
    pub no_wait: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

/// Stored-fields codecs selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Uncompressed documents
    Plain,
    /// LZ4-compressed blocks
    Compressing,
}

/// Benchmark operations selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Fetch every document in order
    Scan,
    /// Range search, then fetch each hit
    Search,
    /// Uniform random fetches
    RandomFetch,
    /// Repeatedly open and close a reader
    OpenClose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        let args = LoadArgs::parse_from(["pilum-load"]);
        assert_eq!(args.index_path, PathBuf::from("tmp-codec"));
        assert_eq!(args.num_docs, 100);
        assert!(!args.update);
        assert_eq!(args.codec, CodecKind::Plain);
        assert_eq!(args.block_size, 128);
        assert_eq!(args.verbosity.level(), 1);
    }

    #[test]
    fn test_query_flags() {
        let args = QueryArgs::parse_from([
            "pilum-query",
            "--index-path",
            "idx",
            "--operation",
            "open-close",
            "--threads",
            "8",
            "--access",
            "paged",
            "--shared-reader",
            "--fetch-count",
            "-1",
            "--no-wait",
            "-q",
        ]);
        assert_eq!(args.index_path, Some(PathBuf::from("idx")));
        assert_eq!(args.operation, Some(OperationKind::OpenClose));
        assert_eq!(args.threads, Some(8));
        assert_eq!(args.access, Some(AccessStrategy::Paged));
        assert!(args.shared_reader);
        assert_eq!(args.fetch_count, Some(-1));
        assert!(args.no_wait);
        assert_eq!(args.verbosity.level(), 0);
        assert_eq!(args.output_format, OutputFormat::Human);
    }

    #[test]
    fn test_verbosity_levels() {
        let args = QueryArgs::parse_from(["pilum-query", "-vvv"]);
        assert_eq!(args.verbosity.level(), 3);
    }
}
