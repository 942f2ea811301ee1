//! Command implementations for the Pilum tools.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use log::info;

use crate::benchmark::operation::{
    DEFAULT_FETCH_COUNT, DEFAULT_OPEN_CLOSE_COUNT, DEFAULT_SEARCH_FIELD, DEFAULT_THRESHOLD,
};
use crate::benchmark::{BenchmarkConfig, BenchmarkHarness, BenchmarkReport, Operation};
use crate::cli::args::{CodecKind, LoadArgs, OperationKind, QueryArgs};
use crate::cli::output::{LoadSummary, output_load_summary, output_report};
use crate::codec::descriptor::CodecDescriptor;
use crate::document::generator::DocumentGenerator;
use crate::error::Result;
use crate::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};

/// Generate documents and write them as one segment.
pub fn run_load(args: LoadArgs) -> Result<()> {
    let start = Instant::now();
    println!("Indexing to directory '{}'...", args.index_path.display());

    let config = IndexWriterConfig {
        codec: match args.codec {
            CodecKind::Plain => CodecDescriptor::Plain,
            CodecKind::Compressing => CodecDescriptor::Compressing {
                block_size: args.block_size,
            },
        },
        open_mode: if args.update {
            OpenMode::Append
        } else {
            OpenMode::Create
        },
    };
    let mut writer = IndexWriter::open(&args.index_path, config)?;

    println!("Generate {} KV pairs...", args.num_docs);
    let index_start = Instant::now();
    for doc in DocumentGenerator::new(args.seed).take(args.num_docs as usize) {
        writer.add_document(doc)?;
    }
    let index_elapsed = index_start.elapsed();

    let segment = writer.finalize_segment()?;
    writer.close()?;

    let summary = LoadSummary {
        index_path: args.index_path.display().to_string(),
        segment: segment.name,
        documents: segment.doc_count,
        codec: segment.codec,
        index_latency_ms: if args.num_docs == 0 {
            f64::NAN
        } else {
            index_elapsed.as_secs_f64() * 1000.0 / args.num_docs as f64
        },
        total_ms: start.elapsed().as_millis() as u64,
    };
    output_load_summary(&summary, args.output_format)
}

/// Run a benchmark and print its report.
pub fn run_query(args: QueryArgs) -> Result<()> {
    let config = build_config(&args)?;
    info!("Benchmark configuration: {config:?}");

    if !args.no_wait {
        wait_for_ready()?;
    }

    let harness = BenchmarkHarness::new(config)?;
    let outcome = harness.run(None)?;
    let report = BenchmarkReport::new(harness.config(), &outcome);
    output_report(&report, args.output_format, args.pretty)
}

/// Merge the optional config file with explicit flags; flags win.
pub fn build_config(args: &QueryArgs) -> Result<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => BenchmarkConfig::from_json_file(path)?,
        None => BenchmarkConfig::default(),
    };

    if let Some(path) = &args.index_path {
        config.location = path.clone();
    }
    config.operation = resolve_operation(args, &config.operation);
    if let Some(threads) = args.threads {
        config.concurrency = if threads == 0 { num_cpus::get() } else { threads };
    }
    if let Some(access) = args.access {
        config.access = access;
    }
    if args.shared_reader {
        config.shared_reader = true;
    }
    if let Some(ms) = args.warmup_ms {
        config.warmup_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.deadline_ms {
        config.deadline = Some(Duration::from_millis(ms));
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    config.validate()?;
    Ok(config)
}

/// Pick the operation from flags, keeping parameters from `base` when the
/// kind matches and no flag overrides them.
fn resolve_operation(args: &QueryArgs, base: &Operation) -> Operation {
    let kind = args.operation.unwrap_or(match base {
        Operation::SequentialScan => OperationKind::Scan,
        Operation::RangeSearch { .. } => OperationKind::Search,
        Operation::RandomFetch { .. } => OperationKind::RandomFetch,
        Operation::RepeatedOpenClose { .. } => OperationKind::OpenClose,
    });

    match kind {
        OperationKind::Scan => Operation::SequentialScan,
        OperationKind::Search => {
            let (base_field, base_threshold) = match base {
                Operation::RangeSearch { field, threshold } => (field.as_str(), *threshold),
                _ => (DEFAULT_SEARCH_FIELD, DEFAULT_THRESHOLD),
            };
            Operation::RangeSearch {
                field: args.field.clone().unwrap_or_else(|| base_field.to_string()),
                threshold: args.threshold.unwrap_or(base_threshold),
            }
        }
        OperationKind::RandomFetch => {
            let base_count = match base {
                Operation::RandomFetch { count } => *count,
                _ => DEFAULT_FETCH_COUNT,
            };
            Operation::RandomFetch {
                count: args.fetch_count.unwrap_or(base_count),
            }
        }
        OperationKind::OpenClose => {
            let base_count = match base {
                Operation::RepeatedOpenClose { count } => *count,
                _ => DEFAULT_OPEN_CLOSE_COUNT,
            };
            Operation::RepeatedOpenClose {
                count: args.open_close_count.unwrap_or(base_count),
            }
        }
    }
}

/// Block until the user presses Enter, so page caches can be dropped first.
pub fn wait_for_ready() -> Result<()> {
    println!("Please drop cache now ...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
