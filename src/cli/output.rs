//! Output formatting for the Pilum tools.

use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkReport;
use crate::cli::args::OutputFormat;
use crate::codec::descriptor::CodecDescriptor;
use crate::error::{PilumError, Result};

/// Result structure for a load run.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadSummary {
    pub index_path: String,
    pub segment: String,
    pub documents: u64,
    pub codec: CodecDescriptor,
    /// Mean time to add one document.
    pub index_latency_ms: f64,
    pub total_ms: u64,
}

/// Print a load summary in the requested format.
pub fn output_load_summary(summary: &LoadSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            println!("Index latency: {} ms.", summary.index_latency_ms);
            println!(
                "Wrote segment {} with {} documents ({})",
                summary.segment, summary.documents, summary.codec
            );
            println!("{} total milliseconds", summary.total_ms);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(summary)?),
    }
    Ok(())
}

/// Print a benchmark report in the requested format.
pub fn output_report(report: &BenchmarkReport, format: OutputFormat, pretty: bool) -> Result<()> {
    match format {
        OutputFormat::Human => print!("{}", report.render_human()),
        OutputFormat::Json => println!("{}", report.to_json(pretty)?),
    }
    Ok(())
}

/// Report a failed command on stderr.
pub fn output_error(error: &PilumError) {
    eprintln!("Error [{}]: {error}", error.kind());
}
