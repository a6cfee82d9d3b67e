//! elprep Extractor - Entity-linking mention preparation
//!
//! Converts annotated documents into mention records resolved against a
//! terminology, and writes the per-dataset artifacts.

pub mod batch;
pub mod mention;
pub mod output;

pub use batch::{process_corpus, process_documents, process_split, BatchOptions, SplitOutput};
pub use mention::{extract_mentions, Extraction, ResolutionContext, UNKNOWN_GROUP};
pub use output::{DatasetWriter, RunReport, SplitSummary};

use elprep_core::{CorpusSource, Result};
use elprep_terminology::{CorrectionMap, Terminology};

/// Convert one corpus and write all of its artifacts.
///
/// Writes the dictionary artifacts, one mention file per split the
/// source provides, and the run report.
pub fn convert_dataset(
    name: &str,
    terminology: &Terminology,
    corrections: Option<&CorrectionMap>,
    source: &dyn CorpusSource,
    writer: &DatasetWriter,
    options: BatchOptions,
) -> Result<RunReport> {
    writer.write_terminology(&terminology.index)?;

    let ctx = ResolutionContext::new(terminology).with_corrections(corrections);
    let mut report = RunReport::new(name, terminology.index.dictionary().len());
    for output in process_corpus(source, &ctx, options)? {
        writer.write_split(&output)?;
        report.add_split(&output);
    }
    writer.write_report(&report)?;

    tracing::info!(
        "Finished {}: {} mentions over {} splits",
        name,
        report.total_mentions(),
        report.splits.len()
    );
    Ok(report)
}
