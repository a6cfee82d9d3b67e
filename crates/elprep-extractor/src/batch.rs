//! Batch driver
//!
//! Runs the mention extractor over every document of a split and every
//! split of a corpus.

use std::collections::BTreeMap;

use rayon::prelude::*;

use elprep_core::{
    AppliedCorrection, CorpusSource, Diagnostic, LoadedSplit, MentionRecord, RawDocument,
    Result, Split,
};

use crate::mention::{extract_mentions, Extraction, ResolutionContext};

/// Batch options
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Extract documents on the rayon thread pool
    pub parallel: bool,
}

/// Everything produced for one split
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub split: Split,
    /// Documents converted
    pub documents: usize,
    /// Documents the corpus source could not read
    pub documents_failed: usize,
    pub mentions: Vec<MentionRecord>,
    pub skipped: Vec<Diagnostic>,
    pub corrections: Vec<AppliedCorrection>,
}

impl SplitOutput {
    /// Skip counts keyed by reason code
    pub fn skipped_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for diagnostic in &self.skipped {
            *counts.entry(diagnostic.reason.code()).or_insert(0) += 1;
        }
        counts
    }
}

/// Extract every document of a split.
///
/// Records keep document order, then entity order within a document,
/// whether or not extraction runs in parallel.
pub fn process_split(
    split: Split,
    loaded: &LoadedSplit,
    ctx: &ResolutionContext<'_>,
    options: BatchOptions,
) -> SplitOutput {
    let extractions: Vec<Extraction> = if options.parallel {
        loaded
            .documents
            .par_iter()
            .map(|doc| extract_mentions(doc, ctx))
            .collect()
    } else {
        loaded
            .documents
            .iter()
            .map(|doc| extract_mentions(doc, ctx))
            .collect()
    };

    let mut output = SplitOutput {
        split,
        documents: loaded.documents.len(),
        documents_failed: loaded.failed,
        mentions: Vec::new(),
        skipped: Vec::new(),
        corrections: Vec::new(),
    };
    for extraction in extractions {
        output.mentions.extend(extraction.mentions);
        output.skipped.extend(extraction.skipped);
        output.corrections.extend(extraction.corrections);
    }

    log_split(&output);
    output
}

/// Extract a plain list of documents
pub fn process_documents(
    split: Split,
    documents: Vec<RawDocument>,
    ctx: &ResolutionContext<'_>,
    options: BatchOptions,
) -> SplitOutput {
    process_split(split, &LoadedSplit::new(documents), ctx, options)
}

/// Extract every split the source provides, in processing order.
/// Splits without backing data are left out.
pub fn process_corpus(
    source: &dyn CorpusSource,
    ctx: &ResolutionContext<'_>,
    options: BatchOptions,
) -> Result<Vec<SplitOutput>> {
    let mut outputs = Vec::new();
    for split in Split::PROCESSING_ORDER {
        let Some(loaded) = source.load_split(split)? else {
            tracing::debug!("No {} split in {} source", split, source.name());
            continue;
        };
        tracing::info!("Processing split: {} ({} documents)", split, loaded.documents.len());
        outputs.push(process_split(split, &loaded, ctx, options));
    }
    Ok(outputs)
}

fn log_split(output: &SplitOutput) {
    for correction in &output.corrections {
        tracing::debug!(
            "Corrected concept {} -> {} for entity '{}' in {}",
            correction.from,
            correction.to,
            correction.entity_text,
            correction.document_id
        );
    }
    for diagnostic in &output.skipped {
        tracing::debug!(
            "Skipping entity '{}' in {}: {}",
            diagnostic.entity_text,
            diagnostic.document_id,
            diagnostic.reason
        );
    }
    tracing::info!(
        "Split {}: {} mentions, {} entities skipped, {} corrections",
        output.split,
        output.mentions.len(),
        output.skipped.len(),
        output.corrections.len()
    );
}
