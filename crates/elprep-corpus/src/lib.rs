//! elprep Corpus - Source document loading
//!
//! Supports reading annotated corpora from:
//! - BigBio-KB JSON Lines exports (one document per line, one file per split)
//! - Local tab-separated annotation tables plus raw text files
//!
//! Each source implements the `CorpusSource` trait and yields
//! `RawDocument`s for the mention extractor.

pub mod bigbio;
pub mod tsv;

pub use bigbio::BigBioJsonlSource;
pub use tsv::LocalTsvSource;

use std::path::{Path, PathBuf};

use elprep_core::{CorpusSource, CorpusSourceConfig, Split};

/// Create the source described by a dataset configuration
pub fn open_source(config: &CorpusSourceConfig) -> Box<dyn CorpusSource> {
    match config {
        CorpusSourceConfig::BigbioJsonl { dir } => Box::new(BigBioJsonlSource::new(dir)),
        CorpusSourceConfig::LocalTsv { dir } => Box::new(LocalTsvSource::new(dir)),
    }
}

/// First existing `<dir>/<name>.<ext>` among the split's accepted names
pub(crate) fn split_file(dir: &Path, split: Split, ext: &str) -> Option<PathBuf> {
    split_names(split)
        .iter()
        .map(|name| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

/// Names a split may be stored under, canonical first
pub(crate) fn split_names(split: Split) -> &'static [&'static str] {
    match split {
        Split::Train => &["train"],
        Split::Validation => &["validation", "valid"],
        Split::Test => &["test"],
    }
}
