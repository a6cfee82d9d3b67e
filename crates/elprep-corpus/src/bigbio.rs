//! BigBio-KB JSON Lines source
//!
//! Reads `<dir>/<split>.jsonl` files where each line is one document in
//! the BigBio knowledge-base schema.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use elprep_core::{CorpusSource, LoadedSplit, PrepError, RawDocument, Result, Split};

use crate::split_file;

/// Directory of per-split BigBio-KB exports
#[derive(Debug, Clone)]
pub struct BigBioJsonlSource {
    dir: PathBuf,
}

impl BigBioJsonlSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read every document of a JSON Lines file.
    ///
    /// Lines that do not parse are logged and counted, not fatal.
    pub fn read_file(path: &Path) -> Result<LoadedSplit> {
        let file = std::fs::File::open(path).map_err(|e| PrepError::io(path, e))?;
        let reader = BufReader::new(file);

        let mut loaded = LoadedSplit::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| PrepError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawDocument>(&line) {
                Ok(doc) => loaded.documents.push(doc),
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed document at {}:{}: {}",
                        path.display(),
                        idx + 1,
                        e
                    );
                    loaded.failed += 1;
                }
            }
        }
        Ok(loaded)
    }
}

impl CorpusSource for BigBioJsonlSource {
    fn load_split(&self, split: Split) -> Result<Option<LoadedSplit>> {
        let Some(path) = split_file(&self.dir, split, "jsonl") else {
            return Ok(None);
        };
        tracing::info!("Loading {} split from {}", split, path.display());
        Self::read_file(&path).map(Some)
    }

    fn name(&self) -> &str {
        "bigbio_jsonl"
    }
}
