//! Correction Overlay
//!
//! Manually reviewed concept id substitutions for known-bad source
//! annotations, applied before any group resolution.

use std::collections::HashMap;
use std::path::Path;

use elprep_core::{PrepError, Result};

use crate::table::{cell, DelimitedTable};

/// Raw concept id -> corrected concept id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionMap {
    map: HashMap<String, String>,
}

impl CorrectionMap {
    /// Build from `(old_id, new_id)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a two-column file with a header row; columns are positional
    pub fn load(path: &Path) -> Result<Self> {
        let table = DelimitedTable::open(path)?;
        if table.headers().len() < 2 {
            return Err(PrepError::malformed(
                path,
                "correction table needs two columns (old_id, new_id)",
            ));
        }

        let mut map = HashMap::with_capacity(table.len());
        for (idx, record) in table.rows().iter().enumerate() {
            match (cell(record, 0), cell(record, 1)) {
                (Some(old), Some(new)) => {
                    map.insert(old.to_string(), new.to_string());
                }
                _ => {
                    return Err(PrepError::malformed(
                        path,
                        format!("row {}: empty concept id", idx + 2),
                    ))
                }
            }
        }

        tracing::info!("Loaded {} code corrections from {}", map.len(), path.display());
        Ok(Self { map })
    }

    /// Load when a path is configured and the file exists
    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>> {
        match path {
            Some(path) if path.is_file() => Self::load(path).map(Some),
            Some(path) => {
                tracing::info!(
                    "Correction file {} not found; continuing without corrections",
                    path.display()
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Corrected id for `concept_id`, if one is registered
    pub fn get(&self, concept_id: &str) -> Option<&str> {
        self.map.get(concept_id).map(String::as_str)
    }

    /// `concept_id` after correction
    pub fn apply<'a>(&'a self, concept_id: &'a str) -> &'a str {
        self.get(concept_id).unwrap_or(concept_id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
