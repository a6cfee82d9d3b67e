//! Artifact writers and run report
//!
//! Output layout per dataset:
//!
//! ```text
//! <dataset>/dictionary.json          flat concept dictionary
//! <dataset>/terminology_index.json   group -> concept -> {title, description}
//! <dataset>/<split>.jsonl            one mention record per line
//! <dataset>/<split>.skipped.jsonl    one skip diagnostic per line
//! <dataset>/report.json              counts per split
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elprep_core::{PrepError, Result, Split};
use elprep_terminology::TerminologyIndex;

use crate::batch::SplitOutput;

pub const DICTIONARY_FILE: &str = "dictionary.json";
pub const TERMINOLOGY_INDEX_FILE: &str = "terminology_index.json";
pub const REPORT_FILE: &str = "report.json";

// ============================================================================
// Serialization helpers
// ============================================================================

/// One JSON object per line, newline-joined, no trailing newline
pub fn to_jsonl<T: Serialize>(records: &[T]) -> Result<String> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| PrepError::io(path, e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_file(path, &serde_json::to_string_pretty(value)?)
}

// ============================================================================
// Dataset writer
// ============================================================================

/// Writes the artifacts of one dataset into its output directory
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    dir: PathBuf,
    write_diagnostics: bool,
}

impl DatasetWriter {
    /// Create the output directory if needed
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| PrepError::io(&dir, e))?;
        Ok(Self {
            dir,
            write_diagnostics: true,
        })
    }

    /// Enable or disable `<split>.skipped.jsonl` files
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.write_diagnostics = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a split's mention file
    pub fn mentions_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.jsonl", split.file_stem()))
    }

    /// Path of a split's diagnostics file
    pub fn diagnostics_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.skipped.jsonl", split.file_stem()))
    }

    /// Write the dictionary artifact and the nested terminology index
    pub fn write_terminology(&self, index: &TerminologyIndex) -> Result<()> {
        let dictionary = self.dir.join(DICTIONARY_FILE);
        write_json(&dictionary, index.dictionary())?;
        write_json(
            &self.dir.join(TERMINOLOGY_INDEX_FILE),
            index.group_concept_map(),
        )?;
        tracing::info!(
            "Dictionary with {} entries saved to {}",
            index.dictionary().len(),
            dictionary.display()
        );
        Ok(())
    }

    /// Write a split's mention file (and diagnostics when enabled)
    pub fn write_split(&self, output: &SplitOutput) -> Result<()> {
        let path = self.mentions_path(output.split);
        tracing::info!(
            "Writing {} processed mentions to {}",
            output.mentions.len(),
            path.display()
        );
        write_file(&path, &to_jsonl(&output.mentions)?)?;

        if self.write_diagnostics {
            write_file(
                &self.diagnostics_path(output.split),
                &to_jsonl(&output.skipped)?,
            )?;
        }
        Ok(())
    }

    /// Write the run report
    pub fn write_report(&self, report: &RunReport) -> Result<()> {
        write_json(&self.dir.join(REPORT_FILE), report)
    }
}

// ============================================================================
// Run report
// ============================================================================

/// Counts for one split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub split: Split,
    pub documents: usize,
    pub documents_failed: usize,
    pub mentions: usize,
    pub skipped: usize,
    pub skipped_by_reason: BTreeMap<String, usize>,
    pub corrections_applied: usize,
}

impl From<&SplitOutput> for SplitSummary {
    fn from(output: &SplitOutput) -> Self {
        Self {
            split: output.split,
            documents: output.documents,
            documents_failed: output.documents_failed,
            mentions: output.mentions.len(),
            skipped: output.skipped.len(),
            skipped_by_reason: output
                .skipped_by_reason()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            corrections_applied: output.corrections.len(),
        }
    }
}

/// Summary of one dataset conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset: String,
    pub generated_at: DateTime<Utc>,
    pub dictionary_entries: usize,
    pub splits: Vec<SplitSummary>,
}

impl RunReport {
    pub fn new(dataset: impl Into<String>, dictionary_entries: usize) -> Self {
        Self {
            dataset: dataset.into(),
            generated_at: Utc::now(),
            dictionary_entries,
            splits: Vec::new(),
        }
    }

    /// Add a split summary
    pub fn add_split(&mut self, output: &SplitOutput) {
        self.splits.push(SplitSummary::from(output));
    }

    /// Total mentions over all splits
    pub fn total_mentions(&self) -> usize {
        self.splits.iter().map(|s| s.mentions).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elprep_core::{Diagnostic, MentionRecord, SkipReason};
    use elprep_terminology::ConceptRow;

    fn mention(id: &str) -> MentionRecord {
        MentionRecord {
            mention: "fièvre".to_string(),
            mention_id: id.to_string(),
            context_left: String::new(),
            context_right: String::new(),
            context_doc_id: "d".to_string(),
            group: "DISO".to_string(),
            label_id: "C2".to_string(),
            label: "Fever ( DISO : Sign )".to_string(),
            label_title: "Fever".to_string(),
        }
    }

    fn split_output() -> SplitOutput {
        SplitOutput {
            split: Split::Validation,
            documents: 1,
            documents_failed: 0,
            mentions: vec![mention("d.1"), mention("d.2")],
            skipped: vec![Diagnostic {
                document_id: "d".to_string(),
                entity_id: None,
                entity_text: "x".to_string(),
                reason: SkipReason::NoConceptReference,
            }],
            corrections: vec![],
        }
    }

    #[test]
    fn test_to_jsonl_has_no_trailing_newline() {
        let text = to_jsonl(&[mention("d.1"), mention("d.2")]).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.ends_with('\n'));
        assert_eq!(to_jsonl::<MentionRecord>(&[]).unwrap(), "");
    }

    #[test]
    fn test_write_split_uses_valid_stem() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::create(dir.path().join("EMEA")).unwrap();
        writer.write_split(&split_output()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("EMEA/valid.jsonl")).unwrap();
        let first: MentionRecord = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first.mention, "fièvre");
        assert!(dir.path().join("EMEA/valid.skipped.jsonl").is_file());
    }

    #[test]
    fn test_diagnostics_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::create(dir.path()).unwrap().with_diagnostics(false);
        writer.write_split(&split_output()).unwrap();
        assert!(!writer.diagnostics_path(Split::Validation).exists());
    }

    #[test]
    fn test_write_terminology() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::create(dir.path()).unwrap();
        let index = TerminologyIndex::from_rows(vec![ConceptRow::new("C1", "Flu", "DISO", "Viral")]);
        writer.write_terminology(&index).unwrap();

        let dictionary: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(DICTIONARY_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            dictionary,
            serde_json::json!([{
                "concept_id": "C1",
                "title": "Flu",
                "description": "Flu ( DISO : Viral )",
                "group": "DISO"
            }])
        );

        let nested: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(TERMINOLOGY_INDEX_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(nested["DISO"]["C1"]["title"], "Flu");
    }

    #[test]
    fn test_report_summary() {
        let mut report = RunReport::new("EMEA", 10);
        report.add_split(&split_output());
        assert_eq!(report.total_mentions(), 2);
        assert_eq!(report.splits[0].skipped_by_reason["no_concept_reference"], 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["splits"][0]["split"], "validation");
    }
}
