//! Local TSV annotation source
//!
//! Layout:
//!
//! ```text
//! <corpus>/Normalization/train.tsv
//! <corpus>/Normalization/test.tsv
//! <corpus>/raw_txt/train/<filename>.txt
//! <corpus>/raw_txt/test/<filename>.txt
//! ```
//!
//! Each annotation row names a file, a label, a character span, the
//! span text and one or more concept codes joined by `+`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use elprep_core::{
    CorpusSource, LoadedSplit, NormalizedRef, PrepError, RawDocument, RawEntity, Result, Split,
};

use crate::{split_file, split_names};

/// Knowledge base recorded on normalized references from TSV codes
pub const DEFAULT_DB_NAME: &str = "SNOMEDCT";

/// Code value marking an unlinked mention
const NO_CODE: &str = "NO_CODE";

/// Annotation tables with raw texts in a sibling `raw_txt` directory
#[derive(Debug, Clone)]
pub struct LocalTsvSource {
    dir: PathBuf,
    raw_root: PathBuf,
    db_name: String,
}

impl LocalTsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let raw_root = dir
            .parent()
            .map(|p| p.join("raw_txt"))
            .unwrap_or_else(|| dir.join("raw_txt"));
        Self {
            dir,
            raw_root,
            db_name: DEFAULT_DB_NAME.to_string(),
        }
    }

    /// Override the raw text root
    pub fn with_raw_root(mut self, raw_root: impl Into<PathBuf>) -> Self {
        self.raw_root = raw_root.into();
        self
    }

    /// Override the knowledge base name put on references
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    fn raw_dir(&self, split: Split) -> PathBuf {
        split_names(split)
            .iter()
            .map(|name| self.raw_root.join(name))
            .find(|p| p.is_dir())
            .unwrap_or_else(|| self.raw_root.join(split.as_str()))
    }

    /// Read one annotation table and its raw texts
    pub fn read_split(&self, annotations: &Path, raw_dir: &Path) -> Result<LoadedSplit> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .flexible(true)
            .from_path(annotations)
            .map_err(|e| PrepError::Corpus(format!("{}: {e}", annotations.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| PrepError::Corpus(format!("{}: {e}", annotations.display())))?
            .clone();
        let columns = Columns::resolve(&headers, annotations)?;

        let mut order: Vec<String> = Vec::new();
        let mut entities: HashMap<String, Vec<RawEntity>> = HashMap::new();
        let mut broken: HashSet<String> = HashSet::new();

        for (idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| PrepError::Corpus(format!("{}: {e}", annotations.display())))?;
            let Some(filename) = field(&record, columns.filename) else {
                tracing::warn!(
                    "{}:{}: row without filename, skipping",
                    annotations.display(),
                    idx + 2
                );
                continue;
            };
            let filename = filename.to_string();
            if !entities.contains_key(&filename) {
                order.push(filename.clone());
                entities.insert(filename.clone(), Vec::new());
            }

            match self.parse_entity(&record, &columns) {
                Some(entity) => {
                    if let Some(list) = entities.get_mut(&filename) {
                        list.push(entity);
                    }
                }
                None => {
                    tracing::warn!(
                        "{}:{}: unreadable span offsets for {}",
                        annotations.display(),
                        idx + 2,
                        filename
                    );
                    broken.insert(filename);
                }
            }
        }

        let mut loaded = LoadedSplit::default();
        for filename in order {
            if broken.contains(&filename) {
                loaded.failed += 1;
                continue;
            }
            let text_path = raw_text_path(raw_dir, &filename);
            let text = match std::fs::read_to_string(&text_path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        "Skipping document {}: cannot read {}: {}",
                        filename,
                        text_path.display(),
                        e
                    );
                    loaded.failed += 1;
                    continue;
                }
            };

            let document_id = filename
                .strip_suffix(".txt")
                .unwrap_or(&filename)
                .to_string();
            let mut doc = RawDocument::new(document_id).with_passage(text);
            doc.entities = entities.remove(&filename).unwrap_or_default();
            loaded.documents.push(doc);
        }

        Ok(loaded)
    }

    fn parse_entity(&self, record: &StringRecord, columns: &Columns) -> Option<RawEntity> {
        let start = field(record, columns.start)?.parse::<usize>().ok()?;
        let end = field(record, columns.end)?.parse::<usize>().ok()?;

        let normalized: Vec<NormalizedRef> = field(record, columns.code)
            .map(|codes| {
                codes
                    .split('+')
                    .map(str::trim)
                    .filter(|c| !c.is_empty() && *c != NO_CODE)
                    .map(|c| NormalizedRef::new(self.db_name.as_str(), c))
                    .collect()
            })
            .unwrap_or_default();

        Some(RawEntity {
            id: columns.mark.and_then(|i| field(record, i)).map(str::to_string),
            entity_text: vec![record.get(columns.span).unwrap_or_default().to_string()],
            offsets: vec![[start, end]],
            raw_type: field(record, columns.label).map(str::to_string),
            normalized,
        })
    }
}

impl CorpusSource for LocalTsvSource {
    fn load_split(&self, split: Split) -> Result<Option<LoadedSplit>> {
        let Some(annotations) = split_file(&self.dir, split, "tsv") else {
            return Ok(None);
        };
        let raw_dir = self.raw_dir(split);
        tracing::info!(
            "Loading {} split from {} (texts in {})",
            split,
            annotations.display(),
            raw_dir.display()
        );
        self.read_split(&annotations, &raw_dir).map(Some)
    }

    fn name(&self) -> &str {
        "local_tsv"
    }
}

/// Column positions of an annotation table
struct Columns {
    filename: usize,
    label: usize,
    start: usize,
    end: usize,
    span: usize,
    code: usize,
    mark: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| {
                PrepError::Corpus(format!(
                    "{}: missing column {}",
                    path.display(),
                    aliases.join(" | ")
                ))
            })
        };

        Ok(Self {
            filename: require(&["filename"])?,
            label: require(&["label"])?,
            start: require(&["start_span", "off0"])?,
            end: require(&["end_span", "off1"])?,
            span: require(&["span"])?,
            code: require(&["code"])?,
            mark: find(&["mark"]),
        })
    }
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn raw_text_path(raw_dir: &Path, filename: &str) -> PathBuf {
    if filename.ends_with(".txt") {
        raw_dir.join(filename)
    } else {
        raw_dir.join(format!("{filename}.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let norm = root.path().join("Normalization");
        let raw = root.path().join("raw_txt").join("train");
        std::fs::create_dir_all(&norm).unwrap();
        std::fs::create_dir_all(&raw).unwrap();

        std::fs::write(
            norm.join("train.tsv"),
            "filename\tmark\tlabel\toff0\toff1\tspan\tcode\n\
             caso1\tT1\tMORFOLOGIA_NEOPLASIA\t13\t22\tcarcinoma\t8010/3\n\
             caso2\tT1\tMORFOLOGIA_NEOPLASIA\t0\t5\ttumor\tNO_CODE\n\
             caso1\tT2\tMORFOLOGIA_NEOPLASIA\t0\t8\tPaciente\t8000/1+8000/3\n\
             caso3\tT1\tMORFOLOGIA_NEOPLASIA\t0\t4\tmasa\t8000/0\n",
        )
        .unwrap();
        std::fs::write(raw.join("caso1.txt"), "Paciente con carcinoma.").unwrap();
        std::fs::write(raw.join("caso2.txt"), "tumor benigno").unwrap();
        root
    }

    #[test]
    fn test_load_split_groups_rows_by_file() {
        let root = corpus();
        let source = LocalTsvSource::new(root.path().join("Normalization"));
        let loaded = source.load_split(Split::Train).unwrap().unwrap();

        // caso3 has no raw text
        assert_eq!(loaded.failed, 1);
        assert_eq!(loaded.documents.len(), 2);

        let caso1 = &loaded.documents[0];
        assert_eq!(caso1.document_id, "caso1");
        assert_eq!(caso1.full_text(), "Paciente con carcinoma.");
        assert_eq!(caso1.entities.len(), 2);
        assert_eq!(caso1.entities[0].concept_id(), Some("8010/3"));
        assert_eq!(caso1.entities[0].id.as_deref(), Some("T1"));
        assert_eq!(caso1.entities[1].normalized.len(), 2);
        assert_eq!(caso1.entities[1].normalized[0].db_name, DEFAULT_DB_NAME);

        let caso2 = &loaded.documents[1];
        assert!(caso2.entities[0].normalized.is_empty());
        assert_eq!(caso2.entities[0].raw_type.as_deref(), Some("MORFOLOGIA_NEOPLASIA"));
    }

    #[test]
    fn test_missing_split_is_none() {
        let root = corpus();
        let source = LocalTsvSource::new(root.path().join("Normalization"));
        assert!(source.load_split(Split::Test).unwrap().is_none());
    }

    #[test]
    fn test_missing_column_is_error() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("train.tsv"), "filename\tlabel\n").unwrap();
        let source = LocalTsvSource::new(root.path());
        let err = source.load_split(Split::Train).unwrap_err();
        assert!(matches!(err, PrepError::Corpus(_)));
    }

    #[test]
    fn test_bad_offsets_fail_the_document() {
        let root = tempfile::tempdir().unwrap();
        let norm = root.path().join("Normalization");
        std::fs::create_dir_all(&norm).unwrap();
        std::fs::write(
            norm.join("train.tsv"),
            "filename\tlabel\tstart_span\tend_span\tspan\tcode\n\
             a\tX\tzero\t4\tabcd\tC1\n",
        )
        .unwrap();

        let source = LocalTsvSource::new(&norm).with_raw_root(root.path());
        let loaded = source.load_split(Split::Train).unwrap().unwrap();
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.failed, 1);
    }
}
