//! Delimited table reader using csv
//!
//! Reads terminology and correction tables (TSV or CSV) into memory and
//! resolves columns by header name. Any structural problem is reported as
//! `MalformedTerminology`.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use elprep_core::{PrepError, Result};

/// An in-memory delimited table
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl DelimitedTable {
    /// Read a table; tab-delimited for `.tsv`, comma-delimited otherwise
    pub fn open(path: &Path) -> Result<Self> {
        let tab = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tsv"))
            .unwrap_or(false);

        let file = std::fs::File::open(path).map_err(|e| PrepError::io(path, e))?;
        let mut builder = ReaderBuilder::new();
        builder.has_headers(true).flexible(false);
        if tab {
            builder.delimiter(b'\t').quoting(false);
        }
        let mut reader = builder.from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| PrepError::malformed(path, format!("unreadable header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            // Line 1 is the header
            let record = record
                .map_err(|e| PrepError::malformed(path, format!("row {}: {e}", idx + 2)))?;
            rows.push(record);
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching one of `aliases`
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    /// Like [`find_column`](Self::find_column), failing when absent
    pub fn column(&self, aliases: &[&str]) -> Result<usize> {
        self.find_column(aliases).ok_or_else(|| {
            PrepError::malformed(
                &self.path,
                format!(
                    "missing required column (one of: {}); found: {}",
                    aliases.join(", "),
                    self.headers.join(", ")
                ),
            )
        })
    }
}

/// Trimmed cell value; `None` when empty
pub fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Locate `<dir>/<stem>.tsv` or `<dir>/<stem>.csv`
pub fn locate(dir: &Path, stem: &str) -> Result<PathBuf> {
    ["tsv", "csv"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            PrepError::malformed(dir.join(stem), format!("no {stem}.tsv or {stem}.csv found"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_open_tsv_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "concepts.tsv",
            "CUI\tTitle\tGROUP\n C1 \tFlu \"A\"\tDisease\n",
        );

        let table = DelimitedTable::open(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column(&["concept_id", "CUI"]).unwrap(), 0);
        assert_eq!(cell(&table.rows()[0], 0), Some("C1"));
        assert_eq!(cell(&table.rows()[0], 1), Some("Flu \"A\""));
        assert!(table.column(&["Entity"]).is_err());
    }

    #[test]
    fn test_open_csv_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "fixes.csv", "old,new\n\"C1, x\",C2\n");
        let table = DelimitedTable::open(&path).unwrap();
        assert_eq!(cell(&table.rows()[0], 0), Some("C1, x"));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.csv", "a,b,c\n1,2,3\n4,5\n");
        let err = DelimitedTable::open(&path).unwrap_err();
        assert!(matches!(err, PrepError::MalformedTerminology { .. }));
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_locate_prefers_tsv() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "semantic_info.csv", "x\n");
        write(dir.path(), "semantic_info.tsv", "x\n");
        let found = locate(dir.path(), "semantic_info").unwrap();
        assert!(found.ends_with("semantic_info.tsv"));
        assert!(locate(dir.path(), "all_disambiguated").is_err());
    }

    #[test]
    fn test_empty_cell_is_none() {
        let record = StringRecord::from(vec!["a", "  ", ""]);
        assert_eq!(cell(&record, 0), Some("a"));
        assert_eq!(cell(&record, 1), None);
        assert_eq!(cell(&record, 5), None);
    }
}
