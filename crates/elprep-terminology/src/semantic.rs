//! Semantic Category Resolver
//!
//! Maps raw entity type codes (categories and semantic types) to the
//! semantic groups used by the terminology index.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use elprep_core::Result;

use crate::table::{cell, locate, DelimitedTable};

/// File stem of the semantic reference table inside a terminology directory
pub const SEMANTIC_TABLE: &str = "semantic_info";

/// One row of the semantic reference table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticRow {
    pub category: Option<String>,
    pub semantic_type: Option<String>,
    pub group: String,
}

impl SemanticRow {
    pub fn new(category: &str, semantic_type: &str, group: &str) -> Self {
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Self {
            category: non_empty(category),
            semantic_type: non_empty(semantic_type),
            group: group.to_string(),
        }
    }
}

/// Raw type code -> semantic group lookups
#[derive(Debug, Clone, Default)]
pub struct CategoryResolver {
    category_to_group: HashMap<String, String>,
    semantic_type_to_group: HashMap<String, String>,
    group_names: BTreeSet<String>,
}

impl CategoryResolver {
    /// Build from semantic rows; duplicate codes keep the last row
    pub fn from_rows(rows: impl IntoIterator<Item = SemanticRow>) -> Self {
        let mut resolver = Self::default();
        for row in rows {
            if let Some(category) = row.category {
                resolver
                    .category_to_group
                    .insert(category, row.group.clone());
            }
            if let Some(semantic_type) = row.semantic_type {
                resolver
                    .semantic_type_to_group
                    .insert(semantic_type, row.group);
            }
        }
        resolver.group_names = resolver.category_to_group.values().cloned().collect();
        resolver
    }

    /// Load the semantic table of a terminology directory
    pub fn load(terminology_dir: &Path) -> Result<Self> {
        let path = locate(terminology_dir, SEMANTIC_TABLE)?;
        Self::from_table_file(&path)
    }

    /// Load a semantic table file with `CATEGORY`, `SEM_CODE`, `GROUP` columns
    pub fn from_table_file(path: &Path) -> Result<Self> {
        let table = DelimitedTable::open(path)?;
        let category_col = table.column(&["CATEGORY", "category"])?;
        let sem_col = table.column(&["SEM_CODE", "semantic_type"])?;
        let group_col = table.column(&["GROUP", "group"])?;

        let mut rows = Vec::with_capacity(table.len());
        for record in table.rows() {
            // Rows without a group cannot map anything
            let Some(group) = cell(record, group_col) else {
                continue;
            };
            rows.push(SemanticRow {
                category: cell(record, category_col).map(str::to_string),
                semantic_type: cell(record, sem_col).map(str::to_string),
                group: group.to_string(),
            });
        }

        let resolver = Self::from_rows(rows);
        tracing::info!(
            "Loaded semantic table from {}: {} categories, {} semantic types, {} groups",
            path.display(),
            resolver.category_to_group.len(),
            resolver.semantic_type_to_group.len(),
            resolver.group_names.len()
        );
        Ok(resolver)
    }

    /// Group of a raw category code
    pub fn group_for_category(&self, code: &str) -> Option<&str> {
        self.category_to_group.get(code).map(String::as_str)
    }

    /// Group of a raw semantic-type code
    pub fn group_for_semantic_type(&self, code: &str) -> Option<&str> {
        self.semantic_type_to_group.get(code).map(String::as_str)
    }

    /// Valid group names
    pub fn group_names(&self) -> &BTreeSet<String> {
        &self.group_names
    }

    /// Whether `code` is itself a group name
    pub fn is_group_name(&self, code: &str) -> bool {
        self.group_names.contains(code)
    }

    /// Resolve a raw type: a group name maps to itself, then category
    /// codes, then semantic-type codes
    pub fn group_for_raw_type<'a>(&'a self, raw_type: &'a str) -> Option<&'a str> {
        if self.is_group_name(raw_type) {
            return Some(raw_type);
        }
        self.group_for_category(raw_type)
            .or_else(|| self.group_for_semantic_type(raw_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CategoryResolver {
        CategoryResolver::from_rows(vec![
            SemanticRow::new("Disease or Syndrome", "T047", "DISO"),
            SemanticRow::new("Sign or Symptom", "T184", "DISO"),
            SemanticRow::new("Pharmacologic Substance", "T121", "CHEM"),
            SemanticRow::new("", "T200", "CHEM"),
        ])
    }

    #[test]
    fn test_lookups() {
        let r = resolver();
        assert_eq!(r.group_for_category("Sign or Symptom"), Some("DISO"));
        assert_eq!(r.group_for_semantic_type("T121"), Some("CHEM"));
        assert_eq!(r.group_for_semantic_type("T200"), Some("CHEM"));
        assert_eq!(r.group_for_category(""), None);
        assert_eq!(r.group_for_category("T047"), None);
    }

    #[test]
    fn test_group_names_come_from_category_mapping() {
        let r = resolver();
        let names: Vec<_> = r.group_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["CHEM", "DISO"]);
        assert!(r.is_group_name("DISO"));
        assert!(!r.is_group_name("T047"));
    }

    #[test]
    fn test_raw_type_priority() {
        let r = resolver();
        assert_eq!(r.group_for_raw_type("CHEM"), Some("CHEM"));
        assert_eq!(r.group_for_raw_type("Disease or Syndrome"), Some("DISO"));
        assert_eq!(r.group_for_raw_type("T184"), Some("DISO"));
        assert_eq!(r.group_for_raw_type("T999"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let r = CategoryResolver::from_rows(vec![
            SemanticRow::new("Finding", "T033", "DISO"),
            SemanticRow::new("Finding", "T033", "PHEN"),
        ]);
        assert_eq!(r.group_for_category("Finding"), Some("PHEN"));
        assert_eq!(r.group_for_semantic_type("T033"), Some("PHEN"));
    }

    #[test]
    fn test_load_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("semantic_info.csv"),
            "CATEGORY,SEM_CODE,GROUP\nDisease or Syndrome,T047,DISO\n,T121,CHEM\nOrphan,T000,\n",
        )
        .unwrap();
        let r = CategoryResolver::load(dir.path()).unwrap();
        assert_eq!(r.group_for_raw_type("T047"), Some("DISO"));
        assert_eq!(r.group_for_raw_type("T121"), Some("CHEM"));
        assert_eq!(r.group_for_raw_type("Orphan"), None);
    }

    #[test]
    fn test_load_missing_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("semantic_info.csv"), "CATEGORY,GROUP\nx,y\n").unwrap();
        assert!(CategoryResolver::load(dir.path()).is_err());
    }
}
