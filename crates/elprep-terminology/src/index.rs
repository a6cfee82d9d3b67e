//! Terminology Index
//!
//! Aggregates the concept table into:
//! - a group -> concept -> {title, description} map used for resolution
//! - a concept -> groups index used to disambiguate entity groups
//! - a flat dictionary artifact for downstream encoders
//!
//! Rows are accumulated in a [`TerminologyIndexBuilder`] and frozen into a
//! read-only [`TerminologyIndex`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use elprep_core::{PrepError, Result};

use crate::table::{cell, locate, DelimitedTable};

/// File stem of the concept table inside a terminology directory
pub const CONCEPT_TABLE: &str = "all_disambiguated";

const CONCEPT_ID_COLUMNS: &[&str] = &["CUI", "concept_id", "SNOMED_code"];
const TITLE_COLUMNS: &[&str] = &["Title", "title"];
const GROUP_COLUMNS: &[&str] = &["GROUP", "group"];
const CATEGORY_COLUMNS: &[&str] = &["Entity", "category_label"];

// ============================================================================
// Types
// ============================================================================

/// One row of the concept table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRow {
    pub concept_id: String,
    pub title: String,
    pub group: String,
    pub category_label: String,
}

impl ConceptRow {
    pub fn new(
        concept_id: impl Into<String>,
        title: impl Into<String>,
        group: impl Into<String>,
        category_label: impl Into<String>,
    ) -> Self {
        Self {
            concept_id: concept_id.into(),
            title: title.into(),
            group: group.into(),
            category_label: category_label.into(),
        }
    }
}

/// Title and description of a concept within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptInfo {
    pub title: String,
    pub description: String,
}

/// Entry of the dictionary artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub concept_id: String,
    pub title: String,
    pub description: String,
    pub group: String,
}

/// Result of looking a concept up under a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptLookup<'a> {
    Found(&'a ConceptInfo),
    GroupAbsent,
    ConceptAbsent,
}

/// Two-level group -> concept_id -> info map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupConceptMap(BTreeMap<String, BTreeMap<String, ConceptInfo>>);

impl GroupConceptMap {
    /// Look up a concept; absence of either level is a value, not an error
    pub fn lookup(&self, group: &str, concept_id: &str) -> ConceptLookup<'_> {
        match self.0.get(group) {
            None => ConceptLookup::GroupAbsent,
            Some(concepts) => concepts
                .get(concept_id)
                .map(ConceptLookup::Found)
                .unwrap_or(ConceptLookup::ConceptAbsent),
        }
    }

    /// Concept info, if resolvable
    pub fn get(&self, group: &str, concept_id: &str) -> Option<&ConceptInfo> {
        self.0.get(group).and_then(|c| c.get(concept_id))
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.0.contains_key(group)
    }

    /// Group names in sorted order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Total number of (group, concept) entries
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Concept id -> groups it appears under, in first-seen table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptGroupIndex(HashMap<String, Vec<String>>);

impl ConceptGroupIndex {
    /// Candidate groups of a concept; empty when unknown
    pub fn groups(&self, concept_id: &str) -> &[String] {
        self.0.get(concept_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TripleKey {
    concept_id: String,
    title: String,
    group: String,
}

/// Accumulates concept rows; [`build`](Self::build) freezes them
#[derive(Debug, Default)]
pub struct TerminologyIndexBuilder {
    /// Aggregated triples in first-seen order
    triples: Vec<(TripleKey, Vec<String>)>,
    positions: HashMap<TripleKey, usize>,
    concept_groups: HashMap<String, Vec<String>>,
}

impl TerminologyIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one concept table row.
    ///
    /// An empty category label still registers the concept but adds
    /// nothing to the description's label list.
    pub fn add_row(&mut self, row: ConceptRow) -> &mut Self {
        let groups = self.concept_groups.entry(row.concept_id.clone()).or_default();
        if !groups.contains(&row.group) {
            groups.push(row.group.clone());
        }

        let key = TripleKey {
            concept_id: row.concept_id,
            title: row.title,
            group: row.group,
        };
        let pos = match self.positions.get(&key) {
            Some(&pos) => pos,
            None => {
                self.triples.push((key.clone(), Vec::new()));
                self.positions.insert(key, self.triples.len() - 1);
                self.triples.len() - 1
            }
        };

        let labels = &mut self.triples[pos].1;
        if !row.category_label.is_empty() && !labels.contains(&row.category_label) {
            labels.push(row.category_label);
        }
        self
    }

    /// Add many rows
    pub fn extend(&mut self, rows: impl IntoIterator<Item = ConceptRow>) -> &mut Self {
        for row in rows {
            self.add_row(row);
        }
        self
    }

    /// Freeze into a read-only index
    pub fn build(self) -> TerminologyIndex {
        let mut dictionary: Vec<DictionaryEntry> = self
            .triples
            .into_iter()
            .map(|(key, labels)| DictionaryEntry {
                description: format!("{} ( {} : {} )", key.title, key.group, labels.join(" ; ")),
                concept_id: key.concept_id,
                title: key.title,
                group: key.group,
            })
            .collect();
        // Stable: ties keep first-seen order
        dictionary.sort_by(|a, b| (&a.group, &a.concept_id).cmp(&(&b.group, &b.concept_id)));

        let mut map: BTreeMap<String, BTreeMap<String, ConceptInfo>> = BTreeMap::new();
        let mut conflicts = 0usize;
        for entry in &dictionary {
            let concepts = map.entry(entry.group.clone()).or_default();
            if concepts.contains_key(&entry.concept_id) {
                // Same concept listed under one group with two titles
                conflicts += 1;
                continue;
            }
            concepts.insert(
                entry.concept_id.clone(),
                ConceptInfo {
                    title: entry.title.clone(),
                    description: entry.description.clone(),
                },
            );
        }
        if conflicts > 0 {
            tracing::warn!(
                "{} concepts have more than one title within a group; kept the first",
                conflicts
            );
        }

        TerminologyIndex {
            groups: GroupConceptMap(map),
            concept_groups: ConceptGroupIndex(self.concept_groups),
            dictionary,
        }
    }
}

// ============================================================================
// Index
// ============================================================================

/// Read-only terminology lookups built from one concept table
#[derive(Debug, Clone, Default)]
pub struct TerminologyIndex {
    groups: GroupConceptMap,
    concept_groups: ConceptGroupIndex,
    dictionary: Vec<DictionaryEntry>,
}

impl TerminologyIndex {
    /// Build from concept rows in table order
    pub fn from_rows(rows: impl IntoIterator<Item = ConceptRow>) -> Self {
        let mut builder = TerminologyIndexBuilder::new();
        builder.extend(rows);
        builder.build()
    }

    /// Load the concept table of a terminology directory
    pub fn load(terminology_dir: &Path) -> Result<Self> {
        let path = locate(terminology_dir, CONCEPT_TABLE)?;
        Self::from_table_file(&path)
    }

    /// Load a concept table file
    pub fn from_table_file(path: &Path) -> Result<Self> {
        let table = DelimitedTable::open(path)?;
        let rows = read_concept_rows(&table)?;
        let index = Self::from_rows(rows);
        tracing::info!(
            "Loaded terminology from {}: {} rows, {} concepts, {} groups",
            path.display(),
            table.len(),
            index.concept_groups.len(),
            index.groups.groups().count()
        );
        Ok(index)
    }

    /// Group -> concept -> info map
    pub fn group_concept_map(&self) -> &GroupConceptMap {
        &self.groups
    }

    /// Concept -> candidate groups index
    pub fn concept_group_index(&self) -> &ConceptGroupIndex {
        &self.concept_groups
    }

    /// Dictionary artifact, sorted by (group, concept_id)
    pub fn dictionary(&self) -> &[DictionaryEntry] {
        &self.dictionary
    }
}

fn read_concept_rows(table: &DelimitedTable) -> Result<Vec<ConceptRow>> {
    let id_col = table.column(CONCEPT_ID_COLUMNS)?;
    let title_col = table.column(TITLE_COLUMNS)?;
    let group_col = table.column(GROUP_COLUMNS)?;
    let category_col = table.column(CATEGORY_COLUMNS)?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let required = |col: usize, name: &str| {
                cell(record, col).map(str::to_string).ok_or_else(|| {
                    PrepError::malformed(
                        table.path(),
                        format!("row {}: empty {name}", idx + 2),
                    )
                })
            };
            Ok(ConceptRow {
                concept_id: required(id_col, "concept id")?,
                title: required(title_col, "title")?,
                group: required(group_col, "group")?,
                category_label: cell(record, category_col).unwrap_or_default().to_string(),
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
