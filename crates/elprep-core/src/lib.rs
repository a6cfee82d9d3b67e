//! elprep Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout elprep:
//! - BigBio-style source documents (passages, annotated entities)
//! - Normalized mention records produced for entity-linking training
//! - Per-entity skip diagnostics
//! - Common error types
//! - The corpus source trait
//! - Configuration management

pub mod config;

pub use config::{
    ConfigError, CorpusSourceConfig, DatasetConfig, LoggingConfig, PrepConfig,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for elprep operations
#[derive(Error, Debug)]
pub enum PrepError {
    /// Concept or semantic table is missing columns or has unreadable rows
    #[error("Malformed terminology table {path}: {message}")]
    MalformedTerminology { path: PathBuf, message: String },

    #[error("IO error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PrepError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a malformed-terminology error
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedTerminology {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

// ============================================================================
// Splits
// ============================================================================

/// Dataset split names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    /// Order in which splits are converted
    pub const PROCESSING_ORDER: [Split; 3] = [Split::Validation, Split::Test, Split::Train];

    /// Canonical split name as used by corpus sources
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }

    /// File stem of the mention file written for this split
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "valid",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Split {
    type Err = PrepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Self::Train),
            "validation" | "valid" | "dev" => Ok(Self::Validation),
            "test" => Ok(Self::Test),
            other => Err(PrepError::Corpus(format!("unknown split name: {other}"))),
        }
    }
}

// ============================================================================
// Source Documents
// ============================================================================

/// A text passage of a source document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Ordered text segments
    #[serde(default)]
    pub text: Vec<String>,
}

impl Passage {
    /// Passage with a single text segment
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: vec![text.into()],
        }
    }
}

/// Reference from an annotated entity to a knowledge-base concept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRef {
    /// Knowledge base name (e.g. "UMLS", "SNOMEDCT")
    #[serde(default)]
    pub db_name: String,

    /// Concept identifier
    pub db_id: String,
}

impl NormalizedRef {
    pub fn new(db_name: impl Into<String>, db_id: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            db_id: db_id.into(),
        }
    }
}

/// An annotated entity span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    /// Source annotation id, when the corpus has one
    #[serde(default)]
    pub id: Option<String>,

    /// Surface text fragments
    #[serde(rename = "text", default)]
    pub entity_text: Vec<String>,

    /// Character spans `[start, end]` into the document's full text
    #[serde(default)]
    pub offsets: Vec<[usize; 2]>,

    /// Category or semantic-type code recorded by the corpus
    #[serde(rename = "type", default)]
    pub raw_type: Option<String>,

    /// Concept references; the first one is authoritative
    #[serde(default)]
    pub normalized: Vec<NormalizedRef>,
}

impl RawEntity {
    /// Create an entity covering one span
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity_text: vec![text.into()],
            offsets: vec![[start, end]],
            ..Default::default()
        }
    }

    /// Set the raw type code
    pub fn with_type(mut self, raw_type: impl Into<String>) -> Self {
        self.raw_type = Some(raw_type.into());
        self
    }

    /// Add a normalized concept reference
    pub fn with_concept(mut self, db_name: impl Into<String>, db_id: impl Into<String>) -> Self {
        self.normalized.push(NormalizedRef::new(db_name, db_id));
        self
    }

    /// Surface text: fragments joined by single spaces, trimmed
    pub fn surface_text(&self) -> String {
        self.entity_text.join(" ").trim().to_string()
    }

    /// Concept id of the first normalized reference
    pub fn concept_id(&self) -> Option<&str> {
        self.normalized.first().map(|n| n.db_id.as_str())
    }

    /// Character range covered by the entity: first start to last end,
    /// `0` for each bound when there are no offsets
    pub fn span(&self) -> (usize, usize) {
        let start = self.offsets.first().map(|o| o[0]).unwrap_or(0);
        let end = self.offsets.last().map(|o| o[1]).unwrap_or(0);
        (start, end)
    }
}

/// A unit of the source corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub document_id: String,

    #[serde(default)]
    pub passages: Vec<Passage>,

    #[serde(default)]
    pub entities: Vec<RawEntity>,
}

impl RawDocument {
    /// Create an empty document
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            ..Default::default()
        }
    }

    /// Add a passage
    pub fn with_passage(mut self, text: impl Into<String>) -> Self {
        self.passages.push(Passage::new(text));
        self
    }

    /// Add an entity
    pub fn with_entity(mut self, entity: RawEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// All passage segments joined by a single space.
    /// Entity offsets index into this text by character.
    pub fn full_text(&self) -> String {
        self.passages
            .iter()
            .flat_map(|p| p.text.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Output Records
// ============================================================================

/// A resolved entity mention, one line of a split's mention file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionRecord {
    /// Surface text of the mention
    pub mention: String,

    /// `{document_id}.{n}` where n counts emitted mentions from 1
    pub mention_id: String,

    pub context_left: String,
    pub context_right: String,
    pub context_doc_id: String,

    /// Resolved semantic group
    #[serde(rename = "type")]
    pub group: String,

    /// Resolved (possibly corrected) concept id
    pub label_id: String,

    /// Concept description
    pub label: String,

    /// Concept preferred title
    pub label_title: String,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Why an annotated entity produced no mention record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Entity carries no normalized concept reference
    NoConceptReference,

    /// Neither the concept index nor the raw type yields a group
    UnknownGroup {
        concept_id: String,
        raw_type: Option<String>,
    },

    /// Resolved group has no entry in the terminology index
    GroupNotInTerminology { concept_id: String, group: String },

    /// Resolved group exists but does not contain the concept
    ConceptNotInGroup { concept_id: String, group: String },
}

impl SkipReason {
    /// Stable short code, used for aggregated counts
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoConceptReference => "no_concept_reference",
            Self::UnknownGroup { .. } => "unknown_group",
            Self::GroupNotInTerminology { .. } => "group_not_in_terminology",
            Self::ConceptNotInGroup { .. } => "concept_not_in_group",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConceptReference => write!(f, "entity has no concept reference"),
            Self::UnknownGroup {
                concept_id,
                raw_type,
            } => write!(
                f,
                "no group found for concept {concept_id} and entity type {}",
                raw_type.as_deref().unwrap_or("<none>")
            ),
            Self::GroupNotInTerminology { group, .. } => {
                write!(f, "group '{group}' not found in terminology index")
            }
            Self::ConceptNotInGroup { concept_id, group } => {
                write!(f, "concept '{concept_id}' not found under group '{group}'")
            }
        }
    }
}

/// A skipped entity and the reason it was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub document_id: String,
    pub entity_id: Option<String>,
    pub entity_text: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A concept id substituted by the correction overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    pub document_id: String,
    pub entity_text: String,
    pub from: String,
    pub to: String,
}

// ============================================================================
// Traits
// ============================================================================

/// Documents of one split as delivered by a corpus source
#[derive(Debug, Clone, Default)]
pub struct LoadedSplit {
    pub documents: Vec<RawDocument>,

    /// Documents the source could not read and left out
    pub failed: usize,
}

impl LoadedSplit {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            failed: 0,
        }
    }
}

/// Supplier of source documents, one split at a time
pub trait CorpusSource: Send + Sync {
    /// Load every document of a split.
    ///
    /// Returns `Ok(None)` when the split has no backing data.
    fn load_split(&self, split: Split) -> Result<Option<LoadedSplit>>;

    /// Source name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_text_joins_passages() {
        let doc = RawDocument::new("d1")
            .with_passage("Title line")
            .with_passage("Abstract body.");
        assert_eq!(doc.full_text(), "Title line Abstract body.");
    }

    #[test]
    fn test_full_text_joins_all_segments() {
        let doc = RawDocument {
            document_id: "d1".to_string(),
            passages: vec![Passage {
                text: vec!["a".to_string(), "b".to_string()],
            }],
            entities: vec![],
        };
        assert_eq!(doc.full_text(), "a b");
    }

    #[test]
    fn test_entity_span_defaults() {
        let entity = RawEntity::default();
        assert_eq!(entity.span(), (0, 0));

        let entity = RawEntity {
            offsets: vec![[4, 8], [12, 20]],
            ..Default::default()
        };
        assert_eq!(entity.span(), (4, 20));
    }

    #[test]
    fn test_entity_surface_text() {
        let entity = RawEntity {
            entity_text: vec!["  left".to_string(), "ventricle ".to_string()],
            ..Default::default()
        };
        assert_eq!(entity.surface_text(), "left ventricle");
    }

    #[test]
    fn test_entity_concept_id_uses_first_reference() {
        let entity = RawEntity::new("flu", 0, 3)
            .with_concept("UMLS", "C1")
            .with_concept("UMLS", "C2");
        assert_eq!(entity.concept_id(), Some("C1"));
        assert_eq!(RawEntity::new("x", 0, 1).concept_id(), None);
    }

    #[test]
    fn test_bigbio_document_deserialize() {
        let json = r#"{
            "id": "0",
            "document_id": "25763772",
            "passages": [{"id": "1", "type": "title", "text": ["DCTN4 as a modifier"], "offsets": [[0, 19]]}],
            "entities": [{
                "id": "3",
                "type": "T116",
                "text": ["DCTN4"],
                "offsets": [[0, 5]],
                "normalized": [{"db_name": "UMLS", "db_id": "C4308010"}]
            }],
            "events": [],
            "relations": []
        }"#;
        let doc: RawDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.document_id, "25763772");
        assert_eq!(doc.entities[0].raw_type.as_deref(), Some("T116"));
        assert_eq!(doc.entities[0].concept_id(), Some("C4308010"));
        assert_eq!(doc.entities[0].span(), (0, 5));
    }

    #[test]
    fn test_mention_record_field_names() {
        let record = MentionRecord {
            mention: "flu".to_string(),
            mention_id: "d1.1".to_string(),
            context_left: String::new(),
            context_right: "season".to_string(),
            context_doc_id: "d1".to_string(),
            group: "Disease".to_string(),
            label_id: "C1".to_string(),
            label: "Flu ( Disease : Viral )".to_string(),
            label_title: "Flu".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"mention":"flu","mention_id":"d1.1""#));
        assert!(json.contains(r#""type":"Disease""#));
        assert!(!json.contains("group"));
    }

    #[test]
    fn test_split_names() {
        assert_eq!(Split::Validation.file_stem(), "valid");
        assert_eq!(Split::Validation.as_str(), "validation");
        assert_eq!("valid".parse::<Split>().unwrap(), Split::Validation);
        assert_eq!("TRAIN".parse::<Split>().unwrap(), Split::Train);
        assert!("holdout".parse::<Split>().is_err());
    }

    #[test]
    fn test_diagnostic_serializes_flat() {
        let diagnostic = Diagnostic {
            document_id: "d1".to_string(),
            entity_id: Some("e7".to_string()),
            entity_text: "flu".to_string(),
            reason: SkipReason::ConceptNotInGroup {
                concept_id: "C1".to_string(),
                group: "Disease".to_string(),
            },
        };
        let value = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(value["reason"], "concept_not_in_group");
        assert_eq!(value["group"], "Disease");
        assert_eq!(diagnostic.reason.code(), "concept_not_in_group");
    }
}
