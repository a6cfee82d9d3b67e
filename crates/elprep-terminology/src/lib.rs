//! elprep Terminology - Concept lookups for entity resolution
//!
//! Loads the pre-built terminology tables of one knowledge base:
//! - the concept table, aggregated into a [`TerminologyIndex`]
//! - the semantic reference table, as a [`CategoryResolver`]
//! - an optional [`CorrectionMap`] of reviewed concept id fixes

pub mod correction;
pub mod index;
pub mod semantic;
pub mod table;

pub use correction::CorrectionMap;
pub use index::{
    ConceptGroupIndex, ConceptInfo, ConceptLookup, ConceptRow, DictionaryEntry, GroupConceptMap,
    TerminologyIndex, TerminologyIndexBuilder,
};
pub use semantic::{CategoryResolver, SemanticRow};

use std::path::Path;

use elprep_core::Result;

/// Both lookup structures of one terminology directory
#[derive(Debug, Clone)]
pub struct Terminology {
    pub index: TerminologyIndex,
    pub resolver: CategoryResolver,
}

impl Terminology {
    /// Load `all_disambiguated` and `semantic_info` tables from a directory
    pub fn load(terminology_dir: &Path) -> Result<Self> {
        Ok(Self {
            index: TerminologyIndex::load(terminology_dir)?,
            resolver: CategoryResolver::load(terminology_dir)?,
        })
    }
}
