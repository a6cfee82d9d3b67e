//! Mention extraction
//!
//! Turns the annotated entities of one document into mention records:
//! concept correction, group resolution, terminology lookup and context
//! windows. Entities that cannot be resolved are returned as diagnostics
//! instead of records.

use elprep_core::{
    AppliedCorrection, Diagnostic, MentionRecord, RawDocument, RawEntity, SkipReason,
};
use elprep_terminology::{
    CategoryResolver, ConceptGroupIndex, ConceptInfo, ConceptLookup, CorrectionMap,
    GroupConceptMap, Terminology,
};

/// Group name meaning "could not be resolved"
pub const UNKNOWN_GROUP: &str = "Unknown";

// ============================================================================
// Resolution context
// ============================================================================

/// Read-only lookups shared by every document of a corpus
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub concepts: &'a GroupConceptMap,
    pub concept_groups: &'a ConceptGroupIndex,
    pub resolver: &'a CategoryResolver,
    pub corrections: Option<&'a CorrectionMap>,
}

impl<'a> ResolutionContext<'a> {
    /// Context over a loaded terminology, without corrections
    pub fn new(terminology: &'a Terminology) -> Self {
        Self {
            concepts: terminology.index.group_concept_map(),
            concept_groups: terminology.index.concept_group_index(),
            resolver: &terminology.resolver,
            corrections: None,
        }
    }

    /// Apply a correction overlay before resolution
    pub fn with_corrections(mut self, corrections: Option<&'a CorrectionMap>) -> Self {
        self.corrections = corrections;
        self
    }

    /// Semantic group of a concept mention.
    ///
    /// A concept listed under exactly one group resolves to it. Otherwise
    /// the raw type is mapped through the resolver, and a result outside
    /// a non-empty candidate set is replaced by the first candidate
    /// (first-seen order of the concept table). `None` means unknown,
    /// including a group literally named [`UNKNOWN_GROUP`].
    pub fn resolve_group<'b>(
        &'b self,
        concept_id: &str,
        raw_type: Option<&'b str>,
    ) -> Option<&'b str> {
        let candidates = self.concept_groups.groups(concept_id);
        let group = match candidates {
            [only] => only.as_str(),
            _ => {
                let typed = raw_type.and_then(|t| self.resolver.group_for_raw_type(t));
                match (typed, candidates.first()) {
                    (Some(g), None) => g,
                    (Some(g), Some(_)) if candidates.iter().any(|c| c == g) => g,
                    (_, Some(first)) => first.as_str(),
                    (None, None) => return None,
                }
            }
        };

        Some(group).filter(|g| *g != UNKNOWN_GROUP)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Output of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub mentions: Vec<MentionRecord>,
    pub skipped: Vec<Diagnostic>,
    pub corrections: Vec<AppliedCorrection>,
}

/// Extract the mention records of a document, in entity order
pub fn extract_mentions(document: &RawDocument, ctx: &ResolutionContext<'_>) -> Extraction {
    let full_text = document.full_text();
    let text = CharIndexed::new(&full_text);
    let mut out = Extraction::default();
    let mut next_id = 1usize;

    for entity in &document.entities {
        let surface = entity.surface_text();

        let Some(source_id) = entity.concept_id() else {
            out.skipped.push(diagnostic(
                document,
                entity,
                surface,
                SkipReason::NoConceptReference,
            ));
            continue;
        };

        let concept_id = ctx.corrections.map_or(source_id, |c| c.apply(source_id));
        if concept_id != source_id {
            out.corrections.push(AppliedCorrection {
                document_id: document.document_id.clone(),
                entity_text: surface.clone(),
                from: source_id.to_string(),
                to: concept_id.to_string(),
            });
        }

        let (group, info) = match resolve_concept(ctx, concept_id, entity.raw_type.as_deref()) {
            Ok(resolved) => resolved,
            Err(reason) => {
                out.skipped.push(diagnostic(document, entity, surface, reason));
                continue;
            }
        };

        let (start, end) = entity.span();
        out.mentions.push(MentionRecord {
            mention: surface,
            mention_id: format!("{}.{}", document.document_id, next_id),
            context_left: text.before(start).trim().to_string(),
            context_right: text.after(end).trim().to_string(),
            context_doc_id: document.document_id.clone(),
            group: group.to_string(),
            label_id: concept_id.to_string(),
            label: info.description.clone(),
            label_title: info.title.clone(),
        });
        next_id += 1;
    }

    out
}

/// Group and terminology entry of a (corrected) concept id
fn resolve_concept<'b>(
    ctx: &'b ResolutionContext<'_>,
    concept_id: &str,
    raw_type: Option<&'b str>,
) -> Result<(&'b str, &'b ConceptInfo), SkipReason> {
    let Some(group) = ctx.resolve_group(concept_id, raw_type) else {
        return Err(SkipReason::UnknownGroup {
            concept_id: concept_id.to_string(),
            raw_type: raw_type.map(str::to_string),
        });
    };

    match ctx.concepts.lookup(group, concept_id) {
        ConceptLookup::Found(info) => Ok((group, info)),
        ConceptLookup::GroupAbsent => Err(SkipReason::GroupNotInTerminology {
            concept_id: concept_id.to_string(),
            group: group.to_string(),
        }),
        ConceptLookup::ConceptAbsent => Err(SkipReason::ConceptNotInGroup {
            concept_id: concept_id.to_string(),
            group: group.to_string(),
        }),
    }
}

fn diagnostic(
    document: &RawDocument,
    entity: &RawEntity,
    entity_text: String,
    reason: SkipReason,
) -> Diagnostic {
    Diagnostic {
        document_id: document.document_id.clone(),
        entity_id: entity.id.clone(),
        entity_text,
        reason,
    }
}

/// Character-offset slicing over a UTF-8 string.
/// Offsets past the end clamp to the end.
struct CharIndexed<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
}

impl<'a> CharIndexed<'a> {
    fn new(text: &'a str) -> Self {
        let boundaries = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, boundaries }
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.boundaries
            .get(char_idx)
            .copied()
            .unwrap_or(self.text.len())
    }

    fn before(&self, char_idx: usize) -> &'a str {
        &self.text[..self.byte_offset(char_idx)]
    }

    fn after(&self, char_idx: usize) -> &'a str {
        &self.text[self.byte_offset(char_idx)..]
    }
}

// ============================================================================
// Tests
// ============================================================================
