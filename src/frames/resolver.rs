//! Frame-element resolver
//!
//! Aligns a frame's elements with the syntactic children of its target.
//! Whole element groups from the catalog are tried first, most specific
//! first; if none is fully realised, single-element patterns claim children
//! one at a time in order of frequency.
//!
//! The resolver reads a finished document and produces drafts; recording
//! them is a separate step, so no adapter ever sees resolver output.

use super::catalog::{CatalogEntry, FeGroup, FePattern, FrameCatalog};
use super::relations::RelationTable;
use crate::graph::{Document, FrameElement, FrameId, FrameInstance, FrameSource, GraphError, TermId};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("frame {frame} targets unknown term {term}")]
    UnknownTarget { frame: FrameId, term: TermId },

    #[error("frame {0} has no target")]
    NoTarget(FrameId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// One element filled by one child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub element: String,
    pub term: TermId,
    /// Dependency label that licensed the match
    pub relation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// A whole element group matched
    Group { frequency: u32 },
    /// Patterns matched one element at a time
    Individual,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub assignments: Vec<Assignment>,
    pub strategy: MatchStrategy,
}

impl Resolution {
    pub fn element(&self, name: &str) -> Option<TermId> {
        self.assignments.iter().find(|a| a.element == name).map(|a| a.term)
    }
}

/// Relation label -> dependent, for dependencies governed by `target`.
///
/// The first dependency with a given label wins.
pub fn children_of(doc: &Document, target: TermId) -> BTreeMap<String, TermId> {
    let mut children = BTreeMap::new();
    for dep in doc.children_of(target) {
        children.entry(dep.relation.clone()).or_insert(dep.from);
    }
    children
}

/// Claim `label` from `remaining`, along with any other label on the same term.
fn claim(remaining: &mut BTreeMap<String, TermId>, label: &str) -> Option<TermId> {
    let term = *remaining.get(label)?;
    remaining.retain(|_, t| *t != term);
    Some(term)
}

/// Every significant element of `group` resolved to a distinct child, or `None`.
///
/// Each element is matched against all children; two elements landing on the
/// same term reject the group.
fn match_group(
    table: &RelationTable,
    group: &FeGroup,
    children: &BTreeMap<String, TermId>,
) -> Option<Vec<Assignment>> {
    let mut used = BTreeSet::new();
    let mut assignments = Vec::new();
    for (element, valence) in &group.elements {
        if table.is_skip(valence) {
            continue;
        }
        let relation = table.compatible_relation(valence, children)?;
        let term = *children.get(&relation)?;
        if !used.insert(term) {
            return None;
        }
        assignments.push(Assignment {
            element: element.clone(),
            term,
            relation,
        });
    }
    Some(assignments)
}

/// Most significant elements first, then most frequent.
fn group_order(table: &RelationTable, a: &FeGroup, b: &FeGroup) -> Ordering {
    let significant = |g: &FeGroup| table.significant_count(g.elements.values());
    significant(b)
        .cmp(&significant(a))
        .then_with(|| b.frequency.cmp(&a.frequency))
}

fn match_patterns(
    table: &RelationTable,
    patterns: &[FePattern],
    children: &BTreeMap<String, TermId>,
) -> Vec<Assignment> {
    let mut ordered: Vec<&FePattern> = patterns.iter().collect();
    ordered.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    let mut remaining = children.clone();
    let mut filled = BTreeSet::new();
    let mut assignments = Vec::new();
    for pattern in ordered {
        if filled.contains(&pattern.element) || table.is_skip(&pattern.valence) {
            continue;
        }
        let Some(relation) = table.compatible_relation(&pattern.valence, &remaining) else {
            continue;
        };
        if let Some(term) = claim(&mut remaining, &relation) {
            filled.insert(pattern.element.clone());
            assignments.push(Assignment {
                element: pattern.element.clone(),
                term,
                relation,
            });
        }
    }
    assignments
}

/// Best element alignment for one catalog entry against one set of children.
pub fn resolve(
    table: &RelationTable,
    entry: &CatalogEntry,
    children: &BTreeMap<String, TermId>,
) -> Resolution {
    let mut groups: Vec<&FeGroup> = entry.groups.iter().filter(|g| g.elements.len() > 1).collect();
    groups.sort_by(|a, b| group_order(table, a, b));

    for group in groups {
        if table.significant_count(group.elements.values()) == 0 {
            continue;
        }
        if let Some(assignments) = match_group(table, group, children) {
            return Resolution {
                assignments,
                strategy: MatchStrategy::Group {
                    frequency: group.frequency,
                },
            };
        }
    }

    let assignments = match_patterns(table, &entry.patterns, children);
    let strategy = if assignments.is_empty() {
        MatchStrategy::Unmatched
    } else {
        MatchStrategy::Individual
    };
    Resolution {
        assignments,
        strategy,
    }
}

/// A resolved frame waiting to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDraft {
    /// The tagger frame this was resolved from
    pub source_frame: FrameId,
    pub name: String,
    pub target: TermId,
    pub resolution: Resolution,
}

pub struct FrameElementResolver {
    catalog: Arc<dyn FrameCatalog>,
    relations: RelationTable,
}

impl FrameElementResolver {
    pub fn new(catalog: Arc<dyn FrameCatalog>, relations: RelationTable) -> Self {
        Self { catalog, relations }
    }

    /// Resolve one frame instance. `None` when the catalog has no entry for it.
    pub fn resolve_instance(&self, doc: &Document, frame: &FrameInstance) -> ResolveResult<Option<FrameDraft>> {
        let target = frame.target().ok_or(ResolveError::NoTarget(frame.id))?;
        let term = doc.term(target).ok_or(ResolveError::UnknownTarget {
            frame: frame.id,
            term: target,
        })?;

        let entry = match self.catalog.lookup(&frame.name, &term.lemma, term.pos) {
            Ok(entry) => entry,
            Err(miss) => {
                warn!(frame = %frame.id, name = %frame.name, lemma = %term.lemma, "{}", miss);
                return Ok(None);
            }
        };

        let resolution = resolve(&self.relations, &entry, &children_of(doc, target));
        debug!(
            frame = %frame.id,
            name = %frame.name,
            strategy = ?resolution.strategy,
            elements = resolution.assignments.len(),
            "resolved frame"
        );
        Ok(Some(FrameDraft {
            source_frame: frame.id,
            name: frame.name.clone(),
            target,
            resolution,
        }))
    }

    /// Drafts for every tagger frame in the document.
    pub fn resolve_document(&self, doc: &Document) -> ResolveResult<Vec<FrameDraft>> {
        let mut drafts = Vec::new();
        for frame in doc.frames().iter().filter(|f| f.source == FrameSource::Tagger) {
            if let Some(draft) = self.resolve_instance(doc, frame)? {
                drafts.push(draft);
            }
        }
        Ok(drafts)
    }

    /// Record matched drafts as resolver frames; returns how many were added.
    pub fn apply(&self, doc: &mut Document, drafts: &[FrameDraft]) -> ResolveResult<usize> {
        let mut added = 0;
        for draft in drafts {
            if draft.resolution.strategy == MatchStrategy::Unmatched {
                continue;
            }
            let elements = draft
                .resolution
                .assignments
                .iter()
                .map(|a| FrameElement::new(&a.element, vec![a.term]))
                .collect();
            doc.add_frame(&draft.name, vec![draft.target], elements, FrameSource::Resolver)?;
            added += 1;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{CatalogMiss, StaticCatalog, Valence};
    use crate::graph::{NewTerm, Pos, SentenceId};

    fn group(elements: &[(&str, &str, &str)], frequency: u32) -> FeGroup {
        FeGroup {
            elements: elements
                .iter()
                .map(|(fe, pt, gf)| (fe.to_string(), Valence::new(*pt, *gf)))
                .collect(),
            frequency,
        }
    }

    fn pattern(element: &str, pt: &str, gf: &str, frequency: u32) -> FePattern {
        FePattern {
            element: element.to_string(),
            valence: Valence::new(pt, gf),
            frequency,
        }
    }

    fn kids(pairs: &[(&str, u32)]) -> BTreeMap<String, TermId> {
        pairs.iter().map(|(l, t)| (l.to_string(), TermId(*t))).collect()
    }

    #[test]
    fn satisfiable_group_beats_more_specific_one() {
        let entry = CatalogEntry {
            groups: vec![
                group(&[("Agent", "NP", "Ext"), ("Theme", "NP", "Obj")], 3),
                group(
                    &[("Agent", "NP", "Ext"), ("Theme", "NP", "Obj"), ("Goal", "PP[to]", "Dep")],
                    20,
                ),
            ],
            patterns: Vec::new(),
        };
        let children = kids(&[("nsubj", 1), ("dobj", 3)]);

        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.strategy, MatchStrategy::Group { frequency: 3 });
        assert_eq!(resolution.element("Agent"), Some(TermId(1)));
        assert_eq!(resolution.element("Theme"), Some(TermId(3)));
        assert_eq!(resolution.element("Goal"), None);
    }

    #[test]
    fn more_significant_group_is_tried_first() {
        let entry = CatalogEntry {
            groups: vec![
                group(&[("Agent", "NP", "Ext"), ("Theme", "DNI", "")], 50),
                group(&[("Agent", "NP", "Ext"), ("Theme", "NP", "Obj")], 2),
            ],
            patterns: Vec::new(),
        };
        let children = kids(&[("nsubj", 1), ("dobj", 3)]);

        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.strategy, MatchStrategy::Group { frequency: 2 });
        assert_eq!(resolution.assignments.len(), 2);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let entry = CatalogEntry {
            groups: vec![
                group(&[("Agent", "NP", "Ext"), ("Theme", "NP", "Obj")], 5),
                group(&[("Cause", "NP", "Ext"), ("Theme", "NP", "Obj")], 5),
            ],
            patterns: Vec::new(),
        };
        let children = kids(&[("nsubj", 1), ("dobj", 3)]);
        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.element("Agent"), Some(TermId(1)));
        assert_eq!(resolution.element("Cause"), None);
    }

    #[test]
    fn single_element_groups_are_ignored() {
        let entry = CatalogEntry {
            groups: vec![group(&[("Agent", "NP", "Ext")], 100)],
            patterns: Vec::new(),
        };
        let resolution = resolve(&RelationTable::default(), &entry, &kids(&[("nsubj", 1)]));
        assert_eq!(resolution.strategy, MatchStrategy::Unmatched);
    }

    #[test]
    fn group_elements_sharing_a_child_reject_the_group() {
        let entry = CatalogEntry {
            groups: vec![group(&[("Content", "NP", "Dep"), ("Theme", "NP", "Obj")], 4)],
            patterns: Vec::new(),
        };
        let children = kids(&[("dobj", 1), ("iobj", 2)]);

        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.strategy, MatchStrategy::Unmatched);
        assert!(resolution.assignments.is_empty());
    }

    #[test]
    fn group_of_only_skip_types_never_matches() {
        let entry = CatalogEntry {
            groups: vec![group(&[("Agent", "CNI", ""), ("Theme", "DNI", "")], 30)],
            patterns: Vec::new(),
        };
        let resolution = resolve(&RelationTable::default(), &entry, &kids(&[("nsubj", 1)]));
        assert_eq!(resolution.strategy, MatchStrategy::Unmatched);

        let entry = CatalogEntry {
            patterns: vec![pattern("Agent", "NP", "Ext", 1)],
            ..entry
        };
        let resolution = resolve(&RelationTable::default(), &entry, &kids(&[("nsubj", 1)]));
        assert_eq!(resolution.strategy, MatchStrategy::Individual);
        assert_eq!(resolution.element("Agent"), Some(TermId(1)));
    }

    #[test]
    fn competing_patterns_claim_a_child_once() {
        let entry = CatalogEntry {
            groups: vec![group(&[("Agent", "NP", "Ext"), ("Goal", "PP[to]", "Dep")], 9)],
            patterns: vec![
                pattern("Cause", "NP", "Ext", 2),
                pattern("Agent", "NP", "Ext", 7),
            ],
        };
        let children = kids(&[("nsubj", 1)]);

        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.strategy, MatchStrategy::Individual);
        assert_eq!(resolution.element("Agent"), Some(TermId(1)));
        assert_eq!(resolution.element("Cause"), None);
    }

    #[test]
    fn an_element_takes_one_child() {
        let entry = CatalogEntry {
            groups: Vec::new(),
            patterns: vec![
                pattern("Theme", "NP", "Obj", 5),
                pattern("Theme", "NP", "Dep", 4),
            ],
        };
        let children = kids(&[("dobj", 2), ("nn", 4)]);
        let resolution = resolve(&RelationTable::default(), &entry, &children);
        assert_eq!(resolution.assignments.len(), 1);
        assert_eq!(resolution.element("Theme"), Some(TermId(2)));
    }

    /// "Troops attacked the city" with an Attack frame on "attacked"
    fn attack_document() -> Document {
        let mut doc = Document::new();
        let s = doc.create_sentence(SentenceId(1));
        let troops = doc.add_term(s, NewTerm::new(0, "Troops", "troop", Pos::Noun)).unwrap();
        let attacked = doc.add_term(s, NewTerm::new(7, "attacked", "attack", Pos::Verb)).unwrap();
        let city = doc.add_term(s, NewTerm::new(20, "city", "city", Pos::Noun)).unwrap();
        doc.add_dependency(troops, attacked, "nsubj").unwrap();
        doc.add_dependency(city, attacked, "dobj").unwrap();
        doc.add_frame("Attack", vec![attacked], Vec::new(), FrameSource::Tagger)
            .unwrap();
        doc.add_frame("Victory", vec![city], Vec::new(), FrameSource::Tagger)
            .unwrap();
        doc
    }

    fn attack_resolver() -> FrameElementResolver {
        let catalog = StaticCatalog::new().with_entry(
            "Attack",
            "attack",
            Pos::Verb,
            CatalogEntry {
                groups: vec![group(&[("Assailant", "NP", "Ext"), ("Victim", "NP", "Obj")], 12)],
                patterns: Vec::new(),
            },
        );
        FrameElementResolver::new(Arc::new(catalog), RelationTable::default())
    }

    #[test]
    fn children_first_label_wins() {
        let mut doc = attack_document();
        let extra = doc
            .add_term(SentenceId(1), NewTerm::new(30, "also", "also", Pos::Adverb))
            .unwrap();
        doc.add_dependency(extra, TermId(2), "nsubj").unwrap();

        let children = children_of(&doc, TermId(2));
        assert_eq!(children["nsubj"], TermId(1));
        assert_eq!(children["dobj"], TermId(3));
    }

    #[test]
    fn catalog_miss_skips_only_that_frame() {
        let doc = attack_document();
        let resolver = attack_resolver();
        let victory = &doc.frames()[1];
        assert!(resolver.resolve_instance(&doc, victory).unwrap().is_none());

        let drafts = resolver.resolve_document(&doc).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].resolution.element("Assailant"), Some(TermId(1)));
        assert_eq!(drafts[0].resolution.element("Victim"), Some(TermId(3)));
    }

    #[test]
    fn resolving_twice_gives_the_same_mapping() {
        let mut doc = attack_document();
        let resolver = attack_resolver();

        let first = resolver.resolve_document(&doc).unwrap();
        assert_eq!(resolver.apply(&mut doc, &first).unwrap(), 1);
        let second = resolver.resolve_document(&doc).unwrap();
        assert_eq!(first, second);

        let resolved = doc.frames().last().unwrap();
        assert_eq!(resolved.source, FrameSource::Resolver);
        assert_eq!(resolved.element("Victim").unwrap().terms, vec![TermId(3)]);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let doc = attack_document();
        let mut frame = doc.frames()[0].clone();
        frame.targets = vec![TermId(99)];
        let err = attack_resolver().resolve_instance(&doc, &frame).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownTarget { term: TermId(99), .. }));
    }

    #[test]
    fn miss_is_reported_with_context() {
        let miss = StaticCatalog::new().lookup("Attack", "attack", Pos::Verb).unwrap_err();
        assert_eq!(miss, CatalogMiss::FrameNotFound("Attack".to_string()));
    }
}
