//! Link graph model: flagging, bounded traversal, finalization and tree rendering.
//!
//! A run produces a flat [`Graph`] mapping each explored term to the ordered
//! labels found on its page. Closed labels (excluded or already resolved) are
//! never traversed and only ever rendered as leaves.

mod finalize;
mod flagging;
mod render;
mod traversal;

pub use finalize::finalize;
pub use flagging::{classify, SuffixRule, TerminalRule};
pub use render::render;
pub use traversal::{explore, Crawler, Traversal};

use indexmap::IndexMap;

/// Terminal marker carried by a closed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Terminal by lexical rule, or left unexplored when the run ended.
    Excluded,
    /// Already a graph key when discovered.
    AlreadyResolved,
}

/// A discovered term, optionally closed by exactly one marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub term: String,
    pub marker: Option<Marker>,
}

impl Label {
    pub fn open(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            marker: None,
        }
    }

    pub fn excluded(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            marker: Some(Marker::Excluded),
        }
    }

    pub fn resolved(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            marker: Some(Marker::AlreadyResolved),
        }
    }

    /// Open labels are still eligible for traversal.
    pub fn is_open(&self) -> bool {
        self.marker.is_none()
    }

    /// Close an open label. Markers are never replaced once applied.
    pub fn close(&mut self, marker: Marker) {
        if self.marker.is_none() {
            self.marker = Some(marker);
        }
    }
}

/// Characters used to write markers after a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notation {
    pub excluded: char,
    pub resolved: char,
}

impl Default for Notation {
    fn default() -> Self {
        Self {
            excluded: '$',
            resolved: '@',
        }
    }
}

impl Notation {
    /// Write a label as its term followed by the marker character, if any.
    pub fn format(&self, label: &Label) -> String {
        match label.marker {
            None => label.term.clone(),
            Some(Marker::Excluded) => format!("{}{}", label.term, self.excluded),
            Some(Marker::AlreadyResolved) => format!("{}{}", label.term, self.resolved),
        }
    }

    /// Read a written label back. A trailing marker character closes it, even
    /// when it was part of the term itself.
    pub fn parse(&self, text: &str) -> Label {
        if let Some(term) = text.strip_suffix(self.excluded) {
            Label::excluded(term)
        } else if let Some(term) = text.strip_suffix(self.resolved) {
            Label::resolved(term)
        } else {
            Label::open(text)
        }
    }
}

/// Explored terms mapped to the labels discovered on their pages, in
/// exploration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    entries: IndexMap<String, Vec<Label>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explored term. Returns false and leaves the graph untouched if
    /// the term was already recorded.
    pub fn insert(&mut self, term: impl Into<String>, labels: Vec<Label>) -> bool {
        let term = term.into();
        if self.entries.contains_key(&term) {
            return false;
        }
        self.entries.insert(term, labels);
        true
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(term)
    }

    pub fn get(&self, term: &str) -> Option<&[Label]> {
        self.entries.get(term).map(|labels| labels.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Label])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub(crate) fn labels_mut(&mut self) -> impl Iterator<Item = &mut Vec<Label>> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First explored term, i.e. the seed of the run.
    pub fn root(&self) -> Option<&str> {
        self.entries.keys().next().map(|k| k.as_str())
    }

    /// Total number of labels across all entries.
    pub fn label_count(&self) -> usize {
        self.entries.values().map(|labels| labels.len()).sum()
    }

    /// A graph that carries no discoveries: nothing explored, or only the seed
    /// with an empty list.
    pub fn has_no_results(&self) -> bool {
        self.entries.is_empty() || (self.entries.len() == 1 && self.label_count() == 0)
    }

    /// Plain string form used for persistence.
    pub fn to_document(&self, notation: &Notation) -> IndexMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(term, labels)| {
                (
                    term.clone(),
                    labels.iter().map(|l| notation.format(l)).collect(),
                )
            })
            .collect()
    }

    /// Rebuild a graph from its persisted string form.
    pub fn from_document(document: IndexMap<String, Vec<String>>, notation: &Notation) -> Self {
        let entries = document
            .into_iter()
            .map(|(term, labels)| {
                (
                    term,
                    labels.iter().map(|l| notation.parse(l)).collect(),
                )
            })
            .collect();
        Self { entries }
    }
}
