//! Decides whether a discovered term may be traversed further.

use super::{Graph, Label};

/// Lexical rule marking terms that are never worth exploring.
pub trait TerminalRule: Send + Sync {
    fn is_terminal(&self, term: &str) -> bool;
}

/// Terms ending in any configured suffix are terminal.
#[derive(Debug, Clone, Default)]
pub struct SuffixRule {
    suffixes: Vec<String>,
}

impl SuffixRule {
    pub fn new(suffixes: Vec<String>) -> Self {
        Self {
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }
}

impl TerminalRule for SuffixRule {
    fn is_terminal(&self, term: &str) -> bool {
        self.suffixes.iter().any(|suffix| term.ends_with(suffix.as_str()))
    }
}

/// Label a discovered term against the graph as it stands.
///
/// Precedence: the terminal rule first (`Excluded`), then membership in the
/// graph (`AlreadyResolved`); anything else stays open.
pub fn classify(term: &str, graph: &Graph, rule: &dyn TerminalRule) -> Label {
    if rule.is_terminal(term) {
        Label::excluded(term)
    } else if graph.contains(term) {
        Label::resolved(term)
    } else {
        Label::open(term)
    }
}
