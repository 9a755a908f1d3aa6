//! Post-pass closing every label that can no longer be resolved.

use std::collections::HashSet;

use super::{Graph, Marker};

/// Close every open label whose term was never explored.
///
/// Afterwards each label in the graph is either closed or names a graph key,
/// so rendering never looks up a missing entry. Order is preserved and
/// applying this twice changes nothing.
pub fn finalize(mut graph: Graph) -> Graph {
    let explored: HashSet<String> = graph.keys().map(str::to_string).collect();
    let mut closed = 0;

    for labels in graph.labels_mut() {
        for label in labels.iter_mut() {
            if label.is_open() && !explored.contains(&label.term) {
                label.close(Marker::Excluded);
                closed += 1;
            }
        }
    }

    if closed > 0 {
        log::debug!("Closed {} unexplored label(s)", closed);
    }
    graph
}
