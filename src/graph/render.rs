//! Indented tree rendering of a finalized graph.

use super::{Graph, Notation};

const INDENT: &str = "  ";

/// Render the tree rooted at `root`, one line per node.
///
/// Open labels are expanded in place at the next depth; closed labels are
/// leaves. Every line is `-` followed by the term, indented two spaces per
/// level. Open labels that would re-enter a term already on the current path
/// are printed as leaves, which only happens for graphs not produced by a
/// traversal (hand-edited files).
pub fn render(graph: &Graph, root: &str, notation: &Notation) -> Vec<String> {
    let mut lines = Vec::new();
    let mut path = Vec::new();
    walk(graph, root, 0, notation, &mut path, &mut lines);
    lines
}

fn walk<'a>(
    graph: &'a Graph,
    term: &'a str,
    depth: usize,
    notation: &Notation,
    path: &mut Vec<&'a str>,
    lines: &mut Vec<String>,
) {
    lines.push(line(depth, term));

    let Some(labels) = graph.get(term) else {
        return;
    };

    path.push(term);
    for label in labels {
        if label.is_open() && !path.contains(&label.term.as_str()) {
            walk(graph, &label.term, depth + 1, notation, path, lines);
        } else {
            if label.is_open() {
                log::warn!("Open label {} re-enters its own ancestry, rendered as leaf", label.term);
            }
            lines.push(line(depth + 1, &notation.format(label)));
        }
    }
    path.pop();
}

fn line(depth: usize, text: &str) -> String {
    format!("{}-{}", INDENT.repeat(depth), text)
}
