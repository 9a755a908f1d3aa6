//! Persisted graph files: `search_result_<seed>.json`.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::{Graph, Notation};

/// Path of the result file for a seed term inside `dir`.
///
/// Path separators in the seed are replaced so the file always lands directly
/// in `dir`.
pub fn result_path(dir: &Path, seed: &str) -> PathBuf {
    let name: String = seed
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("search_result_{}.json", name))
}

/// Write the graph as pretty JSON (4-space indent, keys in exploration order).
pub fn save_graph(graph: &Graph, notation: &Notation, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let document = graph.to_document(notation);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut serializer)?;

    std::fs::write(path, buf)?;
    log::info!("Saved {} explored term(s) to {}", graph.len(), path.display());
    Ok(())
}

/// Read a graph written by [`save_graph`].
///
/// Labels are plain strings in the file, so a term whose own text ends in a
/// notation character (e.g. `US$` under the default notation) reads back as a
/// closed label for the shorter term.
pub fn load_graph(path: &Path, notation: &Notation) -> Result<Graph> {
    let content = std::fs::read_to_string(path)?;
    let document: IndexMap<String, Vec<String>> = serde_json::from_str(&content)?;
    Ok(Graph::from_document(document, notation))
}
