//! Selection summarizer — SPEC_FULL §4.M.
//!
//! BFS closure with remaining-depth priority map; queue/visited-map shape
//! mirrors the iterative allocation loops in the teacher's `server/src/budget.rs`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::invariant::HashSizeEnforcement;
use crate::node::{EdgeKind, Graph, NodeId, NodeKind};

/// A selection entry: bare node id (depth 0, default kinds), `[id, depth]`,
/// or `[id, depth, edgeKinds]` (list or bitmask), per SPEC_FULL §4.M.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Id(String),
    IdDepth(String, i64),
    IdDepthKinds(String, i64, EdgeKindSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeKindSpec {
    List(Vec<String>),
    Mask(u8),
}

#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub default_edge_kinds: Vec<EdgeKind>,
    pub drop_node_kinds: Vec<NodeKind>,
    pub max_top: usize,
    pub hash_size_enforcement: HashSizeEnforcement,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            default_edge_kinds: EdgeKind::all().to_vec(),
            drop_node_kinds: vec![NodeKind::Builtin, NodeKind::Missing],
            max_top: 10,
            hash_size_enforcement: HashSizeEnforcement::Warn,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LargestEntry {
    pub id: NodeId,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    #[serde(rename = "selectedNodeIds")]
    pub selected_node_ids: Vec<NodeId>,
    #[serde(rename = "selectedCount")]
    pub selected_count: usize,
    #[serde(rename = "totalBytes")]
    pub total_bytes: u64,
    pub largest: Vec<LargestEntry>,
    pub warnings: Vec<String>,
}

struct NormalizedEntry {
    id: NodeId,
    depth: i64,
    kinds: Vec<EdgeKind>,
}

fn parse_kind(s: &str) -> Option<EdgeKind> {
    match s {
        "runtime" => Some(EdgeKind::Runtime),
        "type" => Some(EdgeKind::Type),
        "dynamic" => Some(EdgeKind::Dynamic),
        _ => None,
    }
}

fn kinds_from_mask(mask: u8) -> Vec<EdgeKind> {
    EdgeKind::all().into_iter().filter(|k| mask & k.bit() != 0).collect()
}

fn normalize_entries(
    entries: &[Entry],
    defaults: &[EdgeKind],
    warnings: &mut Vec<String>,
) -> Vec<NormalizedEntry> {
    let mut out = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let (id, depth, kinds_spec) = match entry {
            Entry::Id(id) => (id.clone(), 0i64, None),
            Entry::IdDepth(id, depth) => (id.clone(), *depth, None),
            Entry::IdDepthKinds(id, depth, spec) => (id.clone(), *depth, Some(spec.clone())),
        };

        if id.is_empty() {
            warnings.push(format!("warning: dropping entry {index} with empty nodeId"));
            continue;
        }

        let depth = if depth < 0 {
            warnings.push(format!("warning: entry {index} has invalid depth, clamped to 0"));
            0
        } else {
            depth
        };

        let kinds = match kinds_spec {
            None => defaults.to_vec(),
            Some(EdgeKindSpec::Mask(mask)) => kinds_from_mask(mask),
            Some(EdgeKindSpec::List(list)) => {
                let mut kinds = Vec::new();
                for raw in &list {
                    match parse_kind(raw) {
                        Some(k) => kinds.push(k),
                        None => warnings.push(format!(
                            "warning: entry {index} has invalid edgeKind '{raw}', dropped"
                        )),
                    }
                }
                if kinds.is_empty() {
                    warnings.push(format!("warning: entry {index} has no valid edgeKinds"));
                }
                kinds
            }
        };

        out.push(NormalizedEntry { id, depth, kinds });
    }
    out
}

/// Closure expansion per SPEC_FULL §4.M.
fn expand(graph: &Graph, entries: &[NormalizedEntry]) -> BTreeSet<NodeId> {
    let mut selected: BTreeSet<NodeId> = BTreeSet::new();
    let mut best_remaining: BTreeMap<NodeId, i64> = BTreeMap::new();
    let mut queue: VecDeque<(NodeId, i64, Vec<EdgeKind>)> = VecDeque::new();

    for entry in entries {
        selected.insert(entry.id.clone());
        let best = best_remaining.entry(entry.id.clone()).or_insert(i64::MIN);
        if entry.depth > *best {
            *best = entry.depth;
            queue.push_back((entry.id.clone(), entry.depth, entry.kinds.clone()));
        }
    }

    while let Some((id, remaining, kinds)) = queue.pop_front() {
        if remaining <= 0 || kinds.is_empty() {
            continue;
        }
        let Some(outgoing) = graph.edges.get(&id) else { continue };
        for edge in outgoing {
            if !kinds.contains(&edge.kind) {
                continue;
            }
            let next_remaining = remaining - 1;
            selected.insert(edge.target.clone());
            let best = best_remaining.entry(edge.target.clone()).or_insert(i64::MIN);
            if next_remaining > *best {
                *best = next_remaining;
                queue.push_back((edge.target.clone(), next_remaining, kinds.clone()));
            }
        }
    }

    selected
}

/// `summarizeSelection` — SPEC_FULL §4.M / §6.2.
pub fn summarize_selection(
    graph: &Graph,
    include: &[Entry],
    exclude: &[Entry],
    options: &SelectionOptions,
) -> Result<Summary, GraphError> {
    let mut warnings: Vec<String> = Vec::new();

    let include_norm = normalize_entries(include, &options.default_edge_kinds, &mut warnings);
    let exclude_norm = normalize_entries(exclude, &options.default_edge_kinds, &mut warnings);

    let included = expand(graph, &include_norm);
    let excluded = expand(graph, &exclude_norm);

    let mut selected: BTreeSet<NodeId> = included.difference(&excluded).cloned().collect();

    let mut dropped: Vec<NodeId> = Vec::new();
    selected.retain(|id| match graph.nodes.get(id) {
        Some(node) if options.drop_node_kinds.contains(&node.kind) => {
            dropped.push(id.clone());
            false
        }
        _ => true,
    });
    dropped.sort();
    for id in &dropped {
        let kind = graph.nodes.get(id).map(|n| format!("{:?}", n.kind)).unwrap_or_default();
        warnings.push(format!("Dropped {kind} node from selection: {id}"));
    }

    for id in &selected {
        if !graph.nodes.contains_key(id) {
            warnings.push(format!("Selected nodeId not present in graph.nodes: {id}"));
        }
    }

    let mut total_bytes: u64 = 0;
    let mut largest: Vec<LargestEntry> = Vec::new();
    let mut hashed_missing_size: Vec<String> = Vec::new();
    let mut unhashed_missing_size: Vec<String> = Vec::new();

    for id in &selected {
        let Some(node) = graph.nodes.get(id) else { continue };
        if let Some(bytes) = node.size() {
            total_bytes += bytes;
            largest.push(LargestEntry { id: id.clone(), bytes });
        } else if node.is_file_kind() {
            if node.hash().is_some() {
                hashed_missing_size.push(id.clone());
            } else {
                unhashed_missing_size.push(id.clone());
            }
        }
    }

    match options.hash_size_enforcement {
        HashSizeEnforcement::Ignore => {}
        HashSizeEnforcement::Error if !hashed_missing_size.is_empty() => {
            hashed_missing_size.sort();
            return Err(GraphError::metadata_invariant(&hashed_missing_size));
        }
        HashSizeEnforcement::Error => {}
        HashSizeEnforcement::Warn => {
            hashed_missing_size.sort();
            for id in &hashed_missing_size {
                warnings.push(format!("metadata.size missing for hashed node: {id}"));
            }
        }
    }
    if options.hash_size_enforcement != HashSizeEnforcement::Ignore {
        unhashed_missing_size.sort();
        for id in &unhashed_missing_size {
            warnings.push(format!("metadata.size missing for file node: {id}"));
        }
    }

    largest.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.id.cmp(&b.id)));
    if options.max_top > 0 {
        largest.truncate(options.max_top);
    } else {
        largest.clear();
    }

    let selected_node_ids: Vec<NodeId> = selected.into_iter().collect();
    let warnings: BTreeSet<String> = warnings.into_iter().collect();

    Ok(Summary {
        selected_count: selected_node_ids.len(),
        selected_node_ids,
        total_bytes,
        largest,
        warnings: warnings.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Edge, Language, Node, Resolution};

    fn graph_abcd() -> Graph {
        let mut graph = Graph::default();
        for id in ["a", "b", "c", "d"] {
            graph.nodes.insert(id.into(), Node::new(id, NodeKind::Source, Language::Ts, None, None));
        }
        graph.edges.insert(
            "a".into(),
            vec![
                Edge { target: "b".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit },
                Edge { target: "d".into(), kind: EdgeKind::Dynamic, resolution: Resolution::Explicit },
            ],
        );
        graph.edges.insert(
            "b".into(),
            vec![Edge { target: "c".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit }],
        );
        graph.edges.insert("c".into(), vec![]);
        graph.edges.insert("d".into(), vec![]);
        graph
    }

    #[test]
    fn excludes_win_scenario_7() {
        let graph = graph_abcd();
        let include = vec![Entry::IdDepthKinds("a".into(), 2, EdgeKindSpec::List(vec!["runtime".into()]))];
        let exclude = vec![Entry::IdDepthKinds("b".into(), 0, EdgeKindSpec::List(vec!["runtime".into()]))];
        let summary =
            summarize_selection(&graph, &include, &exclude, &SelectionOptions::default()).unwrap();
        assert_eq!(summary.selected_node_ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn bare_id_entry_is_depth_zero() {
        let graph = graph_abcd();
        let include = vec![Entry::Id("a".into())];
        let summary = summarize_selection(&graph, &include, &[], &SelectionOptions::default()).unwrap();
        assert_eq!(summary.selected_node_ids, vec!["a".to_string()]);
    }

    #[test]
    fn negative_depth_clamps_to_zero_with_warning() {
        let graph = graph_abcd();
        let include = vec![Entry::IdDepth("a".into(), -1)];
        let summary = summarize_selection(&graph, &include, &[], &SelectionOptions::default()).unwrap();
        assert_eq!(summary.selected_node_ids, vec!["a".to_string()]);
        assert!(summary.warnings.iter().any(|w| w.contains("invalid depth")));
    }

    #[test]
    fn dropped_builtin_and_missing_nodes() {
        let mut graph = graph_abcd();
        graph.nodes.insert("node:fs".into(), Node::new("node:fs", NodeKind::Builtin, Language::Other, None, None));
        graph.edges.insert(
            "a".into(),
            vec![Edge { target: "node:fs".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit }],
        );
        let include = vec![Entry::IdDepth("a".into(), 1)];
        let summary = summarize_selection(&graph, &include, &[], &SelectionOptions::default()).unwrap();
        assert!(!summary.selected_node_ids.contains(&"node:fs".to_string()));
        assert!(summary.warnings.iter().any(|w| w.contains("Dropped")));
    }
}
