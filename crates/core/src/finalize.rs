//! Finalizer — SPEC_FULL §4.K.
//!
//! Because `Graph` is `BTreeMap`-backed (see `node.rs`), ascending key
//! order falls out of the type; finalization is mostly edge
//! dedup/sort plus filling in empty edge lists for every node.

use std::collections::{BTreeMap, BTreeSet};

use crate::node::{Edge, Graph, NodeId};

/// Normalize nodes, complete the edges map, dedupe/sort edges, per SPEC_FULL §4.K.
pub fn finalize(nodes: BTreeMap<NodeId, crate::node::Node>, mut raw_edges: BTreeMap<NodeId, Vec<Edge>>) -> Graph {
    let mut edges: BTreeMap<NodeId, Vec<Edge>> = BTreeMap::new();

    for id in nodes.keys() {
        let mut list = raw_edges.remove(id).unwrap_or_default();
        dedupe_and_sort(&mut list);
        edges.insert(id.clone(), list);
    }

    Graph { nodes, edges }
}

/// Sorts and dedupes by `(target, kind, resolution)` lexicographically on the
/// serialized (lowercase) names, per SPEC_FULL §4.K — not the enums' derived
/// `Ord`, which follows declaration order rather than `dynamic < runtime < type`.
fn dedupe_and_sort(edges: &mut Vec<Edge>) {
    let mut seen: BTreeSet<(NodeId, &'static str, &'static str)> = BTreeSet::new();
    edges.retain(|e| seen.insert((e.target.clone(), e.kind.as_str(), e.resolution.as_str())));
    edges.sort_by(|a, b| {
        (a.target.as_str(), a.kind.as_str(), a.resolution.as_str())
            .cmp(&(b.target.as_str(), b.kind.as_str(), b.resolution.as_str()))
    });
}

/// `finalize(finalize(G)) == finalize(G)`: re-running finalize against an
/// already-finalized graph's own maps is a no-op because the maps are
/// already deduped, sorted, and complete.
pub fn idempotent_finalize(graph: &Graph) -> Graph {
    finalize(graph.nodes.clone(), graph.edges.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{EdgeKind, Language, Node, NodeKind, Resolution};

    fn src(id: &str) -> Node {
        Node::new(id, NodeKind::Source, Language::Ts, None, None)
    }

    #[test]
    fn every_node_gets_an_edges_entry() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a.ts".to_string(), src("a.ts"));
        let graph = finalize(nodes, BTreeMap::new());
        assert_eq!(graph.edges.get("a.ts"), Some(&Vec::new()));
    }

    #[test]
    fn edges_are_deduped_and_sorted() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a.ts".to_string(), src("a.ts"));
        nodes.insert("b.ts".to_string(), src("b.ts"));
        nodes.insert("c.ts".to_string(), src("c.ts"));

        let mut raw = BTreeMap::new();
        raw.insert(
            "a.ts".to_string(),
            vec![
                Edge { target: "c.ts".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit },
                Edge { target: "b.ts".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit },
                Edge { target: "b.ts".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit },
            ],
        );

        let graph = finalize(nodes, raw);
        let edges = graph.edges.get("a.ts").unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].target, "b.ts");
        assert_eq!(edges[1].target, "c.ts");
    }

    #[test]
    fn same_target_edges_sort_lexicographically_by_kind() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a.ts".to_string(), src("a.ts"));
        nodes.insert("x.ts".to_string(), src("x.ts"));

        let mut raw = BTreeMap::new();
        raw.insert(
            "a.ts".to_string(),
            vec![
                Edge { target: "x.ts".into(), kind: EdgeKind::Runtime, resolution: Resolution::Explicit },
                Edge { target: "x.ts".into(), kind: EdgeKind::Dynamic, resolution: Resolution::Explicit },
            ],
        );

        let graph = finalize(nodes, raw);
        let edges = graph.edges.get("a.ts").unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].kind, EdgeKind::Dynamic);
        assert_eq!(edges[1].kind, EdgeKind::Runtime);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a.ts".to_string(), src("a.ts"));
        let graph = finalize(nodes, BTreeMap::new());
        let again = idempotent_finalize(&graph);
        assert_eq!(graph, again);
    }
}
