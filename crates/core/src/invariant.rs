//! Invariant checker — SPEC_FULL §4.L.

use crate::error::GraphError;
use crate::node::{Graph, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashSizeEnforcement {
    #[default]
    Warn,
    Error,
    Ignore,
}

/// Collect ids with `kind ∈ {source, external}` that have `metadata.hash`
/// but no `metadata.size`, sorted ascending.
fn hashed_without_size(graph: &Graph) -> Vec<String> {
    let mut offenders: Vec<String> = graph
        .nodes
        .values()
        .filter(|n| n.is_file_kind() && n.hash().is_some() && n.size().is_none())
        .map(|n| n.id.clone())
        .collect();
    offenders.sort();
    offenders
}

/// Apply the hash-implies-size policy. Returns warning strings for `Warn`,
/// an empty vec for `Ignore`, and an `Err` for `Error` when offenders exist.
pub fn check_invariants(
    graph: &Graph,
    policy: HashSizeEnforcement,
) -> Result<Vec<String>, GraphError> {
    if policy == HashSizeEnforcement::Ignore {
        return Ok(Vec::new());
    }

    let offenders = hashed_without_size(graph);
    if offenders.is_empty() {
        return Ok(Vec::new());
    }

    match policy {
        HashSizeEnforcement::Error => Err(GraphError::metadata_invariant(&offenders)),
        HashSizeEnforcement::Warn => Ok(offenders
            .into_iter()
            .map(|id| format!("warning: metadata.size missing for hashed node {id}"))
            .collect()),
        HashSizeEnforcement::Ignore => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Language, Metadata, Node};

    fn node_with(id: &str, hash: Option<&str>, size: Option<u64>) -> Node {
        Node::new(
            id,
            NodeKind::Source,
            Language::Ts,
            None,
            Some(Metadata { hash: hash.map(String::from), is_outside_root: false, size }),
        )
    }

    #[test]
    fn ignore_policy_returns_empty() {
        let mut graph = Graph::default();
        graph.nodes.insert("a.ts".into(), node_with("a.ts", Some("deadbeef"), None));
        let result = check_invariants(&graph, HashSizeEnforcement::Ignore).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn warn_policy_lists_offenders() {
        let mut graph = Graph::default();
        graph.nodes.insert("a.ts".into(), node_with("a.ts", Some("deadbeef"), None));
        let result = check_invariants(&graph, HashSizeEnforcement::Warn).unwrap();
        assert_eq!(result, vec!["warning: metadata.size missing for hashed node a.ts".to_string()]);
    }

    #[test]
    fn error_policy_fails() {
        let mut graph = Graph::default();
        graph.nodes.insert("a.ts".into(), node_with("a.ts", Some("deadbeef"), None));
        let err = check_invariants(&graph, HashSizeEnforcement::Error).unwrap_err();
        assert!(err.to_string().contains("a.ts"));
    }

    #[test]
    fn no_offenders_is_clean() {
        let mut graph = Graph::default();
        graph.nodes.insert("a.ts".into(), node_with("a.ts", Some("deadbeef"), Some(10)));
        let result = check_invariants(&graph, HashSizeEnforcement::Error).unwrap();
        assert!(result.is_empty());
    }
}
