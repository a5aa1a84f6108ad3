//! Analyzer orchestrator — SPEC_FULL §4.J.
//!
//! `BuildContext` is the per-run cache named in SPEC_FULL §9 ("global
//! mutable state is a single per-run cache, never shared across runs"):
//! parsed files and resolved specifiers are memoized for the lifetime of
//! one `build_graph` call and discarded afterward.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::hash::try_hash_file;
use crate::lang::{LanguageProvider, ParsedModule};
use crate::node::{Edge, EdgeKind, Language, Metadata, Node, NodeId, NodeKind, Resolution};
use crate::path_util::{abs_path_to_node_id, node_id_to_abs_path};
use crate::reexport::{GetSourceFile, ResolveAbsPath};
use crate::resolve::{resolve, Resolved};
use crate::tunnel::expand_tunnel;

pub struct BuildContext<'a> {
    language: &'a dyn LanguageProvider,
    parsed_cache: RefCell<BTreeMap<PathBuf, Option<ParsedModule>>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(language: &'a dyn LanguageProvider) -> Self {
        Self { language, parsed_cache: RefCell::new(BTreeMap::new()) }
    }

    fn parse_cached(&self, abs_path: &Path) -> Option<ParsedModule> {
        if let Some(cached) = self.parsed_cache.borrow().get(abs_path) {
            return cached.clone();
        }
        let parsed = std::fs::read_to_string(abs_path).ok().and_then(|text| self.language.parse(abs_path, &text));
        self.parsed_cache.borrow_mut().insert(abs_path.to_path_buf(), parsed.clone());
        parsed
    }
}

impl<'a> ResolveAbsPath for BuildContext<'a> {
    fn resolve_abs_path(&self, from_abs_path: &Path, specifier: &str) -> Option<PathBuf> {
        match resolve(from_abs_path, specifier) {
            Resolved::File { abs_path, .. } => Some(abs_path),
            _ => None,
        }
    }
}

impl<'a> GetSourceFile for BuildContext<'a> {
    fn get_source_file(&self, abs_path: &Path) -> Option<ParsedModule> {
        self.parse_cached(abs_path)
    }
}

pub struct AnalyzeOutput {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: BTreeMap<NodeId, Vec<Edge>>,
    pub errors: Vec<String>,
}

/// Run 4.J for every id in `dirty_source_ids`, materializing nodes into `nodes`
/// (pre-seeded with `base_nodes`, the scan/hash pass's source nodes).
pub fn analyze(
    ctx: &BuildContext,
    cwd: &Path,
    dirty_source_ids: &std::collections::BTreeSet<NodeId>,
    base_nodes: &BTreeMap<NodeId, Node>,
) -> AnalyzeOutput {
    let mut nodes = base_nodes.clone();
    let mut edges: BTreeMap<NodeId, Vec<Edge>> = BTreeMap::new();
    let mut errors = Vec::new();

    for source_id in dirty_source_ids {
        let Some(abs_path) = node_id_to_abs_path(cwd, source_id) else {
            errors.push(format!("cannot resolve absolute path for {source_id}"));
            continue;
        };

        let Some(parsed) = ctx.parse_cached(&abs_path) else {
            errors.push(format!("failed to parse {source_id}"));
            edges.insert(source_id.clone(), Vec::new());
            continue;
        };

        let mut source_edges = Vec::new();

        for import in &parsed.explicit_imports {
            let target_id = materialize_resolved(&resolve(&abs_path, &import.specifier), cwd, base_nodes, &mut nodes);
            source_edges.push(Edge { target: target_id, kind: import.kind, resolution: Resolution::Explicit });
        }

        for tunnel in &parsed.tunnel_requests {
            let declaration_files = expand_tunnel(ctx, &abs_path, &tunnel.specifier, &tunnel.export_name);
            for declaration_file in declaration_files {
                let is_external = declaration_file.components().any(|c| c.as_os_str() == "node_modules");
                let target_id = materialize_file(&declaration_file, is_external, cwd, base_nodes, &mut nodes);
                source_edges.push(Edge { target: target_id, kind: tunnel.kind, resolution: Resolution::Implicit });
            }
        }

        edges.insert(source_id.clone(), source_edges);
    }

    AnalyzeOutput { nodes, edges, errors }
}

fn materialize_resolved(
    resolved: &Resolved,
    cwd: &Path,
    base_nodes: &BTreeMap<NodeId, Node>,
    nodes: &mut BTreeMap<NodeId, Node>,
) -> NodeId {
    match resolved {
        Resolved::Builtin { id } => {
            nodes.entry(id.clone()).or_insert_with(|| Node::new(id.clone(), NodeKind::Builtin, Language::Other, None, None));
            id.clone()
        }
        Resolved::Missing { specifier } => {
            nodes
                .entry(specifier.clone())
                .or_insert_with(|| Node::new(specifier.clone(), NodeKind::Missing, Language::Other, None, None));
            specifier.clone()
        }
        Resolved::File { abs_path, is_external } => materialize_file(abs_path, *is_external, cwd, base_nodes, nodes),
    }
}

fn materialize_file(
    abs_path: &Path,
    is_external: bool,
    cwd: &Path,
    base_nodes: &BTreeMap<NodeId, Node>,
    nodes: &mut BTreeMap<NodeId, Node>,
) -> NodeId {
    let (node_id, is_outside_root) = abs_path_to_node_id(abs_path, cwd);

    if let Some(existing) = nodes.get(&node_id) {
        if existing.hash().is_some() && existing.size().is_some() {
            return node_id;
        }
    }

    let under_node_modules = abs_path.components().any(|c| c.as_os_str() == "node_modules");
    let existing_is_source = base_nodes.get(&node_id).map(|n| n.kind == NodeKind::Source).unwrap_or(false);
    let kind = if existing_is_source || (!is_external && !under_node_modules) {
        NodeKind::Source
    } else {
        NodeKind::External
    };

    let language = Language::from_path(&node_id);
    let metadata = try_hash_file(abs_path)
        .map(|h| Metadata { hash: Some(h.hash_hex), is_outside_root, size: Some(h.size) })
        .or(is_outside_root.then(|| Metadata { hash: None, is_outside_root, size: None }));

    let node = Node::new(node_id.clone(), kind, language, None, metadata);
    nodes.insert(node_id.clone(), node);
    node_id
}
