//! Deterministic dependency-graph compiler for TypeScript/JavaScript
//! repositories — public API per SPEC_FULL §6.
//!
//! `build_graph` sequences the components named in SPEC_FULL §2:
//! C (scan) → D (node factory) → E (incremental plan) → F/G/H/I (per-source
//! analysis) → J (materialization) → K (finalize) → L (invariants) →
//! N (error cap).

pub mod analyze;
pub mod config;
pub mod describe;
pub mod error;
pub mod error_cap;
pub mod finalize;
pub mod hash;
pub mod incremental;
pub mod invariant;
pub mod lang;
pub mod node;
pub mod path_util;
pub mod reexport;
pub mod resolve;
pub mod scan;
pub mod selection;
pub mod tunnel;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

pub use error::{GraphError, GraphResult};
pub use invariant::HashSizeEnforcement;
pub use node::{Edge, EdgeKind, Graph, Language, Metadata, Node, NodeId, NodeKind, Resolution};
pub use selection::{summarize_selection, Entry, SelectionOptions, Summary};

use analyze::{analyze, BuildContext};
use lang::LanguageProvider;
use node::NodeKind as NK;

/// Inputs to `build_graph`, per SPEC_FULL §6.1. `cwd` is required; everything
/// else has a default and may be left unset, then overridden by a
/// `.codescope-graph.toml` in `cwd`, then by whatever the caller sets here
/// directly (direct field values always win — see `build_graph`).
pub struct BuildOptions<'a> {
    pub cwd: PathBuf,
    pub language: Option<&'a dyn LanguageProvider>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub previous_graph: Option<Graph>,
    pub hash_size_enforcement: Option<HashSizeEnforcement>,
    pub node_description_limit: Option<usize>,
    pub node_description_tags: Option<Vec<String>>,
    pub max_errors: Option<usize>,
}

impl<'a> BuildOptions<'a> {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            language: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            previous_graph: None,
            hash_size_enforcement: None,
            node_description_limit: None,
            node_description_tags: None,
            max_errors: None,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BuildStats {
    pub modules: usize,
    pub edges: usize,
    pub dirty: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildResult {
    pub graph: Graph,
    pub stats: BuildStats,
    pub errors: Vec<String>,
}

const DEFAULT_NODE_DESCRIPTION_LIMIT: usize = 160;
const DEFAULT_MAX_ERRORS: usize = 50;

fn default_description_tags() -> Vec<String> {
    vec!["@module".to_string(), "@packageDocumentation".to_string()]
}

/// Drop tags that don't match `^@\w+$` (SPEC_FULL §6.1), warning once per offender.
fn filter_valid_tags(tags: Vec<String>, errors: &mut Vec<String>) -> Vec<String> {
    let pattern = regex::Regex::new(r"^@\w+$").expect("static tag pattern is valid");
    tags.into_iter()
        .filter(|tag| {
            let ok = pattern.is_match(tag);
            if !ok {
                errors.push(format!("warning: dropping invalid nodeDescriptionTag '{tag}'"));
            }
            ok
        })
        .collect()
}

#[cfg(feature = "treesitter")]
fn default_language_provider() -> Option<Box<dyn LanguageProvider>> {
    Some(Box::new(lang::ts::TreeSitterProvider))
}

#[cfg(not(feature = "treesitter"))]
fn default_language_provider() -> Option<Box<dyn LanguageProvider>> {
    None
}

/// `buildGraph(options) -> result`, SPEC_FULL §6.1.
#[instrument(skip(options), fields(cwd = %options.cwd.display()))]
pub fn build_graph(options: &BuildOptions) -> GraphResult<BuildResult> {
    let (file_config, config_warning) = config::load_config(&options.cwd);
    let mut errors: Vec<String> = config_warning.into_iter().collect();

    let includes = if options.includes.is_empty() {
        file_config.includes.clone().unwrap_or_default()
    } else {
        options.includes.clone()
    };
    let excludes = if options.excludes.is_empty() {
        file_config.excludes.clone().unwrap_or_default()
    } else {
        options.excludes.clone()
    };
    let hash_size_enforcement = options.hash_size_enforcement.unwrap_or_else(|| {
        file_config
            .hash_size_enforcement
            .as_deref()
            .and_then(config::parse_enforcement)
            .unwrap_or_default()
    });
    let node_description_limit = options
        .node_description_limit
        .or(file_config.node_description_limit)
        .unwrap_or(DEFAULT_NODE_DESCRIPTION_LIMIT);
    let node_description_tags = options
        .node_description_tags
        .clone()
        .or(file_config.node_description_tags.clone())
        .unwrap_or_else(default_description_tags);
    let node_description_tags = filter_valid_tags(node_description_tags, &mut errors);
    let max_errors = options.max_errors.or(file_config.max_errors).unwrap_or(DEFAULT_MAX_ERRORS);

    let scan_config = scan::ScanConfig { includes, excludes };
    let candidates = scan::scan_universe(&options.cwd, &scan_config);
    info!(count = candidates.len(), "scanned universe");

    // Hashing is the one genuinely parallelizable step (SPEC_FULL §5): each
    // file is hashed independently, bounded by rayon's global pool, then
    // folded back into the deterministic BTreeMap in scan order.
    let hashed: Vec<(NodeId, Language, hash::FileHash)> = {
        use rayon::prelude::*;
        candidates
            .par_iter()
            .filter_map(|id| {
                let abs_path = options.cwd.join(id);
                hash::hash_file(&abs_path).ok().map(|h| (id.clone(), Language::from_path(id), h))
            })
            .collect()
    };
    let hashed_ids: std::collections::BTreeSet<NodeId> = hashed.iter().map(|(id, ..)| id.clone()).collect();

    let mut base_nodes: BTreeMap<NodeId, node::Node> = BTreeMap::new();
    let mut analyzable_source_ids = std::collections::BTreeSet::new();

    for (id, language, file_hash) in hashed {
        let metadata = node::Metadata { hash: Some(file_hash.hash_hex), is_outside_root: false, size: Some(file_hash.size) };
        base_nodes.insert(id.clone(), node::Node::new(id.clone(), NK::Source, language, None, Some(metadata)));
        if language.is_analyzable() {
            analyzable_source_ids.insert(id);
        }
    }
    for id in &candidates {
        if hashed_ids.contains(id) {
            continue;
        }
        let abs_path = options.cwd.join(id);
        let language = Language::from_path(id);
        warn!(%id, "failed to hash scanned file");
        errors.push(format!("warning: failed to read {}", abs_path.display()));
        base_nodes.insert(id.clone(), node::Node::new(id.clone(), NK::Source, language, None, None));
        if language.is_analyzable() {
            analyzable_source_ids.insert(id.clone());
        }
    }

    let plan = incremental::plan_incremental(
        &options.cwd,
        &analyzable_source_ids,
        &base_nodes,
        options.previous_graph.as_ref(),
    );
    info!(dirty = plan.dirty_source_ids.len(), "planned incremental dirty set");

    let mut nodes_for_analysis = base_nodes.clone();
    for (id, node) in &plan.carried_nodes {
        nodes_for_analysis.entry(id.clone()).or_insert_with(|| node.clone());
    }

    let owned_default = if options.language.is_none() { default_language_provider() } else { None };
    let language_provider: Option<&dyn LanguageProvider> = options.language.or(owned_default.as_deref());

    let (mut nodes, mut edges) = match language_provider {
        Some(provider) => {
            let ctx = BuildContext::new(provider);
            let output = analyze(&ctx, &options.cwd, &plan.dirty_source_ids, &nodes_for_analysis);
            errors.extend(output.errors);

            let mut edges = plan.reused_edges_by_source.clone();
            edges.extend(output.edges);
            (output.nodes, edges)
        }
        None => {
            errors.push(GraphError::AnalyzerMissing("no LanguageProvider supplied and no default analyzer compiled in".into()).to_string());
            (nodes_for_analysis, plan.reused_edges_by_source.clone())
        }
    };

    apply_descriptions(&options.cwd, &mut nodes, node_description_limit, &node_description_tags);

    let graph = finalize::finalize(std::mem::take(&mut nodes), std::mem::take(&mut edges));

    let invariant_messages = invariant::check_invariants(&graph, hash_size_enforcement)?;
    errors.extend(invariant_messages);

    let stats = BuildStats {
        modules: graph.nodes.len(),
        edges: graph.edges.values().map(Vec::len).sum(),
        dirty: plan.dirty_source_ids.len(),
    };

    let errors = error_cap::cap_errors(errors, max_errors);
    Ok(BuildResult { graph, stats, errors })
}

/// Fill in `node.description` for source nodes whose language is analyzable
/// and whose file can still be read, per SPEC_FULL §6.4's description
/// extractor interface. Applied after analysis, never blocking it.
fn apply_descriptions(
    cwd: &std::path::Path,
    nodes: &mut BTreeMap<NodeId, node::Node>,
    limit: usize,
    tags: &[String],
) {
    if limit == 0 {
        return;
    }
    for (id, node) in nodes.iter_mut() {
        if node.kind != NK::Source || node.description.is_some() || !node.language.is_analyzable() {
            continue;
        }
        let Some(abs_path) = path_util::node_id_to_abs_path(cwd, id) else { continue };
        if let Ok(text) = std::fs::read_to_string(&abs_path) {
            if let Some(description) = describe::extract_description(&text, limit, tags) {
                node.description = Some(description);
            }
        }
    }
}

#[cfg(all(test, feature = "treesitter"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &std::path::Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn explicit_import_produces_a_runtime_edge() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "import { b } from './b';\n");
        write(dir.path(), "b.ts", "export function b() {}\n");

        let options = BuildOptions::new(dir.path());
        let result = build_graph(&options).unwrap();

        assert!(result.graph.nodes.contains_key("a.ts"));
        assert!(result.graph.nodes.contains_key("b.ts"));
        let edges = result.graph.edges.get("a.ts").unwrap();
        assert!(edges.iter().any(|e| e.target == "b.ts" && e.kind == EdgeKind::Runtime));
    }

    #[test]
    fn missing_specifier_materializes_a_missing_node() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "import { x } from './nope';\n");

        let options = BuildOptions::new(dir.path());
        let result = build_graph(&options).unwrap();

        let missing = result.graph.nodes.get("./nope").expect("missing node recorded");
        assert_eq!(missing.kind, NodeKind::Missing);
    }

    #[test]
    fn builtin_import_materializes_a_node_prefix() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "import * as fs from 'node:fs';\n");

        let options = BuildOptions::new(dir.path());
        let result = build_graph(&options).unwrap();

        assert!(result.graph.nodes.contains_key("node:fs"));
    }

    #[test]
    fn barrel_tunnel_resolves_to_defining_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "barrel.ts", "export { Widget } from './widget';\n");
        write(dir.path(), "widget.ts", "export class Widget {}\n");
        write(dir.path(), "use.ts", "import { Widget } from './barrel';\n");

        let options = BuildOptions::new(dir.path());
        let result = build_graph(&options).unwrap();

        let edges = result.graph.edges.get("use.ts").unwrap();
        assert!(edges.iter().any(|e| e.target == "barrel.ts" && e.resolution == Resolution::Explicit));
        assert!(edges.iter().any(|e| e.target == "widget.ts" && e.resolution == Resolution::Implicit));
    }

    #[test]
    fn stats_report_module_edge_and_dirty_counts() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "import './b';\n");
        write(dir.path(), "b.ts", "export const b = 1;\n");

        let options = BuildOptions::new(dir.path());
        let result = build_graph(&options).unwrap();

        assert_eq!(result.stats.modules, result.graph.nodes.len());
        assert_eq!(result.stats.dirty, 2);
    }
}
