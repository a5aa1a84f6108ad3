//! Data model: node/edge/graph shapes per SPEC_FULL §3.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Source,
    External,
    Builtin,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ts,
    Js,
    Json,
    Md,
    Other,
}

impl Language {
    /// Derive a language from a lowercase file extension, per SPEC_FULL §4.D.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".d.ts") || lower.ends_with(".ts") || lower.ends_with(".tsx") {
            Language::Ts
        } else if lower.ends_with(".js") || lower.ends_with(".jsx") {
            Language::Js
        } else if lower.ends_with(".json") {
            Language::Json
        } else if lower.ends_with(".md") {
            Language::Md
        } else {
            Language::Other
        }
    }

    pub fn is_analyzable(self) -> bool {
        matches!(self, Language::Ts | Language::Js)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Runtime,
    Type,
    Dynamic,
}

impl EdgeKind {
    pub fn bit(self) -> u8 {
        match self {
            EdgeKind::Runtime => 1,
            EdgeKind::Type => 2,
            EdgeKind::Dynamic => 4,
        }
    }

    pub fn all() -> [EdgeKind; 3] {
        [EdgeKind::Runtime, EdgeKind::Type, EdgeKind::Dynamic]
    }

    /// Serialized (lowercase) name, used for lexicographic ordering per SPEC_FULL §4.K
    /// ("target, then kind, then resolution, lexicographically") — the enum's
    /// declaration order (`Runtime < Type < Dynamic`) doesn't match `dynamic < runtime < type`.
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Runtime => "runtime",
            EdgeKind::Type => "type",
            EdgeKind::Dynamic => "dynamic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Explicit,
    Implicit,
}

impl Resolution {
    /// Serialized (lowercase) name; see `EdgeKind::as_str` for why this matters for sorting.
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Explicit => "explicit",
            Resolution::Implicit => "implicit",
        }
    }
}

/// Sparse metadata; canonical key order on serialization is `hash, isOutsideRoot, size`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(rename = "isOutsideRoot", skip_serializing_if = "is_false", default)]
    pub is_outside_root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.hash.is_none() && !self.is_outside_root && self.size.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Node {
    /// Assemble a node, omitting empty description/metadata, per SPEC_FULL §4.D `makeNode`.
    pub fn new(
        id: impl Into<NodeId>,
        kind: NodeKind,
        language: Language,
        description: Option<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        let description = description.filter(|d| !d.is_empty());
        let metadata = metadata.filter(|m| !m.is_empty());
        Self { id: id.into(), kind, language, description, metadata }
    }

    pub fn hash(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.hash.as_deref())
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.size)
    }

    /// `kind ∈ {source, external}` file nodes are hash-comparable for the incremental planner.
    pub fn is_file_kind(&self) -> bool {
        matches!(self.kind, NodeKind::Source | NodeKind::External)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub target: NodeId,
    pub kind: EdgeKind,
    pub resolution: Resolution,
}

/// Working graph during a build: plain maps keyed by NodeId, no back-references,
/// per SPEC_FULL §9 ("pointer graphs").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: BTreeMap<NodeId, Vec<Edge>>,
}
