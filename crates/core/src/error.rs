//! Error taxonomy for the dependency-graph compiler.

use thiserror::Error;

/// Fatal conditions returned from the public entry points. Non-fatal
/// conditions are folded into `BuildResult::errors` / `Summary::warnings`
/// instead of appearing here.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No language analyzer was available and the caller opted out of
    /// degraded (nodes-only) behavior.
    #[error("no language analyzer available: {0}")]
    AnalyzerMissing(String),

    #[error("metadata invariant violated: {count} node(s) have a hash but no size ({sample}{more})")]
    MetadataInvariant {
        count: usize,
        sample: String,
        more: &'static str,
    },

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl GraphError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Build a `MetadataInvariant` error from a sorted list of offending ids,
    /// per SPEC_FULL §4.L: count plus up to the first 10 ids, with `...` if more.
    pub fn metadata_invariant(offenders: &[String]) -> Self {
        let count = offenders.len();
        let shown: Vec<&str> = offenders.iter().take(10).map(String::as_str).collect();
        Self::MetadataInvariant {
            count,
            sample: shown.join(", "),
            more: if count > 10 { ", ..." } else { "" },
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
