//! Configuration loading — SPEC_FULL §7.1.
//!
//! Grounded on the teacher's `ScanConfig`-from-file pattern
//! (`server/src/types.rs::ScanConfig`) and its use of `toml = "0.8"`.

use std::path::Path;

use serde::Deserialize;

use crate::invariant::HashSizeEnforcement;

/// On-disk configuration, all fields optional: absent/malformed files
/// degrade to `BuildOptions` defaults with a warning, never a fatal error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub includes: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    #[serde(rename = "hashSizeEnforcement")]
    pub hash_size_enforcement: Option<String>,
    #[serde(rename = "nodeDescriptionLimit")]
    pub node_description_limit: Option<usize>,
    #[serde(rename = "nodeDescriptionTags")]
    pub node_description_tags: Option<Vec<String>>,
    #[serde(rename = "maxErrors")]
    pub max_errors: Option<usize>,
}

/// Load `<cwd>/.codescope-graph.toml`. Returns `(config, warning)` where
/// `warning` is set for a present-but-malformed file; an absent file is
/// silently treated as an empty config (not a warning).
pub fn load_config(cwd: &Path) -> (FileConfig, Option<String>) {
    let path = cwd.join(".codescope-graph.toml");
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return (FileConfig::default(), None),
    };
    match toml::from_str::<FileConfig>(&text) {
        Ok(cfg) => (cfg, None),
        Err(e) => (
            FileConfig::default(),
            Some(format!("warning: malformed config at {}: {e}", path.display())),
        ),
    }
}

pub fn parse_enforcement(s: &str) -> Option<HashSizeEnforcement> {
    match s {
        "warn" => Some(HashSizeEnforcement::Warn),
        "error" => Some(HashSizeEnforcement::Error),
        "ignore" => Some(HashSizeEnforcement::Ignore),
        _ => None,
    }
}
