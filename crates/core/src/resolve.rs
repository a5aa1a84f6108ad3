//! Module resolver — SPEC_FULL §4.G.
//!
//! Extension-probe/index-fallback ordering and the `node_modules` upward
//! walk are grounded on the relative/bare specifier resolution in the
//! `other_examples` barrel-resolution module cited in DESIGN.md; the
//! builtin-name set and `package.json` field precedence are new, following
//! the same "probe a fixed candidate list, first hit wins" shape.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

/// Probed in order for a resolved base path with no extension; first existing
/// file wins, per SPEC_FULL §4.G.
const EXTENSION_CANDIDATES: &[&str] =
    &[".ts", ".tsx", ".d.ts", ".js", ".jsx", ".mts", ".mjs", ".cts", ".cjs"];

const INDEX_CANDIDATES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.d.ts",
    "index.js",
    "index.jsx",
    "index.mts",
    "index.mjs",
    "index.cts",
    "index.cjs",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Builtin { id: String },
    Missing { specifier: String },
    File { abs_path: PathBuf, is_external: bool },
}

fn builtin_names() -> &'static BTreeSet<&'static str> {
    static NAMES: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    NAMES.get_or_init(|| {
        [
            "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "domain",
            "events", "fs", "http", "http2", "https", "net", "os", "path", "perf_hooks",
            "process", "punycode", "querystring", "readline", "repl", "stream", "string_decoder",
            "sys", "timers", "tls", "trace_events", "tty", "url", "util", "v8", "vm", "worker_threads",
            "zlib", "async_hooks", "diagnostics_channel", "inspector", "module", "wasi",
        ]
        .into_iter()
        .collect()
    })
}

fn builtin_id(specifier: &str) -> Option<String> {
    let name = specifier.strip_prefix("node:").unwrap_or(specifier);
    builtin_names().contains(name).then(|| format!("node:{name}"))
}

fn is_relative_or_absolute(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/') || is_windows_drive_absolute(specifier)
}

fn is_windows_drive_absolute(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Resolve `specifier` as seen from `from_abs_path`, per SPEC_FULL §4.G.
pub fn resolve(from_abs_path: &Path, specifier: &str) -> Resolved {
    if let Some(id) = builtin_id(specifier) {
        return Resolved::Builtin { id };
    }

    if is_relative_or_absolute(specifier) {
        let base = if specifier.starts_with('.') {
            from_abs_path.parent().unwrap_or(Path::new(".")).join(specifier)
        } else {
            PathBuf::from(specifier)
        };
        return match resolve_file_or_index(&base) {
            Some(abs_path) => {
                let is_external = path_contains_node_modules(&abs_path);
                Resolved::File { abs_path, is_external }
            }
            None => Resolved::Missing { specifier: specifier.to_string() },
        };
    }

    match resolve_bare_specifier(from_abs_path, specifier) {
        Some(abs_path) => Resolved::File { abs_path, is_external: true },
        None => Resolved::Missing { specifier: specifier.to_string() },
    }
}

fn path_contains_node_modules(p: &Path) -> bool {
    p.components().any(|c| c.as_os_str() == "node_modules")
}

/// Probe `base` as an exact file, then with each extension, then as a directory
/// index, per SPEC_FULL §4.G.
fn resolve_file_or_index(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(normalize(base));
    }
    for ext in EXTENSION_CANDIDATES {
        let candidate = append_suffix(base, ext);
        if candidate.is_file() {
            return Some(normalize(&candidate));
        }
    }
    if base.is_dir() {
        for index in INDEX_CANDIDATES {
            let candidate = base.join(index);
            if candidate.is_file() {
                return Some(normalize(&candidate));
            }
        }
    }
    None
}

fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn normalize(p: &Path) -> PathBuf {
    // `base.join(...)` never introduces a trailing slash here; this is a hook
    // for callers that construct paths with `..`/`.` segments upstream.
    p.to_path_buf()
}

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    main: Option<String>,
    module: Option<String>,
    types: Option<String>,
    typings: Option<String>,
}

/// Walk up from `from_abs_path` looking for `node_modules/<pkg>`, then resolve
/// `<pkg>`'s entry point via `package.json` (`types`/`typings` preferred for a
/// type-aware resolver, falling back to `main`), per SPEC_FULL §4.G.
fn resolve_bare_specifier(from_abs_path: &Path, specifier: &str) -> Option<PathBuf> {
    let (pkg_name, subpath) = split_package_specifier(specifier);

    let mut dir = from_abs_path.parent()?.to_path_buf();
    loop {
        let candidate_root = dir.join("node_modules").join(pkg_name);
        if candidate_root.is_dir() {
            if let Some(subpath) = subpath {
                if let Some(resolved) = resolve_file_or_index(&candidate_root.join(subpath)) {
                    return Some(resolved);
                }
            } else if let Some(resolved) = resolve_package_entry(&candidate_root) {
                return Some(resolved);
            }
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Split `@scope/pkg/sub/path` or `pkg/sub/path` into `(package_name, Some(rest))`.
fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let mut parts = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
    let first = parts.next().unwrap_or(specifier);
    if specifier.starts_with('@') {
        let scope = first;
        let name = parts.next();
        let rest = parts.next();
        match name {
            Some(name) => {
                let pkg_len = scope.len() + 1 + name.len();
                (&specifier[..pkg_len], rest)
            }
            None => (specifier, None),
        }
    } else {
        let rest = parts.next();
        (first, rest)
    }
}

fn resolve_package_entry(pkg_root: &Path) -> Option<PathBuf> {
    let manifest_path = pkg_root.join("package.json");
    let manifest: PackageJson = std::fs::read_to_string(&manifest_path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default();

    for field in [manifest.types.as_deref(), manifest.typings.as_deref(), manifest.main.as_deref(), manifest.module.as_deref()] {
        if let Some(entry) = field {
            if let Some(resolved) = resolve_file_or_index(&pkg_root.join(entry)) {
                return Some(resolved);
            }
        }
    }

    resolve_file_or_index(pkg_root)
}

/// Nearest ancestor directory containing a `package.json`, per SPEC_FULL §4.I's commander rule.
pub fn nearest_package_root(abs_path: &Path) -> Option<PathBuf> {
    let mut dir = if abs_path.is_dir() { Some(abs_path.to_path_buf()) } else { abs_path.parent().map(Path::to_path_buf) };
    while let Some(current) = dir {
        if current.join("package.json").is_file() {
            return Some(current);
        }
        dir = current.parent().map(Path::to_path_buf);
    }
    None
}
