//! Universe scanner — SPEC_FULL §4.C.
//!
//! Grounded on `walk_files_parallel` in the teacher's `server/src/scan.rs`
//! (`ignore::WalkBuilder`, hidden-file handling, custom `filter_entry`).
//! The precedence semantics (`implicit-deny > exclude > include > gitignore
//! > default-allow`) are specified fully in SPEC_FULL and implemented here
//! with a bespoke matcher rather than relying on `ignore`'s own include/
//! exclude layering, since the spec's precedence order does not match
//! `ignore`'s override semantics directly.

use std::collections::BTreeSet;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;

#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    // `**` segments match across path separators; `*`/`?` do not cross them
    // except within a `**` span. Implemented via a small recursive matcher
    // so dot-files are matched like any other character (no special-casing).
    fn inner(pat: &[u8], s: &[u8]) -> bool {
        match pat.first() {
            None => s.is_empty(),
            Some(b'*') if pat.get(1) == Some(&b'*') => {
                // `**` matches zero or more path segments (including separators).
                let rest = &pat[2..];
                let rest = if rest.first() == Some(&b'/') { &rest[1..] } else { rest };
                if inner(rest, s) {
                    return true;
                }
                for i in 0..s.len() {
                    if inner(rest, &s[i + 1..]) {
                        return true;
                    }
                }
                false
            }
            Some(b'*') => {
                let rest = &pat[1..];
                for i in 0..=s.len() {
                    if s[..i].contains(&b'/') {
                        break;
                    }
                    if inner(rest, &s[i..]) {
                        return true;
                    }
                }
                false
            }
            Some(b'?') => {
                if s.is_empty() || s[0] == b'/' {
                    false
                } else {
                    inner(&pat[1..], &s[1..])
                }
            }
            Some(&c) => !s.is_empty() && s[0] == c && inner(&pat[1..], &s[1..]),
        }
    }
    inner(pattern.as_bytes(), candidate.as_bytes())
}

fn any_match(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, candidate))
}

fn load_gitignore(cwd: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(cwd);
    let _ = builder.add(cwd.join(".gitignore")); // absent/unreadable -> treated as empty
    builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Enumerate candidate files under `cwd`, returning a sorted, deduplicated
/// list of repo-relative POSIX paths, per SPEC_FULL §4.C.
pub fn scan_universe(cwd: &Path, config: &ScanConfig) -> Vec<String> {
    let gitignore = load_gitignore(cwd);
    let mut candidates: BTreeSet<String> = BTreeSet::new();

    // Base enumeration: walk everything, `.git` and `node_modules` excluded
    // at walk time for efficiency (re-applied logically below anyway).
    let mut walker = WalkBuilder::new(cwd);
    walker
        .hidden(false)
        .git_ignore(false)
        .git_exclude(false)
        .git_global(false)
        .ignore(false)
        .follow_links(true)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            name != ".git" && name != "node_modules"
        });
    for entry in walker.build().flatten() {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            if let Ok(rel) = entry.path().strip_prefix(cwd) {
                candidates.insert(to_posix(rel.to_string_lossy().as_ref()));
            }
        }
    }

    // Extra enumeration: non-`**/*` include globs, still excluding `.git/**`,
    // so they can re-include `node_modules/**`.
    for include in &config.includes {
        if include == "**/*" {
            continue;
        }
        let mut walker = WalkBuilder::new(cwd);
        walker
            .hidden(false)
            .git_ignore(false)
            .git_exclude(false)
            .git_global(false)
            .ignore(false)
            .follow_links(true)
            .filter_entry(|entry| entry.file_name().to_string_lossy() != ".git");
        for entry in walker.build().flatten() {
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                if let Ok(rel) = entry.path().strip_prefix(cwd) {
                    let rel = to_posix(rel.to_string_lossy().as_ref());
                    if glob_match(include, &rel) {
                        candidates.insert(rel);
                    }
                }
            }
        }
    }

    let mut included: Vec<String> = Vec::new();
    for candidate in candidates {
        if candidate == ".git" || candidate.starts_with(".git/") {
            continue;
        }
        let explicit_allow = any_match(&config.includes, &candidate);
        let under_node_modules = candidate == "node_modules" || candidate.starts_with("node_modules/");
        if under_node_modules && !explicit_allow {
            continue;
        }

        let gitignored = gitignore.matched(cwd.join(&candidate), false).is_ignore();
        let mut keep = !gitignored;
        if explicit_allow {
            keep = true;
        }
        if any_match(&config.excludes, &candidate) {
            keep = false;
        }
        if keep {
            included.push(candidate);
        }
    }

    included.sort();
    included.dedup();
    included
}

fn to_posix(p: &str) -> String {
    p.replace('\\', "/")
}
