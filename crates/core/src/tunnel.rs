//! Tunnel expander + commander rule — SPEC_FULL §4.I.
//!
//! This crate is AST-only (no type-checker host), so step 4's merged-
//! declaration expansion is the unconditional fallback named in SPEC_FULL
//! §4.I: every `symbol`-kind result uses its defining file directly.

use std::path::{Path, PathBuf};

use crate::reexport::{resolve_defining_exports, DefiningExport, GetSourceFile, ResolveAbsPath};
use crate::resolve::{nearest_package_root, Resolved};

/// Expand one tunnel request `(specifier, exportName)` from source `from_abs_path`
/// into the declaration files it should produce implicit edges to.
pub fn expand_tunnel<H: ResolveAbsPath + GetSourceFile>(
    host: &H,
    from_abs_path: &Path,
    specifier: &str,
    export_name: &str,
) -> Vec<PathBuf> {
    let resolved = crate::resolve::resolve(from_abs_path, specifier);
    let (barrel, barrel_is_external) = match resolved {
        Resolved::File { abs_path, is_external } => (abs_path, is_external),
        _ => return Vec::new(),
    };

    let defining = resolve_defining_exports(&barrel, export_name, host, host);

    // Step 4: AST-only fallback — every result's defining file is used directly.
    let mut files: Vec<PathBuf> = defining
        .into_iter()
        .map(|d| match d {
            DefiningExport::Module { abs_path } => abs_path,
            DefiningExport::Symbol { abs_path, .. } => abs_path,
        })
        .collect();

    let barrel_is_under_node_modules = barrel.components().any(|c| c.as_os_str() == "node_modules");
    if barrel_is_external || barrel_is_under_node_modules {
        files = apply_commander_rule(&barrel, files);
    }

    dedupe_paths(&mut files);
    files
}

/// Restrict `files` to the barrel's own package, per SPEC_FULL §4.I step 5.
/// Files with no discoverable package root are retained.
fn apply_commander_rule(barrel: &Path, files: Vec<PathBuf>) -> Vec<PathBuf> {
    let barrel_root = nearest_package_root(barrel);
    files
        .into_iter()
        .filter(|file| match nearest_package_root(file) {
            Some(root) => Some(root) == barrel_root,
            None => true,
        })
        .collect()
}

fn dedupe_paths(files: &mut Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(f.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ParsedModule;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FakeHost {
        modules: RefCell<HashMap<PathBuf, ParsedModule>>,
    }

    impl ResolveAbsPath for FakeHost {
        fn resolve_abs_path(&self, from_abs_path: &Path, specifier: &str) -> Option<PathBuf> {
            match crate::resolve::resolve(from_abs_path, specifier) {
                Resolved::File { abs_path, .. } => Some(abs_path),
                _ => None,
            }
        }
    }

    impl GetSourceFile for FakeHost {
        fn get_source_file(&self, abs_path: &Path) -> Option<ParsedModule> {
            self.modules.borrow().get(abs_path).cloned()
        }
    }

    #[test]
    fn commander_rule_confines_tunnel_to_barrel_package() {
        let dir = tempdir().unwrap();
        let pkg_dir = dir.path().join("node_modules/pkg");
        let other_dir = dir.path().join("node_modules/other");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::create_dir_all(&other_dir).unwrap();
        std::fs::write(pkg_dir.join("package.json"), r#"{"types":"index.d.ts"}"#).unwrap();
        std::fs::write(other_dir.join("package.json"), "{}").unwrap();
        std::fs::write(pkg_dir.join("index.d.ts"), "").unwrap();
        std::fs::write(pkg_dir.join("a.d.ts"), "").unwrap();
        std::fs::write(other_dir.join("index.d.ts"), "").unwrap();

        let mut barrel = ParsedModule::default();
        barrel.named_from.push(crate::lang::NamedFromExport {
            exported_name: "A".to_string(),
            property_name: "A".to_string(),
            specifier: "./a".to_string(),
        });
        barrel.named_from.push(crate::lang::NamedFromExport {
            exported_name: "B".to_string(),
            property_name: "B".to_string(),
            specifier: "other".to_string(),
        });

        let mut a_module = ParsedModule::default();
        a_module.local_names.insert("A".to_string());
        let mut other_module = ParsedModule::default();
        other_module.local_names.insert("B".to_string());

        let mut modules = HashMap::new();
        modules.insert(pkg_dir.join("index.d.ts"), barrel);
        modules.insert(pkg_dir.join("a.d.ts"), a_module);
        modules.insert(other_dir.join("index.d.ts"), other_module);
        let host = FakeHost { modules: RefCell::new(modules) };

        let usepkg = dir.path().join("usepkg.ts");
        std::fs::write(&usepkg, "").unwrap();

        let a_files = expand_tunnel(&host, &usepkg, "pkg", "A");
        assert_eq!(a_files, vec![pkg_dir.join("a.d.ts")]);

        let b_files = expand_tunnel(&host, &usepkg, "pkg", "B");
        assert!(b_files.is_empty(), "forwarding into a different package must be filtered out");
    }
}
