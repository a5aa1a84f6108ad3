//! Re-export traversal (AST-first) — SPEC_FULL §4.H.
//!
//! DFS-with-memo-and-cycle-stack shape is grounded on the `ReExportAll`
//! resolver in the `other_examples` barrel module cited in DESIGN.md,
//! extended from star-only forwarding to the full named/renamed/default/
//! namespace set via [`crate::lang::ParsedModule::forwarding_targets`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::lang::{ForwardTarget, ParsedModule};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefiningExport {
    Symbol { abs_path: PathBuf, export_name: String },
    Module { abs_path: PathBuf },
}

/// `resolveAbsPath(fromAbsPath, specifier) -> absPath | null`, SPEC_FULL §4.H.
pub trait ResolveAbsPath {
    fn resolve_abs_path(&self, from_abs_path: &Path, specifier: &str) -> Option<PathBuf>;
}

/// `getSourceFile(absPath) -> parsedModule | null`, SPEC_FULL §4.H.
pub trait GetSourceFile {
    fn get_source_file(&self, abs_path: &Path) -> Option<ParsedModule>;
}

type MemoKey = (PathBuf, String);

struct Resolver<'a, R: ResolveAbsPath, S: GetSourceFile> {
    resolve_abs_path: &'a R,
    get_source_file: &'a S,
    memo: HashMap<MemoKey, Vec<DefiningExport>>,
    stack: HashSet<MemoKey>,
}

impl<'a, R: ResolveAbsPath, S: GetSourceFile> Resolver<'a, R, S> {
    fn resolve(&mut self, abs_path: &Path, export_name: &str) -> Vec<DefiningExport> {
        let key: MemoKey = (abs_path.to_path_buf(), export_name.to_string());

        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        if self.stack.contains(&key) {
            // Cycle: let other branches accumulate; this branch contributes nothing.
            return Vec::new();
        }

        let Some(module) = self.get_source_file.get_source_file(abs_path) else {
            return Vec::new();
        };

        self.stack.insert(key.clone());

        let mut results = Vec::new();
        if module.defines_locally(export_name) {
            results.push(DefiningExport::Symbol { abs_path: abs_path.to_path_buf(), export_name: export_name.to_string() });
        }

        for target in module.forwarding_targets(export_name) {
            match target {
                ForwardTarget::Module { specifier } => {
                    if let Some(next) = self.resolve_abs_path.resolve_abs_path(abs_path, &specifier) {
                        results.push(DefiningExport::Module { abs_path: next });
                    }
                }
                ForwardTarget::Symbol { specifier, import_name } => {
                    if let Some(next) = self.resolve_abs_path.resolve_abs_path(abs_path, &specifier) {
                        results.extend(self.resolve(&next, &import_name));
                    }
                }
            }
        }

        self.stack.remove(&key);
        dedupe(&mut results);
        self.memo.insert(key, results.clone());
        results
    }
}

fn dedupe(results: &mut Vec<DefiningExport>) {
    let mut seen: HashSet<DefiningExport> = HashSet::new();
    results.retain(|r| seen.insert(r.clone()));
}

/// `resolveDefiningExports(entryModule, exportName)`, SPEC_FULL §4.H.
pub fn resolve_defining_exports<R: ResolveAbsPath, S: GetSourceFile>(
    entry_abs_path: &Path,
    export_name: &str,
    resolve_abs_path: &R,
    get_source_file: &S,
) -> Vec<DefiningExport> {
    let mut resolver = Resolver { resolve_abs_path, get_source_file, memo: HashMap::new(), stack: HashSet::new() };
    resolver.resolve(entry_abs_path, export_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeHost {
        modules: RefCell<HashMap<PathBuf, ParsedModule>>,
    }

    impl ResolveAbsPath for FakeHost {
        fn resolve_abs_path(&self, from_abs_path: &Path, specifier: &str) -> Option<PathBuf> {
            let dir = from_abs_path.parent()?;
            Some(dir.join(format!("{specifier}.ts")))
        }
    }

    impl GetSourceFile for FakeHost {
        fn get_source_file(&self, abs_path: &Path) -> Option<ParsedModule> {
            self.modules.borrow().get(abs_path).cloned()
        }
    }

    fn module_with_local(name: &str) -> ParsedModule {
        let mut module = ParsedModule::default();
        module.local_names.insert(name.to_string());
        module
    }

    #[test]
    fn defines_locally_returns_symbol_with_no_forwarding() {
        let mut modules = HashMap::new();
        modules.insert(PathBuf::from("/repo/a.ts"), module_with_local("A"));
        let host = FakeHost { modules: RefCell::new(modules) };

        let results = resolve_defining_exports(Path::new("/repo/a.ts"), "A", &host, &host);
        assert_eq!(results, vec![DefiningExport::Symbol { abs_path: "/repo/a.ts".into(), export_name: "A".into() }]);
    }

    #[test]
    fn star_from_forwards_to_next_module() {
        let mut barrel = ParsedModule::default();
        barrel.star_from.push("./a".to_string());

        let mut modules = HashMap::new();
        modules.insert(PathBuf::from("/repo/index.ts"), barrel);
        modules.insert(PathBuf::from("/repo/a.ts"), module_with_local("A"));
        let host = FakeHost { modules: RefCell::new(modules) };

        let results = resolve_defining_exports(Path::new("/repo/index.ts"), "A", &host, &host);
        assert_eq!(results, vec![DefiningExport::Symbol { abs_path: "/repo/a.ts".into(), export_name: "A".into() }]);
    }

    #[test]
    fn cyclic_forwarding_terminates() {
        let mut a = ParsedModule::default();
        a.star_from.push("./b".to_string());
        let mut b = ParsedModule::default();
        b.star_from.push("./a".to_string());

        let mut modules = HashMap::new();
        modules.insert(PathBuf::from("/repo/a.ts"), a);
        modules.insert(PathBuf::from("/repo/b.ts"), b);
        let host = FakeHost { modules: RefCell::new(modules) };

        let results = resolve_defining_exports(Path::new("/repo/a.ts"), "X", &host, &host);
        assert!(results.is_empty());
    }

    #[test]
    fn namespace_forwarding_does_not_recurse() {
        let mut barrel = ParsedModule::default();
        barrel.star_as_from.push(("Ns".to_string(), "./a".to_string()));

        let mut modules = HashMap::new();
        modules.insert(PathBuf::from("/repo/index.ts"), barrel);
        modules.insert(PathBuf::from("/repo/a.ts"), module_with_local("A"));
        let host = FakeHost { modules: RefCell::new(modules) };

        let results = resolve_defining_exports(Path::new("/repo/index.ts"), "Ns", &host, &host);
        assert_eq!(results, vec![DefiningExport::Module { abs_path: "/repo/a.ts".into() }]);
    }
}
