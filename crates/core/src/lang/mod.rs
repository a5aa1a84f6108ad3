//! Language provider contract — SPEC_FULL §4.F / §6.4.
//!
//! The core never parses a file itself; it asks a `LanguageProvider` for a
//! `ParsedModule`. This crate ships one concrete provider (tree-sitter
//! backed, [`ts::TreeSitterProvider`]) behind the `treesitter` feature, but
//! callers may supply their own — the trait is the entire surface the
//! orchestrator (`analyze.rs`) and the re-export traversal (`reexport.rs`)
//! depend on, mirroring the "host injects the analyzer" design note in
//! SPEC_FULL §9.

#[cfg(feature = "treesitter")]
pub mod ts;

use crate::node::EdgeKind;

/// One `import`/`export ... from`/`require()` at module scope (or a dynamic
/// `import()`/nested `require()`), without path resolution — SPEC_FULL §4.F.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitImport {
    pub specifier: String,
    pub kind: EdgeKind,
}

/// One importer binding that should be tunneled through its source module — SPEC_FULL §4.F.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelRequest {
    pub specifier: String,
    pub export_name: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportBindingKind {
    Default,
    Named,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub kind: ImportBindingKind,
    pub specifier: String,
    /// The name in the source module (for `Named`; irrelevant for `Default`/`Namespace`).
    pub import_name: Option<String>,
}

/// A forwarding target discovered while resolving a single export name from
/// one module — SPEC_FULL §4.H `collectForwardingTargets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardTarget {
    /// Keep following `specifier`'s export `import_name` for a local declaration.
    Symbol { specifier: String, import_name: String },
    /// `specifier` itself is the target (namespace forwarding); do not recurse.
    Module { specifier: String },
}

/// Everything the rest of the crate needs to know about one parsed source file.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    pub explicit_imports: Vec<ExplicitImport>,
    pub tunnel_requests: Vec<TunnelRequest>,

    /// Top-level function/class/interface/type/enum/module/variable declarations.
    pub local_names: std::collections::HashSet<String>,
    /// Importer-local name -> binding description.
    pub import_bindings: std::collections::HashMap<String, ImportBinding>,
    /// `true` if this module has a default export (`export default ...` or `export = ...`).
    pub defines_default: bool,
    /// Names exported via `export { name }` (no specifier) whose local side is in `local_names`.
    pub local_named_exports: std::collections::HashMap<String, String>,
    /// Names re-exported via `export { localBindingName as exportedName }` where
    /// `localBindingName` is an imported binding, not a local declaration.
    pub binding_named_exports: std::collections::HashMap<String, String>,

    pub star_from: Vec<String>,
    pub star_as_from: Vec<(String, String)>,
    pub named_from: Vec<NamedFromExport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFromExport {
    pub exported_name: String,
    pub property_name: String,
    pub specifier: String,
}

impl ParsedModule {
    /// SPEC_FULL §4.H `definesLocally`.
    pub fn defines_locally(&self, export_name: &str) -> bool {
        if export_name == "default" {
            return self.defines_default;
        }
        self.local_names.contains(export_name) || self.local_named_exports.contains_key(export_name)
    }

    /// SPEC_FULL §4.H `collectForwardingTargets`.
    pub fn forwarding_targets(&self, export_name: &str) -> Vec<ForwardTarget> {
        let mut targets = Vec::new();

        for specifier in &self.star_from {
            targets.push(ForwardTarget::Symbol {
                specifier: specifier.clone(),
                import_name: export_name.to_string(),
            });
        }

        for (ns_name, specifier) in &self.star_as_from {
            if ns_name == export_name {
                targets.push(ForwardTarget::Module { specifier: specifier.clone() });
            }
        }

        for entry in &self.named_from {
            if entry.exported_name == export_name {
                targets.push(ForwardTarget::Symbol {
                    specifier: entry.specifier.clone(),
                    import_name: entry.property_name.clone(),
                });
            }
        }

        if let Some(local_binding_name) = self.binding_named_exports.get(export_name) {
            if let Some(binding) = self.import_bindings.get(local_binding_name) {
                match binding.kind {
                    ImportBindingKind::Namespace => {
                        targets.push(ForwardTarget::Module { specifier: binding.specifier.clone() });
                    }
                    ImportBindingKind::Default => {
                        targets.push(ForwardTarget::Symbol {
                            specifier: binding.specifier.clone(),
                            import_name: "default".to_string(),
                        });
                    }
                    ImportBindingKind::Named => {
                        targets.push(ForwardTarget::Symbol {
                            specifier: binding.specifier.clone(),
                            import_name: binding
                                .import_name
                                .clone()
                                .unwrap_or_else(|| local_binding_name.clone()),
                        });
                    }
                }
            }
        }

        targets
    }
}

/// The minimum capability set a host-supplied analyzer must provide —
/// SPEC_FULL §6.4.
pub trait LanguageProvider: Send + Sync {
    /// Parse `source_text` (the file at `abs_path`, used only to pick a grammar
    /// by extension) into a [`ParsedModule`]. Returns `None` on a parse failure
    /// the caller should treat as "file unavailable" (SPEC_FULL §4.H step 3).
    fn parse(&self, abs_path: &std::path::Path, source_text: &str) -> Option<ParsedModule>;
}
