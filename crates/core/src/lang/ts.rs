//! Tree-sitter-backed language provider for TypeScript/JavaScript.
//!
//! Grounded on `language_for_ext`/`classify_node`/`walk_node` in the
//! teacher's `server/src/ast.rs`: one grammar dispatch by extension, one
//! tree-sitter `Parser`, one walk over the tree. Unlike the teacher's AST
//! indexer (which builds a generic symbol index), this walk is specialized
//! to the explicit-import / tunnel-request / forwarding-target extraction
//! in SPEC_FULL §4.F/§4.H, done in a single pass over the file's top-level
//! statements per SPEC_FULL §9 ("single traversal").

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::node::EdgeKind;

use super::{
    ExplicitImport, ForwardTarget, ImportBinding, ImportBindingKind, LanguageProvider,
    NamedFromExport, ParsedModule, TunnelRequest,
};

pub struct TreeSitterProvider;

impl Default for TreeSitterProvider {
    fn default() -> Self {
        Self
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Grammar {
    Typescript,
    Tsx,
    Javascript,
}

fn grammar_for_path(path: &Path) -> Option<Grammar> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ts" | "mts" | "cts" => Some(Grammar::Typescript),
        "tsx" => Some(Grammar::Tsx),
        "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::Javascript),
        _ => None,
    }
}

fn parser_for(grammar: Grammar) -> Option<Parser> {
    let mut parser = Parser::new();
    let language = match grammar {
        Grammar::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Grammar::Javascript => tree_sitter_javascript::LANGUAGE.into(),
    };
    parser.set_language(&language).ok()?;
    Some(parser)
}

impl LanguageProvider for TreeSitterProvider {
    fn parse(&self, abs_path: &Path, source_text: &str) -> Option<ParsedModule> {
        let grammar = grammar_for_path(abs_path)?;
        let mut parser = parser_for(grammar)?;
        let tree = parser.parse(source_text, None)?;
        Some(walk_module(tree.root_node(), source_text))
    }
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn walk_module(root: Node, source: &str) -> ParsedModule {
    let mut module = ParsedModule::default();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        visit_top_level(child, source, &mut module, 0);
    }
    module
}

/// `depth` counts function-body nesting for the dynamic-`require()` classification in SPEC_FULL §4.F.
fn visit_top_level(node: Node, source: &str, module: &mut ParsedModule, depth: usize) {
    match node.kind() {
        "import_statement" => handle_import_statement(node, source, module),
        "export_statement" => handle_export_statement(node, source, module),
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = child_text_by_field(node, "name", source) {
                module.local_names.insert(name);
            }
            scan_for_requires_and_dynamic_imports(node, source, module, depth + 1);
        }
        "class_declaration" => {
            if let Some(name) = child_text_by_field(node, "name", source) {
                module.local_names.insert(name);
            }
            scan_for_requires_and_dynamic_imports(node, source, module, depth + 1);
        }
        "interface_declaration" | "type_alias_declaration" | "enum_declaration" | "module" | "internal_module" => {
            if let Some(name) = child_text_by_field(node, "name", source) {
                module.local_names.insert(name);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.children(&mut cursor) {
                if declarator.kind() == "variable_declarator" {
                    if let Some(name) = child_text_by_field(declarator, "name", source) {
                        module.local_names.insert(name);
                    }
                }
            }
            scan_for_requires_and_dynamic_imports(node, source, module, depth);
        }
        "expression_statement" => {
            scan_for_requires_and_dynamic_imports(node, source, module, depth);
        }
        _ => {
            scan_for_requires_and_dynamic_imports(node, source, module, depth);
        }
    }
}

fn child_text_by_field<'a>(node: Node, field: &str, source: &'a str) -> Option<String> {
    node.child_by_field_name(field).map(|n| text(n, source).to_string())
}

/// Whole-declaration type-only check: an `import`/`export` statement carries
/// a `type` keyword token as an immediate child.
fn has_type_keyword(node: Node, source: &str) -> bool {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "type" || (child.kind() == "identifier" && text(child, source) == "type") {
            return true;
        }
    }
    false
}

fn string_literal_contents<'a>(node: Node, source: &'a str) -> Option<String> {
    let raw = text(node, source);
    let trimmed = raw.trim_matches(|c| c == '\'' || c == '"' || c == '`');
    Some(trimmed.to_string())
}

fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn handle_import_statement(node: Node, source: &str, module: &mut ParsedModule) {
    let raw = text(node, source);
    if raw.contains("= require(") {
        // `import X = require('m')` — TS-only CommonJS-interop form.
        if let Some(specifier) = extract_first_string_literal(node, source) {
            module.explicit_imports.push(ExplicitImport { specifier: specifier.clone(), kind: EdgeKind::Runtime });
            if let Some(name) = child_text_by_field(node, "name", source) {
                module
                    .import_bindings
                    .insert(name, ImportBinding { kind: ImportBindingKind::Default, specifier, import_name: None });
            }
        }
        return;
    }

    let Some(source_node) = find_child_by_kind(node, "string") else { return };
    let Some(specifier) = string_literal_contents(source_node, source) else { return };

    let whole_type_only = has_type_keyword(node, source);
    let clause = find_child_by_kind(node, "import_clause");

    let Some(clause) = clause else {
        // Side-effect-only import: `import 'm'` — no tunnel, runtime edge.
        module.explicit_imports.push(ExplicitImport { specifier, kind: EdgeKind::Runtime });
        return;
    };

    let default_binding = find_child_by_kind(clause, "identifier");
    let namespace_import = find_child_by_kind(clause, "namespace_import");
    let named_imports = find_child_by_kind(clause, "named_imports");

    let has_default = default_binding.is_some();
    let has_named = named_imports.is_some();

    // Namespace imports: explicit edge, never tunneled.
    if let Some(ns) = namespace_import {
        let kind = if whole_type_only { EdgeKind::Type } else { EdgeKind::Runtime };
        module.explicit_imports.push(ExplicitImport { specifier: specifier.clone(), kind });
        if let Some(alias) = find_child_by_kind(ns, "identifier") {
            let local = text(alias, source).to_string();
            module.import_bindings.insert(
                local,
                ImportBinding { kind: ImportBindingKind::Namespace, specifier, import_name: None },
            );
        }
        return;
    }

    if let Some(default_node) = default_binding {
        let local = text(default_node, source).to_string();
        let kind = if whole_type_only { EdgeKind::Type } else { EdgeKind::Runtime };
        // A clause mixing a default binding and a named block is never all-type-only.
        let explicit_kind = if has_named && !whole_type_only { EdgeKind::Runtime } else { kind };
        module.explicit_imports.push(ExplicitImport { specifier: specifier.clone(), kind: explicit_kind });
        module.import_bindings.insert(
            local,
            ImportBinding { kind: ImportBindingKind::Default, specifier: specifier.clone(), import_name: None },
        );
        module.tunnel_requests.push(TunnelRequest {
            specifier: specifier.clone(),
            export_name: "default".to_string(),
            kind: explicit_kind,
        });
    }

    if let Some(named) = named_imports {
        let mut specifiers = Vec::new();
        let mut cursor = named.walk();
        for spec in named.children(&mut cursor) {
            if spec.kind() != "import_specifier" {
                continue;
            }
            let spec_type_only = has_type_keyword(spec, source);
            let name_node = spec.child_by_field_name("name").or_else(|| find_child_by_kind(spec, "identifier"));
            let Some(name_node) = name_node else { continue };
            let import_name = text(name_node, source).to_string();
            let alias = spec.child_by_field_name("alias").map(|n| text(n, source).to_string());
            let local = alias.clone().unwrap_or_else(|| import_name.clone());
            specifiers.push((import_name, local, spec_type_only));
        }

        // Whole-clause runtime unless every specifier is individually type-only
        // and there is no default binding (mirrors the spec's tie-break).
        let all_type_only = !has_default && !specifiers.is_empty() && specifiers.iter().all(|(_, _, t)| *t);
        let clause_kind = if whole_type_only || all_type_only { EdgeKind::Type } else { EdgeKind::Runtime };

        if !has_default {
            module.explicit_imports.push(ExplicitImport { specifier: specifier.clone(), kind: clause_kind });
        }

        for (import_name, local, spec_type_only) in specifiers {
            module.import_bindings.insert(
                local,
                ImportBinding {
                    kind: ImportBindingKind::Named,
                    specifier: specifier.clone(),
                    import_name: Some(import_name.clone()),
                },
            );
            let tunnel_kind = if whole_type_only || spec_type_only { EdgeKind::Type } else { clause_kind };
            module.tunnel_requests.push(TunnelRequest {
                specifier: specifier.clone(),
                export_name: import_name,
                kind: tunnel_kind,
            });
        }
    }
}

fn extract_first_string_literal(node: Node, source: &str) -> Option<String> {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "string" {
            return string_literal_contents(n, source);
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    None
}

fn handle_export_statement(node: Node, source: &str, module: &mut ParsedModule) {
    let whole_type_only = has_type_keyword(node, source);
    let has_default_keyword = node
        .children(&mut node.walk())
        .any(|c| c.kind() == "default" || (c.kind() == "identifier" && text(c, source) == "default"));

    if has_default_keyword {
        module.defines_default = true;
        return;
    }

    // `export = expr` — TS-only direct default-export equivalent.
    let raw = text(node, source);
    if raw.trim_start().starts_with("export =") {
        module.defines_default = true;
        return;
    }

    let source_node = find_child_by_kind(node, "string");
    let specifier = source_node.and_then(|n| string_literal_contents(n, source));

    // `export * from 'm'` / `export * as Ns from 'm'`.
    if find_child_by_kind(node, "*").is_some() || raw.trim_start().starts_with("export *") {
        let Some(specifier) = specifier else { return };
        let ns_alias = find_child_by_kind(node, "namespace_export")
            .and_then(|ns| find_child_by_kind(ns, "identifier"))
            .map(|n| text(n, source).to_string());
        match ns_alias {
            Some(ns) => module.star_as_from.push((ns, specifier)),
            None => module.star_from.push(specifier),
        }
        return;
    }

    if let Some(export_clause) = find_child_by_kind(node, "export_clause") {
        let mut cursor = export_clause.walk();
        for spec in export_clause.children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let name_node = spec.child_by_field_name("name").or_else(|| find_child_by_kind(spec, "identifier"));
            let Some(name_node) = name_node else { continue };
            let property_name = text(name_node, source).to_string();
            let exported_name = spec
                .child_by_field_name("alias")
                .map(|n| text(n, source).to_string())
                .unwrap_or_else(|| property_name.clone());

            match &specifier {
                Some(spec_str) => {
                    module.named_from.push(NamedFromExport {
                        exported_name,
                        property_name,
                        specifier: spec_str.clone(),
                    });
                }
                None => {
                    if module.local_names.contains(&property_name) {
                        module.local_named_exports.insert(exported_name, property_name);
                    } else if module.import_bindings.contains_key(&property_name) {
                        module.binding_named_exports.insert(exported_name, property_name);
                    } else {
                        // Declared later in the file or forward-referenced;
                        // best-effort: treat as a local export.
                        module.local_named_exports.insert(exported_name, property_name);
                    }
                }
            }
        }
        let _ = whole_type_only;
        return;
    }

    // `export function f() {}` / `export class C {}` / `export const x = ...` /
    // `export interface I {}` / `export type T = ...` / `export enum E {}`.
    if let Some(decl) = node.child_by_field_name("declaration") {
        visit_top_level(decl, source, module, 0);
    } else {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(
                child.kind(),
                "function_declaration"
                    | "generator_function_declaration"
                    | "class_declaration"
                    | "interface_declaration"
                    | "type_alias_declaration"
                    | "enum_declaration"
                    | "lexical_declaration"
                    | "variable_declaration"
            ) {
                visit_top_level(child, source, module, 0);
            }
        }
    }
}

/// Find `require(...)`/`import(...)` calls nested inside an expression tree,
/// classifying them per SPEC_FULL §4.F (`dynamic` inside a function body,
/// `runtime` for top-level `require`).
fn scan_for_requires_and_dynamic_imports(node: Node, source: &str, module: &mut ParsedModule, depth: usize) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let next_depth = if matches!(child.kind(), "function" | "function_declaration" | "arrow_function" | "method_definition" | "generator_function") {
            depth + 1
        } else {
            depth
        };

        if child.kind() == "call_expression" {
            if let Some(callee) = child.child_by_field_name("function") {
                let callee_text = text(callee, source);
                if callee_text == "require" {
                    if let Some(spec) = first_string_arg(child, source) {
                        let kind = if depth > 0 { EdgeKind::Dynamic } else { EdgeKind::Runtime };
                        module.explicit_imports.push(ExplicitImport { specifier: spec, kind });
                    }
                } else if callee_text == "import" {
                    if let Some(spec) = first_string_arg(child, source) {
                        module.explicit_imports.push(ExplicitImport { specifier: spec, kind: EdgeKind::Dynamic });
                    }
                }
            }
        }
        if child.kind() == "import" {
            // Dynamic `import(x)` may parse as a dedicated `import` expression node
            // rather than a call_expression in some grammar versions.
            if let Some(parent) = child.parent() {
                if parent.kind() == "call_expression" {
                    if let Some(spec) = first_string_arg(parent, source) {
                        module.explicit_imports.push(ExplicitImport { specifier: spec, kind: EdgeKind::Dynamic });
                    }
                }
            }
        }

        scan_for_requires_and_dynamic_imports(child, source, module, next_depth);
    }
}

fn first_string_arg(call: Node, source: &str) -> Option<String> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    for child in args.children(&mut cursor) {
        if child.kind() == "string" {
            return string_literal_contents(child, source);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str, path: &str) -> ParsedModule {
        TreeSitterProvider
            .parse(&PathBuf::from(path), src)
            .expect("parse should succeed")
    }

    #[test]
    fn plain_named_import_is_runtime() {
        let module = parse("import { a } from './a';\n", "use.ts");
        assert_eq!(module.explicit_imports.len(), 1);
        assert_eq!(module.explicit_imports[0].kind, EdgeKind::Runtime);
        assert_eq!(module.tunnel_requests.len(), 1);
        assert_eq!(module.tunnel_requests[0].export_name, "a");
    }

    #[test]
    fn type_only_named_import_tunnels_as_type() {
        let module = parse("import type { User } from './models';\n", "feature.ts");
        assert_eq!(module.explicit_imports[0].kind, EdgeKind::Type);
        assert_eq!(module.tunnel_requests[0].kind, EdgeKind::Type);
    }

    #[test]
    fn namespace_import_has_no_tunnel() {
        let module = parse("import * as Ns from './barrel';\n", "use.ts");
        assert_eq!(module.explicit_imports.len(), 1);
        assert!(module.tunnel_requests.is_empty());
    }

    #[test]
    fn default_import_tunnels_as_default() {
        let module = parse("import Foo from './foo';\n", "use.ts");
        assert_eq!(module.tunnel_requests[0].export_name, "default");
    }

    #[test]
    fn export_star_from_is_forwarding() {
        let module = parse("export * from './a';\n", "barrel.ts");
        assert_eq!(module.star_from, vec!["./a".to_string()]);
    }

    #[test]
    fn local_function_is_a_local_name() {
        let module = parse("export function greet() {}\n", "a.ts");
        assert!(module.local_names.contains("greet"));
    }
}
