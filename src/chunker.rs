//! AST-aware chunking via tree-sitter.
//!
//! A chunk is one top-level definition: the chunker parses a file, walks
//! the root's direct children, and emits a [`Chunk`] per definition kind
//! registered for the language. Export statements, Python decorated
//! definitions, and C++ template declarations are unwrapped for naming and
//! classification while the emitted range stays on the outer node, so the
//! `export`/decorator/`template` prefix remains part of the snippet.
//!
//! Definitions whose line span exceeds the configured limit and whose kind
//! is splittable decompose into their member definitions (found directly
//! or inside a recognized body wrapper). When no members are found the
//! whole node is emitted as a single chunk.

use anyhow::{anyhow, Result};
use tree_sitter::{Node, Parser};

use crate::languages::Lang;
use crate::models::Chunk;

/// Container nodes searched for member definitions during a split.
const BODY_WRAPPERS: &[&str] = &[
    "class_body",
    "declaration_list",
    "field_declaration_list",
    "body_statement",
    "block",
];

/// Parse `source` and emit one chunk per top-level definition.
///
/// Line numbers are 1-based and inclusive; `max_chunk_lines` is the span
/// above which splittable definitions decompose into members.
///
/// # Errors
///
/// Returns an error when the grammar rejects the parser or the parse
/// itself fails. Callers treat this as a per-file, non-fatal condition.
pub fn chunk_file(
    source: &str,
    file_path: &str,
    lang: Lang,
    file_hash: &str,
    max_chunk_lines: usize,
) -> Result<Vec<Chunk>> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang.grammar())
        .map_err(|e| anyhow!("set_language failed for {}: {e}", lang.id()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("parse failed for {file_path}"))?;

    let root = tree.root_node();
    let ctx = ChunkCtx {
        source,
        file_path,
        lang,
        file_hash,
        max_chunk_lines,
    };

    let mut chunks = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if !lang.top_level_kinds().contains(&child.kind()) {
            continue;
        }
        process_definition(&ctx, &child, &mut chunks);
    }

    Ok(chunks)
}

/// Shared inputs threaded through chunk emission.
struct ChunkCtx<'a> {
    source: &'a str,
    file_path: &'a str,
    lang: Lang,
    file_hash: &'a str,
    max_chunk_lines: usize,
}

fn process_definition(ctx: &ChunkCtx<'_>, outer: &Node, output: &mut Vec<Chunk>) {
    let Some(inner) = unwrap_definition(outer, ctx.lang) else {
        return;
    };

    let start = outer.start_position().row + 1;
    let end = outer.end_position().row + 1;
    let span = end - start + 1;

    if span > ctx.max_chunk_lines && ctx.lang.splittable_kinds().contains(&inner.kind()) {
        let members = collect_members(&inner, ctx.lang);
        if !members.is_empty() {
            for member in &members {
                emit_chunk(ctx, member, member, output);
            }
            return;
        }
    }

    emit_chunk(ctx, &inner, outer, output);
}

/// Resolve the node used for naming, classification, and split decisions.
///
/// Returns `None` when the outer node wraps nothing chunkable (e.g. a
/// re-export list). The outer node keeps ownership of the line range.
fn unwrap_definition<'t>(outer: &Node<'t>, lang: Lang) -> Option<Node<'t>> {
    match outer.kind() {
        "export_statement" => {
            if let Some(decl) = outer.child_by_field_name("declaration") {
                if is_recognized_declaration(&decl, lang) {
                    return Some(decl);
                }
                return None;
            }
            // `export default <expr>` keeps anonymous functions and classes
            let value = outer.child_by_field_name("value")?;
            let kind = value.kind();
            if kind.contains("function") || kind.contains("class") {
                Some(value)
            } else {
                None
            }
        }
        "decorated_definition" => outer
            .child_by_field_name("definition")
            .or_else(|| first_named_child_of_kinds(outer, lang.top_level_kinds())),
        "template_declaration" => {
            // `template <...> class Foo {...}` — classify by the wrapped
            // declaration; fall back to the template node itself.
            Some(first_named_child_of_kinds(outer, lang.top_level_kinds()).unwrap_or(*outer))
        }
        _ => Some(*outer),
    }
}

fn is_recognized_declaration(node: &Node, lang: Lang) -> bool {
    let kind = node.kind();
    lang.top_level_kinds().contains(&kind) || kind.contains("function") || kind.contains("class")
}

fn first_named_child_of_kinds<'t>(node: &Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| kinds.contains(&c.kind()));
    found
}

/// Member definitions of a splittable node: functions, methods,
/// constructors, or any registered top-level kind, searched directly and
/// one level into body wrapper nodes.
fn collect_members<'t>(node: &Node<'t>, lang: Lang) -> Vec<Node<'t>> {
    let mut members = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if is_member_kind(child.kind(), lang) {
            members.push(child);
        } else if BODY_WRAPPERS.contains(&child.kind()) {
            let mut inner_cursor = child.walk();
            for grandchild in child.named_children(&mut inner_cursor) {
                if is_member_kind(grandchild.kind(), lang) {
                    members.push(grandchild);
                }
            }
        }
    }
    members
}

fn is_member_kind(kind: &str, lang: Lang) -> bool {
    kind.contains("function")
        || kind.contains("method")
        || kind.contains("constructor")
        || lang.top_level_kinds().contains(&kind)
}

fn emit_chunk(ctx: &ChunkCtx<'_>, naming: &Node, range: &Node, output: &mut Vec<Chunk>) {
    let naming = match unwrap_definition(naming, ctx.lang) {
        Some(n) => n,
        None => *naming,
    };

    let start_line = range.start_position().row + 1;
    let end_line = range.end_position().row + 1;
    let snippet = &ctx.source[range.byte_range()];
    let signature = snippet.lines().next().unwrap_or_default().trim().to_string();

    output.push(Chunk {
        chunk_key: format!("{}:{}:{}", ctx.file_path, start_line, end_line),
        file_path: ctx.file_path.to_string(),
        language: ctx.lang.id().to_string(),
        kind: normalize_kind(naming.kind()),
        name: extract_name(&naming, ctx.source, ctx.lang),
        signature,
        snippet: snippet.to_string(),
        start_line: start_line as i64,
        end_line: end_line as i64,
        file_hash: ctx.file_hash.to_string(),
    });
}

// ============ Name extraction ============

/// Best-effort identifier for a definition node. Language-specific rules
/// run first; anything they miss falls through to the generic
/// field/child scan. Returns an empty string when nothing applies.
fn extract_name(node: &Node, source: &str, lang: Lang) -> String {
    if let Some(name) = specific_name(node, source, lang) {
        if !name.is_empty() {
            return name;
        }
    }
    generic_name(node, source)
}

fn specific_name(node: &Node, source: &str, lang: Lang) -> Option<String> {
    let text = |n: &Node| source[n.byte_range()].to_string();

    match node.kind() {
        "decorated_definition" => node
            .child_by_field_name("definition")
            .map(|d| extract_name(&d, source, lang)),
        // Ruby `def obj.name`
        "singleton_method" => {
            let object = node.child_by_field_name("object")?;
            let name = node.child_by_field_name("name")?;
            Some(format!("{}.{}", text(&object), text(&name)))
        }
        // Ruby top-level `CONST = ...` — left-hand side verbatim
        "assignment" if lang == Lang::Ruby => {
            node.child_by_field_name("left").map(|l| text(&l))
        }
        "function_definition" if matches!(lang, Lang::C | Lang::Cpp) => {
            c_function_name(node, source)
        }
        "type_definition" if matches!(lang, Lang::C | Lang::Cpp) => {
            first_child_of_kind(node, "type_identifier").map(|n| text(&n))
        }
        "method_declaration" if lang == Lang::Go => go_method_name(node, source),
        "type_declaration" | "const_declaration" | "var_declaration" if lang == Lang::Go => {
            let mut cursor = node.walk();
            let spec = node.named_children(&mut cursor).next()?;
            spec.child_by_field_name("name").map(|n| text(&n))
        }
        "val_definition" | "var_definition" if lang == Lang::Scala => {
            node.child_by_field_name("pattern").map(|p| text(&p))
        }
        "variable_declaration" if lang == Lang::Zig => {
            first_child_of_kind(node, "identifier").map(|n| text(&n))
        }
        "test_declaration" if lang == Lang::Zig => first_child_of_kind(node, "string")
            .map(|n| text(&n).trim_matches('"').to_string()),
        "impl_item" => {
            let ty = node.child_by_field_name("type")?;
            match node.child_by_field_name("trait") {
                Some(tr) => Some(format!("{} for {}", text(&tr), text(&ty))),
                None => Some(text(&ty)),
            }
        }
        "lexical_declaration" | "variable_declaration"
            if matches!(lang, Lang::JavaScript | Lang::TypeScript | Lang::Tsx) =>
        {
            let mut cursor = node.walk();
            let declarator = node.named_children(&mut cursor).next()?;
            declarator.child_by_field_name("name").map(|n| text(&n))
        }
        _ => None,
    }
}

fn generic_name(node: &Node, source: &str) -> String {
    for field in ["name", "identifier", "type_identifier"] {
        if let Some(n) = node.child_by_field_name(field) {
            let text = &source[n.byte_range()];
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    // Fallback: first identifier-like child
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "identifier" | "type_identifier" | "constant") {
            return source[child.byte_range()].to_string();
        }
    }
    String::new()
}

/// C/C++ function names sit under the `declarator` field, nested inside
/// `function_declarator` (and `pointer_declarator` for pointer returns).
fn c_function_name(node: &Node, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "function_declarator" | "pointer_declarator" | "parenthesized_declarator" => {
                current = current.child_by_field_name("declarator")?;
            }
            _ => break,
        }
    }
    Some(source[current.byte_range()].to_string())
}

/// Go methods are named `Receiver.Name`.
fn go_method_name(node: &Node, source: &str) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    let name_text = &source[name.byte_range()];

    let receiver_type = node.child_by_field_name("receiver").and_then(|recv| {
        let mut cursor = recv.walk();
        let param = recv.named_children(&mut cursor).next()?;
        let ty = param.child_by_field_name("type")?;
        Some(source[ty.byte_range()].trim_start_matches('*').to_string())
    });

    match receiver_type {
        Some(recv) => Some(format!("{recv}.{name_text}")),
        None => Some(name_text.to_string()),
    }
}

fn first_child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

// ============ Kind normalization ============

const EXACT_KINDS: &[(&str, &str)] = &[
    ("namespace_definition", "namespace"),
    ("internal_module", "namespace"),
    ("template_declaration", "template"),
    ("test_declaration", "test"),
    ("object_definition", "object"),
    ("record_declaration", "record"),
    ("constructor_declaration", "constructor"),
    ("singleton_method", "method"),
    ("type_item", "type"),
    ("type_definition", "type"),
    ("type_alias_declaration", "type"),
    ("type_declaration", "type"),
    ("const_item", "const"),
    ("const_declaration", "const"),
    ("static_item", "static"),
    ("lexical_declaration", "variable"),
    ("variable_declaration", "variable"),
    ("var_declaration", "variable"),
    ("val_definition", "variable"),
    ("var_definition", "variable"),
    ("assignment", "variable"),
    ("declaration", "declaration"),
];

const SUBSTRING_KINDS: &[(&str, &str)] = &[
    ("function", "function"),
    ("struct", "struct"),
    ("enum", "enum"),
    ("impl", "impl"),
    ("trait", "trait"),
    ("class", "class"),
    ("method", "method"),
    ("interface", "interface"),
    ("macro", "macro"),
    ("namespace", "namespace"),
    ("template", "template"),
    ("module", "module"),
    ("mod", "module"),
];

/// Map a raw AST kind onto the normalized vocabulary, falling back to the
/// raw kind when nothing matches.
pub fn normalize_kind(raw: &str) -> String {
    for (exact, normalized) in EXACT_KINDS {
        if raw == *exact {
            return (*normalized).to_string();
        }
    }
    for (needle, normalized) in SUBSTRING_KINDS {
        if raw.contains(needle) {
            return (*normalized).to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, lang: Lang) -> Vec<Chunk> {
        chunk_file(source, "/repo/test.src", lang, "hash", 150).unwrap()
    }

    #[test]
    fn test_rust_top_level_functions() {
        let source = "fn alpha() {\n    let x = 1;\n}\n\nfn beta() -> i32 {\n    42\n}\n";
        let chunks = chunk(source, Lang::Rust);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "alpha");
        assert_eq!(chunks[0].kind, "function");
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
        assert_eq!(chunks[0].signature, "fn alpha() {");
        assert_eq!(chunks[0].chunk_key, "/repo/test.src:1:3");
        assert_eq!(chunks[1].name, "beta");
    }

    #[test]
    fn test_rust_impl_name_includes_trait() {
        let source = "struct Foo;\n\nimpl Foo {\n    fn a(&self) {}\n}\n\nimpl Default for Foo {\n    fn default() -> Self { Foo }\n}\n";
        let chunks = chunk(source, Lang::Rust);
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Foo"));
        assert!(names.contains(&"Default for Foo"));
        let kinds: Vec<_> = chunks.iter().map(|c| c.kind.as_str()).collect();
        assert!(kinds.contains(&"struct"));
        assert!(kinds.contains(&"impl"));
    }

    #[test]
    fn test_rust_snippet_is_verbatim() {
        let source = "fn whole() {\n    // body\n    let y = 2;\n}\n";
        let chunks = chunk(source, Lang::Rust);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].snippet, source.trim_end_matches('\n'));
    }

    #[test]
    fn test_rust_oversized_impl_splits_into_methods() {
        let mut source = String::from("impl Big {\n");
        for m in 0..3 {
            source.push_str(&format!("    fn m{m}() {{\n"));
            for i in 0..60 {
                source.push_str(&format!("        let v{i} = {i};\n"));
            }
            source.push_str("    }\n");
        }
        source.push_str("}\n");

        let chunks = chunk(&source, Lang::Rust);
        assert_eq!(chunks.len(), 3);
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["m0", "m1", "m2"]);
        for c in &chunks {
            assert_eq!(c.kind, "function");
            assert!(c.end_line - c.start_line + 1 <= 150);
        }
    }

    #[test]
    fn test_small_impl_stays_whole() {
        let source = "impl Small {\n    fn one(&self) {}\n    fn two(&self) {}\n}\n";
        let chunks = chunk(source, Lang::Rust);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, "impl");
    }

    #[test]
    fn test_python_class_split_emits_methods() {
        let mut source = String::from("class Big:\n");
        for m in ["m1", "m2", "m3"] {
            source.push_str(&format!("    def {m}(self):\n"));
            for i in 0..55 {
                source.push_str(&format!("        x{i} = {i}\n"));
            }
        }
        let chunks = chunk(&source, Lang::Python);
        assert_eq!(chunks.len(), 3);
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["m1", "m2", "m3"]);
        assert!(chunks.iter().all(|c| c.kind == "function"));
    }

    #[test]
    fn test_python_decorator_range_covers_decorator() {
        let source = "@app.route('/x')\ndef handler():\n    return 1\n";
        let chunks = chunk(source, Lang::Python);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "handler");
        assert_eq!(chunks[0].kind, "function");
        assert_eq!(chunks[0].start_line, 1);
        assert!(chunks[0].snippet.starts_with("@app.route"));
        assert_eq!(chunks[0].signature, "@app.route('/x')");
    }

    #[test]
    fn test_typescript_export_unwrapping() {
        let source = "export function visible() {\n    return 1;\n}\n\nexport const answer = 42;\n\nexport { visible as v };\n";
        let chunks = chunk(source, Lang::TypeScript);
        assert_eq!(chunks.len(), 2, "re-export list must be skipped");
        assert_eq!(chunks[0].name, "visible");
        assert_eq!(chunks[0].kind, "function");
        assert!(chunks[0].snippet.starts_with("export function"));
        assert_eq!(chunks[1].name, "answer");
        assert_eq!(chunks[1].kind, "variable");
    }

    #[test]
    fn test_typescript_default_export_anonymous_function_kept() {
        let source = "export default function () {\n    return 0;\n}\n";
        let chunks = chunk(source, Lang::TypeScript);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, "function");
        assert!(chunks[0].name.is_empty());
    }

    #[test]
    fn test_typescript_interface_and_type_alias() {
        let source = "interface Shape {\n    area(): number;\n}\n\ntype Id = string;\n";
        let chunks = chunk(source, Lang::TypeScript);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, "interface");
        assert_eq!(chunks[0].name, "Shape");
        assert_eq!(chunks[1].kind, "type");
        assert_eq!(chunks[1].name, "Id");
    }

    #[test]
    fn test_c_function_declarator_unwrapping() {
        let source = "int add(int a, int b) {\n    return a + b;\n}\n\nint *alloc_buf(void) {\n    return 0;\n}\n";
        let chunks = chunk(source, Lang::C);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "add");
        assert_eq!(chunks[0].kind, "function");
        assert_eq!(chunks[1].name, "alloc_buf");
    }

    #[test]
    fn test_c_typedef_name() {
        let source = "typedef struct {\n    int x;\n} point_t;\n";
        let chunks = chunk(source, Lang::C);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "point_t");
        assert_eq!(chunks[0].kind, "type");
    }

    #[test]
    fn test_go_method_receiver_name() {
        let source = "package main\n\nfunc (s *Server) Start() error {\n    return nil\n}\n\nfunc Plain() {}\n";
        let chunks = chunk(source, Lang::Go);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "Server.Start");
        assert_eq!(chunks[0].kind, "method");
        assert_eq!(chunks[1].name, "Plain");
    }

    #[test]
    fn test_go_type_and_const_specs() {
        let source = "package main\n\ntype Config struct {\n    Addr string\n}\n\nconst MaxRetries = 5\n";
        let chunks = chunk(source, Lang::Go);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name, "Config");
        assert_eq!(chunks[0].kind, "type");
        assert_eq!(chunks[1].name, "MaxRetries");
        assert_eq!(chunks[1].kind, "const");
    }

    #[test]
    fn test_ruby_singleton_method_and_assignment() {
        let source = "VERSION = \"1.0\"\n\ndef self.build\n  new\nend\n\nclass Widget\n  def render\n  end\nend\n";
        let chunks = chunk(source, Lang::Ruby);
        let by_name: Vec<_> = chunks
            .iter()
            .map(|c| (c.name.as_str(), c.kind.as_str()))
            .collect();
        assert!(by_name.contains(&("VERSION", "variable")));
        assert!(by_name.contains(&("self.build", "method")));
        assert!(by_name.contains(&("Widget", "class")));
    }

    #[test]
    fn test_java_class_chunk() {
        let source =
            "public class Greeter {\n    public String greet() {\n        return \"hi\";\n    }\n}\n";
        let chunks = chunk(source, Lang::Java);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "Greeter");
        assert_eq!(chunks[0].kind, "class");
    }

    #[test]
    fn test_javascript_lexical_declaration_name() {
        let source = "const handler = () => {\n    return 1;\n};\n";
        let chunks = chunk(source, Lang::JavaScript);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "handler");
        assert_eq!(chunks[0].kind, "variable");
    }

    #[test]
    fn test_line_numbers_one_based_inclusive() {
        let source = "\n\nfn below_blank_lines() {\n    let a = 1;\n}\n";
        let chunks = chunk(source, Lang::Rust);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 3);
        assert_eq!(chunks[0].end_line, 5);
        assert!(chunks[0].start_line <= chunks[0].end_line);
    }

    #[test]
    fn test_normalize_kind_table() {
        assert_eq!(normalize_kind("function_item"), "function");
        assert_eq!(normalize_kind("function_definition"), "function");
        assert_eq!(normalize_kind("struct_item"), "struct");
        assert_eq!(normalize_kind("impl_item"), "impl");
        assert_eq!(normalize_kind("mod_item"), "module");
        assert_eq!(normalize_kind("namespace_definition"), "namespace");
        assert_eq!(normalize_kind("template_declaration"), "template");
        assert_eq!(normalize_kind("test_declaration"), "test");
        assert_eq!(normalize_kind("lexical_declaration"), "variable");
        assert_eq!(normalize_kind("singleton_method"), "method");
        assert_eq!(normalize_kind("record_declaration"), "record");
        // Unknown kinds pass through verbatim
        assert_eq!(normalize_kind("union_specifier"), "union_specifier");
    }

    #[test]
    fn test_empty_source_yields_no_chunks() {
        let chunks = chunk("", Lang::Rust);
        assert!(chunks.is_empty());
    }
}
