//! Language registry: file extensions, tree-sitter grammars, and the AST
//! node kinds that delimit chunks.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A supported language with its tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Rust,
    C,
    Cpp,
    Go,
    Python,
    Zig,
    Java,
    Scala,
    JavaScript,
    TypeScript,
    Tsx,
    Php,
    Ruby,
}

/// Every registered language, in registry order.
pub const ALL_LANGS: &[Lang] = &[
    Lang::Rust,
    Lang::C,
    Lang::Cpp,
    Lang::Go,
    Lang::Python,
    Lang::Zig,
    Lang::Java,
    Lang::Scala,
    Lang::JavaScript,
    Lang::TypeScript,
    Lang::Tsx,
    Lang::Php,
    Lang::Ruby,
];

impl Lang {
    /// Canonical name stored on chunks and used by the language filter.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Go => "go",
            Self::Python => "python",
            Self::Zig => "zig",
            Self::Java => "java",
            Self::Scala => "scala",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Php => "php",
            Self::Ruby => "ruby",
        }
    }

    /// Load the tree-sitter grammar for this language.
    #[must_use]
    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Zig => tree_sitter_zig::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Scala => tree_sitter_scala::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            Self::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        }
    }

    /// AST node kinds treated as top-level definitions.
    ///
    /// Only direct children of the parse root with one of these kinds (or
    /// reachable through export/decorator/template unwrapping) become
    /// chunks.
    #[must_use]
    pub fn top_level_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &[
                "function_item",
                "struct_item",
                "enum_item",
                "union_item",
                "trait_item",
                "impl_item",
                "type_item",
                "const_item",
                "static_item",
                "macro_definition",
                "mod_item",
            ],
            Self::C => &[
                "function_definition",
                "struct_specifier",
                "enum_specifier",
                "union_specifier",
                "type_definition",
                "declaration",
            ],
            Self::Cpp => &[
                "function_definition",
                "class_specifier",
                "struct_specifier",
                "enum_specifier",
                "union_specifier",
                "namespace_definition",
                "template_declaration",
                "type_definition",
                "declaration",
            ],
            Self::Go => &[
                "function_declaration",
                "method_declaration",
                "type_declaration",
                "const_declaration",
                "var_declaration",
            ],
            Self::Python => &[
                "function_definition",
                "class_definition",
                "decorated_definition",
            ],
            Self::Zig => &[
                "function_declaration",
                "variable_declaration",
                "test_declaration",
            ],
            Self::Java => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
                "record_declaration",
                "annotation_type_declaration",
            ],
            Self::Scala => &[
                "class_definition",
                "object_definition",
                "trait_definition",
                "enum_definition",
                "function_definition",
                "val_definition",
                "var_definition",
                "type_definition",
            ],
            Self::JavaScript => &[
                "function_declaration",
                "generator_function_declaration",
                "class_declaration",
                "lexical_declaration",
                "variable_declaration",
                "export_statement",
            ],
            Self::TypeScript | Self::Tsx => &[
                "function_declaration",
                "generator_function_declaration",
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "enum_declaration",
                "internal_module",
                "lexical_declaration",
                "variable_declaration",
                "export_statement",
            ],
            Self::Php => &[
                "function_definition",
                "class_declaration",
                "interface_declaration",
                "trait_declaration",
                "enum_declaration",
            ],
            Self::Ruby => &[
                "method",
                "singleton_method",
                "class",
                "module",
                "assignment",
            ],
        }
    }

    /// The subset of top-level kinds that decompose into member
    /// definitions when oversized.
    #[must_use]
    pub fn splittable_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["impl_item", "trait_item", "mod_item"],
            Self::C => &[],
            Self::Cpp => &["class_specifier", "struct_specifier", "namespace_definition"],
            Self::Go => &[],
            Self::Python => &["class_definition"],
            Self::Zig => &["variable_declaration"],
            Self::Java => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
                "record_declaration",
            ],
            Self::Scala => &["class_definition", "object_definition", "trait_definition"],
            Self::JavaScript => &["class_declaration"],
            Self::TypeScript | Self::Tsx => &["class_declaration", "abstract_class_declaration"],
            Self::Php => &[
                "class_declaration",
                "interface_declaration",
                "trait_declaration",
            ],
            Self::Ruby => &["class", "module"],
        }
    }

    /// Resolve a canonical name back to a language.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_LANGS.iter().copied().find(|l| l.id() == name)
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect language from file extension. Unknown extensions are skipped by
/// the scanner.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "rs" => Some(Lang::Rust),
        "c" | "h" => Some(Lang::C),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Lang::Cpp),
        "go" => Some(Lang::Go),
        "py" | "pyi" => Some(Lang::Python),
        "zig" => Some(Lang::Zig),
        "java" => Some(Lang::Java),
        "scala" | "sc" => Some(Lang::Scala),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "ts" | "mts" | "cts" => Some(Lang::TypeScript),
        "tsx" => Some(Lang::Tsx),
        "php" => Some(Lang::Php),
        "rb" => Some(Lang::Ruby),
        _ => None,
    }
}
