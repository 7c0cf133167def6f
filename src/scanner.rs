use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::languages::{detect_language, Lang};

/// Directory names never descended into, regardless of `.gitignore`.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "build",
    "dist",
    ".next",
    "__pycache__",
    ".tox",
    ".venv",
    "venv",
    ".mypy_cache",
    ".cargo",
    ".rustup",
];

/// A candidate source file produced by the scanner.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub abs_path: String,
    pub rel_path: String,
    pub language: Lang,
    /// SHA-256 hex digest of the file's raw bytes.
    pub hash: String,
    pub content: String,
}

/// Result of a directory scan: accepted files plus non-fatal errors.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub errors: Vec<String>,
}

/// Walk `root` recursively and collect every indexable source file.
///
/// Filters: hidden entries (leading dot, except the root itself), the
/// hard-coded ignore list, simple directory-name patterns from the root
/// `.gitignore`, unknown extensions, empty files, and files larger than
/// `max_file_bytes`. Unreadable entries never abort the scan; they are
/// accumulated into [`ScanOutcome::errors`].
pub fn scan_directory(
    root: &Path,
    language_filter: Option<&HashSet<Lang>>,
    max_file_bytes: u64,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let gitignore_dirs = load_gitignore_dirs(root);

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return false;
        }
        if entry.file_type().is_dir() {
            return !IGNORED_DIRS.contains(&name.as_ref()) && !gitignore_dirs.contains(name.as_ref());
        }
        true
    });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                outcome.errors.push(format!("scan: {e}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(language) = detect_language(path) else {
            continue;
        };
        if let Some(filter) = language_filter {
            if !filter.contains(&language) {
                continue;
            }
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                outcome.errors.push(format!("{}: {e}", path.display()));
                continue;
            }
        };
        if size == 0 || size > max_file_bytes {
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                outcome.errors.push(format!("{}: {e}", path.display()));
                continue;
            }
        };
        let hash = sha256_hex(&bytes);
        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(_) => {
                outcome
                    .errors
                    .push(format!("{}: not valid UTF-8", path.display()));
                continue;
            }
        };

        let rel_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        outcome.files.push(ScannedFile {
            abs_path: path.to_string_lossy().to_string(),
            rel_path,
            language,
            hash,
            content,
        });
    }

    // Sort for deterministic ordering
    outcome.files.sort_by(|a, b| a.abs_path.cmp(&b.abs_path));

    tracing::debug!(
        files = outcome.files.len(),
        errors = outcome.errors.len(),
        root = %root.display(),
        "scan complete"
    );

    outcome
}

/// SHA-256 hex digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Collect simple directory-name patterns from the `.gitignore` at the
/// scan root. A pattern qualifies when it has no wildcards and no path
/// separators; a trailing slash is allowed. Anything more elaborate is
/// ignored here.
fn load_gitignore_dirs(root: &Path) -> HashSet<String> {
    let mut dirs = HashSet::new();
    let Ok(content) = std::fs::read_to_string(root.join(".gitignore")) else {
        return dirs;
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let name = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if name.is_empty()
            || name
                .chars()
                .any(|c| matches!(c, '*' | '?' | '[' | ']' | '!' | '/' | '\\'))
        {
            continue;
        }
        dirs.insert(name.to_string());
    }
    dirs
}
