//! Core data models used throughout the engine.
//!
//! These types represent the codebases, files, chunks, and search results
//! that flow through the indexing and retrieval pipeline. The data
//! lifecycle is:
//!
//! ```text
//! Scanner → ScannedFile → chunk_file() → Chunk
//!                                          ↓
//!                                  embed_many() → embedding
//!                                          ↓
//!                                    search() → SearchResult
//! ```
//!
//! All cross-entity relations are integer foreign keys inside the store;
//! none of these values holds a reference into another.

use serde::Serialize;

/// A registered root directory under which source files are indexed.
///
/// Created on the first `index(dir)` call for a root path and never
/// deleted by the core. `indexed_at` is advanced at the end of every
/// successful index run.
#[derive(Debug, Clone, Serialize)]
pub struct Codebase {
    /// Monotonic integer id (SQLite rowid).
    pub id: i64,
    /// Absolute root path, unique across the database.
    pub root_path: String,
    /// Human-readable name, defaulting to the last path segment.
    pub name: String,
    /// Wall-clock time of the last successful index run (Unix epoch seconds).
    pub indexed_at: i64,
}

/// One row per source file within a codebase.
///
/// Invariant: `file_hash` is the SHA-256 of the content from which the
/// file's current chunk set was produced.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedFileInfo {
    pub codebase_id: i64,
    /// Absolute file path; unique together with `codebase_id`.
    pub file_path: String,
    /// SHA-256 hex digest of the file content.
    pub file_hash: String,
    /// Number of chunks extracted from this file.
    pub chunk_count: i64,
    /// Unix epoch seconds at which the file was last (re-)chunked.
    pub indexed_at: i64,
}

/// The unit of retrieval: a single top-level definition extracted from a
/// source file.
///
/// The `chunk_key` (`{file_path}:{start_line}:{end_line}`, 1-based
/// inclusive lines) is globally unique and stable across runs as long as
/// the definition does not move.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub chunk_key: String,
    pub file_path: String,
    /// Canonical language name, e.g. `"rust"`.
    pub language: String,
    /// Normalized definition kind (`function`, `struct`, `method`, ...)
    /// or the raw AST kind when no normalization applies.
    pub kind: String,
    /// Best-effort identifier; empty when none could be extracted.
    pub name: String,
    /// First physical line of the definition, trimmed.
    pub signature: String,
    /// Verbatim source text of the definition.
    pub snippet: String,
    pub start_line: i64,
    pub end_line: i64,
    /// SHA-256 hex digest of the source file this chunk came from.
    pub file_hash: String,
}

/// A search result returned from the query engine.
///
/// `score` is mode-dependent: cosine similarity for semantic search,
/// BM25-derived for keyword search, and the fused RRF score for hybrid.
/// `snippet` is empty unless the caller asked for it.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_key: String,
    pub file_path: String,
    pub name: String,
    pub kind: String,
    pub signature: String,
    pub snippet: String,
    pub start_line: i64,
    pub end_line: i64,
    pub score: f64,
}

/// Summary of a single index run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexResult {
    /// Files processed (chunked and persisted) this run.
    pub files: u64,
    /// Chunks created this run.
    pub chunks: u64,
    /// Chunks embedded this run.
    pub embedded: u64,
    /// Files skipped because their content hash was unchanged.
    pub skipped: u64,
    /// Files removed because they disappeared from the scan.
    pub removed: u64,
    /// Non-fatal per-entry errors (unreadable entries, parse failures).
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Aggregate counts over the whole database.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub codebases: i64,
    pub files: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
    pub db_size_bytes: u64,
}
