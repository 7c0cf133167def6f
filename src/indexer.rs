//! Indexing pipeline orchestration.
//!
//! Coordinates the full flow for one `index(dir)` call: scan → hash check
//! → batched chunk/persist/embed → stale-file removal → text-index
//! rebuild → codebase touch. Batching bounds memory regardless of
//! repository size: at most one file batch's chunks are held at a time,
//! and the embedder sees sub-batches of a fixed size.
//!
//! # Pipeline
//!
//! 1. Resolve the directory and ensure the codebase row exists.
//! 2. Scan for candidate files; record every absolute path as active.
//! 3. Partition into unchanged (stored hash matches) and to-process.
//! 4. For each slice of files: chunk (per-file errors are non-fatal),
//!    persist in one transaction, then embed the codebase's stale chunks
//!    in sub-batches, upserting vectors after each embedder call.
//! 5. Remove files that disappeared from the scan.
//! 6. Rebuild the codebase's text index.
//! 7. Advance the codebase timestamp.
//!
//! Chunks for a file are always persisted before that file's embeddings
//! are requested, and the text index is rebuilt only after every chunk of
//! the run is durable. Cancellation between steps leaves committed
//! batches in place; a missing text index is tolerated by the reader.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::chunker::chunk_file;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::languages::Lang;
use crate::models::IndexResult;
use crate::scanner::{scan_directory, ScannedFile};
use crate::store::{EmbeddingUpsert, FileChunks, PendingEmbedding, Store};

/// Options for a single index run.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Restrict the run to these canonical language names.
    pub languages: Option<Vec<String>>,
    /// Log per-file progress at `info` instead of `debug`.
    pub verbose: bool,
}

/// Snippet prefix included in each embedding input.
const EMBED_SNIPPET_CHARS: usize = 500;

pub(crate) async fn run_index(
    store: &Store,
    embedder: &dyn Embedder,
    config: &Config,
    dir: &Path,
    opts: &IndexOptions,
) -> Result<IndexResult> {
    let start = std::time::Instant::now();
    let mut report = IndexResult::default();

    let root = std::fs::canonicalize(dir)
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string());
    let codebase_id = store
        .get_or_create_codebase(&root.to_string_lossy(), &name)
        .await?;

    let language_filter = match &opts.languages {
        Some(names) => {
            let mut set = HashSet::new();
            for name in names {
                match Lang::from_name(name) {
                    Some(lang) => {
                        set.insert(lang);
                    }
                    None => bail!("Unknown language: '{name}'"),
                }
            }
            Some(set)
        }
        None => None,
    };

    let outcome = scan_directory(&root, language_filter.as_ref(), config.indexing.max_file_bytes);
    report.errors.extend(outcome.errors);

    let active_files: HashSet<String> =
        outcome.files.iter().map(|f| f.abs_path.clone()).collect();

    // Hash check: skip files whose stored hash matches current content.
    let mut to_process: Vec<&ScannedFile> = Vec::new();
    for file in &outcome.files {
        match store.get_file_hash(codebase_id, &file.abs_path).await? {
            Some(stored) if stored == file.hash => report.skipped += 1,
            _ => to_process.push(file),
        }
    }

    let total = to_process.len();
    tracing::info!(
        codebase_id,
        total,
        skipped = report.skipped,
        root = %root.display(),
        "indexing started"
    );

    let mut processed = 0usize;
    for batch in to_process.chunks(config.indexing.file_batch_size) {
        let mut payload: Vec<FileChunks> = Vec::with_capacity(batch.len());
        for file in batch {
            processed += 1;
            match chunk_file(
                &file.content,
                &file.abs_path,
                file.language,
                &file.hash,
                config.indexing.max_chunk_lines,
            ) {
                Ok(chunks) => {
                    if opts.verbose {
                        tracing::info!(
                            file = %file.rel_path,
                            progress = format_args!("{processed}/{total}"),
                            chunks = chunks.len(),
                        );
                    } else {
                        tracing::debug!(file = %file.rel_path, chunks = chunks.len());
                    }
                    report.chunks += chunks.len() as u64;
                    payload.push(FileChunks {
                        file_path: file.abs_path.clone(),
                        file_hash: file.hash.clone(),
                        chunks,
                    });
                }
                Err(e) => {
                    report.errors.push(format!("{}: {e:#}", file.rel_path));
                }
            }
        }

        store.batch_upsert_all_file_chunks(codebase_id, &payload).await?;
        report.files += payload.len() as u64;

        report.embedded += embed_stale_chunks(store, embedder, config, codebase_id).await?;
    }

    // Catch-up sweep: chunks left stale by an earlier failed run, or by a
    // model change, re-embed even when no file content changed.
    report.embedded += embed_stale_chunks(store, embedder, config, codebase_id).await?;

    report.removed = store.remove_stale_files(codebase_id, &active_files).await?;
    store.rebuild_fts_table(codebase_id).await?;
    store.touch_codebase(codebase_id).await?;

    report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
    tracing::info!(
        codebase_id,
        files = report.files,
        chunks = report.chunks,
        embedded = report.embedded,
        removed = report.removed,
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "indexing finished"
    );
    Ok(report)
}

/// Embed every stale chunk of the codebase in fixed-size sub-batches,
/// upserting vectors after each embedder call. Embedder failures
/// propagate; vectors from completed sub-batches stay committed.
async fn embed_stale_chunks(
    store: &Store,
    embedder: &dyn Embedder,
    config: &Config,
    codebase_id: i64,
) -> Result<u64> {
    let pending = store
        .get_stale_embeddings(codebase_id, embedder.model_name(), None)
        .await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let mut embedded = 0u64;
    for sub_batch in pending.chunks(config.indexing.embed_batch_size) {
        let texts: Vec<String> = sub_batch.iter().map(build_embedding_input).collect();
        let vectors = embedder.embed_many(&texts).await?;
        if vectors.len() != sub_batch.len() {
            bail!(
                "Embedder returned {} vectors for {} inputs",
                vectors.len(),
                sub_batch.len()
            );
        }

        let upserts: Vec<EmbeddingUpsert> = sub_batch
            .iter()
            .zip(vectors)
            .map(|(item, vector)| EmbeddingUpsert {
                chunk_key: item.chunk_key.clone(),
                vector,
                model: embedder.model_name().to_string(),
            })
            .collect();
        store.batch_upsert_embeddings(&upserts).await?;
        embedded += upserts.len() as u64;
    }

    Ok(embedded)
}

/// Plain-text embedding input for one chunk:
/// `{file_path}[: {kind} {name}]`, the signature, and a snippet prefix,
/// with empty fields omitted.
fn build_embedding_input(chunk: &PendingEmbedding) -> String {
    let mut text = chunk.file_path.clone();

    let label = [chunk.kind.as_str(), chunk.name.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if !label.is_empty() {
        text.push_str(": ");
        text.push_str(&label);
    }

    if !chunk.signature.is_empty() {
        text.push('\n');
        text.push_str(&chunk.signature);
    }

    if !chunk.snippet.is_empty() {
        text.push('\n');
        text.extend(chunk.snippet.chars().take(EMBED_SNIPPET_CHARS));
    }

    text
}
