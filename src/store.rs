//! SQLite persistence for codebases, files, chunks, and embeddings.
//!
//! Owns every mutation of on-disk state. All multi-row writes run inside a
//! single transaction so that cancellation at any batch boundary leaves
//! the database consistent: a batch is either fully committed or fully
//! rolled back.
//!
//! Text search uses one FTS5 table per codebase (`fts_{codebase_id}`)
//! over the weighted `(name, signature)` columns. The tables are rebuilt
//! wholesale after each index run, never patched; readers treat a missing
//! table as an empty result set. Vector search scans the quantized
//! embedding BLOBs on the `chunks` table and ranks by cosine distance
//! in-process.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::embedding::{cosine_distance, dequantize_vector, quantize_vector};
use crate::models::{Chunk, Codebase, IndexedFileInfo, SearchResult};

/// Per-column BM25 weights for the text index.
const FTS_NAME_WEIGHT: f64 = 5.0;
const FTS_SIGNATURE_WEIGHT: f64 = 3.0;

pub struct Store {
    pool: SqlitePool,
}

/// All chunks extracted from one file, persisted as a unit.
pub struct FileChunks {
    pub file_path: String,
    pub file_hash: String,
    pub chunks: Vec<Chunk>,
}

/// A chunk whose embedding is absent or was produced by another model.
#[derive(Debug, Clone)]
pub struct PendingEmbedding {
    pub chunk_key: String,
    pub name: String,
    pub signature: String,
    pub file_path: String,
    pub kind: String,
    pub snippet: String,
}

/// One vector ready for storage.
pub struct EmbeddingUpsert {
    pub chunk_key: String,
    pub vector: Vec<f32>,
    pub model: String,
}

fn fts_table(codebase_id: i64) -> String {
    format!("fts_{codebase_id}")
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a codebase root, returning its id. Idempotent.
    pub async fn get_or_create_codebase(&self, root_path: &str, name: &str) -> Result<i64> {
        sqlx::query(
            "INSERT INTO codebases (root_path, name, indexed_at) VALUES (?, ?, 0)
             ON CONFLICT(root_path) DO NOTHING",
        )
        .bind(root_path)
        .bind(name)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM codebases WHERE root_path = ?")
            .bind(root_path)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Advance the codebase's last-indexed timestamp.
    pub async fn touch_codebase(&self, codebase_id: i64) -> Result<()> {
        sqlx::query("UPDATE codebases SET indexed_at = ? WHERE id = ?")
            .bind(now_ts())
            .bind(codebase_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stored content hash for a file, or `None` if the file is new.
    pub async fn get_file_hash(&self, codebase_id: i64, file_path: &str) -> Result<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar(
            "SELECT file_hash FROM indexed_files WHERE codebase_id = ? AND file_path = ?",
        )
        .bind(codebase_id)
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    /// Atomically replace the chunk sets of a batch of files.
    ///
    /// For each file: delete its existing chunks, insert the new set
    /// (a `chunk_key` conflict updates the row and clears its embedding),
    /// and upsert the `indexed_files` row with the new hash and count.
    /// Runs in one transaction.
    pub async fn batch_upsert_all_file_chunks(
        &self,
        codebase_id: i64,
        files: &[FileChunks],
    ) -> Result<()> {
        let now = now_ts();
        let mut tx = self.pool.begin().await?;

        for file in files {
            sqlx::query("DELETE FROM chunks WHERE codebase_id = ? AND file_path = ?")
                .bind(codebase_id)
                .bind(&file.file_path)
                .execute(&mut *tx)
                .await?;

            for chunk in &file.chunks {
                sqlx::query(
                    r#"
                    INSERT INTO chunks (codebase_id, file_path, chunk_key, language, kind,
                                        name, signature, snippet, start_line, end_line,
                                        file_hash, indexed_at, embedding, embedding_model)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL)
                    ON CONFLICT(chunk_key) DO UPDATE SET
                        codebase_id = excluded.codebase_id,
                        file_path = excluded.file_path,
                        language = excluded.language,
                        kind = excluded.kind,
                        name = excluded.name,
                        signature = excluded.signature,
                        snippet = excluded.snippet,
                        start_line = excluded.start_line,
                        end_line = excluded.end_line,
                        file_hash = excluded.file_hash,
                        indexed_at = excluded.indexed_at,
                        embedding = NULL,
                        embedding_model = NULL
                    "#,
                )
                .bind(codebase_id)
                .bind(&chunk.file_path)
                .bind(&chunk.chunk_key)
                .bind(&chunk.language)
                .bind(&chunk.kind)
                .bind(&chunk.name)
                .bind(&chunk.signature)
                .bind(&chunk.snippet)
                .bind(chunk.start_line)
                .bind(chunk.end_line)
                .bind(&chunk.file_hash)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                r#"
                INSERT INTO indexed_files (codebase_id, file_path, file_hash, chunk_count, indexed_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(codebase_id, file_path) DO UPDATE SET
                    file_hash = excluded.file_hash,
                    chunk_count = excluded.chunk_count,
                    indexed_at = excluded.indexed_at
                "#,
            )
            .bind(codebase_id)
            .bind(&file.file_path)
            .bind(&file.file_hash)
            .bind(file.chunks.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove every stored file (and its chunks) not present in
    /// `active_files`. Returns the number of files removed.
    pub async fn remove_stale_files(
        &self,
        codebase_id: i64,
        active_files: &HashSet<String>,
    ) -> Result<u64> {
        let stored: Vec<String> =
            sqlx::query_scalar("SELECT file_path FROM indexed_files WHERE codebase_id = ?")
                .bind(codebase_id)
                .fetch_all(&self.pool)
                .await?;

        let stale: Vec<&String> = stored
            .iter()
            .filter(|path| !active_files.contains(*path))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for path in &stale {
            sqlx::query("DELETE FROM chunks WHERE codebase_id = ? AND file_path = ?")
                .bind(codebase_id)
                .bind(path)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM indexed_files WHERE codebase_id = ? AND file_path = ?")
                .bind(codebase_id)
                .bind(path)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(codebase_id, removed = stale.len(), "stale files removed");
        Ok(stale.len() as u64)
    }

    /// Chunks in the codebase whose embedding is absent or was produced by
    /// a model other than `model_name`.
    pub async fn get_stale_embeddings(
        &self,
        codebase_id: i64,
        model_name: &str,
        limit: Option<i64>,
    ) -> Result<Vec<PendingEmbedding>> {
        let mut sql = String::from(
            "SELECT chunk_key, name, signature, file_path, kind, snippet
             FROM chunks
             WHERE codebase_id = ?
               AND (embedding IS NULL OR embedding_model IS NULL OR embedding_model != ?)
             ORDER BY id",
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(codebase_id).bind(model_name);
        if let Some(n) = limit {
            query = query.bind(n);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| PendingEmbedding {
                chunk_key: row.get("chunk_key"),
                name: row.get("name"),
                signature: row.get("signature"),
                file_path: row.get("file_path"),
                kind: row.get("kind"),
                snippet: row.get("snippet"),
            })
            .collect())
    }

    /// Store a batch of vectors, 8-bit quantized, in one transaction.
    pub async fn batch_upsert_embeddings(&self, items: &[EmbeddingUpsert]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            let blob = quantize_vector(&item.vector);
            sqlx::query("UPDATE chunks SET embedding = ?, embedding_model = ? WHERE chunk_key = ?")
                .bind(&blob)
                .bind(&item.model)
                .bind(&item.chunk_key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Drop and recreate the codebase's text index from its current chunk
    /// set, then ask FTS5 to optimize. Atomic from the reader's
    /// perspective; readers tolerate the table being absent entirely.
    pub async fn rebuild_fts_table(&self, codebase_id: i64) -> Result<()> {
        let table = fts_table(codebase_id);
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE VIRTUAL TABLE {table} USING fts5(name, signature, chunk_id UNINDEXED)"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "INSERT INTO {table} (name, signature, chunk_id)
             SELECT name, signature, id FROM chunks WHERE codebase_id = ?"
        ))
        .bind(codebase_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("INSERT INTO {table}({table}) VALUES('optimize')"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(codebase_id, "fts table rebuilt");
        Ok(())
    }

    /// Global vector search across all codebases.
    ///
    /// Orders by ascending cosine distance over the dequantized vectors
    /// and reports `score = 1 − distance`. Chunks without an embedding are
    /// not searchable.
    pub async fn vector_search(
        &self,
        query_vector: &[f32],
        limit: usize,
        include_snippet: bool,
    ) -> Result<Vec<SearchResult>> {
        let rows = sqlx::query(
            "SELECT chunk_key, file_path, name, kind, signature, snippet,
                    start_line, end_line, embedding
             FROM chunks WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, SearchResult)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = dequantize_vector(&blob);
                let distance = cosine_distance(query_vector, &vector);
                let result = SearchResult {
                    chunk_key: row.get("chunk_key"),
                    file_path: row.get("file_path"),
                    name: row.get("name"),
                    kind: row.get("kind"),
                    signature: row.get("signature"),
                    snippet: if include_snippet {
                        row.get("snippet")
                    } else {
                        String::new()
                    },
                    start_line: row.get("start_line"),
                    end_line: row.get("end_line"),
                    score: f64::from(1.0 - distance),
                };
                (distance, result)
            })
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, r)| r).collect())
    }

    /// Full-text search across every codebase's text index.
    ///
    /// Runs one BM25-ranked query per codebase, dereferences matches to
    /// chunk rows, merges all results, and truncates to `limit`. Codebases
    /// whose text table does not exist (never indexed, or a rebuild was
    /// cancelled) silently contribute nothing.
    pub async fn fts_search(
        &self,
        query_string: &str,
        limit: usize,
        include_snippet: bool,
    ) -> Result<Vec<SearchResult>> {
        let match_expr = build_match_expr(query_string);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let codebase_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM codebases")
            .fetch_all(&self.pool)
            .await?;

        let mut results: Vec<SearchResult> = Vec::new();
        for codebase_id in codebase_ids {
            let table = fts_table(codebase_id);
            if !self.table_exists(&table).await? {
                continue;
            }

            let sql = format!(
                "SELECT c.chunk_key, c.file_path, c.name, c.kind, c.signature, c.snippet,
                        c.start_line, c.end_line,
                        bm25({table}, {FTS_NAME_WEIGHT}, {FTS_SIGNATURE_WEIGHT}) AS bm25_score
                 FROM {table}
                 JOIN chunks c ON c.id = {table}.chunk_id
                 WHERE {table} MATCH ?
                 ORDER BY bm25_score
                 LIMIT ?"
            );

            let rows = sqlx::query(&sql)
                .bind(&match_expr)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;

            for row in &rows {
                let bm25: f64 = row.get("bm25_score");
                results.push(SearchResult {
                    chunk_key: row.get("chunk_key"),
                    file_path: row.get("file_path"),
                    name: row.get("name"),
                    kind: row.get("kind"),
                    signature: row.get("signature"),
                    snippet: if include_snippet {
                        row.get("snippet")
                    } else {
                        String::new()
                    },
                    start_line: row.get("start_line"),
                    end_line: row.get("end_line"),
                    // FTS5 bm25 is lower-is-better and negative; negate so
                    // higher means more relevant.
                    score: -bm25,
                });
            }
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    pub async fn list_codebases(&self) -> Result<Vec<Codebase>> {
        let rows = sqlx::query("SELECT id, root_path, name, indexed_at FROM codebases ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Codebase {
                id: row.get("id"),
                root_path: row.get("root_path"),
                name: row.get("name"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }

    pub async fn list_files(&self, codebase_id: Option<i64>) -> Result<Vec<IndexedFileInfo>> {
        let sql = match codebase_id {
            Some(_) => {
                "SELECT codebase_id, file_path, file_hash, chunk_count, indexed_at
                 FROM indexed_files WHERE codebase_id = ? ORDER BY file_path"
            }
            None => {
                "SELECT codebase_id, file_path, file_hash, chunk_count, indexed_at
                 FROM indexed_files ORDER BY codebase_id, file_path"
            }
        };
        let mut query = sqlx::query(sql);
        if let Some(id) = codebase_id {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| IndexedFileInfo {
                codebase_id: row.get("codebase_id"),
                file_path: row.get("file_path"),
                file_hash: row.get("file_hash"),
                chunk_count: row.get("chunk_count"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }

    pub async fn get_chunk(&self, chunk_key: &str) -> Result<Option<Chunk>> {
        let row = sqlx::query(
            "SELECT chunk_key, file_path, language, kind, name, signature, snippet,
                    start_line, end_line, file_hash
             FROM chunks WHERE chunk_key = ?",
        )
        .bind(chunk_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Chunk {
            chunk_key: row.get("chunk_key"),
            file_path: row.get("file_path"),
            language: row.get("language"),
            kind: row.get("kind"),
            name: row.get("name"),
            signature: row.get("signature"),
            snippet: row.get("snippet"),
            start_line: row.get("start_line"),
            end_line: row.get("end_line"),
            file_hash: row.get("file_hash"),
        }))
    }

    pub async fn count_embedded_chunks(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count_codebases(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM codebases")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_files(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM indexed_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_chunks(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of `indexed_files.chunk_count` across all codebases; the
    /// search health check compares this against the database size.
    pub async fn sum_indexed_chunk_counts(&self) -> Result<i64> {
        let sum: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(chunk_count), 0) FROM indexed_files")
                .fetch_one(&self.pool)
                .await?;
        Ok(sum)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Build an FTS5 MATCH expression from a whitespace-separated token
/// string. Each token is quoted so punctuation-bearing identifiers are
/// matched as phrases rather than parsed as operators; tokens are
/// OR-joined so BM25 ranks multi-term coverage instead of requiring it.
fn build_match_expr(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "")))
        .filter(|t| t.len() > 2)
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;

    async fn setup_store() -> Store {
        let pool = db::connect_memory().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        Store::new(pool)
    }

    fn make_chunk(file: &str, start: i64, end: i64, name: &str) -> Chunk {
        Chunk {
            chunk_key: format!("{file}:{start}:{end}"),
            file_path: file.to_string(),
            language: "rust".to_string(),
            kind: "function".to_string(),
            name: name.to_string(),
            signature: format!("fn {name}()"),
            snippet: format!("fn {name}() {{}}"),
            start_line: start,
            end_line: end,
            file_hash: "hash0".to_string(),
        }
    }

    fn file_batch(file: &str, hash: &str, chunks: Vec<Chunk>) -> Vec<FileChunks> {
        vec![FileChunks {
            file_path: file.to_string(),
            file_hash: hash.to_string(),
            chunks,
        }]
    }

    #[tokio::test]
    async fn test_get_or_create_codebase_idempotent() {
        let store = setup_store().await;
        let a = store.get_or_create_codebase("/repo", "repo").await.unwrap();
        let b = store.get_or_create_codebase("/repo", "repo").await.unwrap();
        assert_eq!(a, b);
        let other = store
            .get_or_create_codebase("/other", "other")
            .await
            .unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn test_file_hash_roundtrip() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        assert!(store.get_file_hash(cb, "/repo/a.rs").await.unwrap().is_none());

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "alpha")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();

        assert_eq!(
            store.get_file_hash(cb, "/repo/a.rs").await.unwrap().as_deref(),
            Some("h1")
        );
    }

    #[tokio::test]
    async fn test_rechunk_clears_embedding() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "alpha")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks.clone()))
            .await
            .unwrap();
        store
            .batch_upsert_embeddings(&[EmbeddingUpsert {
                chunk_key: "/repo/a.rs:1:3".to_string(),
                vector: vec![1.0, 0.0],
                model: "m1".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(store.count_embedded_chunks().await.unwrap(), 1);

        // Re-chunking the same file must clear the embedding even when the
        // chunk key collides.
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h2", chunks))
            .await
            .unwrap();
        assert_eq!(store.count_embedded_chunks().await.unwrap(), 0);

        let stale = store.get_stale_embeddings(cb, "m1", None).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].chunk_key, "/repo/a.rs:1:3");
    }

    #[tokio::test]
    async fn test_stale_embeddings_on_model_switch() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "alpha")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();
        store
            .batch_upsert_embeddings(&[EmbeddingUpsert {
                chunk_key: "/repo/a.rs:1:3".to_string(),
                vector: vec![1.0, 0.0],
                model: "model-a".to_string(),
            }])
            .await
            .unwrap();

        assert!(store
            .get_stale_embeddings(cb, "model-a", None)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .get_stale_embeddings(cb, "model-b", None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_remove_stale_files() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        for file in ["/repo/a.rs", "/repo/b.rs"] {
            let chunks = vec![make_chunk(file, 1, 3, "f")];
            store
                .batch_upsert_all_file_chunks(cb, &file_batch(file, "h", chunks))
                .await
                .unwrap();
        }

        let mut active = HashSet::new();
        active.insert("/repo/a.rs".to_string());
        let removed = store.remove_stale_files(cb, &active).await.unwrap();
        assert_eq!(removed, 1);

        let files = store.list_files(Some(cb)).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_path, "/repo/a.rs");
        assert_eq!(store.count_chunks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fts_rebuild_and_search() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![
            make_chunk("/repo/a.rs", 1, 3, "parse_config"),
            make_chunk("/repo/a.rs", 5, 8, "render_output"),
        ];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();
        store.rebuild_fts_table(cb).await.unwrap();

        let results = store.fts_search("parse_config", 10, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "parse_config");
        assert!(results[0].score > 0.0);
        assert!(results[0].snippet.is_empty());

        let with_snippet = store.fts_search("parse_config", 10, true).await.unwrap();
        assert!(!with_snippet[0].snippet.is_empty());
    }

    #[tokio::test]
    async fn test_fts_search_tolerates_missing_table() {
        let store = setup_store().await;
        store.get_or_create_codebase("/repo", "repo").await.unwrap();

        // No rebuild has happened; the reader must see an empty result.
        let results = store.fts_search("anything", 10, false).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fts_rebuild_replaces_prior_contents() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "old_name")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();
        store.rebuild_fts_table(cb).await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "new_name")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h2", chunks))
            .await
            .unwrap();
        store.rebuild_fts_table(cb).await.unwrap();

        assert!(store.fts_search("old_name", 10, false).await.unwrap().is_empty());
        assert_eq!(store.fts_search("new_name", 10, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_distance() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![
            make_chunk("/repo/a.rs", 1, 3, "near"),
            make_chunk("/repo/a.rs", 5, 8, "far"),
        ];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();
        store
            .batch_upsert_embeddings(&[
                EmbeddingUpsert {
                    chunk_key: "/repo/a.rs:1:3".to_string(),
                    vector: vec![1.0, 0.0],
                    model: "m".to_string(),
                },
                EmbeddingUpsert {
                    chunk_key: "/repo/a.rs:5:8".to_string(),
                    vector: vec![0.0, 1.0],
                    model: "m".to_string(),
                },
            ])
            .await
            .unwrap();

        let results = store.vector_search(&[1.0, 0.0], 10, false).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "near");
        assert!(results[0].score > results[1].score);
        assert!((results[0].score - 1.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_vector_search_skips_unembedded_chunks() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "alpha")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();

        let results = store.vector_search(&[1.0, 0.0], 10, false).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_get_chunk_by_key() {
        let store = setup_store().await;
        let cb = store.get_or_create_codebase("/repo", "repo").await.unwrap();

        let chunks = vec![make_chunk("/repo/a.rs", 1, 3, "alpha")];
        store
            .batch_upsert_all_file_chunks(cb, &file_batch("/repo/a.rs", "h1", chunks))
            .await
            .unwrap();

        let chunk = store.get_chunk("/repo/a.rs:1:3").await.unwrap().unwrap();
        assert_eq!(chunk.name, "alpha");
        assert!(store.get_chunk("/missing:1:1").await.unwrap().is_none());
    }

    #[test]
    fn test_build_match_expr_quotes_and_joins() {
        assert_eq!(build_match_expr("foo bar"), "\"foo\" OR \"bar\"");
        assert_eq!(build_match_expr("retry-loop"), "\"retry-loop\"");
        assert_eq!(build_match_expr(""), "");
    }
}
