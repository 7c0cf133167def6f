//! Database schema migrations.
//!
//! Creates all required tables and ensures idempotent execution.
//!
//! # Schema
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌───────────────┐
//! │  codebases   │──┐  │    chunks     │     │ indexed_files │
//! │              │  │  │               │     │               │
//! │ id (PK)      │  ├──│ codebase_id   │  ┌──│ codebase_id   │
//! │ root_path    │  │  │ chunk_key (U) │  │  │ file_path     │
//! │ name         │  └──┼───────────────┼──┘  │ file_hash     │
//! │ indexed_at   │     │ embedding     │     │ chunk_count   │
//! └──────────────┘     │ embedding_model     │ indexed_at    │
//!                      └───────────────┘     └───────────────┘
//!
//! fts_{codebase_id}  — one FTS5 table per codebase over (name, signature),
//!                      owned by the store's rebuild operation, not by
//!                      migrations.
//! ```
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `codebases` | Registered root directories |
//! | `chunks` | Top-level definitions with optional quantized embeddings |
//! | `indexed_files` | Per-file content hashes for incremental change detection |
//!
//! All operations use `CREATE TABLE IF NOT EXISTS`; running migrations
//! multiple times is safe.

use anyhow::Result;
use sqlx::SqlitePool;

/// Run all database migrations.
///
/// # Errors
///
/// Returns an error if any SQL statement cannot be executed.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS codebases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            root_path TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            indexed_at INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codebase_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            chunk_key TEXT NOT NULL UNIQUE,
            language TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            signature TEXT NOT NULL DEFAULT '',
            snippet TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            file_hash TEXT NOT NULL,
            indexed_at INTEGER NOT NULL,
            embedding BLOB,
            embedding_model TEXT,
            FOREIGN KEY (codebase_id) REFERENCES codebases(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indexed_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codebase_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            chunk_count INTEGER NOT NULL,
            indexed_at INTEGER NOT NULL,
            UNIQUE(codebase_id, file_path),
            FOREIGN KEY (codebase_id) REFERENCES codebases(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the common query patterns
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_codebase_file ON chunks(codebase_id, file_path)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_embedding_model ON chunks(codebase_id, embedding_model)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_indexed_files_codebase ON indexed_files(codebase_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = db::connect_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'chunks'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }
}
