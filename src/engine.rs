//! The `SearchEngine` facade: one handle owning the store, the injected
//! embedder, and the configuration. Front-ends (CLI, agent-tool
//! protocols) call these methods and format the returned plain data.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{self, Config};
use crate::db;
use crate::embedding::Embedder;
use crate::indexer::{run_index, IndexOptions};
use crate::migrate;
use crate::models::{Chunk, Codebase, IndexResult, IndexStats, IndexedFileInfo, SearchResult};
use crate::search::{run_search, SearchOptions};
use crate::store::Store;

pub struct SearchEngine {
    store: Store,
    embedder: Arc<dyn Embedder>,
    config: Config,
}

impl SearchEngine {
    /// Open (or create) the database at the configured path and prepare
    /// the schema.
    pub async fn open(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config::validate(&config)?;
        let pool = db::connect(&config.db.path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            store: Store::new(pool),
            embedder,
            config,
        })
    }

    /// Index (or incrementally re-index) a directory of source code.
    pub async fn index(&self, dir: impl AsRef<Path>, opts: IndexOptions) -> Result<IndexResult> {
        run_index(
            &self.store,
            self.embedder.as_ref(),
            &self.config,
            dir.as_ref(),
            &opts,
        )
        .await
    }

    /// Search every indexed codebase.
    pub async fn search(&self, query: &str, opts: SearchOptions) -> Result<Vec<SearchResult>> {
        run_search(
            &self.store,
            self.embedder.as_ref(),
            &self.config,
            query,
            &opts,
        )
        .await
    }

    pub async fn list_codebases(&self) -> Result<Vec<Codebase>> {
        self.store.list_codebases().await
    }

    /// Indexed files, optionally restricted to one codebase.
    pub async fn list_files(&self, codebase_id: Option<i64>) -> Result<Vec<IndexedFileInfo>> {
        self.store.list_files(codebase_id).await
    }

    /// Full chunk row for a chunk key, e.g. to expand a search hit's
    /// snippet.
    pub async fn get_chunk(&self, chunk_key: &str) -> Result<Option<Chunk>> {
        self.store.get_chunk(chunk_key).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        let db_size_bytes = std::fs::metadata(&self.config.db.path)
            .map(|m| m.len())
            .unwrap_or(0);
        Ok(IndexStats {
            codebases: self.store.count_codebases().await?,
            files: self.store.count_files().await?,
            chunks: self.store.count_chunks().await?,
            embedded_chunks: self.store.count_embedded_chunks().await?,
            db_size_bytes,
        })
    }

    /// Close the underlying connection pool. Further calls will fail.
    pub async fn close(self) {
        self.store.close().await;
    }
}
