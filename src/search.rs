//! Search dispatch: semantic, keyword, and hybrid retrieval.
//!
//! - *semantic* embeds the query and runs the global vector search.
//! - *keyword* reduces the query to keywords and runs the per-codebase
//!   text search; a query that is all stop words returns nothing.
//! - *hybrid* runs both and merges them with reciprocal-rank fusion.
//!
//! The score threshold is applied at the very end, after fusion, so it
//! always filters the scores the caller actually receives.

use std::sync::OnceLock;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::fusion::reciprocal_rank_fusion;
use crate::models::SearchResult;
use crate::query::{preprocess, QueryMode};
use crate::store::Store;

/// Which retrieval path a search uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Semantic,
    Keyword,
    Hybrid,
}

/// Options for a single search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum results, 1..=50.
    pub limit: usize,
    /// Minimum score; results below are dropped after fusion.
    pub threshold: f64,
    /// Populate `snippet` on results.
    pub include_snippet: bool,
    pub mode: SearchMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            threshold: 0.0,
            include_snippet: false,
            mode: SearchMode::Semantic,
        }
    }
}

/// Database size above which an all-zero chunk count is suspicious.
const HEALTH_SIZE_THRESHOLD: u64 = 1_000_000;

/// Verdict of the once-per-process health check: `None` is healthy,
/// `Some(message)` fails every subsequent search.
static HEALTH_VERDICT: OnceLock<Option<String>> = OnceLock::new();

pub(crate) async fn run_search(
    store: &Store,
    embedder: &dyn Embedder,
    config: &Config,
    query: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    if !(1..=50).contains(&opts.limit) {
        bail!("limit must be between 1 and 50, got {}", opts.limit);
    }
    if !(0.0..=1.0).contains(&opts.threshold) {
        bail!("threshold must be in [0.0, 1.0], got {}", opts.threshold);
    }

    ensure_searchable(store, config).await?;

    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut results = match opts.mode {
        SearchMode::Semantic => semantic_search(store, embedder, query, opts).await?,
        SearchMode::Keyword => keyword_search(store, query, opts).await?,
        SearchMode::Hybrid => {
            let text = keyword_search(store, query, opts).await?;
            let vector = semantic_search(store, embedder, query, opts).await?;
            reciprocal_rank_fusion(
                text,
                vector,
                config.retrieval.text_weight,
                config.retrieval.vector_weight,
                opts.limit,
            )
        }
    };

    results.retain(|r| r.score >= opts.threshold);
    Ok(results)
}

async fn semantic_search(
    store: &Store,
    embedder: &dyn Embedder,
    query: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let vectors = embedder.embed_many(&[query.to_string()]).await?;
    let query_vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response for query"))?;
    store
        .vector_search(&query_vector, opts.limit, opts.include_snippet)
        .await
}

async fn keyword_search(
    store: &Store,
    query: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let keywords = preprocess(query, QueryMode::Keywords);
    if keywords.is_empty() {
        return Ok(Vec::new());
    }
    store
        .fts_search(&keywords, opts.limit, opts.include_snippet)
        .await
}

/// Run the health check exactly once per process; reuse the verdict on
/// every later search.
async fn ensure_searchable(store: &Store, config: &Config) -> Result<()> {
    if HEALTH_VERDICT.get().is_none() {
        let verdict = health_verdict(store, config).await?;
        let _ = HEALTH_VERDICT.set(verdict);
    }
    if let Some(message) = HEALTH_VERDICT.get().and_then(|v| v.as_deref()) {
        bail!("{message}");
    }
    Ok(())
}

/// A sizeable database with registered codebases but zero indexed chunks
/// means the writer's tables are not visible to this reader.
pub(crate) async fn health_verdict(store: &Store, config: &Config) -> Result<Option<String>> {
    let db_size = std::fs::metadata(&config.db.path).map(|m| m.len()).unwrap_or(0);
    if db_size <= HEALTH_SIZE_THRESHOLD {
        return Ok(None);
    }
    if store.count_codebases().await? == 0 {
        return Ok(None);
    }
    if store.sum_indexed_chunk_counts().await? > 0 {
        return Ok(None);
    }

    Ok(Some(format!(
        "database is unsearchable: {db_size} bytes on disk with registered codebases but zero \
         indexed chunks; likely a concurrent writer holds the lock or the write-ahead log is \
         inaccessible"
    )))
}
