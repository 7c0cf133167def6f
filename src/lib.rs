//! # codeseek
//!
//! **A local, embedded code-search engine for AI coding agents.**
//!
//! Given a directory of source code, codeseek builds a persistent index
//! supporting natural-language semantic search (dense vector embeddings),
//! precise identifier lookup (full-text search), and a hybrid of the two.
//! Indexing is incremental: only files whose content hash changed are
//! re-parsed and re-embedded. Many codebases share one SQLite database
//! with isolated per-codebase text indices and a globally searchable
//! vector space.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────────┐
//! │ Scanner  │──▶│ Chunker  │──▶│    SQLite      │
//! │ walk+hash│   │tree-sitter│  │ FTS5 + vectors │
//! └──────────┘   └──────────┘   └──────┬────────┘
//!                      ▲               │
//!                ┌─────┴────┐   ┌──────▼────────┐
//!                │ Embedder │   │ semantic /    │
//!                │ (caller) │   │ keyword /     │
//!                └──────────┘   │ hybrid search │
//!                               └───────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **scanner** walks a directory, applies ignore rules, and hashes
//!    every candidate file ([`scanner`]).
//! 2. The **chunker** parses changed files with tree-sitter and emits one
//!    chunk per top-level definition ([`chunker`], [`languages`]).
//! 3. The **store** persists chunks in batched transactions and rebuilds
//!    the codebase's FTS5 text index ([`store`]).
//! 4. Stale chunks are embedded through the caller-supplied [`Embedder`]
//!    and stored as 8-bit-quantized vectors ([`embedding`]).
//! 5. Queries run through the **search** dispatch: vector distance,
//!    BM25 text match, or reciprocal-rank fusion of both ([`search`],
//!    [`query`], [`fusion`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codeseek::{Config, IndexOptions, SearchEngine, SearchMode, SearchOptions};
//!
//! # struct MyEmbedder;
//! # #[async_trait::async_trait]
//! # impl codeseek::Embedder for MyEmbedder {
//! #     fn model_name(&self) -> &str { "my-model" }
//! #     fn dims(&self) -> usize { 384 }
//! #     async fn embed_many(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
//! #         Ok(texts.iter().map(|_| vec![0.0; 384]).collect())
//! #     }
//! # }
//! # async fn example() -> anyhow::Result<()> {
//! let engine = SearchEngine::open(Config::default(), Arc::new(MyEmbedder)).await?;
//! engine.index("/path/to/repo", IndexOptions::default()).await?;
//! let hits = engine
//!     .search("where is the retry logic", SearchOptions {
//!         mode: SearchMode::Hybrid,
//!         ..Default::default()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Search Modes
//!
//! | Mode | Engine | Requires Embedder Call |
//! |------|--------|------------------------|
//! | `keyword` | SQLite FTS5 (weighted BM25) | No |
//! | `semantic` | Cosine distance over quantized vectors | Yes |
//! | `hybrid` | Reciprocal-rank fusion of both | Yes |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with defaults and validation |
//! | [`models`] | Core data types: `Codebase`, `Chunk`, `SearchResult`, ... |
//! | [`languages`] | Language registry: extensions, grammars, chunk-boundary node kinds |
//! | [`scanner`] | Directory walk, ignore rules, content hashing |
//! | [`chunker`] | tree-sitter chunking with oversize splitting and name extraction |
//! | [`store`] | SQLite persistence, per-codebase FTS5 tables, vector search |
//! | [`embedding`] | Embedder capability trait and vector quantization |
//! | [`query`] | Keyword extraction for the text-search path |
//! | [`fusion`] | Reciprocal-rank fusion |
//! | [`indexer`] | The batched `index(dir)` pipeline |
//! | [`search`] | Mode dispatch, threshold filter, health check |
//! | [`engine`] | The `SearchEngine` facade |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema migrations (idempotent) |

pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod fusion;
pub mod indexer;
pub mod languages;
pub mod migrate;
pub mod models;
pub mod query;
pub mod scanner;
pub mod search;
pub mod store;

pub use config::Config;
pub use embedding::Embedder;
pub use engine::SearchEngine;
pub use indexer::IndexOptions;
pub use models::{Chunk, Codebase, IndexResult, IndexStats, IndexedFileInfo, SearchResult};
pub use search::{SearchMode, SearchOptions};
