use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Files chunked and persisted per pipeline batch.
    #[serde(default = "default_file_batch_size")]
    pub file_batch_size: usize,
    /// Chunks sent to the embedder per call.
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
    /// Files larger than this many bytes are skipped by the scanner.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Line span above which a splittable definition is decomposed into
    /// its members.
    #[serde(default = "default_max_chunk_lines")]
    pub max_chunk_lines: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Weight of the full-text list in hybrid rank fusion.
    #[serde(default = "default_text_weight")]
    pub text_weight: f64,
    /// Weight of the vector list in hybrid rank fusion.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            indexing: IndexingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            file_batch_size: default_file_batch_size(),
            embed_batch_size: default_embed_batch_size(),
            max_file_bytes: default_max_file_bytes(),
            max_chunk_lines: default_max_chunk_lines(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            text_weight: default_text_weight(),
            vector_weight: default_vector_weight(),
        }
    }
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("codeseek")
        .join("codeseek.db")
}

fn default_file_batch_size() -> usize {
    200
}
fn default_embed_batch_size() -> usize {
    64
}
fn default_max_file_bytes() -> u64 {
    1_000_000
}
fn default_max_chunk_lines() -> usize {
    150
}
fn default_text_weight() -> f64 {
    0.4
}
fn default_vector_weight() -> f64 {
    0.6
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.indexing.file_batch_size == 0 {
        anyhow::bail!("indexing.file_batch_size must be > 0");
    }
    if config.indexing.embed_batch_size == 0 {
        anyhow::bail!("indexing.embed_batch_size must be > 0");
    }
    if config.indexing.max_chunk_lines == 0 {
        anyhow::bail!("indexing.max_chunk_lines must be > 0");
    }
    if !(0.0..=1.0).contains(&config.retrieval.text_weight) {
        anyhow::bail!("retrieval.text_weight must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.retrieval.vector_weight) {
        anyhow::bail!("retrieval.vector_weight must be in [0.0, 1.0]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.indexing.file_batch_size, 200);
        assert_eq!(config.indexing.embed_batch_size, 64);
        assert_eq!(config.indexing.max_file_bytes, 1_000_000);
        assert_eq!(config.indexing.max_chunk_lines, 150);
        assert!((config.retrieval.text_weight - 0.4).abs() < f64::EPSILON);
        assert!((config.retrieval.vector_weight - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_db_path_under_config_dir() {
        let path = default_db_path();
        let s = path.to_string_lossy();
        assert!(s.contains(".config"), "unexpected path: {}", s);
        assert!(s.ends_with("codeseek.db"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [indexing]
            file_batch_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.indexing.file_batch_size, 50);
        assert_eq!(config.indexing.embed_batch_size, 64);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.indexing.file_batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_weight() {
        let mut config = Config::default();
        config.retrieval.vector_weight = 1.5;
        assert!(validate(&config).is_err());
    }
}
