//! Embedder capability and vector utilities.
//!
//! The embedding function itself is caller-supplied: anything implementing
//! [`Embedder`] can back semantic search — a local ONNX model, an HTTP
//! API, or a deterministic fake in tests. The engine stores the model name
//! alongside every vector so a model change is detected as staleness.
//!
//! Also provides the vector helpers used by the store:
//! - [`quantize_vector`] — encode an `f32` vector as a scale-prefixed
//!   8-bit BLOB for SQLite storage
//! - [`dequantize_vector`] — decode the BLOB back into a `Vec<f32>`
//! - [`cosine_similarity`] / [`cosine_distance`] — similarity scoring

use anyhow::Result;
use async_trait::async_trait;

/// Capability trait for embedding providers.
///
/// Implementations must return one vector per input text, in input order,
/// all with the same dimensionality for a given model. Shape violations
/// are the only errors this boundary is expected to produce; the indexer
/// propagates them without partial commit.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier stored per embedding (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts. Same-order, equal-length output.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Encode a float vector as a scale-prefixed 8-bit BLOB.
///
/// Layout: 4 bytes little-endian `f32` scale, then one `i8` per
/// dimension, where `value ≈ scale × i8`. The scale is `max|v| / 127`, so
/// the quantized range covers the vector's full magnitude.
///
/// # Example
///
/// ```rust
/// use codeseek::embedding::{quantize_vector, dequantize_vector};
///
/// let v = vec![1.0f32, -0.5, 0.25];
/// let blob = quantize_vector(&v);
/// assert_eq!(blob.len(), 4 + 3);
/// let restored = dequantize_vector(&blob);
/// assert!((restored[0] - 1.0).abs() < 0.02);
/// ```
pub fn quantize_vector(vec: &[f32]) -> Vec<u8> {
    let max_abs = vec.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };

    let mut bytes = Vec::with_capacity(4 + vec.len());
    bytes.extend_from_slice(&scale.to_le_bytes());
    for &v in vec {
        let q = (v / scale).round().clamp(-127.0, 127.0) as i8;
        bytes.push(q as u8);
    }
    bytes
}

/// Decode a scale-prefixed 8-bit BLOB back into a float vector.
///
/// Returns an empty vector for blobs shorter than the scale prefix.
pub fn dequantize_vector(blob: &[u8]) -> Vec<f32> {
    if blob.len() < 4 {
        return Vec::new();
    }
    let scale = f32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
    blob[4..].iter().map(|&b| f32::from(b as i8) * scale).collect()
}

/// Compute cosine similarity between two vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance: `1 − cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
