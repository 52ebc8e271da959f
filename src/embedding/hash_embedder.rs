use super::EmbeddingProvider;
use anyhow::Result;
use sha2::{Digest, Sha256};

/// Deterministic bag-of-tokens embedder. Each lowercase token is hashed into
/// a bucket with a sign bit; the vector is L2-normalized. Needs no model, so
/// offline indexing and tests use it.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_one("def connect_database(url)");
        let b = embedder.embed_one("def connect_database(url)");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_one("database connection");
        let near = embedder.embed_one("open a database connection pool");
        let far = embedder.embed_one("render the widget tree");
        assert!(dot(&query, &near) > dot(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        assert!(embedder.embed_one("  ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_batch() {
        let embedder = HashEmbedder::new(16);
        let out = embedder
            .embed_batch(vec!["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(embedder.dimension(), 16);
        assert_eq!(embedder.model_name(), "hash");
    }
}
