use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::NounError;

/// Turns text into fixed-size vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_key(&self) -> String;

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NounError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, NounError> {
        self.embed_many(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NounError::Embedding("no embedding returned".to_string()))
    }
}

const TOKEN_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.8;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder. Needs no model or network, and is
/// tolerant of misspellings through its character trigrams.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(64) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];

        let normalized = text.to_lowercase();
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return vec;
        }

        for token in &tokens {
            self.add_feature(&mut vec, &format!("t:{token}"), TOKEN_WEIGHT);
        }

        for pair in tokens.windows(2) {
            self.add_feature(&mut vec, &format!("b:{}_{}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let padded: Vec<char> = format!(" {} ", tokens.join(" ")).chars().collect();
        for tri in padded.windows(3) {
            let trigram: String = tri.iter().collect();
            self.add_feature(&mut vec, &format!("c:{trigram}"), TRIGRAM_WEIGHT);
        }

        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }

        vec
    }

    fn add_feature(&self, vec: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());

        let mut first = [0u8; 8];
        first.copy_from_slice(&digest[..8]);

        #[allow(clippy::cast_possible_truncation)]
        let idx = (u64::from_le_bytes(first) % self.dim as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vec[idx] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_key(&self) -> String {
        format!("local-hash:{}", self.dim)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NounError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;

    #[test]
    fn vectors_are_unit_length_and_deterministic() {
        let embedder = HashEmbedder::new(128);
        let a = embedder.embed_text("Led Zeppelin");
        let b = embedder.embed_text("led zeppelin");

        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(64);
        assert!(embedder.embed_text(" -- ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn misspelling_stays_close() {
        let embedder = HashEmbedder::new(256);
        let target = embedder.embed_text("Alice In Chains");
        let typo = embedder.embed_text("alis in chain");
        let other = embedder.embed_text("Audioslave");

        assert!(cosine_similarity(&target, &typo) > cosine_similarity(&other, &typo));
    }

    #[test]
    fn dimension_has_a_floor() {
        assert_eq!(HashEmbedder::new(8).dim(), 64);
    }
}
