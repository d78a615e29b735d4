//! Fuzzy lookup of known proper nouns (artist and album names) by embedding similarity.

mod embedder;
mod http;
mod index;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use config::{Credentials, EmbeddingConfig, EmbeddingProvider};

pub use embedder::{Embedder, HashEmbedder};
pub use http::{HttpEmbedder, HttpFlavor};
pub use index::{FlatIndex, Neighbor, VectorIndex};

#[derive(Debug, thiserror::Error)]
pub enum NounError {
    #[error("proper noun index has not been built")]
    IndexNotBuilt,

    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Built once at startup, read-only afterwards.
pub struct ProperNounResolver {
    index: Box<dyn VectorIndex>,
}

impl std::fmt::Debug for ProperNounResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProperNounResolver")
            .field("nouns", &self.index.len())
            .finish()
    }
}

impl ProperNounResolver {
    /// De-duplicates `corpus` and builds `index` over it.
    pub async fn build(
        mut index: Box<dyn VectorIndex>,
        corpus: Vec<String>,
    ) -> Result<Self, NounError> {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = corpus
            .into_iter()
            .filter(|noun| seen.insert(noun.clone()))
            .collect();

        index.build(&distinct).await?;
        Ok(Self { index })
    }

    /// Known nouns most similar to `candidate`, nearest first.
    pub async fn resolve(&self, candidate: &str, k: usize) -> Result<Vec<String>, NounError> {
        let hits = self.index.query(candidate, k).await?;
        tracing::debug!(candidate, hits = hits.len(), "resolved proper noun");
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Builds the embedder selected in `config`.
pub fn build_embedder(
    config: &EmbeddingConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn Embedder>, NounError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Ok(match config.provider {
        EmbeddingProvider::Local => Arc::new(HashEmbedder::new(config.dims)),
        EmbeddingProvider::Ollama => Arc::new(HttpEmbedder::new(
            HttpFlavor::Ollama,
            config.url.clone(),
            config.model.clone(),
            None,
            timeout,
            config.max_retries,
        )?),
        EmbeddingProvider::OpenAI => Arc::new(HttpEmbedder::new(
            HttpFlavor::OpenAI,
            config.url.clone(),
            config.model.clone(),
            credentials.openai_api_key.clone(),
            timeout,
            config.max_retries,
        )?),
    })
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn music_nouns() -> Vec<String> {
        [
            "AC/DC",
            "Accept",
            "Aerosmith",
            "Alanis Morissette",
            "Alice In Chains",
            "Antônio Carlos Jobim",
            "Apocalyptica",
            "Audioslave",
            "Led Zeppelin",
            "Let There Be Rock",
            "Big Ones",
            "Jagged Little Pill",
            "Alice In Chains",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    async fn resolver() -> ProperNounResolver {
        let embedder = build_embedder(&EmbeddingConfig::default(), &Credentials::default()).unwrap();
        ProperNounResolver::build(Box::new(FlatIndex::new(embedder)), music_nouns())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn corpus_is_deduplicated() {
        assert_eq!(resolver().await.len(), 12);
    }

    #[tokio::test]
    async fn exact_noun_ranks_first() {
        let resolver = resolver().await;
        for noun in ["AC/DC", "Alice In Chains", "Jagged Little Pill", "Led Zeppelin"] {
            let hits = resolver.resolve(noun, 5).await.unwrap();
            assert_eq!(hits[0], noun);
            assert!(hits.len() <= 5);
        }
    }

    #[tokio::test]
    async fn near_miss_is_within_top_five() {
        let resolver = resolver().await;
        for (typo, intended) in [
            ("alis in chain", "Alice In Chains"),
            ("led zepelin", "Led Zeppelin"),
            ("aerosmit", "Aerosmith"),
            ("jaged litle pill", "Jagged Little Pill"),
        ] {
            let hits = resolver.resolve(typo, 5).await.unwrap();
            assert!(hits.iter().any(|h| h == intended), "{typo} -> {hits:?}");
        }
    }

    #[test]
    fn cosine_handles_mismatched_and_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
