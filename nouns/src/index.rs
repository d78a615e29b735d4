use std::sync::Arc;

use async_trait::async_trait;

use crate::{Embedder, NounError, cosine_similarity};

const BUILD_BATCH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub text: String,
    pub score: f32,
}

/// Nearest-neighbour search over embedded texts.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds `corpus` and replaces whatever the index held before.
    async fn build(&mut self, corpus: &[String]) -> Result<(), NounError>;

    /// Up to `k` entries closest to `text`, best first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Neighbor>, NounError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive cosine-similarity index.
pub struct FlatIndex {
    embedder: Arc<dyn Embedder>,
    entries: Option<Vec<(String, Vec<f32>)>>,
}

impl std::fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("embedder", &self.embedder.model_key())
            .field("entries", &self.len())
            .finish()
    }
}

impl FlatIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: None,
        }
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn build(&mut self, corpus: &[String]) -> Result<(), NounError> {
        let mut entries = Vec::with_capacity(corpus.len());

        for batch in corpus.chunks(BUILD_BATCH) {
            let vectors = self.embedder.embed_many(batch).await?;
            if vectors.len() != batch.len() {
                return Err(NounError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            entries.extend(batch.iter().cloned().zip(vectors));
        }

        tracing::info!(
            embedder = %self.embedder.model_key(),
            entries = entries.len(),
            "built proper noun index"
        );
        self.entries = Some(entries);
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<Neighbor>, NounError> {
        let entries = self.entries.as_ref().ok_or(NounError::IndexNotBuilt)?;
        let query = self.embedder.embed_one(text).await?;

        let mut scored: Vec<Neighbor> = entries
            .iter()
            .map(|(text, vec)| Neighbor {
                text: text.clone(),
                score: cosine_similarity(&query, vec),
            })
            .collect();

        // Case and punctuation variants embed identically; the exact spelling wins the tie.
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| (b.text == text).cmp(&(a.text == text)))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }
}
