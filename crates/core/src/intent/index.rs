//! Immutable nearest-neighbor index over the canonical phrase catalog.
//!
//! The catalog is small enough that an exact linear scan beats any
//! approximate structure; distances stay exact and the build is one
//! embedding call per phrase. Vectors are L2-normalized before indexing and
//! before querying, so squared-L2 and cosine orderings agree and the
//! distance reported here is plain cosine distance.

use crate::embeddings::{l2_normalize, EmbeddingClient, EmbeddingError};

use super::{Intent, IntentPhrase};

struct IndexedPhrase {
    text: &'static str,
    intent: Intent,
    vector: Vec<f32>,
}

pub struct IntentIndex {
    phrases: Vec<IndexedPhrase>,
    dimension: usize,
}

impl IntentIndex {
    /// Embeds every catalog phrase exactly once and freezes the index.
    /// Safe for concurrent lookups afterwards; never mutated.
    pub async fn build(
        client: &dyn EmbeddingClient,
        catalog: Vec<IntentPhrase>,
    ) -> Result<Self, EmbeddingError> {
        let mut phrases = Vec::with_capacity(catalog.len());
        let mut dimension = 0;
        for phrase in catalog {
            let mut vector = client.embed(phrase.text).await?;
            if dimension == 0 {
                dimension = vector.len();
            } else if vector.len() != dimension {
                return Err(EmbeddingError::Malformed(format!(
                    "embedding dimension changed mid-build: expected {dimension}, got {} for `{}`",
                    vector.len(),
                    phrase.text
                )));
            }
            l2_normalize(&mut vector);
            phrases.push(IndexedPhrase { text: phrase.text, intent: phrase.intent, vector });
        }
        Ok(Self { phrases, dimension })
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact k=1 lookup. Expects a normalized query vector; returns the
    /// matched phrase, its intent, and the cosine distance. Ties break to
    /// the lowest phrase index (strict `<` during the scan).
    pub fn nearest(&self, query: &[f32]) -> Option<(&'static str, Intent, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (position, phrase) in self.phrases.iter().enumerate() {
            let distance = cosine_distance(query, &phrase.vector);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((position, distance)),
            }
        }
        best.map(|(position, distance)| {
            let phrase = &self.phrases[position];
            (phrase.text, phrase.intent, distance)
        })
    }
}

/// Cosine distance for unit vectors: `1 - a·b`, clamped into `[0, 2]` to
/// absorb float drift around exact matches.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "query dimension must match index dimension");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (1.0 - dot).clamp(0.0, 2.0)
}
