use std::sync::Arc;

use tracing::debug;

use crate::embeddings::{l2_normalize, EmbeddingClient, EmbeddingError};

use super::{IntentIndex, IntentMatch};

/// Resolves utterances against the frozen phrase index. Pure aside from the
/// embedding call: resolving the same utterance twice against an unchanged
/// index yields the same label and distance.
pub struct IntentResolver {
    client: Arc<dyn EmbeddingClient>,
    index: IntentIndex,
    distance_threshold: f32,
}

impl IntentResolver {
    pub fn new(client: Arc<dyn EmbeddingClient>, index: IntentIndex, distance_threshold: f32) -> Self {
        Self { client, index, distance_threshold }
    }

    /// Embeds the utterance and returns the nearest canonical intent, or an
    /// unknown match when the nearest phrase sits beyond the threshold.
    ///
    /// An embedding failure is surfaced as an error, never folded into
    /// `unknown`: "couldn't even try" must stay distinguishable from
    /// "couldn't understand".
    pub async fn resolve(&self, utterance: &str) -> Result<IntentMatch, EmbeddingError> {
        let mut query = self.client.embed(utterance).await?;
        l2_normalize(&mut query);

        let Some((phrase, intent, distance)) = self.index.nearest(&query) else {
            return Ok(IntentMatch { intent: None, phrase: None, distance: f32::INFINITY });
        };

        debug!(
            event_name = "intent.resolve.nearest",
            phrase,
            distance,
            threshold = self.distance_threshold,
            "nearest canonical phrase computed"
        );

        if distance > self.distance_threshold {
            return Ok(IntentMatch { intent: None, phrase: None, distance });
        }
        Ok(IntentMatch { intent: Some(intent), phrase: Some(phrase.to_string()), distance })
    }
}
