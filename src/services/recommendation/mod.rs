use crate::algorithms::collaborative::{
    item_based_recommendations, user_based_recommendations, InteractionMatrix, MatrixStats,
};
use crate::algorithms::content::{ContentFilter, ContentScores};
use crate::config::Config;
use crate::models::*;
use crate::services::catalog::{CatalogSnapshot, CatalogStore};
use crate::utils::{sort_scores, validation};
use anyhow::Result;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Unified entry point over the collaborative and content strategies.
/// Constructed once per process with explicit configuration; every request
/// computes against a fresh catalog snapshot, so requests share no mutable
/// state and batches are safe to parallelize.
pub struct RecommendationService {
    config: Arc<Config>,
    content_filter: ContentFilter,
    catalog: Arc<CatalogStore>,
}

impl RecommendationService {
    pub fn new(config: Arc<Config>, catalog: Arc<CatalogStore>) -> Result<Self> {
        let content_filter = ContentFilter::new(config.content.clone())?;
        Ok(Self {
            config,
            content_filter,
            catalog,
        })
    }

    /// Resolve the requested list length: default when absent, clamped to
    /// the configured ceiling, rejected when zero.
    fn resolve_top_k(&self, top_k: Option<usize>) -> Result<usize> {
        let rec = &self.config.recommendation;
        match top_k {
            None => Ok(rec.default_top_k),
            Some(0) => Err(crate::error::EncoreError::InvalidTopK.into()),
            Some(k) => Ok(k.min(rec.max_top_k)),
        }
    }

    pub async fn recommend(
        &self,
        context: &RecommendationContext,
        strategy: Strategy,
        top_k: Option<usize>,
    ) -> Result<RecommendationResult> {
        validation::validate_context(context, strategy)?;
        let top_k = self.resolve_top_k(top_k)?;

        let snapshot = self.catalog.snapshot();
        let matrix =
            InteractionMatrix::from_interactions(&snapshot.interactions, &self.config.recommendation.weighting);

        let result = self.recommend_on_snapshot(&snapshot, &matrix, context, strategy, top_k)?;
        info!(
            "served {} {} recommendations for {}",
            result.scores.len(),
            strategy,
            result.context_id
        );
        Ok(result)
    }

    /// Batch variant: one snapshot and one matrix, contexts processed
    /// independently in parallel. Validation runs up front so a malformed
    /// context fails the batch before any computation; degenerate contexts
    /// (cold users, unknown seeds) degrade to empty results instead.
    pub async fn recommend_batch(
        &self,
        contexts: &[RecommendationContext],
        strategy: Strategy,
        top_k: Option<usize>,
    ) -> Result<Vec<RecommendationResult>> {
        validation::validate_batch_size(contexts.len(), self.config.recommendation.max_batch_size)?;
        for context in contexts {
            validation::validate_context(context, strategy)?;
        }
        let top_k = self.resolve_top_k(top_k)?;

        let snapshot = self.catalog.snapshot();
        let matrix =
            InteractionMatrix::from_interactions(&snapshot.interactions, &self.config.recommendation.weighting);

        let results: Result<Vec<RecommendationResult>> = contexts
            .par_iter()
            .map(|context| self.recommend_on_snapshot(&snapshot, &matrix, context, strategy, top_k))
            .collect();
        let results = results?;

        info!(
            "served batch of {} {} recommendation lists",
            results.len(),
            strategy
        );
        Ok(results)
    }

    /// Diagnostic view of the matrix the next request would compute over.
    pub async fn matrix_stats(&self) -> MatrixStats {
        let snapshot = self.catalog.snapshot();
        InteractionMatrix::from_interactions(&snapshot.interactions, &self.config.recommendation.weighting)
            .stats()
    }

    fn recommend_on_snapshot(
        &self,
        snapshot: &CatalogSnapshot,
        matrix: &InteractionMatrix,
        context: &RecommendationContext,
        strategy: Strategy,
        top_k: usize,
    ) -> Result<RecommendationResult> {
        let mut skipped_seeds = Vec::new();
        let scores = match strategy {
            Strategy::CollaborativeUser => {
                let user = context.user_id.as_deref().unwrap_or_default();
                user_based_recommendations(
                    matrix,
                    user,
                    self.config.recommendation.neighbor_count,
                    top_k,
                )
            }
            Strategy::CollaborativeItem => {
                let user = context.user_id.as_deref().unwrap_or_default();
                item_based_recommendations(matrix, user, top_k)
            }
            Strategy::ContentArtist => {
                let out = self.content_filter.recommend_by_artists(
                    &context.seed_artists,
                    &snapshot.artists,
                    &snapshot.concerts,
                    top_k,
                )?;
                skipped_seeds = out.skipped_seeds;
                out.scores
            }
            Strategy::ContentVenue => {
                let out = self.content_filter.recommend_by_venues(
                    &context.seed_venues,
                    &snapshot.venues,
                    &snapshot.concerts,
                    top_k,
                )?;
                skipped_seeds = out.skipped_seeds;
                out.scores
            }
            Strategy::ContentHybrid => {
                let out = self.content_filter.recommend_hybrid(
                    &context.seed_artists,
                    &context.seed_venues,
                    &snapshot.artists,
                    &snapshot.venues,
                    &snapshot.concerts,
                    top_k,
                )?;
                skipped_seeds = out.skipped_seeds;
                out.scores
            }
            Strategy::HybridAll => {
                let (scores, skipped) = self.hybrid_all(snapshot, matrix, context, top_k)?;
                skipped_seeds = skipped;
                scores
            }
        };

        let note = if scores.is_empty() {
            Some(empty_result_note(context, &skipped_seeds))
        } else if skipped_seeds.is_empty() {
            None
        } else {
            Some(format!(
                "unknown seed ids skipped: {}",
                skipped_seeds.join(", ")
            ))
        };

        Ok(RecommendationResult {
            context_id: context.label(),
            scores,
            strategy,
            generated_at: Utc::now(),
            note,
        })
    }

    /// Merge every strategy the context supports: weighted sum per target
    /// id, concatenated reasoning, max confidence, then one final sort.
    fn hybrid_all(
        &self,
        snapshot: &CatalogSnapshot,
        matrix: &InteractionMatrix,
        context: &RecommendationContext,
        top_k: usize,
    ) -> Result<(Vec<RecommendationScore>, Vec<String>)> {
        let weights = self.config.recommendation.hybrid_weights;
        let mut merged: HashMap<String, RecommendationScore> = HashMap::new();
        let mut skipped = Vec::new();

        let mut fold = |scores: Vec<RecommendationScore>, weight: f64| {
            for rec in scores {
                match merged.get_mut(&rec.target_id) {
                    Some(existing) => {
                        existing.score += weight * rec.score;
                        existing.confidence = existing.confidence.max(rec.confidence);
                        existing.reasoning = format!("{}; {}", existing.reasoning, rec.reasoning);
                    }
                    None => {
                        merged.insert(
                            rec.target_id.clone(),
                            RecommendationScore {
                                score: weight * rec.score,
                                source: Strategy::HybridAll,
                                ..rec
                            },
                        );
                    }
                }
            }
        };

        if let Some(user) = context.user_id.as_deref() {
            fold(
                user_based_recommendations(
                    matrix,
                    user,
                    self.config.recommendation.neighbor_count,
                    top_k,
                ),
                weights.collaborative_user,
            );
            fold(
                item_based_recommendations(matrix, user, top_k),
                weights.collaborative_item,
            );
        }
        if !context.seed_artists.is_empty() {
            let ContentScores {
                scores,
                skipped_seeds,
            } = self.content_filter.recommend_by_artists(
                &context.seed_artists,
                &snapshot.artists,
                &snapshot.concerts,
                top_k,
            )?;
            skipped.extend(skipped_seeds);
            fold(scores, weights.content_artist);
        }
        if !context.seed_venues.is_empty() {
            let ContentScores {
                scores,
                skipped_seeds,
            } = self.content_filter.recommend_by_venues(
                &context.seed_venues,
                &snapshot.venues,
                &snapshot.concerts,
                top_k,
            )?;
            skipped.extend(skipped_seeds);
            fold(scores, weights.content_venue);
        }

        let mut scores: Vec<RecommendationScore> = merged.into_values().collect();
        sort_scores(&mut scores);
        scores.truncate(top_k);
        Ok((scores, skipped))
    }
}

fn empty_result_note(context: &RecommendationContext, skipped_seeds: &[String]) -> String {
    if !skipped_seeds.is_empty() {
        format!(
            "no candidates: none of the seed ids were found in the catalog ({})",
            skipped_seeds.join(", ")
        )
    } else if context.user_id.is_some() {
        "no candidates: this user has no interaction history to learn from yet".to_string()
    } else {
        "no candidates: no strategy produced any matches for the supplied seeds".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionType;

    fn service() -> RecommendationService {
        let config = Arc::new(Config::default());
        let catalog = Arc::new(CatalogStore::new());

        catalog
            .add_artists(vec![
                ArtistFeatures::new("artA", "Artist A")
                    .with_genres(["rock", "pop"])
                    .with_popularity(80.0),
                ArtistFeatures::new("artB", "Artist B")
                    .with_genres(["rock"])
                    .with_popularity(70.0),
            ])
            .unwrap();
        catalog
            .add_venues(vec![
                VenueFeatures::new("v1", "Hall", 40.0, -74.0, 2000, "theater"),
                VenueFeatures::new("v2", "Arena", 40.1, -74.1, 15000, "arena"),
            ])
            .unwrap();
        catalog
            .add_concerts(vec![
                Concert::new("concertA", "artA", "v1"),
                Concert::new("concertB", "artB", "v1"),
                Concert::new("concertC", "artB", "v2"),
            ])
            .unwrap();
        catalog
            .add_interactions(vec![
                UserInteraction::new("user1", "concertA", InteractionType::Attended),
                UserInteraction::new("user1", "concertB", InteractionType::Purchased),
                UserInteraction::new("user2", "concertA", InteractionType::Attended),
                UserInteraction::new("user2", "concertC", InteractionType::Viewed),
            ])
            .unwrap();

        RecommendationService::new(config, catalog).unwrap()
    }

    #[tokio::test]
    async fn collaborative_user_excludes_history() {
        let service = service();
        let ctx = RecommendationContext::for_user("user1");
        let result = service
            .recommend(&ctx, Strategy::CollaborativeUser, Some(5))
            .await
            .unwrap();

        let ids: Vec<&str> = result.scores.iter().map(|s| s.target_id.as_str()).collect();
        assert!(ids.contains(&"concertC"));
        assert!(!ids.contains(&"concertA"));
        assert!(result.note.is_none());
    }

    #[tokio::test]
    async fn cold_user_gets_empty_result_with_note() {
        let service = service();
        let ctx = RecommendationContext::for_user("stranger");
        let result = service
            .recommend(&ctx, Strategy::CollaborativeUser, None)
            .await
            .unwrap();
        assert!(result.scores.is_empty());
        assert!(result.note.unwrap().contains("no interaction history"));
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let service = service();
        let ctx = RecommendationContext::for_user("user1");
        assert!(service
            .recommend(&ctx, Strategy::CollaborativeUser, Some(0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn oversized_top_k_is_clamped_not_rejected() {
        let service = service();
        let ctx = RecommendationContext::for_user("user1");
        let result = service
            .recommend(&ctx, Strategy::CollaborativeUser, Some(100_000))
            .await
            .unwrap();
        assert!(result.scores.len() <= service.config.recommendation.max_top_k);
    }

    #[tokio::test]
    async fn content_artist_ranks_by_seed_similarity() {
        let service = service();
        let ctx = RecommendationContext {
            user_id: None,
            seed_artists: vec!["artA".to_string()],
            seed_venues: vec![],
        };
        let result = service
            .recommend(&ctx, Strategy::ContentArtist, Some(5))
            .await
            .unwrap();
        assert!(!result.scores.is_empty());
        // concertA is by the seed artist itself, a perfect match.
        assert_eq!(result.scores[0].target_id, "concertA");
    }

    #[tokio::test]
    async fn hybrid_all_merges_and_dedupes() {
        let service = service();
        let ctx = RecommendationContext {
            user_id: Some("user1".to_string()),
            seed_artists: vec!["artA".to_string()],
            seed_venues: vec![],
        };
        let result = service
            .recommend(&ctx, Strategy::HybridAll, Some(10))
            .await
            .unwrap();

        let mut seen = std::collections::HashSet::new();
        for rec in &result.scores {
            assert!(seen.insert(rec.target_id.clone()), "duplicate target id");
            assert_eq!(rec.source, Strategy::HybridAll);
        }
        for pair in result.scores.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn batch_results_match_single_requests() {
        let service = service();
        let contexts = vec![
            RecommendationContext::for_user("user1"),
            RecommendationContext::for_user("user2"),
            RecommendationContext::for_user("stranger"),
        ];
        let batch = service
            .recommend_batch(&contexts, Strategy::CollaborativeUser, Some(5))
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);

        let single = service
            .recommend(&contexts[0], Strategy::CollaborativeUser, Some(5))
            .await
            .unwrap();
        let batch_ids: Vec<&str> = batch[0].scores.iter().map(|s| s.target_id.as_str()).collect();
        let single_ids: Vec<&str> = single.scores.iter().map(|s| s.target_id.as_str()).collect();
        assert_eq!(batch_ids, single_ids);
        assert!(batch[2].scores.is_empty());
    }

    #[tokio::test]
    async fn unknown_seeds_produce_partial_note() {
        let service = service();
        let ctx = RecommendationContext {
            user_id: None,
            seed_artists: vec!["artA".to_string(), "ghost".to_string()],
            seed_venues: vec![],
        };
        let result = service
            .recommend(&ctx, Strategy::ContentArtist, Some(5))
            .await
            .unwrap();
        assert!(!result.scores.is_empty());
        assert!(result.note.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn matrix_stats_reflect_catalog() {
        let service = service();
        let stats = service.matrix_stats().await;
        assert_eq!(stats.users, 2);
        assert_eq!(stats.items, 3);
    }
}
