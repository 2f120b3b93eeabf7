use crate::algorithms::similarity::{haversine_similarity, jaccard_similarity};
use crate::error::EncoreError;
use crate::models::{
    ArtistFeatures, Concert, RecommendationScore, SimilarityMethod, SimilarityScore, Strategy,
    VenueFeatures,
};
use crate::utils::sort_scores;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Composite weights for artist-artist similarity. Must sum to 1; the sum
/// is validated at filter construction, never silently normalized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArtistWeights {
    pub genre: f64,
    pub popularity: f64,
    pub era: f64,
}

impl Default for ArtistWeights {
    fn default() -> Self {
        Self {
            genre: 0.5,
            popularity: 0.3,
            era: 0.2,
        }
    }
}

impl ArtistWeights {
    pub fn validate(&self) -> Result<(), EncoreError> {
        let sum = self.genre + self.popularity + self.era;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EncoreError::InvalidWeights {
                name: "artist composite",
                sum,
            });
        }
        Ok(())
    }
}

/// Composite weights for venue-venue similarity. Same sum-to-1 contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenueWeights {
    pub geo: f64,
    pub capacity: f64,
    pub venue_type: f64,
}

impl Default for VenueWeights {
    fn default() -> Self {
        Self {
            geo: 0.4,
            capacity: 0.4,
            venue_type: 0.2,
        }
    }
}

impl VenueWeights {
    pub fn validate(&self) -> Result<(), EncoreError> {
        let sum = self.geo + self.capacity + self.venue_type;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EncoreError::InvalidWeights {
                name: "venue composite",
                sum,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub artist_weights: ArtistWeights,
    pub venue_weights: VenueWeights,
    /// Artist share of the content-hybrid blend; venues get the rest.
    pub hybrid_mix: f64,
    /// Years after which era proximity decays to zero.
    pub era_span_years: f64,
    /// Distance at which geographic similarity halves.
    pub geo_scale_km: f64,
    /// Capacity ratio mapped to zero log-scale similarity.
    pub max_capacity_ratio: f64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            artist_weights: ArtistWeights::default(),
            venue_weights: VenueWeights::default(),
            hybrid_mix: 0.5,
            era_span_years: 50.0,
            geo_scale_km: 100.0,
            max_capacity_ratio: 100.0,
        }
    }
}

/// Scores and the seed ids that were not found in the catalog. Missing
/// seeds degrade the result instead of failing it.
#[derive(Debug, Clone, Default)]
pub struct ContentScores {
    pub scores: Vec<RecommendationScore>,
    pub skipped_seeds: Vec<String>,
}

/// Content-based filter over artist/venue attribute catalogs, independent
/// of interaction history.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    config: ContentConfig,
}

impl ContentFilter {
    pub fn new(config: ContentConfig) -> Result<Self, EncoreError> {
        config.artist_weights.validate()?;
        config.venue_weights.validate()?;
        if !(0.0..=1.0).contains(&config.hybrid_mix) {
            return Err(EncoreError::InvalidWeights {
                name: "content hybrid mix",
                sum: config.hybrid_mix,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Weighted composite of genre overlap, popularity closeness, and era
    /// proximity. Absent formation years contribute a neutral 1.0.
    pub fn artist_similarity(
        &self,
        a: &ArtistFeatures,
        b: &ArtistFeatures,
    ) -> Result<f64, EncoreError> {
        if !a.popularity.is_finite() || !b.popularity.is_finite() {
            return Err(EncoreError::NonFiniteInput {
                context: "artist popularity",
            });
        }
        let w = self.config.artist_weights;

        let genre = jaccard_similarity(&a.genres, &b.genres);
        let popularity = 1.0 - (a.popularity - b.popularity).abs() / 100.0;
        let era = match (a.formation_year, b.formation_year) {
            (Some(ya), Some(yb)) => {
                (1.0 - (ya - yb).abs() as f64 / self.config.era_span_years).max(0.0)
            }
            _ => 1.0,
        };

        Ok(w.genre * genre + w.popularity * popularity + w.era * era)
    }

    /// Weighted composite of geographic proximity, log-scale capacity
    /// closeness, and venue-type match.
    pub fn venue_similarity(
        &self,
        a: &VenueFeatures,
        b: &VenueFeatures,
    ) -> Result<f64, EncoreError> {
        let w = self.config.venue_weights;

        let geo = haversine_similarity(
            (a.latitude, a.longitude),
            (b.latitude, b.longitude),
            self.config.geo_scale_km,
        )?;

        let capacity = if a.capacity == 0 || b.capacity == 0 {
            0.0
        } else {
            let log_gap = ((a.capacity as f64).ln() - (b.capacity as f64).ln()).abs();
            (1.0 - log_gap / self.config.max_capacity_ratio.ln()).clamp(0.0, 1.0)
        };

        let type_match = if a.venue_type == b.venue_type { 1.0 } else { 0.0 };

        Ok(w.geo * geo + w.capacity * capacity + w.venue_type * type_match)
    }

    /// Composite artist similarity packaged with its method tag.
    pub fn artist_similarity_score(
        &self,
        a: &ArtistFeatures,
        b: &ArtistFeatures,
    ) -> Result<SimilarityScore, EncoreError> {
        Ok(SimilarityScore {
            entity_a: a.id.clone(),
            entity_b: b.id.clone(),
            score: self.artist_similarity(a, b)?,
            method: SimilarityMethod::CompositeWeighted,
        })
    }

    /// Genre overlap alone.
    pub fn artist_genre_similarity(&self, a: &ArtistFeatures, b: &ArtistFeatures) -> SimilarityScore {
        SimilarityScore {
            entity_a: a.id.clone(),
            entity_b: b.id.clone(),
            score: jaccard_similarity(&a.genres, &b.genres),
            method: SimilarityMethod::Jaccard,
        }
    }

    /// Geographic proximity alone.
    pub fn venue_geo_similarity(
        &self,
        a: &VenueFeatures,
        b: &VenueFeatures,
    ) -> Result<SimilarityScore, EncoreError> {
        Ok(SimilarityScore {
            entity_a: a.id.clone(),
            entity_b: b.id.clone(),
            score: haversine_similarity(
                (a.latitude, a.longitude),
                (b.latitude, b.longitude),
                self.config.geo_scale_km,
            )?,
            method: SimilarityMethod::Haversine,
        })
    }

    /// Rank concerts by the similarity of their artist to the seed set;
    /// each concert scores against its closest seed.
    pub fn recommend_by_artists(
        &self,
        seed_ids: &[String],
        artists: &HashMap<String, ArtistFeatures>,
        concerts: &[Concert],
        top_k: usize,
    ) -> Result<ContentScores, EncoreError> {
        let (seeds, skipped) = resolve_seeds(seed_ids, artists, "artist");
        let mut out = ContentScores {
            scores: Vec::new(),
            skipped_seeds: skipped,
        };
        if seeds.is_empty() {
            return Ok(out);
        }

        for concert in concerts {
            let artist = match artists.get(&concert.artist_id) {
                Some(artist) => artist,
                None => continue,
            };
            let mut best: Option<(f64, &ArtistFeatures)> = None;
            for seed in &seeds {
                let sim = self.artist_similarity(seed, artist)?;
                if best.map_or(true, |(s, _)| sim > s) {
                    best = Some((sim, seed));
                }
            }
            if let Some((score, seed)) = best {
                if score > 0.0 {
                    out.scores.push(RecommendationScore {
                        target_id: concert.id.clone(),
                        score,
                        confidence: score.clamp(0.0, 1.0),
                        reasoning: format!(
                            "{} is similar to {} you like (match {:.2})",
                            artist.name, seed.name, score
                        ),
                        source: Strategy::ContentArtist,
                    });
                }
            }
        }

        sort_scores(&mut out.scores);
        out.scores.truncate(top_k);
        Ok(out)
    }

    /// Rank concerts by the similarity of their venue to the seed set.
    pub fn recommend_by_venues(
        &self,
        seed_ids: &[String],
        venues: &HashMap<String, VenueFeatures>,
        concerts: &[Concert],
        top_k: usize,
    ) -> Result<ContentScores, EncoreError> {
        let (seeds, skipped) = resolve_seeds(seed_ids, venues, "venue");
        let mut out = ContentScores {
            scores: Vec::new(),
            skipped_seeds: skipped,
        };
        if seeds.is_empty() {
            return Ok(out);
        }

        for concert in concerts {
            let venue = match venues.get(&concert.venue_id) {
                Some(venue) => venue,
                None => continue,
            };
            let mut best: Option<(f64, &VenueFeatures)> = None;
            for seed in &seeds {
                let sim = self.venue_similarity(seed, venue)?;
                if best.map_or(true, |(s, _)| sim > s) {
                    best = Some((sim, seed));
                }
            }
            if let Some((score, seed)) = best {
                if score > 0.0 {
                    out.scores.push(RecommendationScore {
                        target_id: concert.id.clone(),
                        score,
                        confidence: score.clamp(0.0, 1.0),
                        reasoning: format!(
                            "{} resembles {} (match {:.2})",
                            venue.name, seed.name, score
                        ),
                        source: Strategy::ContentVenue,
                    });
                }
            }
        }

        sort_scores(&mut out.scores);
        out.scores.truncate(top_k);
        Ok(out)
    }

    /// Blend of the artist and venue strategies with the configured mix; a
    /// concert scored by only one side keeps that side's weighted share.
    pub fn recommend_hybrid(
        &self,
        seed_artists: &[String],
        seed_venues: &[String],
        artists: &HashMap<String, ArtistFeatures>,
        venues: &HashMap<String, VenueFeatures>,
        concerts: &[Concert],
        top_k: usize,
    ) -> Result<ContentScores, EncoreError> {
        let by_artist =
            self.recommend_by_artists(seed_artists, artists, concerts, concerts.len().max(top_k))?;
        let by_venue =
            self.recommend_by_venues(seed_venues, venues, concerts, concerts.len().max(top_k))?;

        let mix = self.config.hybrid_mix;
        let mut blended: HashMap<String, RecommendationScore> = HashMap::new();

        for rec in by_artist.scores {
            blended.insert(
                rec.target_id.clone(),
                RecommendationScore {
                    score: mix * rec.score,
                    confidence: rec.confidence,
                    source: Strategy::ContentHybrid,
                    ..rec
                },
            );
        }
        for rec in by_venue.scores {
            match blended.get_mut(&rec.target_id) {
                Some(existing) => {
                    existing.score += (1.0 - mix) * rec.score;
                    existing.confidence = existing.confidence.max(rec.confidence);
                    existing.reasoning = format!("{}; {}", existing.reasoning, rec.reasoning);
                }
                None => {
                    blended.insert(
                        rec.target_id.clone(),
                        RecommendationScore {
                            score: (1.0 - mix) * rec.score,
                            confidence: rec.confidence,
                            source: Strategy::ContentHybrid,
                            ..rec
                        },
                    );
                }
            }
        }

        let mut skipped = by_artist.skipped_seeds;
        skipped.extend(by_venue.skipped_seeds);

        let mut scores: Vec<RecommendationScore> = blended.into_values().collect();
        sort_scores(&mut scores);
        scores.truncate(top_k);

        Ok(ContentScores {
            scores,
            skipped_seeds: skipped,
        })
    }
}

/// Look seeds up in the catalog; unknown ids are skipped with a warning so
/// one stale id cannot abort the whole request.
fn resolve_seeds<'a, T>(
    seed_ids: &[String],
    catalog: &'a HashMap<String, T>,
    kind: &str,
) -> (Vec<&'a T>, Vec<String>) {
    let mut resolved = Vec::with_capacity(seed_ids.len());
    let mut skipped = Vec::new();
    for id in seed_ids {
        match catalog.get(id) {
            Some(entry) => resolved.push(entry),
            None => {
                warn!("seed {kind} {id} not found in catalog, skipping");
                skipped.push(id.clone());
            }
        }
    }
    (resolved, skipped)
}
