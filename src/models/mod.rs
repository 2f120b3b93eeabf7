use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// One observed event of a user engaging with a concert. Immutable once
/// recorded; produced by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInteraction {
    pub user_id: String,
    pub concert_id: String,
    pub interaction: InteractionType,
    pub timestamp: DateTime<Utc>,
    pub rating: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Attended,
    Purchased,
    Viewed,
}

impl InteractionType {
    /// Ordinal weight, increasing in declaration order.
    pub fn weight(&self) -> f64 {
        match self {
            InteractionType::Attended => 1.0,
            InteractionType::Purchased => 2.0,
            InteractionType::Viewed => 3.0,
        }
    }
}

impl UserInteraction {
    pub fn new(
        user_id: impl Into<String>,
        concert_id: impl Into<String>,
        interaction: InteractionType,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            concert_id: concert_id.into(),
            interaction,
            timestamp: Utc::now(),
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Artist attribute record supplied by the data-access collaborator.
/// Required fields are explicit; `extra` carries forward-compatible
/// attributes without stringly-typed lookups on the required ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistFeatures {
    pub id: String,
    pub name: String,
    pub genres: BTreeSet<String>,
    /// Popularity score on a 0-100 scale.
    pub popularity: f64,
    pub formation_year: Option<i32>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ArtistFeatures {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            genres: BTreeSet::new(),
            popularity: 0.0,
            formation_year: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_formation_year(mut self, year: i32) -> Self {
        self.formation_year = Some(year);
        self
    }
}

/// Venue attribute record supplied by the data-access collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueFeatures {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: u32,
    pub venue_type: String,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl VenueFeatures {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        capacity: u32,
        venue_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
            capacity,
            venue_type: venue_type.into(),
            extra: HashMap::new(),
        }
    }
}

/// A concert links an artist to a venue; the catalogs are joined through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concert {
    pub id: String,
    pub artist_id: String,
    pub venue_id: String,
    pub date: Option<DateTime<Utc>>,
}

impl Concert {
    pub fn new(
        id: impl Into<String>,
        artist_id: impl Into<String>,
        venue_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            artist_id: artist_id.into(),
            venue_id: venue_id.into(),
            date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    Cosine,
    Jaccard,
    Haversine,
    CompositeWeighted,
}

/// A computed similarity between two entities. Produced fresh per query,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub entity_a: String,
    pub entity_b: String,
    pub score: f64,
    pub method: SimilarityMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CollaborativeUser,
    CollaborativeItem,
    ContentArtist,
    ContentVenue,
    ContentHybrid,
    HybridAll,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::CollaborativeUser => "collaborative-user",
            Strategy::CollaborativeItem => "collaborative-item",
            Strategy::ContentArtist => "content-artist",
            Strategy::ContentVenue => "content-venue",
            Strategy::ContentHybrid => "content-hybrid",
            Strategy::HybridAll => "hybrid-all",
        };
        f.write_str(s)
    }
}

/// One candidate recommendation with a human-readable justification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationScore {
    pub target_id: String,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub source: Strategy,
}

/// What the caller wants recommendations for: a known user, explicit
/// preference seeds, or both (hybrid).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub user_id: Option<String>,
    #[serde(default)]
    pub seed_artists: Vec<String>,
    #[serde(default)]
    pub seed_venues: Vec<String>,
}

impl RecommendationContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.seed_artists.is_empty() && self.seed_venues.is_empty()
    }

    /// Label used as the owning id on results: the user id when present,
    /// otherwise a stable description of the seed set.
    pub fn label(&self) -> String {
        match &self.user_id {
            Some(user) => user.clone(),
            None => format!(
                "seeds[{}]",
                self.seed_artists
                    .iter()
                    .chain(self.seed_venues.iter())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }
}

/// The full answer to one recommendation request. Scores are strictly
/// descending, ties broken by ascending target id. Caller owns the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub context_id: String,
    pub scores: Vec<RecommendationScore>,
    pub strategy: Strategy,
    pub generated_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl RecommendationResult {
    pub fn empty(context_id: String, strategy: Strategy, note: impl Into<String>) -> Self {
        Self {
            context_id,
            scores: Vec::new(),
            strategy,
            generated_at: Utc::now(),
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    Psi,
    KsTest,
    ChiSquare,
}

/// Output of one statistical comparison of a baseline sample against a
/// current sample. Immutable, one per detection call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftDetectionResult {
    pub model_name: String,
    pub model_version: String,
    pub method: DriftMethod,
    /// Method-specific units: PSI value, KS statistic, or chi-square
    /// statistic.
    pub score: f64,
    pub drift_detected: bool,
    pub p_value: Option<f64>,
    pub low_confidence: bool,
    pub warning: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Mae,
    Rmse,
    Mape,
    RSquared,
    PrecisionAtK,
    RecallAtK,
    MeanAveragePrecision,
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricName::Mae => "mae",
            MetricName::Rmse => "rmse",
            MetricName::Mape => "mape",
            MetricName::RSquared => "r_squared",
            MetricName::PrecisionAtK => "precision_at_k",
            MetricName::RecallAtK => "recall_at_k",
            MetricName::MeanAveragePrecision => "map",
        };
        f.write_str(s)
    }
}

/// One metric observation for a model, with its baseline comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPerformanceMetrics {
    pub model_name: String,
    pub model_version: String,
    pub metric: MetricName,
    pub value: f64,
    pub baseline: Option<f64>,
    pub threshold_breached: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Decision artifact recorded when monitoring signals fire. Append-only:
/// the orchestrator accumulates these for the life of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingTrigger {
    pub id: Uuid,
    pub model_name: String,
    pub model_version: String,
    pub reason: String,
    pub severity: TriggerSeverity,
    pub retraining_recommended: bool,
    pub timestamp: DateTime<Utc>,
}

/// Exportable aggregation of every check run for one model+version pair.
/// Plain structured data; publishing it anywhere is the alerting
/// collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub id: Uuid,
    pub model_name: String,
    pub model_version: String,
    pub drift_results: Vec<DriftDetectionResult>,
    pub performance_metrics: Vec<ModelPerformanceMetrics>,
    pub triggers: Vec<RetrainingTrigger>,
    pub generated_at: DateTime<Utc>,
}
