use crate::algorithms::collaborative::WeightingMode;
use crate::algorithms::content::ContentConfig;
use crate::algorithms::drift::DriftConfig;
use crate::error::EncoreError;
use crate::utils::metrics::PerformanceThresholds;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub recommendation: RecommendationConfig,
    pub content: ContentConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Per-strategy weights for the hybrid-all merge. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeights {
    pub collaborative_user: f64,
    pub collaborative_item: f64,
    pub content_artist: f64,
    pub content_venue: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative_user: 0.25,
            collaborative_item: 0.25,
            content_artist: 0.25,
            content_venue: 0.25,
        }
    }
}

impl HybridWeights {
    pub fn validate(&self) -> Result<(), EncoreError> {
        let sum = self.collaborative_user
            + self.collaborative_item
            + self.content_artist
            + self.content_venue;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EncoreError::InvalidWeights {
                name: "hybrid strategy",
                sum,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Nearest neighbors consulted by user-based filtering.
    pub neighbor_count: usize,
    pub default_top_k: usize,
    /// Hard ceiling; larger requests are clamped, not rejected.
    pub max_top_k: usize,
    pub max_batch_size: usize,
    pub weighting: WeightingMode,
    pub hybrid_weights: HybridWeights,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            neighbor_count: 10,
            default_top_k: 10,
            max_top_k: 100,
            max_batch_size: 256,
            weighting: WeightingMode::TypeWeight,
            hybrid_weights: HybridWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub drift: DriftConfig,
    pub performance: PerformanceThresholds,
    /// Cutoff for Precision@k / Recall@k / MAP.
    pub ranking_k: usize,
    /// Relative R² drop treated as a critical signal.
    pub r_squared_critical_drop: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            drift: DriftConfig::default(),
            performance: PerformanceThresholds::default(),
            ranking_k: 10,
            r_squared_critical_drop: 0.25,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            recommendation: RecommendationConfig::default(),
            content: ContentConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ENCORE"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Single checkpoint for every weight-sum and bound rule; weights are
    /// rejected, never silently normalized.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.content.artist_weights.validate()?;
        self.content.venue_weights.validate()?;
        self.recommendation.hybrid_weights.validate()?;

        if self.recommendation.default_top_k == 0 || self.recommendation.max_top_k == 0 {
            return Err(EncoreError::InvalidTopK.into());
        }
        if self.recommendation.default_top_k > self.recommendation.max_top_k {
            return Err(anyhow::anyhow!(
                "default_top_k {} exceeds max_top_k {}",
                self.recommendation.default_top_k,
                self.recommendation.max_top_k
            ));
        }
        if self.monitoring.drift.bins < 2 {
            return Err(anyhow::anyhow!(
                "drift binning needs at least 2 bins, got {}",
                self.monitoring.drift.bins
            ));
        }
        if self.monitoring.drift.psi_epsilon <= 0.0 {
            return Err(anyhow::anyhow!("psi_epsilon must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn hybrid_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.recommendation.hybrid_weights.content_artist = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut config = Config::default();
        config.recommendation.default_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_binning_is_rejected() {
        let mut config = Config::default();
        config.monitoring.drift.bins = 1;
        assert!(config.validate().is_err());
    }
}
