use crate::error::EncoreError;
use crate::models::{MetricName, ModelPerformanceMetrics};
use crate::utils::mean;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Relative-degradation tolerances per metric, as fractions. Lower-is-
/// better metrics breach when they grow past the tolerance; higher-is-
/// better metrics breach when they shrink past it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub mae_pct: f64,
    pub rmse_pct: f64,
    pub mape_pct: f64,
    pub r_squared_pct: f64,
    pub precision_pct: f64,
    pub recall_pct: f64,
    pub map_pct: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            mae_pct: 0.20,
            rmse_pct: 0.20,
            mape_pct: 0.20,
            r_squared_pct: 0.10,
            precision_pct: 0.15,
            recall_pct: 0.15,
            map_pct: 0.15,
        }
    }
}

/// Computes regression and ranking metrics against supplied baselines and
/// flags per-metric threshold breaches. One observation per metric, so
/// callers can act on individual breaches.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    thresholds: PerformanceThresholds,
    ranking_k: usize,
}

impl PerformanceMonitor {
    pub fn new(thresholds: PerformanceThresholds, ranking_k: usize) -> Self {
        Self {
            thresholds,
            ranking_k,
        }
    }

    pub fn ranking_k(&self) -> usize {
        self.ranking_k
    }

    /// MAE, RMSE, MAPE, and R² for one (predictions, actuals) pairing.
    ///
    /// MAPE excludes points whose actual is zero from its denominator; if
    /// every actual is zero the MAPE observation is skipped entirely.
    pub fn regression_metrics(
        &self,
        model_name: &str,
        model_version: &str,
        predictions: &[f64],
        actuals: &[f64],
        baselines: &HashMap<MetricName, f64>,
    ) -> Result<Vec<ModelPerformanceMetrics>, EncoreError> {
        if predictions.len() != actuals.len() {
            return Err(EncoreError::DimensionMismatch {
                left: predictions.len(),
                right: actuals.len(),
            });
        }
        if predictions.is_empty() {
            return Err(EncoreError::EmptySample {
                context: "regression predictions",
            });
        }
        if predictions.iter().chain(actuals.iter()).any(|v| !v.is_finite()) {
            return Err(EncoreError::NonFiniteInput {
                context: "regression pairs",
            });
        }

        let mut out = Vec::with_capacity(4);

        let mae = mean(
            &predictions
                .iter()
                .zip(actuals)
                .map(|(p, a)| (p - a).abs())
                .collect::<Vec<_>>(),
        );
        out.push(self.observe(model_name, model_version, MetricName::Mae, mae, baselines));

        let mse = mean(
            &predictions
                .iter()
                .zip(actuals)
                .map(|(p, a)| (p - a).powi(2))
                .collect::<Vec<_>>(),
        );
        out.push(self.observe(
            model_name,
            model_version,
            MetricName::Rmse,
            mse.sqrt(),
            baselines,
        ));

        let pct_errors: Vec<f64> = predictions
            .iter()
            .zip(actuals)
            .filter(|(_, a)| **a != 0.0)
            .map(|(p, a)| ((p - a) / a).abs() * 100.0)
            .collect();
        if pct_errors.is_empty() {
            debug!("all actuals are zero, skipping MAPE for {model_name}:{model_version}");
        } else {
            out.push(self.observe(
                model_name,
                model_version,
                MetricName::Mape,
                mean(&pct_errors),
                baselines,
            ));
        }

        let actual_mean = mean(actuals);
        let ss_tot: f64 = actuals.iter().map(|a| (a - actual_mean).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(actuals)
            .map(|(p, a)| (a - p).powi(2))
            .sum();
        let r_squared = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };
        out.push(self.observe(
            model_name,
            model_version,
            MetricName::RSquared,
            r_squared,
            baselines,
        ));

        Ok(out)
    }

    /// Precision@k, Recall@k, and MAP averaged over (ranked list,
    /// relevant set) query pairs.
    pub fn ranking_metrics(
        &self,
        model_name: &str,
        model_version: &str,
        ranked: &[Vec<String>],
        relevant: &[HashSet<String>],
        baselines: &HashMap<MetricName, f64>,
    ) -> Result<Vec<ModelPerformanceMetrics>, EncoreError> {
        if ranked.len() != relevant.len() {
            return Err(EncoreError::DimensionMismatch {
                left: ranked.len(),
                right: relevant.len(),
            });
        }
        if ranked.is_empty() {
            return Err(EncoreError::EmptySample {
                context: "ranking queries",
            });
        }

        let k = self.ranking_k;
        let precisions: Vec<f64> = ranked
            .iter()
            .zip(relevant)
            .map(|(r, rel)| precision_at_k(r, rel, k))
            .collect();
        let recalls: Vec<f64> = ranked
            .iter()
            .zip(relevant)
            .map(|(r, rel)| recall_at_k(r, rel, k))
            .collect();
        let aps: Vec<f64> = ranked
            .iter()
            .zip(relevant)
            .map(|(r, rel)| average_precision(r, rel, k))
            .collect();

        Ok(vec![
            self.observe(
                model_name,
                model_version,
                MetricName::PrecisionAtK,
                mean(&precisions),
                baselines,
            ),
            self.observe(
                model_name,
                model_version,
                MetricName::RecallAtK,
                mean(&recalls),
                baselines,
            ),
            self.observe(
                model_name,
                model_version,
                MetricName::MeanAveragePrecision,
                mean(&aps),
                baselines,
            ),
        ])
    }

    fn observe(
        &self,
        model_name: &str,
        model_version: &str,
        metric: MetricName,
        value: f64,
        baselines: &HashMap<MetricName, f64>,
    ) -> ModelPerformanceMetrics {
        let baseline = baselines.get(&metric).copied();
        ModelPerformanceMetrics {
            model_name: model_name.to_string(),
            model_version: model_version.to_string(),
            metric,
            value,
            baseline,
            threshold_breached: baseline
                .map_or(false, |b| self.breached(metric, value, b)),
            timestamp: Utc::now(),
        }
    }

    /// Relative degradation against the baseline. A non-positive baseline
    /// makes the relative check meaningless, so it is disabled for that
    /// metric.
    fn breached(&self, metric: MetricName, value: f64, baseline: f64) -> bool {
        if baseline <= 0.0 {
            return false;
        }
        match metric {
            MetricName::Mae => (value - baseline) / baseline > self.thresholds.mae_pct,
            MetricName::Rmse => (value - baseline) / baseline > self.thresholds.rmse_pct,
            MetricName::Mape => (value - baseline) / baseline > self.thresholds.mape_pct,
            MetricName::RSquared => (baseline - value) / baseline > self.thresholds.r_squared_pct,
            MetricName::PrecisionAtK => {
                (baseline - value) / baseline > self.thresholds.precision_pct
            }
            MetricName::RecallAtK => (baseline - value) / baseline > self.thresholds.recall_pct,
            MetricName::MeanAveragePrecision => {
                (baseline - value) / baseline > self.thresholds.map_pct
            }
        }
    }
}

fn precision_at_k(ranked: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if ranked.is_empty() {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|id| relevant.contains(*id)).count();
    hits as f64 / k.min(ranked.len()) as f64
}

fn recall_at_k(ranked: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|id| relevant.contains(*id)).count();
    hits as f64 / relevant.len() as f64
}

fn average_precision(ranked: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut precision_sum = 0.0;
    for (i, id) in ranked.iter().take(k).enumerate() {
        if relevant.contains(id) {
            hits += 1;
            precision_sum += hits as f64 / (i + 1) as f64;
        }
    }
    precision_sum / relevant.len() as f64
}
