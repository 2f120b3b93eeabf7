use crate::algorithms::drift::DriftDetector;
use crate::config::Config;
use crate::models::*;
use crate::utils::metrics::PerformanceMonitor;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Seam for the alerting collaborator. The orchestrator never calls any
/// external alarm API itself; implementations forward triggers wherever
/// the deployment wants them.
#[async_trait]
pub trait TriggerPublisher: Send + Sync {
    async fn publish(&self, trigger: &RetrainingTrigger) -> Result<()>;
}

/// Default publisher: a structured log line and nothing else.
pub struct LogPublisher;

#[async_trait]
impl TriggerPublisher for LogPublisher {
    async fn publish(&self, trigger: &RetrainingTrigger) -> Result<()> {
        warn!(
            "retraining trigger for {}:{} severity {:?}: {}",
            trigger.model_name, trigger.model_version, trigger.severity, trigger.reason
        );
        Ok(())
    }
}

/// One drift comparison to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftCheck {
    pub method: DriftMethod,
    pub baseline: Vec<f64>,
    pub current: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionCheck {
    pub predictions: Vec<f64>,
    pub actuals: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingCheck {
    pub ranked: Vec<Vec<String>>,
    pub relevant: Vec<HashSet<String>>,
}

/// Everything the model-serving collaborator supplies for one monitoring
/// pass over a model+version pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRequest {
    pub model_name: String,
    pub model_version: String,
    #[serde(default)]
    pub drift_checks: Vec<DriftCheck>,
    #[serde(default)]
    pub regression: Option<RegressionCheck>,
    #[serde(default)]
    pub ranking: Option<RankingCheck>,
    #[serde(default)]
    pub baselines: HashMap<MetricName, f64>,
}

/// Composes drift detection and performance monitoring into retraining
/// triggers and an exportable report. The trigger history is the one piece
/// of shared mutable state in the system and is lock-guarded for
/// concurrent monitoring calls.
pub struct MonitoringService {
    config: Arc<Config>,
    detector: DriftDetector,
    monitor: PerformanceMonitor,
    history: RwLock<Vec<RetrainingTrigger>>,
    publisher: Arc<dyn TriggerPublisher>,
}

impl MonitoringService {
    pub fn new(config: Arc<Config>) -> Self {
        let detector = DriftDetector::new(config.monitoring.drift.clone());
        let monitor = PerformanceMonitor::new(
            config.monitoring.performance,
            config.monitoring.ranking_k,
        );
        Self {
            config,
            detector,
            monitor,
            history: RwLock::new(Vec::new()),
            publisher: Arc::new(LogPublisher),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn TriggerPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Run every requested check, derive a trigger when signals warrant
    /// one, append it to the history, and hand back the full report.
    pub async fn run_checks(&self, request: &MonitoringRequest) -> Result<MonitoringReport> {
        let mut drift_results = Vec::with_capacity(request.drift_checks.len());
        for check in &request.drift_checks {
            drift_results.push(self.detector.detect(
                &request.model_name,
                &request.model_version,
                check.method,
                &check.baseline,
                &check.current,
            )?);
        }

        let mut performance_metrics = Vec::new();
        if let Some(regression) = &request.regression {
            performance_metrics.extend(self.monitor.regression_metrics(
                &request.model_name,
                &request.model_version,
                &regression.predictions,
                &regression.actuals,
                &request.baselines,
            )?);
        }
        if let Some(ranking) = &request.ranking {
            performance_metrics.extend(self.monitor.ranking_metrics(
                &request.model_name,
                &request.model_version,
                &ranking.ranked,
                &ranking.relevant,
                &request.baselines,
            )?);
        }

        let triggers = match self.evaluate(request, &drift_results, &performance_metrics) {
            Some(trigger) => {
                self.history.write().push(trigger.clone());
                if let Err(err) = self.publisher.publish(&trigger).await {
                    warn!("trigger publisher failed: {err}");
                }
                vec![trigger]
            }
            None => Vec::new(),
        };

        info!(
            "monitoring pass for {}:{} ran {} drift checks, {} metrics, {} triggers",
            request.model_name,
            request.model_version,
            drift_results.len(),
            performance_metrics.len(),
            triggers.len()
        );

        Ok(MonitoringReport {
            id: Uuid::new_v4(),
            model_name: request.model_name.clone(),
            model_version: request.model_version.clone(),
            drift_results,
            performance_metrics,
            triggers,
            generated_at: Utc::now(),
        })
    }

    /// Severity rule table: critical signal → Critical; any flagged drift
    /// or breached metric → High; two or more moderate signals → Medium;
    /// signals without a moderate one → Low; nothing → no trigger.
    fn evaluate(
        &self,
        request: &MonitoringRequest,
        drift_results: &[DriftDetectionResult],
        metrics: &[ModelPerformanceMetrics],
    ) -> Option<RetrainingTrigger> {
        let drift_cfg = &self.config.monitoring.drift;
        let mut critical = Vec::new();
        let mut hard = Vec::new();
        let mut moderate = Vec::new();
        let mut informational = Vec::new();

        for result in drift_results {
            let label = match result.method {
                DriftMethod::Psi => "PSI",
                DriftMethod::KsTest => "KS",
                DriftMethod::ChiSquare => "chi-square",
            };
            if result.method == DriftMethod::Psi && result.score >= drift_cfg.psi_critical {
                critical.push(format!("PSI {:.3} at or above critical {:.2}", result.score, drift_cfg.psi_critical));
            } else if result.drift_detected {
                hard.push(match result.p_value {
                    Some(p) => format!("{label} flagged drift (p={p:.4})"),
                    None => format!("{label} flagged drift (score {:.3})", result.score),
                });
            } else if result.method == DriftMethod::Psi && result.score >= 0.1 {
                moderate.push(format!("PSI {:.3} in the moderate band", result.score));
            } else if result.low_confidence {
                informational.push(format!("{label} ran on an undersized sample"));
            }
        }

        for metric in metrics {
            let degradation = metric
                .baseline
                .filter(|b| *b > 0.0)
                .map(|b| relative_degradation(metric.metric, metric.value, b));
            if metric.metric == MetricName::RSquared {
                if let Some(d) = degradation {
                    if d > self.config.monitoring.r_squared_critical_drop {
                        critical.push(format!(
                            "R² dropped {:.0}% against baseline",
                            d * 100.0
                        ));
                        continue;
                    }
                }
            }
            if metric.threshold_breached {
                hard.push(format!(
                    "{} {:.4} degraded past tolerance (baseline {:.4})",
                    metric.metric,
                    metric.value,
                    metric.baseline.unwrap_or_default()
                ));
            } else if let Some(d) = degradation {
                let tolerance = self.tolerance(metric.metric);
                if d > tolerance / 2.0 {
                    moderate.push(format!(
                        "{} drifting toward tolerance ({:.0}% of {:.0}%)",
                        metric.metric,
                        d * 100.0,
                        tolerance * 100.0
                    ));
                }
            }
        }

        let (severity, mut reasons) = if !critical.is_empty() {
            critical.extend(hard);
            (TriggerSeverity::Critical, critical)
        } else if !hard.is_empty() {
            (TriggerSeverity::High, hard)
        } else if moderate.len() >= 2 {
            (TriggerSeverity::Medium, moderate)
        } else if !moderate.is_empty() || !informational.is_empty() {
            moderate.extend(informational);
            (TriggerSeverity::Low, moderate)
        } else {
            return None;
        };
        reasons.dedup();

        Some(RetrainingTrigger {
            id: Uuid::new_v4(),
            model_name: request.model_name.clone(),
            model_version: request.model_version.clone(),
            reason: reasons.join("; "),
            severity,
            retraining_recommended: severity >= TriggerSeverity::High,
            timestamp: Utc::now(),
        })
    }

    fn tolerance(&self, metric: MetricName) -> f64 {
        let t = &self.config.monitoring.performance;
        match metric {
            MetricName::Mae => t.mae_pct,
            MetricName::Rmse => t.rmse_pct,
            MetricName::Mape => t.mape_pct,
            MetricName::RSquared => t.r_squared_pct,
            MetricName::PrecisionAtK => t.precision_pct,
            MetricName::RecallAtK => t.recall_pct,
            MetricName::MeanAveragePrecision => t.map_pct,
        }
    }

    /// Query the append-only trigger history, optionally filtered by model
    /// name and minimum severity.
    pub fn triggers(
        &self,
        model_name: Option<&str>,
        min_severity: Option<TriggerSeverity>,
    ) -> Vec<RetrainingTrigger> {
        self.history
            .read()
            .iter()
            .filter(|t| model_name.map_or(true, |m| t.model_name == m))
            .filter(|t| min_severity.map_or(true, |s| t.severity >= s))
            .cloned()
            .collect()
    }

    pub fn trigger_count(&self) -> usize {
        self.history.read().len()
    }
}

/// Positive values mean worse-than-baseline, regardless of metric
/// direction.
fn relative_degradation(metric: MetricName, value: f64, baseline: f64) -> f64 {
    match metric {
        MetricName::Mae | MetricName::Rmse | MetricName::Mape => (value - baseline) / baseline,
        _ => (baseline - value) / baseline,
    }
}
