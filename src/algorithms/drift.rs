use crate::error::EncoreError;
use crate::models::{DriftDetectionResult, DriftMethod};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Thresholds and numeric guards for the statistical tests. The epsilon
/// substitution and minimum sample size are tunables, not load-bearing
/// constants; the defaults follow common monitoring practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Quantile bins derived from the baseline sample.
    pub bins: usize,
    /// Substituted for zero bin proportions so ln(p/q) stays defined.
    pub psi_epsilon: f64,
    /// PSI at or above this flags drift; 0.1-0.2 reads as moderate.
    pub psi_threshold: f64,
    /// PSI at or above this is treated as a critical signal downstream.
    pub psi_critical: f64,
    pub ks_significance: f64,
    pub chi_square_significance: f64,
    /// Samples smaller than this still compute but are marked
    /// low-confidence.
    pub min_sample_size: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            psi_epsilon: 1e-4,
            psi_threshold: 0.2,
            psi_critical: 0.3,
            ks_significance: 0.05,
            chi_square_significance: 0.05,
            min_sample_size: 30,
        }
    }
}

struct TestOutcome {
    score: f64,
    p_value: Option<f64>,
    drift_detected: bool,
    warning: Option<String>,
}

/// Stateless drift detector: every call is a pure function of
/// (baseline, current, method, config).
#[derive(Debug, Clone)]
pub struct DriftDetector {
    config: DriftConfig,
}

impl DriftDetector {
    pub fn new(config: DriftConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn detect(
        &self,
        model_name: &str,
        model_version: &str,
        method: DriftMethod,
        baseline: &[f64],
        current: &[f64],
    ) -> Result<DriftDetectionResult, EncoreError> {
        validate_sample(baseline, "baseline")?;
        validate_sample(current, "current")?;

        let outcome = match method {
            DriftMethod::Psi => self.psi(baseline, current),
            DriftMethod::KsTest => self.ks_test(baseline, current),
            DriftMethod::ChiSquare => self.chi_square(baseline, current),
        };

        let min = self.config.min_sample_size;
        let low_confidence = baseline.len() < min || current.len() < min;
        let warning = if low_confidence {
            let sized = format!(
                "sample below the {} observations needed for a reliable statistic (baseline {}, current {})",
                min,
                baseline.len(),
                current.len()
            );
            Some(match outcome.warning {
                Some(prior) => format!("{prior}; {sized}"),
                None => sized,
            })
        } else {
            outcome.warning
        };

        Ok(DriftDetectionResult {
            model_name: model_name.to_string(),
            model_version: model_version.to_string(),
            method,
            score: outcome.score,
            drift_detected: outcome.drift_detected,
            p_value: outcome.p_value,
            low_confidence,
            warning,
            timestamp: Utc::now(),
        })
    }

    /// Population Stability Index over baseline-quantile bins.
    fn psi(&self, baseline: &[f64], current: &[f64]) -> TestOutcome {
        let edges = quantile_edges(baseline, self.config.bins);
        let base_pct = bin_proportions(baseline, &edges, self.config.bins);
        let cur_pct = bin_proportions(current, &edges, self.config.bins);

        let eps = self.config.psi_epsilon;
        let score: f64 = base_pct
            .iter()
            .zip(cur_pct.iter())
            .map(|(&b, &c)| {
                let b = if b == 0.0 { eps } else { b };
                let c = if c == 0.0 { eps } else { c };
                (c - b) * (c / b).ln()
            })
            .sum();

        TestOutcome {
            score,
            p_value: None,
            drift_detected: score >= self.config.psi_threshold,
            warning: None,
        }
    }

    /// Two-sample Kolmogorov-Smirnov statistic with the asymptotic
    /// p-value.
    fn ks_test(&self, baseline: &[f64], current: &[f64]) -> TestOutcome {
        let mut a = baseline.to_vec();
        let mut b = current.to_vec();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
        b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

        let (n1, n2) = (a.len() as f64, b.len() as f64);
        let (mut i, mut j) = (0usize, 0usize);
        let mut d: f64 = 0.0;
        while i < a.len() && j < b.len() {
            let x = a[i].min(b[j]);
            while i < a.len() && a[i] <= x {
                i += 1;
            }
            while j < b.len() && b[j] <= x {
                j += 1;
            }
            d = d.max((i as f64 / n1 - j as f64 / n2).abs());
        }

        let p = ks_p_value(d, n1, n2);
        TestOutcome {
            score: d,
            p_value: Some(p),
            drift_detected: p < self.config.ks_significance,
            warning: None,
        }
    }

    /// Pearson chi-square over the 2×bins contingency table built from
    /// baseline-quantile binning.
    fn chi_square(&self, baseline: &[f64], current: &[f64]) -> TestOutcome {
        let edges = quantile_edges(baseline, self.config.bins);
        let base_counts = bin_counts(baseline, &edges, self.config.bins);
        let cur_counts = bin_counts(current, &edges, self.config.bins);

        let n1: f64 = base_counts.iter().sum::<usize>() as f64;
        let n2: f64 = cur_counts.iter().sum::<usize>() as f64;
        let grand = n1 + n2;

        let mut stat = 0.0;
        let mut populated = 0usize;
        for (&o1, &o2) in base_counts.iter().zip(cur_counts.iter()) {
            let col = (o1 + o2) as f64;
            if col == 0.0 {
                continue;
            }
            populated += 1;
            let e1 = n1 * col / grand;
            let e2 = n2 * col / grand;
            stat += (o1 as f64 - e1).powi(2) / e1 + (o2 as f64 - e2).powi(2) / e2;
        }

        if populated < 2 {
            return TestOutcome {
                score: stat,
                p_value: None,
                drift_detected: false,
                warning: Some("fewer than two populated bins, chi-square not meaningful".to_string()),
            };
        }

        let dof = (populated - 1) as f64;
        let p_value = match ChiSquared::new(dof) {
            Ok(dist) => Some(1.0 - dist.cdf(stat)),
            Err(_) => None,
        };

        TestOutcome {
            score: stat,
            drift_detected: p_value.map_or(false, |p| p < self.config.chi_square_significance),
            p_value,
            warning: None,
        }
    }
}

fn validate_sample(sample: &[f64], context: &'static str) -> Result<(), EncoreError> {
    if sample.is_empty() {
        return Err(EncoreError::EmptySample { context });
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(EncoreError::NonFiniteInput { context });
    }
    Ok(())
}

/// Interior bin edges at the baseline's i/bins quantiles.
fn quantile_edges(baseline: &[f64], bins: usize) -> Vec<f64> {
    let mut sorted = baseline.to_vec();
    sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    (1..bins)
        .map(|i| {
            let pos = i * sorted.len() / bins;
            sorted[pos.min(sorted.len() - 1)]
        })
        .collect()
}

fn bin_counts(sample: &[f64], edges: &[f64], bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    for &x in sample {
        let idx = edges.partition_point(|&e| e < x).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

fn bin_proportions(sample: &[f64], edges: &[f64], bins: usize) -> Vec<f64> {
    let n = sample.len() as f64;
    bin_counts(sample, edges, bins)
        .into_iter()
        .map(|c| c as f64 / n)
        .collect()
}

/// Asymptotic two-sample KS p-value (Kolmogorov distribution tail).
fn ks_p_value(d: f64, n1: f64, n2: f64) -> f64 {
    if d <= 0.0 {
        return 1.0;
    }
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let term = sign * (-2.0 * (k as f64).powi(2) * lambda * lambda).exp();
        sum += term;
        sign = -sign;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DriftDetector {
        DriftDetector::new(DriftConfig::default())
    }

    /// Deterministic roughly-uniform sample.
    fn spread(n: usize, offset: f64) -> Vec<f64> {
        (0..n).map(|i| offset + (i % 97) as f64).collect()
    }

    #[test]
    fn psi_self_comparison_is_zero() {
        let sample = spread(500, 0.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::Psi, &sample, &sample)
            .unwrap();
        assert!(result.score.abs() < 1e-9);
        assert!(!result.drift_detected);
        assert!(!result.low_confidence);
    }

    #[test]
    fn psi_flags_a_large_shift() {
        let baseline = spread(500, 0.0);
        let current = spread(500, 300.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::Psi, &baseline, &current)
            .unwrap();
        assert!(result.score >= 0.2);
        assert!(result.drift_detected);
    }

    #[test]
    fn ks_accepts_identical_samples() {
        let sample = spread(400, 0.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::KsTest, &sample, &sample)
            .unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.p_value.unwrap() > 0.05);
        assert!(!result.drift_detected);
    }

    #[test]
    fn ks_flags_a_shifted_sample() {
        let baseline = spread(400, 0.0);
        let current = spread(400, 60.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::KsTest, &baseline, &current)
            .unwrap();
        assert!(result.p_value.unwrap() < 0.05);
        assert!(result.drift_detected);
    }

    #[test]
    fn chi_square_flags_disjoint_distributions() {
        let baseline = spread(300, 0.0);
        let current = spread(300, 500.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::ChiSquare, &baseline, &current)
            .unwrap();
        assert!(result.drift_detected);
        assert!(result.p_value.unwrap() < 0.05);
    }

    #[test]
    fn chi_square_accepts_identical_samples() {
        let sample = spread(300, 0.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::ChiSquare, &sample, &sample)
            .unwrap();
        assert!(!result.drift_detected);
    }

    #[test]
    fn small_samples_are_marked_low_confidence() {
        let baseline = spread(10, 0.0);
        let current = spread(10, 1.0);
        let result = detector()
            .detect("model", "v1", DriftMethod::Psi, &baseline, &current)
            .unwrap();
        assert!(result.low_confidence);
        assert!(result.warning.is_some());
    }

    #[test]
    fn degenerate_inputs_fail_fast() {
        let d = detector();
        assert!(matches!(
            d.detect("m", "v", DriftMethod::Psi, &[], &[1.0]),
            Err(EncoreError::EmptySample { .. })
        ));
        assert!(matches!(
            d.detect("m", "v", DriftMethod::KsTest, &[1.0, f64::NAN], &[1.0]),
            Err(EncoreError::NonFiniteInput { .. })
        ));
    }
}
