use encore::algorithms::content::{ArtistWeights, ContentConfig, ContentFilter};
use encore::algorithms::drift::{DriftConfig, DriftDetector};
use encore::services::monitoring::{DriftCheck, MonitoringRequest, RegressionCheck};
use encore::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

fn seeded_state() -> AppState {
    let state = AppState::new(Config::default()).unwrap();

    state
        .catalog
        .add_artists(vec![
            ArtistFeatures::new("artA", "Artist A")
                .with_genres(["rock", "pop"])
                .with_popularity(80.0),
            ArtistFeatures::new("artB", "Artist B")
                .with_genres(["rock"])
                .with_popularity(70.0),
            ArtistFeatures::new("artC", "Artist C")
                .with_genres(["jazz"])
                .with_popularity(40.0),
        ])
        .unwrap();
    state
        .catalog
        .add_venues(vec![
            VenueFeatures::new("v1", "Downtown Hall", 40.73, -73.99, 1800, "theater"),
            VenueFeatures::new("v2", "Riverside Arena", 40.80, -73.96, 18000, "arena"),
        ])
        .unwrap();
    state
        .catalog
        .add_concerts(vec![
            Concert::new("concertA", "artA", "v1"),
            Concert::new("concertB", "artB", "v1"),
            Concert::new("concertC", "artB", "v2"),
            Concert::new("concertD", "artC", "v2"),
        ])
        .unwrap();
    state
        .catalog
        .add_interactions(vec![
            UserInteraction::new("user1", "concertA", InteractionType::Attended),
            UserInteraction::new("user1", "concertB", InteractionType::Purchased),
            UserInteraction::new("user2", "concertA", InteractionType::Attended),
            UserInteraction::new("user2", "concertC", InteractionType::Viewed),
        ])
        .unwrap();

    state
}

#[tokio::test]
async fn user_based_surfaces_the_neighbors_concert() {
    let state = seeded_state();
    let result = state
        .recommendation_service
        .recommend(
            &RecommendationContext::for_user("user1"),
            Strategy::CollaborativeUser,
            Some(5),
        )
        .await
        .unwrap();

    let ids: Vec<&str> = result.scores.iter().map(|s| s.target_id.as_str()).collect();
    assert!(ids.contains(&"concertC"), "expected concertC via user2 overlap");
    assert!(!ids.contains(&"concertA"));
    assert!(!ids.contains(&"concertB"));
    for rec in &result.scores {
        assert!(!rec.reasoning.is_empty());
        assert!((0.0..=1.0).contains(&rec.confidence));
    }
}

#[tokio::test]
async fn result_lists_are_strictly_ordered_with_id_tiebreak() {
    let state = seeded_state();
    for strategy in [
        Strategy::CollaborativeUser,
        Strategy::CollaborativeItem,
        Strategy::HybridAll,
    ] {
        let result = state
            .recommendation_service
            .recommend(
                &RecommendationContext {
                    user_id: Some("user1".to_string()),
                    seed_artists: vec!["artA".to_string()],
                    seed_venues: vec!["v1".to_string()],
                },
                strategy,
                Some(10),
            )
            .await
            .unwrap();
        for pair in result.scores.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].target_id < pair[1].target_id),
                "ordering violated for {strategy}"
            );
        }
    }
}

#[tokio::test]
async fn cold_user_is_an_empty_result_not_an_error() {
    let state = seeded_state();
    let result = state
        .recommendation_service
        .recommend(
            &RecommendationContext::for_user("nobody"),
            Strategy::CollaborativeUser,
            None,
        )
        .await
        .unwrap();
    assert!(result.scores.is_empty());
    assert!(result.note.is_some());
}

#[tokio::test]
async fn batch_processes_contexts_independently() {
    let state = seeded_state();
    let contexts = vec![
        RecommendationContext::for_user("user1"),
        RecommendationContext::for_user("nobody"),
        RecommendationContext::for_user("user2"),
    ];
    let results = state
        .recommendation_service
        .recommend_batch(&contexts, Strategy::CollaborativeUser, Some(5))
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(!results[0].scores.is_empty());
    assert!(results[1].scores.is_empty());
    assert_eq!(results[0].context_id, "user1");
    assert_eq!(results[2].context_id, "user2");
}

#[test]
fn artist_composite_matches_the_worked_example() {
    let filter = ContentFilter::new(ContentConfig::default()).unwrap();
    let a = ArtistFeatures::new("artA", "Artist A")
        .with_genres(["rock", "pop"])
        .with_popularity(80.0);
    let b = ArtistFeatures::new("artB", "Artist B")
        .with_genres(["rock"])
        .with_popularity(70.0);

    let sim = filter.artist_similarity(&a, &b).unwrap();
    assert!((sim - 0.72).abs() < 1e-6);
}

#[test]
fn invalid_composite_weights_fail_at_construction() {
    let config = ContentConfig {
        artist_weights: ArtistWeights {
            genre: 0.5,
            popularity: 0.6,
            era: 0.2,
        },
        ..ContentConfig::default()
    };
    assert!(ContentFilter::new(config).is_err());
}

#[tokio::test]
async fn mae_regression_past_threshold_raises_a_high_trigger() {
    let state = seeded_state();

    let mut baselines = HashMap::new();
    baselines.insert(MetricName::Mae, 400.0);
    let request = MonitoringRequest {
        model_name: "attendance-forecaster".to_string(),
        model_version: "2024-06".to_string(),
        drift_checks: Vec::new(),
        regression: Some(RegressionCheck {
            predictions: vec![1500.0, 2500.0, 3500.0, 4500.0],
            actuals: vec![1000.0, 2000.0, 3000.0, 4000.0],
        }),
        ranking: None,
        baselines,
    };

    let report = state.monitoring_service.run_checks(&request).await.unwrap();

    let mae = report
        .performance_metrics
        .iter()
        .find(|m| m.metric == MetricName::Mae)
        .unwrap();
    assert!((mae.value - 500.0).abs() < 1e-9);
    assert!(mae.threshold_breached);

    assert_eq!(report.triggers.len(), 1);
    assert!(report.triggers[0].severity >= TriggerSeverity::High);
    assert!(report.triggers[0].retraining_recommended);

    let stored = state
        .monitoring_service
        .triggers(Some("attendance-forecaster"), Some(TriggerSeverity::High));
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn monitoring_report_round_trips_through_json() {
    let state = seeded_state();
    let sample: Vec<f64> = (0..200).map(|i| (i % 50) as f64).collect();
    let request = MonitoringRequest {
        model_name: "ranker".to_string(),
        model_version: "v3".to_string(),
        drift_checks: vec![DriftCheck {
            method: DriftMethod::Psi,
            baseline: sample.clone(),
            current: sample,
        }],
        regression: None,
        ranking: None,
        baselines: HashMap::new(),
    };

    let report = state.monitoring_service.run_checks(&request).await.unwrap();
    let json = serde_json::to_string(&report).unwrap();
    let parsed: MonitoringReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.model_name, "ranker");
    assert_eq!(parsed.drift_results.len(), 1);
    assert!(!parsed.drift_results[0].drift_detected);
}

#[test]
fn psi_flags_a_shifted_distribution() {
    let detector = DriftDetector::new(DriftConfig::default());
    let mut rng = StdRng::seed_from_u64(7);

    // Roughly normal via averaged uniforms, then shift by several standard
    // deviations.
    let noise = |rng: &mut StdRng| -> f64 {
        (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
    };
    let baseline: Vec<f64> = (0..1000).map(|_| noise(&mut rng)).collect();
    let current: Vec<f64> = (0..1000).map(|_| noise(&mut rng) + 4.0).collect();

    let result = detector
        .detect("m", "v", DriftMethod::Psi, &baseline, &current)
        .unwrap();
    assert!(result.score >= 0.2);
    assert!(result.drift_detected);

    let same = detector
        .detect("m", "v", DriftMethod::Psi, &baseline, &baseline)
        .unwrap();
    assert!(same.score.abs() < 1e-9);
}

#[test]
fn ks_test_accepts_same_distribution_in_most_trials() {
    let detector = DriftDetector::new(DriftConfig::default());
    let mut rng = StdRng::seed_from_u64(42);

    let trials = 100;
    let mut accepted = 0;
    for _ in 0..trials {
        let a: Vec<f64> = (0..200).map(|_| rng.gen::<f64>()).collect();
        let b: Vec<f64> = (0..200).map(|_| rng.gen::<f64>()).collect();
        let result = detector
            .detect("m", "v", DriftMethod::KsTest, &a, &b)
            .unwrap();
        if result.p_value.unwrap() > 0.05 {
            accepted += 1;
        }
    }

    // The expected acceptance rate is 95%; leave slack for the asymptotic
    // approximation.
    assert!(accepted >= 90, "only {accepted}/{trials} trials accepted");
}

#[tokio::test]
async fn hybrid_all_with_seeds_only_still_works() {
    let state = seeded_state();
    let result = state
        .recommendation_service
        .recommend(
            &RecommendationContext {
                user_id: None,
                seed_artists: vec!["artC".to_string()],
                seed_venues: vec![],
            },
            Strategy::HybridAll,
            Some(5),
        )
        .await
        .unwrap();
    assert!(!result.scores.is_empty());
    assert_eq!(result.scores[0].target_id, "concertD");
}

#[tokio::test]
async fn fully_empty_context_is_a_validation_error() {
    let state = seeded_state();
    let result = state
        .recommendation_service
        .recommend(&RecommendationContext::default(), Strategy::HybridAll, None)
        .await;
    assert!(result.is_err());
}
