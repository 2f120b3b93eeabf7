use criterion::{black_box, criterion_group, criterion_main, Criterion};
use encore::algorithms::collaborative::{
    user_based_recommendations, InteractionMatrix, WeightingMode,
};
use encore::algorithms::drift::{DriftConfig, DriftDetector};
use encore::models::{DriftMethod, InteractionType, UserInteraction};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_interactions(users: usize, concerts: usize, per_user: usize) -> Vec<UserInteraction> {
    let mut rng = StdRng::seed_from_u64(1);
    let mut interactions = Vec::with_capacity(users * per_user);
    for u in 0..users {
        for _ in 0..per_user {
            let c = rng.gen_range(0..concerts);
            let interaction = match rng.gen_range(0..3) {
                0 => InteractionType::Attended,
                1 => InteractionType::Purchased,
                _ => InteractionType::Viewed,
            };
            interactions.push(UserInteraction::new(
                format!("user-{u}"),
                format!("concert-{c}"),
                interaction,
            ));
        }
    }
    interactions
}

fn bench_matrix_build(c: &mut Criterion) {
    let interactions = synthetic_interactions(500, 300, 20);
    c.bench_function("matrix_build_500x300", |b| {
        b.iter(|| {
            black_box(InteractionMatrix::from_interactions(
                black_box(&interactions),
                &WeightingMode::TypeWeight,
            ))
        })
    });
}

fn bench_user_based(c: &mut Criterion) {
    let interactions = synthetic_interactions(500, 300, 20);
    let matrix = InteractionMatrix::from_interactions(&interactions, &WeightingMode::TypeWeight);
    c.bench_function("user_based_recommend", |b| {
        b.iter(|| {
            black_box(user_based_recommendations(
                black_box(&matrix),
                "user-42",
                10,
                10,
            ))
        })
    });
}

fn bench_psi(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let baseline: Vec<f64> = (0..10_000).map(|_| rng.gen::<f64>() * 100.0).collect();
    let current: Vec<f64> = (0..10_000).map(|_| rng.gen::<f64>() * 100.0 + 15.0).collect();
    let detector = DriftDetector::new(DriftConfig::default());

    c.bench_function("psi_10k", |b| {
        b.iter(|| {
            black_box(
                detector
                    .detect("bench", "v1", DriftMethod::Psi, &baseline, &current)
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_matrix_build, bench_user_based, bench_psi);
criterion_main!(benches);
