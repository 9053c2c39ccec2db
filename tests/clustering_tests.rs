mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::assertions::assert_valid_clustering;
use common::features::{blob_features, random_binary_features, random_features, six_points};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use mosaic::cluster::seeding::{dispersion, draw_medoids};
use mosaic::cluster::{ClusterPhase, DistanceMatrix, KMedoidsConfig, MedoidClusterer};
use mosaic::error::MosaicError;
use mosaic::features::FeatureSet;
use mosaic::types::{Metric, RefinementStrategy, SeedingStrategy};

fn config(k: usize, seed: u64) -> KMedoidsConfig {
    KMedoidsConfig {
        seed: Some(seed),
        threads: 2,
        ..KMedoidsConfig::new(k)
    }
}

#[test]
fn test_two_clouds_one_medoid_each() {
    let features = six_points();
    let clustering = MedoidClusterer::new(config(2, 42))
        .fit(&features, Metric::Euclidean)
        .unwrap();

    assert_valid_clustering(&clustering, 2, 6);
    assert!(clustering.converged());
    assert!(clustering.iterations <= 2, "took {} iterations", clustering.iterations);

    let clouds: HashSet<usize> = clustering.medoids.iter().map(|&m| m / 3).collect();
    assert_eq!(clouds.len(), 2, "medoids {:?} share a cloud", clustering.medoids);

    // (0,0) and (10,10) are the most central point of each cloud.
    let mut medoids = clustering.medoids.clone();
    medoids.sort_unstable();
    assert_eq!(medoids, vec![0, 3]);

    assert_eq!(clustering.labels[0], clustering.labels[1]);
    assert_eq!(clustering.labels[1], clustering.labels[2]);
    assert_eq!(clustering.labels[3], clustering.labels[4]);
    assert_eq!(clustering.labels[4], clustering.labels[5]);
    assert_ne!(clustering.labels[0], clustering.labels[3]);
}

#[test]
fn test_two_clouds_with_random_seeding() {
    let features = six_points();
    // Enough attempts that at least one draw spans both clouds; such a
    // draw always has the lowest dispersion.
    let clustering = MedoidClusterer::new(KMedoidsConfig {
        seeding: SeedingStrategy::Random,
        seed_attempts: 16,
        ..config(2, 42)
    })
    .fit(&features, Metric::Euclidean)
    .unwrap();

    assert_valid_clustering(&clustering, 2, 6);
    assert!(clustering.converged());
    assert!(clustering.iterations <= 2, "took {} iterations", clustering.iterations);

    let mut medoids = clustering.medoids.clone();
    medoids.sort_unstable();
    assert_eq!(medoids, vec![0, 3]);
    assert_ne!(clustering.labels[0], clustering.labels[3]);
}

#[test]
fn test_random_seeding_is_deterministic() {
    let features = random_features(80, 8, 7);
    let clusterer = MedoidClusterer::new(KMedoidsConfig {
        seeding: SeedingStrategy::Random,
        ..config(6, 1234)
    });

    let first = clusterer.fit(&features, Metric::Euclidean).unwrap();
    let second = clusterer.fit(&features, Metric::Euclidean).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_cheapest_seed_attempt_wins() {
    let features = random_features(40, 3, 19);
    let matrix = DistanceMatrix::build(&features, Metric::Euclidean);
    let base = 77u64;
    let attempts = 6;

    for seeding in [SeedingStrategy::Random, SeedingStrategy::KMeansPlusPlus] {
        let costs: Vec<f64> = (0..attempts)
            .map(|a| {
                let mut rng = StdRng::seed_from_u64(base + a as u64);
                dispersion(&matrix, &draw_medoids(&matrix, 4, seeding, &mut rng))
            })
            .collect();
        let min = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let first_min = costs.iter().position(|&c| c == min).unwrap();

        let clustering = MedoidClusterer::new(KMedoidsConfig {
            seeding,
            seed_attempts: attempts,
            ..config(4, base)
        })
        .fit_matrix(&matrix)
        .unwrap();

        assert_eq!(clustering.seed_cost, min, "{seeding}: costs {costs:?}");
        assert_eq!(clustering.seed_attempt, first_min, "{seeding}");
    }
}

#[test]
fn test_fixed_seed_is_deterministic() {
    let features = random_features(80, 8, 7);
    let clusterer = MedoidClusterer::new(config(6, 1234));

    let first = clusterer.fit(&features, Metric::Euclidean).unwrap();
    let second = clusterer.fit(&features, Metric::Euclidean).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_result_independent_of_thread_count() {
    let features = random_features(60, 4, 3);
    let single = MedoidClusterer::new(KMedoidsConfig {
        threads: 1,
        ..config(5, 99)
    })
    .fit(&features, Metric::Euclidean)
    .unwrap();
    let many = MedoidClusterer::new(KMedoidsConfig {
        threads: 4,
        ..config(5, 99)
    })
    .fit(&features, Metric::Euclidean)
    .unwrap();

    assert_eq!(single.medoids, many.medoids);
    assert_eq!(single.seed_attempt, many.seed_attempt);
}

#[test]
fn test_k_greater_than_n_fails_before_any_distance() {
    let features = random_features(5, 3, 1);
    let calls = AtomicUsize::new(0);
    let clusterer = MedoidClusterer::new(config(6, 0));

    let err = clusterer
        .fit_with(&features, |a, b| {
            calls.fetch_add(1, Ordering::Relaxed);
            Metric::Euclidean.distance(a, b)
        })
        .unwrap_err();

    assert!(matches!(err, MosaicError::Configuration(_)), "got {err:?}");
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_invalid_configurations_rejected() {
    let features = random_features(10, 2, 1);

    let empty = FeatureSet::new(2);
    let err = MedoidClusterer::new(config(1, 0))
        .fit(&empty, Metric::Euclidean)
        .unwrap_err();
    assert!(matches!(err, MosaicError::Configuration(_)));

    for bad in [
        config(0, 0),
        KMedoidsConfig {
            max_iter: 0,
            ..config(2, 0)
        },
        KMedoidsConfig {
            seed_attempts: 0,
            ..config(2, 0)
        },
    ] {
        let err = MedoidClusterer::new(bad.clone())
            .fit(&features, Metric::Euclidean)
            .unwrap_err();
        assert!(
            matches!(err, MosaicError::Configuration(_)),
            "{bad:?} gave {err:?}"
        );
    }
}

#[test]
fn test_hamming_requires_binary_features() {
    let features = random_features(10, 4, 1);
    let err = MedoidClusterer::new(config(2, 0))
        .fit(&features, Metric::Hamming)
        .unwrap_err();
    assert!(matches!(err, MosaicError::Configuration(_)));
}

#[test]
fn test_hamming_over_packed_descriptors() {
    let features = random_binary_features(40, 4, 5);
    assert_eq!(features.dim(), 32);

    let clustering = MedoidClusterer::new(config(4, 8))
        .fit(&features, Metric::Hamming)
        .unwrap();
    assert_valid_clustering(&clustering, 4, 40);
}

#[test]
fn test_batched_and_per_cluster_agree() {
    let centers = vec![
        vec![0.0, 0.0, 0.0],
        vec![5.0, 5.0, 0.0],
        vec![0.0, 5.0, 5.0],
        vec![5.0, 0.0, 5.0],
    ];
    let features = blob_features(&centers, 25, 1.5, 11);
    let matrix = DistanceMatrix::build(&features, Metric::Euclidean);

    for seeding in [SeedingStrategy::Random, SeedingStrategy::KMeansPlusPlus] {
        let run = |refinement| {
            MedoidClusterer::new(KMedoidsConfig {
                seeding,
                refinement,
                ..config(4, 2024)
            })
            .fit_matrix(&matrix)
            .unwrap()
        };
        let batched = run(RefinementStrategy::Batched);
        let per_cluster = run(RefinementStrategy::PerCluster);

        assert_eq!(batched.medoids, per_cluster.medoids, "{seeding}");
        assert_eq!(batched.labels, per_cluster.labels, "{seeding}");
        assert_eq!(batched.iterations, per_cluster.iterations, "{seeding}");
    }
}

#[test]
fn test_fit_on_precomputed_matrix() {
    // Points on a line at 0, 1 and 10.
    let matrix = DistanceMatrix::from_raw(vec![
        0.0, 1.0, 10.0, //
        1.0, 0.0, 9.0, //
        10.0, 9.0, 0.0,
    ])
    .unwrap();
    let clustering = MedoidClusterer::new(config(2, 3))
        .fit_matrix(&matrix)
        .unwrap();

    assert_valid_clustering(&clustering, 2, 3);
    assert!(clustering.medoids.contains(&2), "{:?}", clustering.medoids);
    assert_eq!(clustering.labels[0], clustering.labels[1]);
    assert!(clustering.converged());

    let asymmetric = DistanceMatrix::from_raw(vec![0.0, 1.0, 2.0, 0.0]).unwrap_err();
    assert!(matches!(asymmetric, MosaicError::Validation(_)), "got {asymmetric:?}");
}

#[test]
fn test_duplicate_samples_still_give_k_medoids() {
    let rows = vec![vec![1.0f32, 1.0]; 12];
    let features = FeatureSet::from_rows(&rows).unwrap();

    for seeding in [SeedingStrategy::Random, SeedingStrategy::KMeansPlusPlus] {
        let clustering = MedoidClusterer::new(KMedoidsConfig {
            seeding,
            ..config(3, 5)
        })
        .fit(&features, Metric::Euclidean)
        .unwrap();

        assert_valid_clustering(&clustering, 3, 12);
        assert!(clustering.converged());
        assert_eq!(clustering.seed_cost, 0.0);
    }
}

#[test]
fn test_k_equal_to_n_keeps_every_sample() {
    let features = random_features(7, 3, 2);
    let clustering = MedoidClusterer::new(config(7, 3))
        .fit(&features, Metric::Euclidean)
        .unwrap();

    let mut medoids = clustering.medoids.clone();
    medoids.sort_unstable();
    assert_eq!(medoids, (0..7).collect::<Vec<_>>());
    assert_eq!(clustering.phase, ClusterPhase::Converged);
    assert_eq!(clustering.iterations, 1);
}

#[test]
fn test_max_iter_bounds_iterations() {
    let features = random_features(50, 4, 13);
    let clustering = MedoidClusterer::new(KMedoidsConfig {
        max_iter: 1,
        ..config(5, 17)
    })
    .fit(&features, Metric::Euclidean)
    .unwrap();

    assert_eq!(clustering.iterations, 1);
    assert!(matches!(
        clustering.phase,
        ClusterPhase::Converged | ClusterPhase::MaxIterReached
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_medoid_set_has_exactly_k_unique_entries(
        n in 1usize..30,
        k_frac in 0.0f64..1.0,
        seed in any::<u64>(),
        batched in any::<bool>(),
    ) {
        let k = ((n as f64 * k_frac) as usize).clamp(1, n);
        let features = random_features(n, 3, seed);
        let refinement = if batched {
            RefinementStrategy::Batched
        } else {
            RefinementStrategy::PerCluster
        };
        let clustering = MedoidClusterer::new(KMedoidsConfig {
            refinement,
            seed_attempts: 2,
            ..config(k, seed)
        })
        .fit(&features, Metric::Euclidean)
        .unwrap();

        prop_assert_eq!(clustering.medoids.len(), k);
        let unique: HashSet<_> = clustering.medoids.iter().collect();
        prop_assert_eq!(unique.len(), k);
        for (c, &m) in clustering.medoids.iter().enumerate() {
            prop_assert!(m < n);
            prop_assert_eq!(clustering.labels[m], c);
        }
    }
}
