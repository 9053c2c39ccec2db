//! Initial medoid selection.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::types::SeedingStrategy;

use super::matrix::DistanceMatrix;
use super::refine::{assign_labels, cluster_members};

/// One seeding attempt: the drawn medoids and their dispersion cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub attempt: usize,
    pub medoids: Vec<usize>,
    pub cost: f64,
}

/// Draw `k` distinct medoid indices from the samples of `matrix`.
///
/// Callers guarantee `1 <= k <= matrix.len()`.
pub fn draw_medoids<R: Rng + ?Sized>(
    matrix: &DistanceMatrix,
    k: usize,
    strategy: SeedingStrategy,
    rng: &mut R,
) -> Vec<usize> {
    match strategy {
        SeedingStrategy::Random => rand::seq::index::sample(rng, matrix.len(), k).into_vec(),
        SeedingStrategy::KMeansPlusPlus => kmeans_plus_plus(matrix, k, rng),
    }
}

/// Greedy farthest-point seeding with squared-distance sampling.
fn kmeans_plus_plus<R: Rng + ?Sized>(matrix: &DistanceMatrix, k: usize, rng: &mut R) -> Vec<usize> {
    let n = matrix.len();
    let mut medoids = Vec::with_capacity(k);
    let mut chosen = vec![false; n];
    // Distance from every sample to its nearest chosen medoid.
    let mut nearest = vec![f32::INFINITY; n];

    let first = rng.gen_range(0..n);
    medoids.push(first);
    chosen[first] = true;

    while medoids.len() < k {
        let last = *medoids.last().unwrap_or(&first);
        for (i, d) in matrix.row(last).iter().enumerate() {
            if *d < nearest[i] {
                nearest[i] = *d;
            }
        }

        let remaining: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
        let weights: Vec<f64> = remaining
            .iter()
            .map(|&i| {
                let d = nearest[i] as f64;
                d * d
            })
            .collect();

        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => remaining[dist.sample(rng)],
            // Every remaining sample coincides with a medoid.
            Err(_) => remaining[rng.gen_range(0..remaining.len())],
        };

        medoids.push(next);
        chosen[next] = true;
    }

    medoids
}

/// Intra-cluster dispersion: for every cluster, the sum of distances over
/// all unordered pairs of its members.
pub fn dispersion(matrix: &DistanceMatrix, medoids: &[usize]) -> f64 {
    let labels = assign_labels(matrix, medoids);
    cluster_members(&labels, medoids.len())
        .iter()
        .map(|members| {
            let mut sum = 0.0f64;
            for (pos, &a) in members.iter().enumerate() {
                let row = matrix.row(a);
                for &b in &members[pos + 1..] {
                    sum += row[b] as f64;
                }
            }
            sum
        })
        .sum()
}

/// Pick the seed with minimum cost; ties go to the earliest attempt.
pub fn best_seed(seeds: Vec<Seed>) -> Option<Seed> {
    seeds.into_iter().fold(None, |best, seed| match best {
        Some(b) if b.cost < seed.cost || (b.cost == seed.cost && b.attempt < seed.attempt) => {
            Some(b)
        }
        _ => Some(seed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;
    use crate::types::Metric;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn line(n: usize) -> DistanceMatrix {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32]).collect();
        DistanceMatrix::build(&FeatureSet::from_rows(&rows).unwrap(), Metric::Euclidean)
    }

    #[test]
    fn test_draws_are_distinct() {
        let m = line(20);
        for strategy in [SeedingStrategy::Random, SeedingStrategy::KMeansPlusPlus] {
            let mut rng = StdRng::seed_from_u64(7);
            let medoids = draw_medoids(&m, 20, strategy, &mut rng);
            let unique: HashSet<_> = medoids.iter().collect();
            assert_eq!(unique.len(), 20, "{strategy} produced duplicates");
        }
    }

    #[test]
    fn test_kmeans_plus_plus_handles_duplicates() {
        let rows = vec![vec![1.0, 1.0]; 5];
        let m = DistanceMatrix::build(&FeatureSet::from_rows(&rows).unwrap(), Metric::Euclidean);
        let mut rng = StdRng::seed_from_u64(1);
        let medoids = draw_medoids(&m, 3, SeedingStrategy::KMeansPlusPlus, &mut rng);
        assert_eq!(medoids.iter().collect::<HashSet<_>>().len(), 3);
    }

    #[test]
    fn test_dispersion_counts_unordered_pairs() {
        // Points 0, 1, 2 on a line, one cluster: pairs sum to 1 + 2 + 1.
        let m = line(3);
        assert_eq!(dispersion(&m, &[1]), 4.0);
        // Every point its own medoid: no pairs.
        assert_eq!(dispersion(&m, &[0, 1, 2]), 0.0);
    }

    #[test]
    fn test_best_seed_prefers_lowest_cost_then_attempt() {
        let seeds = vec![
            Seed { attempt: 0, medoids: vec![0], cost: 3.0 },
            Seed { attempt: 1, medoids: vec![1], cost: 1.0 },
            Seed { attempt: 2, medoids: vec![2], cost: 1.0 },
        ];
        let best = best_seed(seeds).unwrap();
        assert_eq!(best.attempt, 1);
        assert!(best_seed(Vec::new()).is_none());
    }
}
