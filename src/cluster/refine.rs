//! Assignment and medoid-update steps of the refinement loop.
//!
//! The update step has two interchangeable strategies. Both accumulate
//! per-member distance sums in `f64` over co-members in ascending sample
//! order, so they agree bit-for-bit and pick identical medoids.

use rayon::prelude::*;

use crate::types::RefinementStrategy;

use super::matrix::DistanceMatrix;

/// Assign every sample to its nearest medoid.
///
/// Returns one cluster position per sample. Ties go to the lowest
/// position, and a medoid always belongs to its own cluster (this keeps
/// clusters non-empty even when samples are duplicated).
pub fn assign_labels(matrix: &DistanceMatrix, medoids: &[usize]) -> Vec<usize> {
    let mut labels: Vec<usize> = (0..matrix.len())
        .map(|i| {
            let row = matrix.row(i);
            let mut best = 0;
            let mut best_dist = f32::INFINITY;
            for (pos, &m) in medoids.iter().enumerate() {
                let d = row[m];
                if d < best_dist {
                    best_dist = d;
                    best = pos;
                }
            }
            best
        })
        .collect();

    for (pos, &m) in medoids.iter().enumerate() {
        labels[m] = pos;
    }
    labels
}

/// Group sample indices by cluster position, ascending within each cluster.
pub fn cluster_members(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut members = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }
    members
}

/// Recompute every cluster's medoid as its most central member.
///
/// The current medoid is the incumbent and is replaced only by a member
/// with a strictly smaller distance sum, so singleton clusters keep their
/// medoid. The result always has `medoids.len()` entries.
pub fn update_medoids(
    matrix: &DistanceMatrix,
    labels: &[usize],
    medoids: &[usize],
    strategy: RefinementStrategy,
) -> Vec<usize> {
    match strategy {
        RefinementStrategy::Batched => update_batched(matrix, labels, medoids),
        RefinementStrategy::PerCluster => update_per_cluster(matrix, labels, medoids),
    }
}

/// Build an `n x k` table holding, for every sample, the sum of its
/// distances to the members of each cluster, then pick per-cluster minima.
fn update_batched(matrix: &DistanceMatrix, labels: &[usize], medoids: &[usize]) -> Vec<usize> {
    let k = medoids.len();
    let n = matrix.len();
    let mut table = vec![0.0f64; n * k];

    table.par_chunks_mut(k).enumerate().for_each(|(i, sums)| {
        for (j, &d) in matrix.row(i).iter().enumerate() {
            sums[labels[j]] += d as f64;
        }
    });

    let members = cluster_members(labels, k);
    medoids
        .iter()
        .enumerate()
        .map(|(pos, &current)| {
            pick_central(current, &members[pos], |i| table[i * k + pos])
        })
        .collect()
}

/// Walk one cluster at a time, summing distances inside its member block.
fn update_per_cluster(matrix: &DistanceMatrix, labels: &[usize], medoids: &[usize]) -> Vec<usize> {
    let members = cluster_members(labels, medoids.len());
    medoids
        .iter()
        .enumerate()
        .map(|(pos, &current)| {
            let cluster = &members[pos];
            pick_central(current, cluster, |i| {
                let row = matrix.row(i);
                cluster.iter().map(|&j| row[j] as f64).sum()
            })
        })
        .collect()
}

fn pick_central<F>(current: usize, members: &[usize], cost: F) -> usize
where
    F: Fn(usize) -> f64,
{
    if members.len() <= 1 {
        return current;
    }
    let mut best = current;
    let mut best_cost = cost(current);
    for &i in members {
        let c = cost(i);
        if c < best_cost {
            best_cost = c;
            best = i;
        }
    }
    best
}
