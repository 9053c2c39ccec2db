use std::collections::HashSet;

use mosaic::cluster::Clustering;
use mosaic::types::QueryHit;
use mosaic::vocabulary::Histogram;

/// Assert that a clustering has exactly `k` distinct in-range medoids and
/// that every medoid is labeled with its own cluster.
pub fn assert_valid_clustering(clustering: &Clustering, k: usize, n: usize) {
    assert_eq!(clustering.medoids.len(), k, "expected {k} medoids");
    let unique: HashSet<_> = clustering.medoids.iter().collect();
    assert_eq!(unique.len(), k, "medoids are not unique: {:?}", clustering.medoids);
    assert!(
        clustering.medoids.iter().all(|&m| m < n),
        "medoid out of range: {:?}",
        clustering.medoids
    );
    assert_eq!(clustering.labels.len(), n);
    for (c, &m) in clustering.medoids.iter().enumerate() {
        assert_eq!(clustering.labels[m], c, "medoid {m} not in its own cluster {c}");
    }
}

/// Assert that hits are ordered by ascending distance, ties by doc id.
pub fn assert_sorted_by_distance(hits: &[QueryHit]) {
    for pair in hits.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.distance < b.distance || (a.distance == b.distance && a.doc_id < b.doc_id),
            "hits out of order: {a:?} before {b:?}"
        );
    }
}

/// Assert that a histogram's frequencies sum to one.
pub fn assert_normalized(histogram: &Histogram) {
    let sum = histogram.sum();
    assert!((sum - 1.0).abs() < 1e-5, "histogram sums to {sum}, expected 1");
}
