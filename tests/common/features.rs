use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mosaic::features::FeatureSet;

/// `n` descriptors of width `dim` with uniform components in [0, 1).
pub fn random_features(n: usize, dim: usize, seed: u64) -> FeatureSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f32>> = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();
    FeatureSet::from_rows(&rows).unwrap()
}

/// `per_center` descriptors around each center, offset by uniform noise in
/// `[-noise, noise)` per component.
pub fn blob_features(centers: &[Vec<f32>], per_center: usize, noise: f32, seed: u64) -> FeatureSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(centers.len() * per_center);
    for center in centers {
        for _ in 0..per_center {
            rows.push(
                center
                    .iter()
                    .map(|&c| c + rng.gen_range(-noise..noise))
                    .collect::<Vec<f32>>(),
            );
        }
    }
    FeatureSet::from_rows(&rows).unwrap()
}

/// `n` byte-packed binary descriptors of `bytes` bytes, bit-expanded.
pub fn random_binary_features(n: usize, bytes: usize, seed: u64) -> FeatureSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<u8>> = (0..n)
        .map(|_| (0..bytes).map(|_| rng.gen()).collect())
        .collect();
    FeatureSet::from_packed(&rows).unwrap()
}

/// Two well separated clouds of three 2-D points each.
pub fn six_points() -> FeatureSet {
    let points: [[f32; 2]; 6] = [
        [0.0, 0.0],
        [0.0, 1.0],
        [1.0, 0.0],
        [10.0, 10.0],
        [10.0, 11.0],
        [11.0, 10.0],
    ];
    FeatureSet::from_rows(&points).unwrap()
}

/// The four corners of a 10x10 square, used as a fixed 2-D vocabulary.
pub fn corner_words() -> Vec<Vec<f32>> {
    vec![
        vec![0.0, 0.0],
        vec![10.0, 0.0],
        vec![0.0, 10.0],
        vec![10.0, 10.0],
    ]
}

/// A document whose descriptors sit next to the given corner words, with
/// `counts[i]` descriptors near word `i`.
pub fn document_near_words(counts: &[usize]) -> FeatureSet {
    let words = corner_words();
    let mut set = FeatureSet::new(2);
    for (word, &count) in words.iter().zip(counts) {
        for j in 0..count {
            let jitter = 0.1 * j as f32;
            set.push(&[word[0] + jitter, word[1] + jitter]).unwrap();
        }
    }
    set
}
