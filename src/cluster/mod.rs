//! k-medoids clustering of descriptor sets.
//!
//! Training builds a dense `DistanceMatrix` over a sub-sampled corpus, draws
//! several candidate seeds in parallel, and refines the cheapest one until
//! the medoid set stops changing.

pub mod kmedoids;
pub mod matrix;
pub mod refine;
pub mod seeding;

pub use kmedoids::{ClusterPhase, Clustering, KMedoidsConfig, MedoidClusterer};
pub use matrix::DistanceMatrix;
