//! Clustering for embedding-based topics.

mod kmeans;

pub use kmeans::KMeans;
