//! K-Means clustering.
//!
//! Lloyd's algorithm with seeded k-means++ initialization. Identical input,
//! cluster count and seed always give identical labels.
//!
//! # Examples
//!
//! ```
//! use reviewlens::cluster::KMeans;
//! use reviewlens::primitives::Matrix;
//!
//! let data = Matrix::from_vec(6, 2, vec![
//!     1.0, 2.0,
//!     1.5, 1.8,
//!     5.0, 8.0,
//!     8.0, 8.0,
//!     1.0, 0.6,
//!     9.0, 11.0,
//! ]).expect("6x2 data");
//!
//! let mut kmeans = KMeans::new(2).with_random_state(42);
//! kmeans.fit(&data).expect("enough samples");
//! assert_eq!(kmeans.predict(&data).len(), 6);
//! ```

use crate::error::{InsightError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-Means clustering model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    random_state: u64,
    centroids: Option<Matrix>,
    labels: Option<Vec<usize>>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    /// K-Means with `n_clusters` clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-6,
            random_state: 42,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of Lloyd iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance on centroid movement.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the initialization seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fitted centroids.
    #[must_use]
    pub fn centroids(&self) -> Option<&Matrix> {
        self.centroids.as_ref()
    }

    /// Labels of the training samples.
    #[must_use]
    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Within-cluster sum of squares.
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Iterations run by the last fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Fit on the rows of `x`.
    ///
    /// # Errors
    ///
    /// `DegenerateCorpus` when there are fewer distinct rows than clusters.
    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        let n_samples = x.n_rows();
        let distinct = count_distinct_rows(x);
        if self.n_clusters == 0 || distinct < self.n_clusters {
            return Err(InsightError::DegenerateCorpus {
                requested_topics: self.n_clusters,
                documents: n_samples,
                vocabulary: x.n_cols(),
            });
        }

        let mut centroids = self.kmeans_plusplus_init(x)?;
        let mut labels = assign_labels(x, &centroids);

        for iter in 0..self.max_iter {
            let new_centroids = update_centroids(x, &labels, &centroids);
            let converged = centroids_converged(&centroids, &new_centroids, self.tol);
            centroids = new_centroids;
            labels = assign_labels(x, &centroids);
            self.n_iter = iter + 1;
            if converged {
                break;
            }
        }

        self.inertia = labels
            .iter()
            .enumerate()
            .map(|(i, &k)| squared_distance(x.row(i), centroids.row(k)))
            .sum();
        self.labels = Some(labels);
        self.centroids = Some(centroids);
        Ok(())
    }

    /// Nearest centroid for each row of `x`; empty before fitting.
    #[must_use]
    pub fn predict(&self, x: &Matrix) -> Vec<usize> {
        self.centroids
            .as_ref()
            .map(|c| assign_labels(x, c))
            .unwrap_or_default()
    }

    /// Squared distance from `point` to every centroid.
    #[must_use]
    pub fn distances(&self, point: &[f64]) -> Vec<f64> {
        let Some(centroids) = &self.centroids else {
            return Vec::new();
        };
        (0..centroids.n_rows())
            .map(|k| squared_distance(point, centroids.row(k)))
            .collect()
    }

    /// k-means++: first centroid uniform, the rest sampled proportional to D².
    fn kmeans_plusplus_init(&self, x: &Matrix) -> Result<Matrix> {
        let (n_samples, n_features) = x.shape();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut chosen = vec![rng.gen_range(0..n_samples)];
        let mut min_distances: Vec<f64> = (0..n_samples)
            .map(|i| squared_distance(x.row(i), x.row(chosen[0])))
            .collect();

        while chosen.len() < self.n_clusters {
            let total: f64 = min_distances.iter().sum();
            let Some(last_positive) = min_distances.iter().rposition(|&d| d > 0.0) else {
                break;
            };
            let mut target = rng.gen::<f64>() * total;
            let mut next = last_positive;
            for (i, &d) in min_distances.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                if target < d {
                    next = i;
                    break;
                }
                target -= d;
            }
            chosen.push(next);
            for (i, d) in min_distances.iter_mut().enumerate() {
                *d = d.min(squared_distance(x.row(i), x.row(next)));
            }
        }

        let mut data = Vec::with_capacity(self.n_clusters * n_features);
        for &idx in &chosen {
            data.extend_from_slice(x.row(idx));
        }
        Matrix::from_vec(chosen.len(), n_features, data)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn count_distinct_rows(x: &Matrix) -> usize {
    let mut rows: Vec<Vec<u64>> = (0..x.n_rows())
        .map(|i| x.row(i).iter().map(|v| v.to_bits()).collect())
        .collect();
    rows.sort_unstable();
    rows.dedup();
    rows.len()
}

/// Nearest centroid per row; ties go to the lowest cluster index.
fn assign_labels(x: &Matrix, centroids: &Matrix) -> Vec<usize> {
    (0..x.n_rows())
        .map(|i| {
            let point = x.row(i);
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for k in 0..centroids.n_rows() {
                let dist = squared_distance(point, centroids.row(k));
                if dist < best_dist {
                    best_dist = dist;
                    best = k;
                }
            }
            best
        })
        .collect()
}

/// Mean of assigned rows; an empty cluster keeps its previous centroid.
fn update_centroids(x: &Matrix, labels: &[usize], previous: &Matrix) -> Matrix {
    let (n_clusters, n_features) = previous.shape();
    let mut sums = Matrix::zeros(n_clusters, n_features);
    let mut counts = vec![0usize; n_clusters];

    for (i, &label) in labels.iter().enumerate() {
        counts[label] += 1;
        for (j, &v) in x.row(i).iter().enumerate() {
            sums.add_at(label, j, v);
        }
    }

    for (k, &count) in counts.iter().enumerate() {
        let row = sums.row_mut(k);
        if count == 0 {
            row.copy_from_slice(previous.row(k));
        } else {
            row.iter_mut().for_each(|v| *v /= count as f64);
        }
    }
    sums
}

fn centroids_converged(old: &Matrix, new: &Matrix, tol: f64) -> bool {
    (0..old.n_rows()).all(|k| squared_distance(old.row(k), new.row(k)) <= tol * tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Matrix {
        Matrix::from_vec(
            6,
            2,
            vec![1.0, 2.0, 1.5, 1.8, 5.0, 8.0, 8.0, 8.0, 1.0, 0.6, 9.0, 11.0],
        )
        .expect("6x2")
    }

    #[test]
    fn test_two_clusters_separate() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_random_state(7);
        kmeans.fit(&data).expect("fit");
        let labels = kmeans.labels().expect("fitted").to_vec();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[4]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[2], labels[5]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_reproducible() {
        let data = sample_data();
        let mut a = KMeans::new(3).with_random_state(42);
        let mut b = KMeans::new(3).with_random_state(42);
        a.fit(&data).expect("fit");
        b.fit(&data).expect("fit");
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.predict(&data), b.predict(&data));
    }

    #[test]
    fn test_too_few_distinct_points() {
        let data = Matrix::from_vec(4, 1, vec![1.0, 1.0, 1.0, 2.0]).expect("4x1");
        let mut kmeans = KMeans::new(3);
        assert!(matches!(
            kmeans.fit(&data),
            Err(InsightError::DegenerateCorpus { .. })
        ));
    }

    #[test]
    fn test_exact_k_distinct_points() {
        let data = Matrix::from_vec(3, 1, vec![0.0, 5.0, 10.0]).expect("3x1");
        let mut kmeans = KMeans::new(3).with_random_state(1);
        kmeans.fit(&data).expect("fit");
        let mut labels = kmeans.labels().expect("fitted").to_vec();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
        assert!(kmeans.inertia().abs() < 1e-12);
    }

    #[test]
    fn test_predict_before_fit_is_empty() {
        let kmeans = KMeans::new(2);
        assert!(kmeans.predict(&sample_data()).is_empty());
        assert!(kmeans.distances(&[0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_inertia_drops_with_more_clusters() {
        let data = sample_data();
        let mut one = KMeans::new(1);
        let mut three = KMeans::new(3);
        one.fit(&data).expect("fit");
        three.fit(&data).expect("fit");
        assert!(three.inertia() < one.inertia());
    }
}
