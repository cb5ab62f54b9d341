//! Seeded Lloyd k-means used to initialize mixture responsibilities.
//!
//! Purpose
//! -------
//! Provide the k-means-based initialization required by the mixture fit
//! policy: a deterministic (seeded) hard partition of the reduced matrix
//! that the EM loop turns into one-hot responsibilities before its first
//! M-step.
//!
//! Key behaviors
//! -------------
//! - Seed centroids from `k` distinct rows of the input, chosen with a
//!   seeded RNG so runs are reproducible.
//! - Iterate assign/update steps until assignments stop changing or the
//!   iteration budget is exhausted.
//! - Re-seed any emptied cluster from the point farthest from its current
//!   centroid, so exactly `k` non-empty clusters come out.
//!
//! Invariants & assumptions
//! ------------------------
//! - `1 <= k <= n` where `n` is the number of rows; callers validate the
//!   candidate count against the silhouette bounds separately.
//! - The input matrix is finite; non-finite entries are rejected by the
//!   mixture fit before this module runs.
//!
//! Testing notes
//! -------------
//! - Unit tests cover grouping of well-separated blobs, determinism under a
//!   fixed seed, and the `k == n` boundary (one point per cluster).

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clustering::errors::{ClusterResult, ClusteringError};

/// Hard partition produced by the k-means initializer.
#[derive(Debug, Clone)]
pub struct KMeansPartition {
    /// One label in `[0, k)` per input row.
    pub labels: Vec<usize>,
    /// Final centroids, `k x p`.
    pub centroids: Array2<f64>,
}

/// Run seeded Lloyd k-means on `x` and return the hard partition.
///
/// Parameters
/// ----------
/// - `x`: `n x p` matrix, one row per entity.
/// - `k`: number of clusters; must satisfy `1 <= k <= n`.
/// - `seed`: RNG seed for centroid selection; fixes the partition for
///   identical inputs.
/// - `max_iter`: assign/update iteration budget.
///
/// Returns
/// -------
/// `ClusterResult<KMeansPartition>` with one label per row and `k`
/// centroids.
///
/// Errors
/// ------
/// - `ClusteringError::EmptyMatrix` when `x` has no rows or columns.
/// - `ClusteringError::FitFailure` when `k == 0` or `k > n`.
pub fn kmeans_partition(
    x: &ArrayView2<'_, f64>, k: usize, seed: u64, max_iter: usize,
) -> ClusterResult<KMeansPartition> {
    let n = x.nrows();
    let p = x.ncols();
    if n == 0 || p == 0 {
        return Err(ClusteringError::EmptyMatrix);
    }
    if k == 0 {
        return Err(ClusteringError::FitFailure { k, reason: "k must be at least 1" });
    }
    if k > n {
        return Err(ClusteringError::FitFailure { k, reason: "more clusters than samples" });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let chosen = rand::seq::index::sample(&mut rng, n, k);
    let mut centroids = Array2::<f64>::zeros((k, p));
    for (c, row_idx) in chosen.into_iter().enumerate() {
        centroids.row_mut(c).assign(&x.row(row_idx));
    }

    let mut labels = vec![0usize; n];
    for _ in 0..max_iter {
        let changed = assign_step(x, &centroids, &mut labels);
        update_step(x, k, &labels, &mut centroids);
        reseed_empty_clusters(x, k, &mut labels, &mut centroids);
        if !changed {
            break;
        }
    }

    Ok(KMeansPartition { labels, centroids })
}

/// Assign each row to its nearest centroid; returns whether any label moved.
fn assign_step(x: &ArrayView2<'_, f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (i, row) in x.rows().into_iter().enumerate() {
        let mut best = 0usize;
        let mut best_dist = f64::INFINITY;
        for (c, centroid) in centroids.rows().into_iter().enumerate() {
            let dist: f64 =
                row.iter().zip(centroid.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
            if dist < best_dist {
                best_dist = dist;
                best = c;
            }
        }
        if labels[i] != best {
            labels[i] = best;
            changed = true;
        }
    }
    changed
}

/// Recompute each centroid as the mean of its assigned rows. Clusters that
/// lost all members keep their previous centroid; `reseed_empty_clusters`
/// handles them afterwards.
fn update_step(x: &ArrayView2<'_, f64>, k: usize, labels: &[usize], centroids: &mut Array2<f64>) {
    let p = x.ncols();
    let mut counts = vec![0usize; k];
    let mut sums = Array2::<f64>::zeros((k, p));
    for (i, row) in x.rows().into_iter().enumerate() {
        let c = labels[i];
        counts[c] += 1;
        let mut target = sums.row_mut(c);
        target += &row;
    }
    for c in 0..k {
        if counts[c] > 0 {
            let mut centroid = centroids.row_mut(c);
            centroid.assign(&sums.row(c));
            centroid.mapv_inplace(|v| v / counts[c] as f64);
        }
    }
}

/// Move each empty cluster's centroid onto the row farthest from its current
/// centroid, and claim that row. Keeps the partition at exactly `k`
/// non-empty clusters, which the mixture fit relies on.
fn reseed_empty_clusters(
    x: &ArrayView2<'_, f64>, k: usize, labels: &mut [usize], centroids: &mut Array2<f64>,
) {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }
    for c in 0..k {
        if counts[c] > 0 {
            continue;
        }
        let mut farthest = 0usize;
        let mut farthest_dist = -1.0f64;
        for (i, row) in x.rows().into_iter().enumerate() {
            // Only steal from clusters that can spare a member.
            if counts[labels[i]] <= 1 {
                continue;
            }
            let own = centroids.row(labels[i]);
            let dist: f64 = row.iter().zip(own.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
            if dist > farthest_dist {
                farthest_dist = dist;
                farthest = i;
            }
        }
        counts[labels[farthest]] -= 1;
        labels[farthest] = c;
        counts[c] = 1;
        centroids.row_mut(c).assign(&x.row(farthest));
    }
}
