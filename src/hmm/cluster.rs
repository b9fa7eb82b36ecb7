/// Lloyd's k-means over window feature vectors; the fitted centroids turn
/// every vector into a finite observation symbol for the HMM.
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::errors::{DepixError, DepixResult};
use crate::pipeline::windows::Window;

const MAX_ITERATIONS: usize = 100;

pub struct KMeansQuantizer {
    centroids: Array2<f64>,
}

impl KMeansQuantizer {
    /// Fit `k` centroids on the window vectors. Initialization samples `k`
    /// distinct vector indices from a seeded RNG, so a fixed seed gives a
    /// fixed model.
    pub fn fit(windows: &[Window], k: usize, seed: u64) -> DepixResult<Self> {
        let vectors: Vec<&[f64]> = windows.iter().map(|w| w.values.as_slice()).collect();
        Self::fit_vectors(&vectors, k, seed)
    }

    fn fit_vectors(vectors: &[&[f64]], k: usize, seed: u64) -> DepixResult<Self> {
        if k == 0 {
            return Err(DepixError::Clustering("k must be positive".into()));
        }
        let n = vectors.len();
        if n < k {
            return Err(DepixError::Clustering(format!(
                "cannot fit {k} clusters on {n} samples"
            )));
        }
        let dim = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dim) {
            return Err(DepixError::Clustering(
                "feature vectors differ in length".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = Array2::<f64>::zeros((k, dim));
        for (row, idx) in rand::seq::index::sample(&mut rng, n, k).into_iter().enumerate() {
            for (col, &v) in vectors[idx].iter().enumerate() {
                centroids[[row, col]] = v;
            }
        }

        let mut quantizer = Self { centroids };
        let mut assignments = vec![usize::MAX; n];

        for _ in 0..MAX_ITERATIONS {
            let next: Vec<usize> = vectors.iter().map(|v| quantizer.nearest(v)).collect();
            if next == assignments {
                break;
            }
            assignments = next;

            // Recompute means; clusters that lost every member keep their
            // previous centroid.
            let mut sums = Array2::<f64>::zeros((k, dim));
            let mut counts = vec![0usize; k];
            for (v, &a) in vectors.iter().zip(&assignments) {
                counts[a] += 1;
                for (col, &x) in v.iter().enumerate() {
                    sums[[a, col]] += x;
                }
            }
            for row in 0..k {
                if counts[row] == 0 {
                    continue;
                }
                for col in 0..dim {
                    quantizer.centroids[[row, col]] = sums[[row, col]] / counts[row] as f64;
                }
            }
        }

        // Drop centroids no training vector maps to (duplicate points make
        // these common). Every surviving cluster then appears in training,
        // so assignment can never produce a symbol unknown to the model.
        let mut used = vec![false; k];
        for v in vectors {
            used[quantizer.nearest(v)] = true;
        }
        if used.iter().any(|u| !u) {
            let kept: Vec<usize> = (0..k).filter(|&row| used[row]).collect();
            let mut compacted = Array2::<f64>::zeros((kept.len(), dim));
            for (new_row, &old_row) in kept.iter().enumerate() {
                for col in 0..dim {
                    compacted[[new_row, col]] = quantizer.centroids[[old_row, col]];
                }
            }
            quantizer.centroids = compacted;
        }

        Ok(quantizer)
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Nearest-centroid index for every vector; total onto `[0, k)`, ties
    /// resolved to the lowest index.
    pub fn assign(&self, vectors: &[Vec<f64>]) -> Vec<usize> {
        vectors.iter().map(|v| self.nearest(v)).collect()
    }

    pub fn assign_windows(&self, windows: &mut [Window]) {
        for window in windows.iter_mut() {
            window.cluster = Some(self.nearest(&window.values));
        }
    }

    fn nearest(&self, vector: &[f64]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (row, centroid) in self.centroids.rows().into_iter().enumerate() {
            let dist: f64 = centroid
                .iter()
                .zip(vector)
                .map(|(c, v)| (c - v) * (c - v))
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best = row;
            }
        }
        best
    }
}
