use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::InitMethod;
use crate::error::{ClusteringError, Result};
use crate::geometry::{Centroid, Point, Vec2, MAX_COORDINATE};

/// Produce the starting centroids for `method`.
///
/// Automatic methods return exactly `k` centroids, each copied from a point of
/// the dataset. For [`InitMethod::Manual`] the already collected
/// `prior_clicks` are returned as they are; the list may be shorter than `k`
/// and is completed through [`ManualSeeding::accept`].
///
/// # Errors
///
/// [`ClusteringError::InvalidConfiguration`] if `k == 0`, if an automatic
/// method is asked for more centroids than there are points, or if more than
/// `k` manual clicks are supplied.
pub fn initialize<R: Rng + ?Sized>(
    points: &[Point],
    k: usize,
    method: InitMethod,
    prior_clicks: &[Centroid],
    rng: &mut R,
) -> Result<Vec<Centroid>> {
    if k == 0 {
        return Err(ClusteringError::invalid("k must be at least 1"));
    }

    let centroids = match method {
        InitMethod::Manual => return manual_centroids(k, prior_clicks),
        _ if k > points.len() => {
            return Err(ClusteringError::invalid(format!(
                "k ({k}) exceeds the number of points ({})",
                points.len()
            )));
        }
        InitMethod::Random => random_centroids(points, k, rng),
        InitMethod::Farthest => farthest_point_centroids(points, k, rng),
        InitMethod::KMeansPlusPlus => kmeans_plusplus_centroids(points, k, rng),
    };
    tracing::info!(%method, k, "initialized centroids");
    Ok(centroids)
}

fn manual_centroids(k: usize, prior_clicks: &[Centroid]) -> Result<Vec<Centroid>> {
    if prior_clicks.len() > k {
        return Err(ClusteringError::invalid(format!(
            "{} manual centroids supplied but k is {k}",
            prior_clicks.len()
        )));
    }
    if let Some(click) = prior_clicks.iter().find(|c| !c.is_in_range()) {
        return Err(out_of_range(click));
    }
    Ok(prior_clicks.to_vec())
}

fn out_of_range(position: &Vec2) -> ClusteringError {
    ClusteringError::invalid(format!(
        "manual centroid ({}, {}) is not finite or exceeds {MAX_COORDINATE:e}",
        position.x, position.y
    ))
}

/// Partial Fisher-Yates shuffle of the point indices, keeping the first `k`.
///
/// Expects `0 < k <= points.len()`.
pub fn random_centroids<R: Rng + ?Sized>(points: &[Point], k: usize, rng: &mut R) -> Vec<Centroid> {
    let mut indices: Vec<usize> = (0..points.len()).collect();
    let (chosen, _) = indices.partial_shuffle(rng, k);
    chosen.iter().map(|&i| points[i].position()).collect()
}

/// Greedy farthest-point traversal.
///
/// The first centroid is a uniformly random point. Every following centroid is
/// the point whose distance to its nearest chosen centroid is largest, the
/// earliest such point on ties.
///
/// Expects `0 < k <= points.len()`.
pub fn farthest_point_centroids<R: Rng + ?Sized>(
    points: &[Point],
    k: usize,
    rng: &mut R,
) -> Vec<Centroid> {
    let mut centroids = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..points.len())].position();
    centroids.push(first);

    let mut nearest = vec![f64::INFINITY; points.len()];
    update_nearest(points, &first, &mut nearest, |p, c| p.distance(c));

    while centroids.len() < k {
        let mut max_distance = f64::NEG_INFINITY;
        let mut farthest = 0;
        for (i, &d) in nearest.iter().enumerate() {
            if d > max_distance {
                max_distance = d;
                farthest = i;
            }
        }
        let next = points[farthest].position();
        centroids.push(next);
        update_nearest(points, &next, &mut nearest, |p, c| p.distance(c));
    }

    centroids
}

/// k-means++ seeding.
///
/// The first centroid is a uniformly random point. Each following centroid is
/// drawn with probability proportional to the squared distance from a point to
/// its nearest chosen centroid, by walking the cumulative distribution with a
/// single draw from `[0, 1)`. When every point already coincides with a
/// centroid the draw falls back to uniform.
///
/// Expects `0 < k <= points.len()`.
pub fn kmeans_plusplus_centroids<R: Rng + ?Sized>(
    points: &[Point],
    k: usize,
    rng: &mut R,
) -> Vec<Centroid> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..n)].position();
    centroids.push(first);

    let mut weights = vec![f64::INFINITY; n];
    update_nearest(points, &first, &mut weights, |p, c| p.distance_squared(c));

    while centroids.len() < k {
        let total: f64 = weights.iter().sum();
        let chosen = if total > 0.0 && total.is_finite() {
            sample_weighted(&weights, total, rng.gen::<f64>())
        } else {
            rng.gen_range(0..n)
        };
        let next = points[chosen].position();
        centroids.push(next);
        update_nearest(points, &next, &mut weights, |p, c| p.distance_squared(c));
    }

    centroids
}

/// Index of the first cumulative probability exceeding `draw`.
///
/// Rounding can leave the final cumulative sum a hair below 1.0; a draw past
/// it lands on the last point that has any weight.
fn sample_weighted(weights: &[f64], total: f64, draw: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w / total;
        last_positive = i;
        if draw < cumulative {
            return i;
        }
    }
    last_positive
}

fn update_nearest(
    points: &[Point],
    centroid: &Vec2,
    nearest: &mut [f64],
    metric: impl Fn(&Vec2, &Vec2) -> f64,
) {
    for (p, best) in points.iter().zip(nearest.iter_mut()) {
        let d = metric(&p.position(), centroid);
        if d < *best {
            *best = d;
        }
    }
}

/// Result of offering one manual centroid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAck {
    pub accepted: bool,
    pub have: usize,
    pub need: usize,
}

/// Acquisition phase of manual initialization: collects user supplied
/// positions until `k` are present, then refuses any more.
#[derive(Clone, Debug)]
pub struct ManualSeeding {
    k: usize,
    centroids: Vec<Centroid>,
}

impl ManualSeeding {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            centroids: Vec::with_capacity(k),
        }
    }

    /// Take `position` as the next centroid unless `k` are already present.
    ///
    /// # Errors
    ///
    /// [`ClusteringError::InvalidConfiguration`] if a coordinate is not finite
    /// or lies beyond [`MAX_COORDINATE`]; the seeding is left unchanged.
    pub fn accept(&mut self, position: Vec2) -> Result<ManualAck> {
        if !position.is_in_range() {
            return Err(out_of_range(&position));
        }
        let accepted = !self.is_complete();
        if accepted {
            self.centroids.push(position);
        }
        Ok(ManualAck {
            accepted,
            have: self.centroids.len(),
            need: self.k,
        })
    }

    pub fn remaining(&self) -> usize {
        self.k - self.centroids.len()
    }

    pub fn is_complete(&self) -> bool {
        self.centroids.len() >= self.k
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn into_centroids(self) -> Vec<Centroid> {
        self.centroids
    }
}
