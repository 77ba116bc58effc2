use crate::geometry::{Centroid, Point, Vec2};

/// Outcome of one assign + update round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepResult {
    /// Some centroid moved further than the tolerance.
    pub moved: bool,
    /// Largest displacement of any centroid during the update.
    pub max_shift: f64,
}

/// One round of Lloyd's algorithm.
///
/// Every point is assigned to its nearest centroid (lowest index wins ties),
/// then every centroid with at least one point moves to the mean of its
/// points. Centroids that own no points stay where they are.
///
/// Both slices must be non-empty and finite; callers validate at the
/// configuration boundary.
pub fn step(points: &mut [Point], centroids: &mut [Centroid], tolerance: f64) -> StepResult {
    update_indexes(points, centroids);
    update_centroids(points, centroids, tolerance)
}

/// Assignment half of the step.
pub fn update_indexes(points: &mut [Point], centroids: &[Centroid]) {
    for point in points.iter_mut() {
        let position = point.position();
        let mut min_dist = f64::INFINITY;
        let mut min_index = 0;
        for (j, c) in centroids.iter().enumerate() {
            let dist = position.distance(c);
            if dist < min_dist {
                min_dist = dist;
                min_index = j;
            }
        }
        point.cluster = Some(min_index);
    }
}

/// Update half of the step; expects every point to carry a cluster index
/// below `centroids.len()`.
pub fn update_centroids(points: &[Point], centroids: &mut [Centroid], tolerance: f64) -> StepResult {
    let mut sums = vec![Vec2::default(); centroids.len()];
    let mut cluster_size = vec![0usize; centroids.len()];
    for point in points {
        if let Some(cluster) = point.cluster {
            sums[cluster] = sums[cluster].add(&point.position());
            cluster_size[cluster] += 1;
        }
    }

    let mut result = StepResult {
        moved: false,
        max_shift: 0.0,
    };
    for ((c, sum), &size) in centroids.iter_mut().zip(&sums).zip(&cluster_size) {
        if size == 0 {
            continue;
        }
        let mean = sum.div(size as f64);
        let shift = c.distance(&mean);
        if shift > tolerance {
            result.moved = true;
        }
        result.max_shift = result.max_shift.max(shift);
        *c = mean;
    }
    result
}
