use rand::Rng;

use crate::error::{ClusteringError, Result};
use crate::geometry::{Point, MAX_COORDINATE};

pub const DEFAULT_POINTS_COUNT: usize = 300;
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 500.0;

/// Scatter `count` unassigned points uniformly over a `width` x `height` canvas.
pub fn generate_uniform(count: usize, width: f64, height: f64, rng: &mut impl Rng) -> Vec<Point> {
    (0..count)
        .map(|_| Point::new(rng.gen::<f64>() * width, rng.gen::<f64>() * height))
        .collect()
}

pub fn validate_points(points: &[Point]) -> Result<()> {
    if points.is_empty() {
        return Err(ClusteringError::invalid("dataset is empty"));
    }
    if let Some(index) = points.iter().position(|p| !p.position().is_in_range()) {
        return Err(ClusteringError::invalid(format!(
            "point {index} has a coordinate that is not finite or exceeds {MAX_COORDINATE:e}"
        )));
    }
    Ok(())
}

pub fn clear_assignments(points: &mut [Point]) {
    points.iter_mut().for_each(|p| p.cluster = None);
}
