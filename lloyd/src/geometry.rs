use serde::{Deserialize, Serialize};

/// Position on the plane. Centroids are bare positions; their identity is
/// their index in the centroid list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

pub type Centroid = Vec2;

/// Largest accepted coordinate magnitude. Squared distances between any two
/// positions in range, and sums over realistic datasets, stay finite.
pub const MAX_COORDINATE: f64 = 1e150;

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Vec2 {
        Vec2 { x, y }
    }

    pub fn distance(&self, other: &Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn distance_squared(&self, other: &Vec2) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn div(&self, other: f64) -> Vec2 {
        Vec2::new(self.x / other, self.y / other)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Finite and no further than [`MAX_COORDINATE`] from the origin on either axis.
    pub fn is_in_range(&self) -> bool {
        self.is_finite() && self.x.abs() <= MAX_COORDINATE && self.y.abs() <= MAX_COORDINATE
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vec2::new(x, y)
    }
}

/// A data point together with the index of the centroid that currently owns it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// `None` until the first assignment step, and again after a reset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point {
            x,
            y,
            cluster: None,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Point::new(v.x, v.y)
    }
}

/// Anything that sits somewhere on the plane.
pub trait Located {
    fn location(&self) -> Vec2;
}

impl Located for Vec2 {
    #[inline]
    fn location(&self) -> Vec2 {
        *self
    }
}

impl Located for Point {
    #[inline]
    fn location(&self) -> Vec2 {
        self.position()
    }
}

/// Euclidean distance, the only similarity measure used for clustering.
pub fn distance(a: &impl Located, b: &impl Located) -> f64 {
    a.location().distance(&b.location())
}

/// Distance from `position` to the closest of `centroids`, or `f64::INFINITY`
/// when there are none yet.
pub fn nearest_distance(position: &Vec2, centroids: &[Centroid]) -> f64 {
    centroids
        .iter()
        .map(|c| position.distance(c))
        .fold(f64::INFINITY, f64::min)
}
