use serde::{Deserialize, Serialize};

use crate::geometry::{Centroid, Point};

/// Why the controller will not advance any further without a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The last step moved no centroid beyond the tolerance.
    Converged,
    /// The iteration cap was hit while centroids were still moving.
    MaxIterationsReached,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub points: Vec<Point>,
    /// Complete centroid list, or the manual centroids collected so far.
    pub centroids: Vec<Centroid>,
    pub iteration: usize,
    pub converged: bool,
    pub terminal_reason: Option<TerminalReason>,
    pub running: bool,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Number of points owned by each centroid.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for cluster in self.points.iter().filter_map(|p| p.cluster) {
            if let Some(size) = sizes.get_mut(cluster) {
                *size += 1;
            }
        }
        sizes
    }
}
