use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClusteringError, Result};

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_MOVEMENT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 500;

/// Strategy used to place the first `k` centroids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitMethod {
    /// `k` distinct data points drawn uniformly without replacement.
    #[default]
    #[serde(rename = "random")]
    Random,
    /// Greedy farthest-point traversal from a random first point.
    #[serde(rename = "farthest", alias = "farthest-point")]
    Farthest,
    /// k-means++ seeding, sampling by squared distance.
    #[serde(rename = "kmeans++", alias = "kmeanspp")]
    KMeansPlusPlus,
    /// Centroids supplied one at a time by the user.
    #[serde(rename = "manual")]
    Manual,
}

impl InitMethod {
    pub const ALL: [InitMethod; 4] = [
        InitMethod::Random,
        InitMethod::Farthest,
        InitMethod::KMeansPlusPlus,
        InitMethod::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InitMethod::Random => "random",
            InitMethod::Farthest => "farthest",
            InitMethod::KMeansPlusPlus => "kmeans++",
            InitMethod::Manual => "manual",
        }
    }

    /// Whether centroids are derived from the dataset rather than typed in.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, InitMethod::Manual)
    }
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitMethod {
    type Err = ClusteringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(InitMethod::Random),
            "farthest" | "farthest-point" => Ok(InitMethod::Farthest),
            "kmeans++" | "kmeanspp" => Ok(InitMethod::KMeansPlusPlus),
            "manual" => Ok(InitMethod::Manual),
            other => Err(ClusteringError::invalid(format!(
                "unknown init method {other:?}, expected one of random, farthest, kmeans++, manual"
            ))),
        }
    }
}

/// Everything the presentation layer can tune.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringConfig {
    pub k: usize,
    pub init_method: InitMethod,
    pub max_iterations: usize,
    /// A centroid that moves by at most this much counts as stable.
    pub movement_tolerance: f64,
    /// Delay between automatic steps while running.
    pub step_interval_ms: u64,
    /// Fixes the random source for reproducible seeding.
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            init_method: InitMethod::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            movement_tolerance: DEFAULT_MOVEMENT_TOLERANCE,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            seed: None,
        }
    }
}

impl ClusteringConfig {
    pub fn new(k: usize, init_method: InitMethod) -> Self {
        Self {
            k,
            init_method,
            ..Default::default()
        }
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    /// Check the settings in isolation. Whether `k` fits the dataset is
    /// decided by the controller, which knows the dataset.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ClusteringError::invalid("k must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(ClusteringError::invalid("max_iterations must be at least 1"));
        }
        if !self.movement_tolerance.is_finite() || self.movement_tolerance < 0.0 {
            return Err(ClusteringError::invalid(format!(
                "movement_tolerance must be a non-negative finite number, got {}",
                self.movement_tolerance
            )));
        }
        if self.step_interval_ms == 0 {
            return Err(ClusteringError::invalid("step_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Read a JSON document; omitted fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: ClusteringConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
