use thiserror::Error;

/// Failures surfaced by the clustering engine.
///
/// Waiting for manual centroids, convergence and the iteration cap are not
/// errors; they are reported through [`crate::controller::StepStatus`] and
/// [`crate::controller::RunStatus`].
#[derive(Debug, Error)]
pub enum ClusteringError {
    /// Rejected input at the configuration boundary: bad `k`, empty or
    /// non-finite dataset, `k` larger than the dataset, and so on.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A blocking run was cancelled by its stop condition.
    #[error("run stopped before reaching a terminal state")]
    Stopped,

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClusteringError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ClusteringError::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ClusteringError>;
