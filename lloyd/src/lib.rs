//! Lloyd's k-means on a 2-D point cloud, exposed as a steppable session.
//!
//! [`Controller`] owns one clustering session. A presentation layer hands it a
//! dataset and a [`ClusteringConfig`], forwards clicks during manual seeding,
//! and calls [`Controller::step`], [`Controller::run`] / [`Controller::poll`]
//! and [`Controller::reset`], rendering the returned [`Snapshot`]s.

pub mod config;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod initializer;
pub mod iteration;
pub mod snapshot;

pub use config::{ClusteringConfig, InitMethod};
pub use controller::{Controller, Phase, RunReport, RunStatus, StepReport, StepStatus};
pub use error::{ClusteringError, Result};
pub use geometry::{distance, Centroid, Point, Vec2};
pub use initializer::{initialize, ManualAck, ManualSeeding};
pub use snapshot::{Snapshot, TerminalReason};
