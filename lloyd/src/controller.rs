use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ClusteringConfig, InitMethod};
use crate::dataset::{clear_assignments, generate_uniform, validate_points};
use crate::error::{ClusteringError, Result};
use crate::geometry::{Centroid, Point, Vec2, MAX_COORDINATE};
use crate::initializer::{initialize, ManualAck, ManualSeeding};
use crate::iteration;
use crate::snapshot::{Snapshot, TerminalReason};

/// Longest uninterrupted sleep inside [`Controller::run_blocking`]; bounds how
/// long a raised stop condition can go unnoticed.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Coarse state of the clustering session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No centroids yet.
    Idle,
    /// Manual seeding is open and still short of `k` centroids.
    AwaitingManualCentroids,
    /// `k` centroids in place, stepping allowed.
    Ready,
    /// A timed run is armed.
    Running,
    Converged,
    MaxIterationsReached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// A step was applied and some centroid moved beyond the tolerance.
    Moved,
    /// A step was applied and nothing moved; the session is now converged.
    Converged,
    /// A step was applied, centroids still moved, and the iteration cap is now reached.
    ReachedMaxIterations,
    /// Nothing was applied because the session already ended.
    AlreadyTerminal(TerminalReason),
    /// Nothing was applied because manual seeding is incomplete.
    AwaitingManualCentroids { remaining: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    /// A run is already armed; the call changed nothing.
    AlreadyRunning,
    AlreadyTerminal(TerminalReason),
    AwaitingManualCentroids { remaining: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub status: StepStatus,
    pub snapshot: Snapshot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub snapshot: Snapshot,
}

#[derive(Clone, Copy, Debug)]
struct RunSchedule {
    next_due: Instant,
}

/// Owns the dataset, the centroids and the iteration state of one clustering
/// session, and drives Lloyd's algorithm step by step or on a timer.
///
/// A timed run is cooperative: [`Controller::run`] only arms a schedule, and
/// the owner advances it through [`Controller::poll`] (or
/// [`Controller::run_blocking`]). Every mutating call cancels an armed run
/// first, so a stale schedule can never step a freshly reset session.
pub struct Controller {
    config: ClusteringConfig,
    points: Vec<Point>,
    centroids: Vec<Centroid>,
    /// Open manual acquisition; `None` outside the manual method or once
    /// the clicks have been promoted to `centroids`.
    manual: Option<ManualSeeding>,
    iteration: usize,
    converged: bool,
    schedule: Option<RunSchedule>,
    rng: StdRng,
}

impl Controller {
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        let rng = Self::make_rng(&config);
        let mut controller = Self {
            config,
            points: Vec::new(),
            centroids: Vec::new(),
            manual: None,
            iteration: 0,
            converged: false,
            schedule: None,
            rng,
        };
        controller.open_manual_acquisition();
        Ok(controller)
    }

    pub fn with_dataset(config: ClusteringConfig, points: Vec<Point>) -> Result<Self> {
        let mut controller = Self::new(config)?;
        controller.set_dataset(points)?;
        Ok(controller)
    }

    fn make_rng(config: &ClusteringConfig) -> StdRng {
        match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Complete centroids, or the manual centroids collected so far.
    pub fn centroids(&self) -> &[Centroid] {
        match &self.manual {
            Some(seeding) if self.centroids.is_empty() => seeding.centroids(),
            _ => &self.centroids,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    /// When the armed run takes its next step.
    pub fn next_due(&self) -> Option<Instant> {
        self.schedule.map(|s| s.next_due)
    }

    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        if self.converged {
            Some(TerminalReason::Converged)
        } else if self.iteration >= self.config.max_iterations {
            Some(TerminalReason::MaxIterationsReached)
        } else {
            None
        }
    }

    pub fn phase(&self) -> Phase {
        match self.terminal_reason() {
            Some(TerminalReason::Converged) => return Phase::Converged,
            Some(TerminalReason::MaxIterationsReached) => return Phase::MaxIterationsReached,
            None => {}
        }
        if self.schedule.is_some() {
            Phase::Running
        } else if self.centroids.len() == self.config.k {
            Phase::Ready
        } else if self.manual.is_some() {
            Phase::AwaitingManualCentroids
        } else {
            Phase::Idle
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            points: self.points.clone(),
            centroids: self.centroids().to_vec(),
            iteration: self.iteration,
            converged: self.converged,
            terminal_reason: self.terminal_reason(),
            running: self.is_running(),
        }
    }

    /// Replace the dataset. The session is reset; on error nothing changes.
    ///
    /// Under the manual method the acquisition phase is reopened.
    pub fn set_dataset(&mut self, points: Vec<Point>) -> Result<()> {
        validate_points(&points)?;
        Self::check_capacity(&self.config, points.len())?;
        self.points = points;
        self.restart();
        Ok(())
    }

    /// The "generate data" action: scatter `count` fresh points over the canvas.
    pub fn generate_dataset(&mut self, count: usize, width: f64, height: f64) -> Result<()> {
        let in_range = |side: f64| side.is_finite() && side > 0.0 && side <= MAX_COORDINATE;
        if !(in_range(width) && in_range(height)) {
            return Err(ClusteringError::invalid(format!(
                "canvas sides must be positive and at most {MAX_COORDINATE:e}, got {width}x{height}"
            )));
        }
        let points = generate_uniform(count, width, height, &mut self.rng);
        self.set_dataset(points)
    }

    /// Replace the configuration. The session is reset; on error nothing changes.
    ///
    /// Selecting the manual method opens the acquisition phase right away.
    pub fn set_config(&mut self, config: ClusteringConfig) -> Result<()> {
        config.validate()?;
        if !self.points.is_empty() {
            Self::check_capacity(&config, self.points.len())?;
        }
        if config.seed.is_some() && config.seed != self.config.seed {
            self.rng = Self::make_rng(&config);
        }
        self.config = config;
        self.restart();
        Ok(())
    }

    fn check_capacity(config: &ClusteringConfig, points_count: usize) -> Result<()> {
        if config.init_method.is_automatic() && config.k > points_count {
            return Err(ClusteringError::invalid(format!(
                "k ({}) exceeds the number of points ({points_count})",
                config.k
            )));
        }
        Ok(())
    }

    fn open_manual_acquisition(&mut self) {
        let k = self.config.k;
        if self.config.init_method == InitMethod::Manual && self.centroids.is_empty() {
            self.manual.get_or_insert_with(|| ManualSeeding::new(k));
        }
    }

    /// Reset after new inputs, reopening manual acquisition when it applies.
    fn restart(&mut self) {
        self.reset();
        self.open_manual_acquisition();
    }

    /// Back to [`Phase::Idle`]: no centroids, no assignments, no iterations,
    /// no armed run. The dataset and configuration are kept.
    pub fn reset(&mut self) -> Snapshot {
        self.cancel_run();
        clear_assignments(&mut self.points);
        self.centroids.clear();
        self.manual = None;
        self.iteration = 0;
        self.converged = false;
        tracing::info!("clustering reset");
        self.snapshot()
    }

    /// Offer one user chosen centroid while seeding manually.
    ///
    /// Once `k` centroids are collected the offer is declined with
    /// `accepted == false`.
    pub fn supply_manual_centroid(&mut self, position: Vec2) -> Result<ManualAck> {
        if self.config.init_method != InitMethod::Manual {
            return Err(ClusteringError::invalid(format!(
                "manual centroids are only accepted with the manual init method, current method is {}",
                self.config.init_method
            )));
        }
        let k = self.config.k;
        if self.centroids.len() == k {
            return Ok(ManualAck {
                accepted: false,
                have: k,
                need: k,
            });
        }

        let seeding = self.manual.get_or_insert_with(|| ManualSeeding::new(k));
        let ack = seeding.accept(position)?;
        if seeding.is_complete() {
            if let Some(seeding) = self.manual.take() {
                self.centroids = initialize(
                    &self.points,
                    k,
                    InitMethod::Manual,
                    seeding.centroids(),
                    &mut self.rng,
                )?;
                tracing::info!(k, "manual centroids complete");
            }
        }
        Ok(ack)
    }

    /// Make sure `k` centroids exist, seeding them if needed.
    ///
    /// Returns the number of manual centroids still missing, if any.
    fn ensure_initialized(&mut self) -> Result<Option<usize>> {
        if self.points.is_empty() {
            return Err(ClusteringError::invalid("no dataset to cluster"));
        }
        let k = self.config.k;
        if self.centroids.len() == k {
            return Ok(None);
        }

        if self.config.init_method == InitMethod::Manual {
            let seeding = self.manual.get_or_insert_with(|| ManualSeeding::new(k));
            return Ok(Some(seeding.remaining()));
        }

        clear_assignments(&mut self.points);
        self.centroids = initialize(
            &self.points,
            k,
            self.config.init_method,
            &[],
            &mut self.rng,
        )?;
        Ok(None)
    }

    /// Apply one Lloyd step, seeding centroids first if there are none.
    pub fn step(&mut self) -> Result<StepReport> {
        let status = match self.step_inner() {
            Ok(status) => status,
            Err(err) => {
                self.cancel_run();
                return Err(err);
            }
        };
        Ok(StepReport {
            status,
            snapshot: self.snapshot(),
        })
    }

    fn step_inner(&mut self) -> Result<StepStatus> {
        if let Some(reason) = self.terminal_reason() {
            self.cancel_run();
            return Ok(StepStatus::AlreadyTerminal(reason));
        }
        if let Some(remaining) = self.ensure_initialized()? {
            self.cancel_run();
            return Ok(StepStatus::AwaitingManualCentroids { remaining });
        }

        let result = iteration::step(
            &mut self.points,
            &mut self.centroids,
            self.config.movement_tolerance,
        );
        self.iteration += 1;
        tracing::debug!(
            iteration = self.iteration,
            max_shift = result.max_shift,
            moved = result.moved,
            "lloyd step"
        );

        if !result.moved {
            self.converged = true;
            self.cancel_run();
            tracing::info!(iterations = self.iteration, "converged");
            Ok(StepStatus::Converged)
        } else if self.iteration >= self.config.max_iterations {
            self.cancel_run();
            tracing::info!(
                iterations = self.iteration,
                "iteration cap reached before convergence"
            );
            Ok(StepStatus::ReachedMaxIterations)
        } else {
            Ok(StepStatus::Moved)
        }
    }

    /// Arm a timed run whose first step is due one interval after `now`.
    ///
    /// At most one run is armed at a time; asking again is a no-op.
    pub fn run(&mut self, now: Instant) -> Result<RunReport> {
        let status = if self.schedule.is_some() {
            RunStatus::AlreadyRunning
        } else if let Some(reason) = self.terminal_reason() {
            RunStatus::AlreadyTerminal(reason)
        } else if let Some(remaining) = self.ensure_initialized()? {
            RunStatus::AwaitingManualCentroids { remaining }
        } else {
            self.schedule = Some(RunSchedule {
                next_due: now + self.config.step_interval(),
            });
            tracing::info!(
                interval_ms = self.config.step_interval_ms,
                "run started"
            );
            RunStatus::Started
        };
        Ok(RunReport {
            status,
            snapshot: self.snapshot(),
        })
    }

    /// Drop the armed run, if any. Returns whether one was armed.
    pub fn cancel_run(&mut self) -> bool {
        let was_running = self.schedule.take().is_some();
        if was_running {
            tracing::info!(iteration = self.iteration, "run stopped");
        }
        was_running
    }

    /// Advance an armed run: applies one step if it is due at `now`.
    ///
    /// The run disarms itself on convergence or at the iteration cap.
    pub fn poll(&mut self, now: Instant) -> Result<Option<StepReport>> {
        match self.schedule {
            Some(schedule) if now >= schedule.next_due => {}
            _ => return Ok(None),
        }
        let report = self.step()?;
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.next_due = now + self.config.step_interval();
        }
        Ok(Some(report))
    }

    /// Drive an armed run on the wall clock until it finishes.
    ///
    /// `on_step` sees every applied step. `stop_condition` is checked at least
    /// every few milliseconds between steps; raising it disarms the run and
    /// returns [`ClusteringError::Stopped`], leaving the last completed step
    /// in place.
    pub fn run_blocking(
        &mut self,
        stop_condition: impl Fn() -> bool,
        mut on_step: impl FnMut(&StepReport),
    ) -> Result<Option<TerminalReason>> {
        while let Some(due) = self.next_due() {
            loop {
                if stop_condition() {
                    self.cancel_run();
                    return Err(ClusteringError::Stopped);
                }
                let now = Instant::now();
                if now >= due {
                    break;
                }
                std::thread::sleep((due - now).min(STOP_POLL_INTERVAL));
            }
            if let Some(report) = self.poll(Instant::now())? {
                on_step(&report);
            }
        }
        Ok(self.terminal_reason())
    }
}
