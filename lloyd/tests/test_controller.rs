#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    use lloyd::{
        ClusteringConfig, ClusteringError, Controller, InitMethod, Phase, Point, RunStatus,
        StepStatus, TerminalReason, Vec2,
    };

    fn square_fixture() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 1.0),
        ]
    }

    fn seeded(k: usize, init_method: InitMethod) -> ClusteringConfig {
        ClusteringConfig {
            seed: Some(42),
            ..ClusteringConfig::new(k, init_method)
        }
    }

    fn uniform_controller(k: usize, init_method: InitMethod) -> Controller {
        let mut controller = Controller::new(seeded(k, init_method)).unwrap();
        controller.generate_dataset(300, 800.0, 500.0).unwrap();
        controller
    }

    #[test]
    fn test_two_step_convergence_on_square() {
        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Manual), square_fixture()).unwrap();
        controller
            .supply_manual_centroid(Vec2::new(0.0, 0.0))
            .unwrap();
        controller
            .supply_manual_centroid(Vec2::new(10.0, 0.0))
            .unwrap();
        assert_eq!(controller.phase(), Phase::Ready);

        let report = controller.step().unwrap();
        assert_eq!(report.status, StepStatus::Moved);
        let clusters: Vec<_> = report.snapshot.points.iter().map(|p| p.cluster).collect();
        assert_eq!(clusters, vec![Some(0), Some(0), Some(1), Some(1)]);
        assert_eq!(
            report.snapshot.centroids,
            vec![Vec2::new(0.0, 0.5), Vec2::new(10.0, 0.5)]
        );
        assert_eq!(report.snapshot.iteration, 1);
        assert_eq!(report.snapshot.terminal_reason, None);

        let report = controller.step().unwrap();
        assert_eq!(report.status, StepStatus::Converged);
        assert!(report.snapshot.converged);
        assert_eq!(report.snapshot.iteration, 2);
        assert_eq!(controller.phase(), Phase::Converged);

        let report = controller.step().unwrap();
        assert_eq!(
            report.status,
            StepStatus::AlreadyTerminal(TerminalReason::Converged)
        );
        assert_eq!(report.snapshot.iteration, 2);
    }

    #[test]
    fn test_manual_seeding_rejects_extra_centroid() {
        let k = 3;
        let mut controller =
            Controller::with_dataset(seeded(k, InitMethod::Manual), square_fixture()).unwrap();
        assert_eq!(controller.phase(), Phase::AwaitingManualCentroids);

        for i in 0..k {
            let ack = controller
                .supply_manual_centroid(Vec2::new(i as f64, 0.0))
                .unwrap();
            assert!(ack.accepted);
            assert_eq!(ack.have, i + 1);
            assert_eq!(ack.need, k);
        }
        let ack = controller
            .supply_manual_centroid(Vec2::new(100.0, 100.0))
            .unwrap();
        assert!(!ack.accepted);
        assert_eq!(ack.have, k);
        assert_eq!(controller.centroids().len(), k);
    }

    #[test]
    fn test_step_waits_for_manual_centroids() {
        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Manual), square_fixture()).unwrap();

        let report = controller.step().unwrap();
        assert_eq!(
            report.status,
            StepStatus::AwaitingManualCentroids { remaining: 2 }
        );
        assert_eq!(report.snapshot.iteration, 0);

        controller
            .supply_manual_centroid(Vec2::new(3.0, 3.0))
            .unwrap();
        // partial clicks are visible to the renderer
        assert_eq!(controller.snapshot().centroids, vec![Vec2::new(3.0, 3.0)]);

        let report = controller.run(Instant::now()).unwrap();
        assert_eq!(
            report.status,
            RunStatus::AwaitingManualCentroids { remaining: 1 }
        );
        assert!(!controller.is_running());
    }

    #[test]
    fn test_manual_centroid_needs_manual_method() {
        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Random), square_fixture()).unwrap();
        let result = controller.supply_manual_centroid(Vec2::new(1.0, 1.0));
        assert!(matches!(
            result,
            Err(ClusteringError::InvalidConfiguration(_))
        ));

        let mut controller = Controller::new(seeded(2, InitMethod::Manual)).unwrap();
        let result = controller.supply_manual_centroid(Vec2::new(f64::NAN, 1.0));
        assert!(matches!(
            result,
            Err(ClusteringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        assert!(matches!(
            Controller::new(seeded(0, InitMethod::Random)),
            Err(ClusteringError::InvalidConfiguration(_))
        ));

        // k larger than the dataset
        assert!(matches!(
            Controller::with_dataset(seeded(5, InitMethod::Farthest), square_fixture()),
            Err(ClusteringError::InvalidConfiguration(_))
        ));

        // manual centroids need not come from the dataset, so k may exceed it
        assert!(Controller::with_dataset(seeded(5, InitMethod::Manual), square_fixture()).is_ok());

        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Random), square_fixture()).unwrap();
        controller.step().unwrap();
        let result = controller.set_config(seeded(7, InitMethod::KMeansPlusPlus));
        assert!(matches!(
            result,
            Err(ClusteringError::InvalidConfiguration(_))
        ));
        // rejected configuration leaves the session untouched
        assert_eq!(controller.config().k, 2);
        assert_eq!(controller.iteration(), 1);

        assert!(controller.set_dataset(vec![]).is_err());
        assert_eq!(controller.points().len(), 4);
    }

    #[test]
    fn test_step_without_dataset_fails() {
        let mut controller = Controller::new(seeded(2, InitMethod::Random)).unwrap();
        assert!(matches!(
            controller.step(),
            Err(ClusteringError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_first_step_seeds_centroids_from_dataset() {
        for method in [
            InitMethod::Random,
            InitMethod::Farthest,
            InitMethod::KMeansPlusPlus,
        ] {
            let mut controller = uniform_controller(4, method);
            assert_eq!(controller.phase(), Phase::Idle);
            assert!(controller.centroids().is_empty());

            let report = controller.step().unwrap();
            assert!(matches!(
                report.status,
                StepStatus::Moved | StepStatus::Converged
            ));
            assert_eq!(report.snapshot.centroids.len(), 4);
            assert!(report.snapshot.points.iter().all(|p| p.cluster.is_some()));
        }
    }

    #[test]
    fn test_config_change_forces_reset() {
        let mut controller = uniform_controller(3, InitMethod::Random);
        controller.step().unwrap();
        controller.run(Instant::now()).unwrap();
        assert!(controller.is_running());

        controller
            .set_config(seeded(5, InitMethod::Farthest))
            .unwrap();
        assert!(!controller.is_running());
        assert_eq!(controller.iteration(), 0);
        assert!(controller.centroids().is_empty());
        assert_eq!(controller.phase(), Phase::Idle);

        controller.step().unwrap();
        assert_eq!(controller.centroids().len(), 5);

        // switching to manual opens acquisition straight away
        controller
            .set_config(seeded(2, InitMethod::Manual))
            .unwrap();
        assert_eq!(controller.phase(), Phase::AwaitingManualCentroids);
    }

    #[test]
    fn test_reset_mid_run() {
        let mut controller = uniform_controller(3, InitMethod::KMeansPlusPlus);
        let start = Instant::now();
        assert_eq!(controller.run(start).unwrap().status, RunStatus::Started);
        let interval = controller.config().step_interval();
        assert!(controller.poll(start + interval).unwrap().is_some());
        assert_eq!(controller.iteration(), 1);

        let snapshot = controller.reset();
        assert_eq!(snapshot.iteration, 0);
        assert!(snapshot.centroids.is_empty());
        assert!(!snapshot.converged);
        assert!(!snapshot.running);
        assert!(snapshot.points.iter().all(|p| p.cluster.is_none()));
        assert_eq!(controller.phase(), Phase::Idle);

        // the old schedule is gone
        assert!(controller.poll(start + interval * 10).unwrap().is_none());
        assert_eq!(controller.iteration(), 0);
    }

    #[test]
    fn test_regenerating_dataset_cancels_run() {
        let mut controller = uniform_controller(3, InitMethod::Farthest);
        let start = Instant::now();
        let interval = controller.config().step_interval();
        assert_eq!(controller.run(start).unwrap().status, RunStatus::Started);
        assert!(controller.poll(start + interval).unwrap().is_some());
        assert_eq!(controller.iteration(), 1);

        controller.generate_dataset(200, 800.0, 500.0).unwrap();
        assert!(!controller.is_running());
        assert_eq!(controller.iteration(), 0);
        assert!(controller.centroids().is_empty());
        assert_eq!(controller.points().len(), 200);
        assert!(controller.poll(start + interval * 10).unwrap().is_none());
        assert_eq!(controller.iteration(), 0);

        controller.run(start).unwrap();
        controller.set_dataset(square_fixture()).unwrap();
        assert!(!controller.is_running());
        assert!(controller.poll(start + interval * 10).unwrap().is_none());
    }

    #[test]
    fn test_huge_coordinates_are_rejected() {
        let mut controller = Controller::new(seeded(2, InitMethod::Manual)).unwrap();
        let overflowing = vec![
            Point::new(1e308, 1e308),
            Point::new(1.5e308, 1.5e308),
            Point::new(-1e308, 0.0),
        ];
        assert!(matches!(
            controller.set_dataset(overflowing),
            Err(ClusteringError::InvalidConfiguration(_))
        ));
        assert!(controller.points().is_empty());

        assert!(matches!(
            controller.supply_manual_centroid(Vec2::new(1e308, 0.0)),
            Err(ClusteringError::InvalidConfiguration(_))
        ));
        assert!(controller.centroids().is_empty());

        assert!(controller
            .generate_dataset(10, f64::MAX, 500.0)
            .is_err());
    }

    #[test]
    fn test_largest_coordinates_keep_centroids_finite() {
        let bound = lloyd::geometry::MAX_COORDINATE;
        let points = vec![
            Point::new(bound, bound),
            Point::new(bound, bound / 2.0),
            Point::new(-bound, 0.0),
            Point::new(-bound, -bound),
        ];
        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Manual), points).unwrap();
        controller.supply_manual_centroid(Vec2::new(bound, bound)).unwrap();
        controller.supply_manual_centroid(Vec2::new(-bound, 0.0)).unwrap();

        let mut status = controller.step().unwrap().status;
        while status == StepStatus::Moved {
            assert!(controller.centroids().iter().all(|c| c.is_finite()));
            status = controller.step().unwrap().status;
        }
        assert_eq!(status, StepStatus::Converged);
        assert_eq!(
            controller.centroids(),
            &[Vec2::new(bound, bound * 0.75), Vec2::new(-bound, -bound / 2.0)]
        );
    }

    #[test]
    fn test_run_is_single_and_waits_for_interval() {
        let mut controller = uniform_controller(3, InitMethod::Random);
        let start = Instant::now();
        let interval = controller.config().step_interval();

        assert_eq!(controller.run(start).unwrap().status, RunStatus::Started);
        assert_eq!(controller.phase(), Phase::Running);
        assert_eq!(
            controller.run(start).unwrap().status,
            RunStatus::AlreadyRunning
        );
        assert_eq!(controller.next_due(), Some(start + interval));

        assert!(controller.poll(start).unwrap().is_none());
        assert!(controller
            .poll(start + interval - Duration::from_millis(1))
            .unwrap()
            .is_none());
        assert!(controller.poll(start + interval).unwrap().is_some());
        assert_eq!(controller.iteration(), 1);
        // one step per due time, even if polled twice
        assert!(controller.poll(start + interval).unwrap().is_none());
    }

    #[test]
    fn test_run_terminates_within_cap() {
        let mut controller = uniform_controller(5, InitMethod::Random);
        let max_iterations = controller.config().max_iterations;
        let interval = controller.config().step_interval();
        let mut now = Instant::now();
        controller.run(now).unwrap();

        let mut polls = 0;
        while controller.is_running() {
            now += interval;
            controller.poll(now).unwrap();
            polls += 1;
            assert!(polls <= max_iterations);
        }

        assert!(controller.iteration() <= max_iterations);
        assert!(controller.terminal_reason().is_some());
        assert_eq!(
            controller.run(now).unwrap().status,
            RunStatus::AlreadyTerminal(controller.terminal_reason().unwrap())
        );
    }

    #[test]
    fn test_iteration_cap_is_terminal() {
        let config = ClusteringConfig {
            max_iterations: 1,
            ..seeded(3, InitMethod::Random)
        };
        let mut controller = Controller::new(config).unwrap();
        controller.generate_dataset(300, 800.0, 500.0).unwrap();

        let report = controller.step().unwrap();
        assert_eq!(report.status, StepStatus::ReachedMaxIterations);
        assert_eq!(
            report.snapshot.terminal_reason,
            Some(TerminalReason::MaxIterationsReached)
        );
        assert!(!report.snapshot.converged);
        assert_eq!(controller.phase(), Phase::MaxIterationsReached);

        let report = controller.step().unwrap();
        assert_eq!(
            report.status,
            StepStatus::AlreadyTerminal(TerminalReason::MaxIterationsReached)
        );
        assert_eq!(controller.iteration(), 1);

        controller.reset();
        assert_eq!(controller.step().unwrap().status, StepStatus::ReachedMaxIterations);
    }

    #[test]
    fn test_seeded_sessions_are_reproducible() {
        let run = || {
            let mut controller = uniform_controller(4, InitMethod::KMeansPlusPlus);
            while controller.terminal_reason().is_none() {
                controller.step().unwrap();
            }
            controller.snapshot()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_run_blocking_reaches_terminal_state() {
        let config = ClusteringConfig {
            step_interval_ms: 1,
            ..seeded(3, InitMethod::Farthest)
        };
        let mut controller = Controller::new(config).unwrap();
        controller.generate_dataset(200, 800.0, 500.0).unwrap();
        controller.run(Instant::now()).unwrap();

        let mut steps = 0;
        let reason = controller
            .run_blocking(|| false, |report| {
                steps += 1;
                assert_eq!(report.snapshot.iteration, steps);
            })
            .unwrap();

        assert!(reason.is_some());
        assert_eq!(steps, controller.iteration());
        assert!(!controller.is_running());
    }

    #[test]
    fn test_run_blocking_honours_stop_condition() {
        let mut controller = uniform_controller(3, InitMethod::Random);
        controller.run(Instant::now()).unwrap();

        let checks = Cell::new(0);
        let result = controller.run_blocking(
            || {
                checks.set(checks.get() + 1);
                true
            },
            |_| panic!("no step expected"),
        );
        assert!(matches!(result, Err(ClusteringError::Stopped)));
        assert_eq!(checks.get(), 1);
        assert!(!controller.is_running());
        assert_eq!(controller.iteration(), 0);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut controller =
            Controller::with_dataset(seeded(2, InitMethod::Manual), square_fixture()).unwrap();
        controller
            .supply_manual_centroid(Vec2::new(0.0, 0.0))
            .unwrap();
        controller
            .supply_manual_centroid(Vec2::new(10.0, 0.0))
            .unwrap();
        controller.step().unwrap();
        let snapshot = controller.step().unwrap().snapshot;

        assert_eq!(snapshot.cluster_sizes(), vec![2, 2]);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"terminal_reason\":\"converged\""));
        let decoded: lloyd::Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
