use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    candidate_grid, smooth_path, CoverageAlgorithm, CoverageConfig, CoverageProblem, Path,
    SmoothedPath, SmoothingConfig,
};
use crate::error::PlannerError;

/// Result of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub candidates: usize,
    pub path: Path,
    pub smoothed: Option<SmoothedPath>,
}

impl PlanOutcome {
    /// False when there was nothing to plan.
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Configures and runs a coverage algorithm over a polygon.
///
/// The algorithm and the start point are required; planning fails with a
/// configuration error before doing any work when either is missing.
#[derive(Clone, Default)]
pub struct CoveragePlanner {
    config: CoverageConfig,
    algorithm: Option<Arc<dyn CoverageAlgorithm>>,
    start: Option<(f64, f64)>,
    heading: f64,
    priority_zones: Vec<Vec<(f64, f64)>>,
    smoothing: Option<SmoothingConfig>,
}

impl CoveragePlanner {
    pub fn new(config: CoverageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl CoverageAlgorithm + 'static) -> Self {
        self.algorithm = Some(Arc::new(algorithm));
        self
    }

    pub fn with_start(mut self, start: (f64, f64), heading: f64) -> Self {
        self.start = Some(start);
        self.heading = heading;
        self
    }

    pub fn with_priority_zone(mut self, zone: Vec<(f64, f64)>) -> Self {
        self.priority_zones.push(zone);
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = Some(smoothing);
        self
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Plan over `polygon` minus `obstacles`, all in pixel space.
    pub fn plan(
        &self,
        polygon: &[(f64, f64)],
        obstacles: &[Vec<(f64, f64)>],
    ) -> Result<PlanOutcome, PlannerError> {
        let algorithm = self.algorithm.as_ref().ok_or(PlannerError::MissingAlgorithm)?;
        let start = self.start.ok_or(PlannerError::MissingStart)?;
        self.config.validate()?;
        if let Some(smoothing) = &self.smoothing {
            smoothing.validate()?;
        }

        let candidates = candidate_grid(
            polygon,
            obstacles,
            self.config.scan_radius_px,
            self.config.scan_accuracy,
            self.config.grid_rotation,
        );
        if candidates.is_empty() {
            info!(vertices = polygon.len(), "No candidate waypoints inside the area");
            return Ok(PlanOutcome::default());
        }

        let path = algorithm.plan(&CoverageProblem {
            candidates: &candidates,
            start,
            heading: self.heading,
            priority_zones: &self.priority_zones,
            config: &self.config,
        });
        let smoothed = self.smoothing.as_ref().map(|smoothing| {
            smooth_path(
                &path,
                smoothing,
                self.config.velocity_mps(),
                self.config.resolution_m,
            )
        });

        info!(
            algorithm = algorithm.name(),
            candidates = candidates.len(),
            waypoints = path.len(),
            minutes = path.travel_time_min,
            "Coverage path planned"
        );
        Ok(PlanOutcome {
            candidates: candidates.len(),
            path,
            smoothed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::GreedyCoverage;

    fn square() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (510.0, 0.0), (510.0, 510.0), (0.0, 510.0)]
    }

    fn config() -> CoverageConfig {
        CoverageConfig {
            scan_radius_px: 50.0,
            scan_accuracy: 2.0,
            travel_time_min: 10_000.0,
            ..CoverageConfig::default()
        }
    }

    #[test]
    fn missing_algorithm_is_a_configuration_error() {
        let planner = CoveragePlanner::new(config()).with_start((0.0, 0.0), 0.0);
        assert_eq!(planner.plan(&square(), &[]), Err(PlannerError::MissingAlgorithm));
    }

    #[test]
    fn missing_start_is_a_configuration_error() {
        let planner = CoveragePlanner::new(config()).with_algorithm(GreedyCoverage);
        assert_eq!(planner.plan(&square(), &[]), Err(PlannerError::MissingStart));
    }

    #[test]
    fn full_plan_is_closed_and_length_is_additive() {
        let planner = CoveragePlanner::new(config())
            .with_algorithm(GreedyCoverage)
            .with_start((0.0, 0.0), std::f64::consts::FRAC_PI_4)
            .with_smoothing(SmoothingConfig::default());
        let outcome = planner.plan(&square(), &[]).unwrap();

        assert!(outcome.has_path());
        assert_eq!(outcome.candidates, 21 * 21);
        assert_eq!(outcome.path.len(), outcome.candidates + 2);
        assert!(outcome.path.is_closed());
        let summed: f64 = outcome
            .path
            .points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
            .sum();
        assert!((outcome.path.length() - summed).abs() < 1e-9);

        let smoothed = outcome.smoothed.unwrap();
        assert_eq!(smoothed.points.first(), Some(&(0.0, 0.0)));
        assert_eq!(smoothed.points.last(), Some(&(0.0, 0.0)));
    }

    #[test]
    fn polygon_without_candidates_reports_no_path() {
        let planner = CoveragePlanner::new(config())
            .with_algorithm(GreedyCoverage)
            .with_start((0.0, 0.0), 0.0);
        let sliver = [(0.0, 0.0), (20.0, 0.0), (20.0, 20.0)];
        let outcome = planner.plan(&sliver, &[]).unwrap();
        assert!(!outcome.has_path());
        assert_eq!(outcome.candidates, 0);
    }

    #[test]
    fn invalid_config_is_reported() {
        let planner = CoveragePlanner::new(CoverageConfig {
            scan_accuracy: 0.0,
            ..config()
        })
        .with_algorithm(GreedyCoverage)
        .with_start((0.0, 0.0), 0.0);
        assert!(matches!(
            planner.plan(&square(), &[]),
            Err(PlannerError::InvalidConfig(_))
        ));
    }
}
