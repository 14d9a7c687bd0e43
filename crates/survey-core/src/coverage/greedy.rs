use tracing::debug;

use super::{CoverageAlgorithm, CoverageProblem, Path};
use crate::spatial::{centroid, distance, point_in_polygon, wrap_angle};

/// Share of the time budget the planner allows itself.
const BUDGET_SLACK: f64 = 0.99;

/// Greedy nearest-best sequencing.
///
/// Each step scores every unvisited candidate by weighted distance, turn and
/// predator costs, scaled down inside priority zones, and flies to the
/// cheapest one. Planning stops when every candidate is visited or when the
/// next leg plus the flight home would exceed 99% of the budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCoverage;

struct Candidate {
    index: usize,
    cost: f64,
    distance: f64,
    bearing: f64,
    turn: f64,
}

impl GreedyCoverage {
    fn best_candidate(
        problem: &CoverageProblem<'_>,
        visited: &[bool],
        current: (f64, f64),
        heading: f64,
        predator: &[f64],
    ) -> Option<Candidate> {
        let config = problem.config;
        let mut best: Option<Candidate> = None;
        for (index, point) in problem.candidates.iter().enumerate() {
            if visited[index] {
                continue;
            }
            let dist = distance(current, *point);
            let bearing = (point.1 - current.1).atan2(point.0 - current.0);
            let turn = wrap_angle(bearing - heading);
            let multiplier = if problem
                .priority_zones
                .iter()
                .any(|zone| point_in_polygon(*point, zone))
            {
                config.priority_multiplier
            } else {
                1.0
            };
            let cost = (config.distance_weight * dist / config.scan_radius_px
                + config.turn_weight * turn.abs()
                + config.predator_weight * predator[index])
                * multiplier;

            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(Candidate {
                    index,
                    cost,
                    distance: dist,
                    bearing,
                    turn,
                });
            }
        }
        best
    }
}

impl CoverageAlgorithm for GreedyCoverage {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn plan(&self, problem: &CoverageProblem<'_>) -> Path {
        let candidates = problem.candidates;
        let Some(center) = centroid(candidates) else {
            return Path::default();
        };
        let config = problem.config;
        let budget = config.travel_time_min * BUDGET_SLACK;

        // Candidates far from the center are cheaper.
        let from_center: Vec<f64> = candidates.iter().map(|p| distance(*p, center)).collect();
        let max_from_center = from_center.iter().copied().fold(0.0, f64::max);
        let predator: Vec<f64> = from_center
            .iter()
            .map(|d| (max_from_center - d) / config.scan_radius_px)
            .collect();

        let start = problem.start;
        let mut path = Path {
            points: vec![start],
            ..Path::default()
        };
        let mut visited = vec![false; candidates.len()];
        let mut current = start;
        let mut heading = problem.heading;

        while let Some(next) = Self::best_candidate(problem, &visited, current, heading, &predator) {
            let target = candidates[next.index];
            let leg = config.minutes_for(next.distance);
            let home = config.minutes_for(distance(target, start));
            if path.travel_time_min + leg + home > budget {
                debug!(
                    visited = path.points.len() - 1,
                    elapsed = path.travel_time_min,
                    "Time budget reached"
                );
                break;
            }

            visited[next.index] = true;
            path.points.push(target);
            path.directions.push(next.bearing);
            path.turns.push(next.turn);
            path.travel_time_min += leg;
            current = target;
            heading = next.bearing;
        }

        let bearing_home = (start.1 - current.1).atan2(start.0 - current.0);
        path.points.push(start);
        path.directions.push(bearing_home);
        path.turns.push(wrap_angle(bearing_home - heading));
        path.travel_time_min += config.minutes_for(distance(current, start));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{candidate_grid, CoverageConfig};

    fn config(budget: f64) -> CoverageConfig {
        CoverageConfig {
            scan_radius_px: 50.0,
            scan_accuracy: 2.0,
            resolution_m: 10.0,
            velocity_kmh: 36.0,
            travel_time_min: budget,
            ..CoverageConfig::default()
        }
    }

    fn square_candidates() -> Vec<(f64, f64)> {
        let polygon = [(0.0, 0.0), (510.0, 0.0), (510.0, 510.0), (0.0, 510.0)];
        candidate_grid(&polygon, &[], 50.0, 2.0, Some(0.0))
    }

    fn plan(candidates: &[(f64, f64)], config: &CoverageConfig, zones: &[Vec<(f64, f64)>]) -> Path {
        GreedyCoverage.plan(&CoverageProblem {
            candidates,
            start: (0.0, 0.0),
            heading: std::f64::consts::FRAC_PI_4,
            priority_zones: zones,
            config,
        })
    }

    #[test]
    fn generous_budget_visits_everything_and_closes() {
        let candidates = square_candidates();
        let config = config(10_000.0);
        let path = plan(&candidates, &config, &[]);

        assert_eq!(path.points.len(), candidates.len() + 2);
        assert!(path.is_closed());
        assert_eq!(path.turns.len(), path.points.len() - 1);
        assert_eq!(path.directions.len(), path.points.len() - 1);
        let expected = config.minutes_for(path.length());
        assert!((path.travel_time_min - expected).abs() < 1e-9);
    }

    #[test]
    fn tight_budget_is_respected() {
        let candidates = square_candidates();
        let config = config(5.0);
        let path = plan(&candidates, &config, &[]);

        assert!(path.is_closed());
        assert!(path.points.len() < candidates.len() + 2);
        assert!(path.travel_time_min <= config.travel_time_min * BUDGET_SLACK + 1e-9);
        assert!(path.points.len() > 2, "budget should allow a few waypoints");
    }

    #[test]
    fn zero_budget_returns_start_twice() {
        let candidates = square_candidates();
        let path = plan(&candidates, &config(0.0), &[]);
        assert_eq!(path.points, vec![(0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(path.travel_time_min, 0.0);
    }

    #[test]
    fn empty_grid_gives_empty_path() {
        let path = plan(&[], &config(100.0), &[]);
        assert!(path.is_empty());
        assert_eq!(path.travel_time_min, 0.0);
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let candidates = [(10.0, 0.0), (0.0, 10.0)];
        let config = CoverageConfig {
            predator_weight: 0.0,
            ..config(10_000.0)
        };
        let path = plan(&candidates, &config, &[]);
        assert_eq!(path.points[1], (10.0, 0.0));
    }

    #[test]
    fn priority_zone_pulls_the_path() {
        let candidates = [(10.0, 0.0), (0.0, 12.0)];
        let config = CoverageConfig {
            predator_weight: 0.0,
            ..config(10_000.0)
        };
        let zone = vec![vec![(-5.0, 5.0), (5.0, 5.0), (5.0, 20.0), (-5.0, 20.0)]];
        assert_eq!(plan(&candidates, &config, &[]).points[1], (10.0, 0.0));
        assert_eq!(plan(&candidates, &config, &zone).points[1], (0.0, 12.0));
    }

    #[test]
    fn turn_weight_prefers_straight_ahead() {
        let candidates = [(-9.0, 0.0), (10.0, 0.0)];
        let config = CoverageConfig {
            predator_weight: 0.0,
            turn_weight: 5.0,
            ..config(10_000.0)
        };
        let path = GreedyCoverage.plan(&CoverageProblem {
            candidates: &candidates,
            start: (0.0, 0.0),
            heading: 0.0,
            priority_zones: &[],
            config: &config,
        });
        assert_eq!(path.points[1], (10.0, 0.0));
    }
}
