//! Coverage path planning over the detected polygon.
//!
//! Everything here works in merged-raster pixel space; `resolution_m`
//! converts to meters where time or bank angle is involved.

mod greedy;
mod grid;
mod planner;
mod smoothing;

pub use greedy::GreedyCoverage;
pub use grid::{candidate_grid, grid_rotation};
pub use planner::{CoveragePlanner, PlanOutcome};
pub use smoothing::{
    smooth_path, tangent_points, CornerKind, CornerSmoothing, SmoothedPath, SmoothingConfig,
    SmoothingWarning,
};

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::spatial::{distance, distance_to_line};

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Sensor footprint radius in pixels.
    pub scan_radius_px: f64,
    /// Candidate points per scan radius.
    pub scan_accuracy: f64,
    pub distance_weight: f64,
    pub turn_weight: f64,
    pub predator_weight: f64,
    /// Cost factor applied inside priority zones, within (0, 1).
    pub priority_multiplier: f64,
    pub resolution_m: f64,
    pub velocity_kmh: f64,
    /// Flight time budget in minutes.
    pub travel_time_min: f64,
    /// Lattice rotation; derived from the first polygon edge when unset.
    pub grid_rotation: Option<f64>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            scan_radius_px: 200.0,
            scan_accuracy: 2.0,
            distance_weight: 1.5,
            turn_weight: 0.0,
            predator_weight: 1.5,
            priority_multiplier: 0.5,
            resolution_m: 10.0,
            velocity_kmh: 60.0,
            travel_time_min: 60.0,
            grid_rotation: None,
        }
    }
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        let positive = [
            ("scan_radius_px", self.scan_radius_px),
            ("scan_accuracy", self.scan_accuracy),
            ("resolution_m", self.resolution_m),
            ("velocity_kmh", self.velocity_kmh),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlannerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.travel_time_min.is_finite() && self.travel_time_min >= 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "travel_time_min must not be negative, got {}",
                self.travel_time_min
            )));
        }
        if !(self.priority_multiplier > 0.0 && self.priority_multiplier < 1.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "priority_multiplier must be within (0, 1), got {}",
                self.priority_multiplier
            )));
        }
        Ok(())
    }

    pub fn velocity_mps(&self) -> f64 {
        self.velocity_kmh / 3.6
    }

    /// Spacing between candidate waypoints in pixels.
    pub fn grid_spacing(&self) -> f64 {
        self.scan_radius_px / self.scan_accuracy
    }

    /// Flight time in minutes for a distance in pixels.
    pub fn minutes_for(&self, distance_px: f64) -> f64 {
        distance_px * self.resolution_m / self.velocity_mps() / 60.0
    }
}

/// Ordered flight path in pixel space.
///
/// `directions[i]` and `turns[i]` describe the leg from `points[i]` to
/// `points[i + 1]`: its bearing and the turn taken at `points[i]` to fly it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<(f64, f64)>,
    pub directions: Vec<f64>,
    pub turns: Vec<f64>,
    pub travel_time_min: f64,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }

    /// Sum of consecutive Euclidean distances in pixels.
    pub fn length(&self) -> f64 {
        polyline_length(&self.points)
    }

    pub fn length_m(&self, resolution_m: f64) -> f64 {
        self.length() * resolution_m
    }

    /// Steepest bank angle implied by any three consecutive points.
    pub fn max_bank_angle(&self, velocity_mps: f64, resolution_m: f64) -> f64 {
        max_bank_angle(&self.points, velocity_mps, resolution_m)
    }
}

pub(crate) fn polyline_length(points: &[(f64, f64)]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// `atan(v² / (g·d))` maximised over point triples, `d` being the offset of
/// the middle point from the chord in meters.
pub fn max_bank_angle(points: &[(f64, f64)], velocity_mps: f64, resolution_m: f64) -> f64 {
    points
        .windows(3)
        .filter_map(|w| {
            let offset_m = distance_to_line(w[1], w[0], w[2]) * resolution_m;
            (offset_m > 1e-9).then(|| (velocity_mps.powi(2) / (GRAVITY * offset_m)).atan())
        })
        .fold(0.0, f64::max)
}

/// Inputs handed to a [`CoverageAlgorithm`].
#[derive(Debug, Clone, Copy)]
pub struct CoverageProblem<'a> {
    pub candidates: &'a [(f64, f64)],
    pub start: (f64, f64),
    pub heading: f64,
    pub priority_zones: &'a [Vec<(f64, f64)>],
    pub config: &'a CoverageConfig,
}

/// Sequencing strategy over a candidate grid.
pub trait CoverageAlgorithm: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build a closed path from `problem.start` through a subset of the
    /// candidates. An empty candidate list yields an empty path.
    fn plan(&self, problem: &CoverageProblem<'_>) -> Path;
}
