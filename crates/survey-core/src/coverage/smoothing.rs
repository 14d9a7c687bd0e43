use std::f64::consts::FRAC_PI_6;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Path, GRAVITY};
use crate::error::PlannerError;
use crate::spatial::distance;

/// Straight-enough corners are left alone.
const MIN_TANGENT_PX: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Maximum bank angle in radians.
    pub bank_angle_rad: f64,
    /// Largest tolerated deviation of a tangent cut from the corner, in meters.
    pub margin_m: f64,
    pub gravity: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            bank_angle_rad: FRAC_PI_6,
            margin_m: 100.0,
            gravity: GRAVITY,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(self.bank_angle_rad > 0.0 && self.bank_angle_rad < std::f64::consts::FRAC_PI_2) {
            return Err(PlannerError::InvalidConfig(format!(
                "bank_angle_rad must be within (0, pi/2), got {}",
                self.bank_angle_rad
            )));
        }
        if !(self.margin_m.is_finite() && self.margin_m >= 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "margin_m must not be negative, got {}",
                self.margin_m
            )));
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        Ok(())
    }

    /// Minimum turn radius in meters at `velocity_mps`.
    pub fn turn_radius_m(&self, velocity_mps: f64) -> f64 {
        velocity_mps.powi(2) / (self.gravity * self.bank_angle_rad.tan())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerKind {
    TangentCut,
    Arc,
}

/// A corner replaced by tangent geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerSmoothing {
    /// Index of the corner in the raw path.
    pub index: usize,
    pub kind: CornerKind,
    pub center: (f64, f64),
    pub radius: f64,
    pub tangent_points: [(f64, f64); 2],
}

/// Corner kept as-is because it could not be smoothed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingWarning {
    /// A leg next to the corner is shorter than the turn radius.
    ManeuverInfeasible {
        index: usize,
        leg_px: f64,
        radius_px: f64,
    },
    /// The tangent construction has no solution for this corner.
    DegenerateGeometry { index: usize },
}

impl fmt::Display for SmoothingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingWarning::ManeuverInfeasible {
                index,
                leg_px,
                radius_px,
            } => write!(
                f,
                "maneuver at waypoint {index} may be infeasible: leg {leg_px:.1} px is shorter than turn radius {radius_px:.1} px"
            ),
            SmoothingWarning::DegenerateGeometry { index } => {
                write!(f, "corner at waypoint {index} has no tangent solution")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPath {
    pub points: Vec<(f64, f64)>,
    pub corners: Vec<CornerSmoothing>,
    pub warnings: Vec<SmoothingWarning>,
    /// Turn radius used, in pixels.
    pub radius_px: f64,
}

/// The two points where tangents from `p` touch the circle of radius `r`
/// around the origin. `None` when `p` is on or inside the circle.
pub fn tangent_points(p: (f64, f64), r: f64) -> Option<[(f64, f64); 2]> {
    let d2 = p.0 * p.0 + p.1 * p.1;
    if d2 <= r * r {
        return None;
    }
    let scale = r * r / d2;
    let offset = (scale * p.0, scale * p.1);
    let k = r / d2 * (d2 - r * r).sqrt();
    let delta = (-p.1 * k, p.0 * k);
    Some([
        (offset.0 + delta.0, offset.1 + delta.1),
        (offset.0 - delta.0, offset.1 - delta.1),
    ])
}

fn unit(from: (f64, f64), to: (f64, f64)) -> Option<(f64, f64)> {
    let d = distance(from, to);
    (d > 1e-12).then(|| ((to.0 - from.0) / d, (to.1 - from.1) / d))
}

enum Corner {
    Keep,
    Replace(Vec<(f64, f64)>, CornerSmoothing),
    Warn(SmoothingWarning),
}

/// Round the corners of `path` so no turn is tighter than the bank-limited
/// radius at `velocity_mps`.
///
/// Short legs keep their corner with a warning. A corner whose tangent cut
/// stays within the margin is replaced by its two tangent points. Otherwise
/// the corner is replaced by arc entry, the corner itself, and arc exit.
pub fn smooth_path(
    path: &Path,
    config: &SmoothingConfig,
    velocity_mps: f64,
    resolution_m: f64,
) -> SmoothedPath {
    let radius = config.turn_radius_m(velocity_mps) / resolution_m;
    let margin = config.margin_m / resolution_m;
    let mut out = SmoothedPath {
        radius_px: radius,
        ..SmoothedPath::default()
    };
    let points = &path.points;
    if points.len() < 3 {
        out.points = points.clone();
        return out;
    }

    out.points.push(points[0]);
    for index in 1..path.turns.len().min(points.len() - 1) {
        let corner = points[index];
        match smooth_corner(
            index,
            points[index - 1],
            corner,
            points[index + 1],
            path.turns[index],
            radius,
            margin,
        ) {
            Corner::Keep => out.points.push(corner),
            Corner::Replace(replacement, smoothing) => {
                out.points.extend(replacement);
                out.corners.push(smoothing);
            }
            Corner::Warn(warning) => {
                warn!(%warning, "Keeping corner unmodified");
                out.points.push(corner);
                out.warnings.push(warning);
            }
        }
    }
    if let Some(last) = points.last() {
        out.points.push(*last);
    }
    out
}

fn smooth_corner(
    index: usize,
    before: (f64, f64),
    corner: (f64, f64),
    after: (f64, f64),
    turn: f64,
    radius: f64,
    margin: f64,
) -> Corner {
    let leg_in = distance(before, corner);
    let leg_out = distance(corner, after);
    if leg_in < radius || leg_out < radius {
        return Corner::Warn(SmoothingWarning::ManeuverInfeasible {
            index,
            leg_px: leg_in.min(leg_out),
            radius_px: radius,
        });
    }

    let half = turn / 2.0;
    let tangent = radius * half.tan().abs();
    let sagitta = radius * (1.0 / half.cos() - 1.0);

    if tangent > MIN_TANGENT_PX && sagitta <= margin {
        let (Some(u_in), Some(u_out)) = (unit(corner, before), unit(corner, after)) else {
            return Corner::Warn(SmoothingWarning::DegenerateGeometry { index });
        };
        let Some(bisector) = unit((0.0, 0.0), (u_in.0 + u_out.0, u_in.1 + u_out.1)) else {
            return Corner::Warn(SmoothingWarning::DegenerateGeometry { index });
        };
        let entry = (corner.0 + tangent * u_in.0, corner.1 + tangent * u_in.1);
        let exit = (corner.0 + tangent * u_out.0, corner.1 + tangent * u_out.1);
        let reach = radius / half.cos().abs();
        let center = (corner.0 + reach * bisector.0, corner.1 + reach * bisector.1);
        return Corner::Replace(
            vec![entry, exit],
            CornerSmoothing {
                index,
                kind: CornerKind::TangentCut,
                center,
                radius,
                tangent_points: [entry, exit],
            },
        );
    }

    if sagitta > margin {
        let middle = ((before.0 + after.0) / 2.0, (before.1 + after.1) / 2.0);
        let Some(toward) = unit(corner, middle) else {
            return Corner::Warn(SmoothingWarning::DegenerateGeometry { index });
        };
        let center = (corner.0 + radius * toward.0, corner.1 + radius * toward.1);
        let relative = |p: (f64, f64)| (p.0 - center.0, p.1 - center.1);
        let (Some(from_before), Some(from_after)) = (
            tangent_points(relative(before), radius),
            tangent_points(relative(after), radius),
        ) else {
            return Corner::Warn(SmoothingWarning::DegenerateGeometry { index });
        };
        let entry = if turn < 0.0 { from_before[1] } else { from_before[0] };
        let exit = if turn > 0.0 { from_after[1] } else { from_after[0] };
        let entry = (entry.0 + center.0, entry.1 + center.1);
        let exit = (exit.0 + center.0, exit.1 + center.1);
        return Corner::Replace(
            vec![entry, corner, exit],
            CornerSmoothing {
                index,
                kind: CornerKind::Arc,
                center,
                radius,
                tangent_points: [entry, exit],
            },
        );
    }

    Corner::Keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{candidate_grid, CoverageAlgorithm, CoverageConfig, CoverageProblem, GreedyCoverage};
    use crate::spatial::wrap_angle;

    fn path_through(points: &[(f64, f64)]) -> Path {
        let mut path = Path {
            points: points.to_vec(),
            ..Path::default()
        };
        let mut heading = 0.0;
        for w in points.windows(2) {
            let bearing = (w[1].1 - w[0].1).atan2(w[1].0 - w[0].0);
            path.directions.push(bearing);
            path.turns.push(wrap_angle(bearing - heading));
            heading = bearing;
        }
        path
    }

    fn assert_on_circle(corner: &CornerSmoothing) {
        for p in corner.tangent_points {
            let d = distance(p, corner.center);
            assert!(
                (d - corner.radius).abs() < 1e-6,
                "tangent point {p:?} is {d} from center, radius {}",
                corner.radius
            );
        }
    }

    #[test]
    fn turn_radius_follows_bank_angle() {
        let config = SmoothingConfig::default();
        let r = config.turn_radius_m(20.0);
        assert!((r - 400.0 / (9.81 * FRAC_PI_6.tan())).abs() < 1e-9);
    }

    #[test]
    fn tangent_points_lie_on_the_circle() {
        let [a, b] = tangent_points((10.0, 0.0), 5.0).unwrap();
        for p in [a, b] {
            assert!((p.0.hypot(p.1) - 5.0).abs() < 1e-12);
            // Tangent: radius is perpendicular to the line from the external point.
            let dot = p.0 * (10.0 - p.0) + p.1 * (0.0 - p.1);
            assert!(dot.abs() < 1e-9);
        }
        assert!(tangent_points((3.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn gentle_corner_becomes_tangent_cut() {
        // 10 px per meter-unit; a 20 m/s turn radius is ~70.7 m = 7.07 px.
        let path = path_through(&[(0.0, 0.0), (100.0, 0.0), (200.0, 30.0), (300.0, 30.0)]);
        let smoothed = smooth_path(&path, &SmoothingConfig::default(), 20.0, 10.0);
        assert!(smoothed.warnings.is_empty());
        assert_eq!(smoothed.corners.len(), 2);
        assert!(smoothed.corners.iter().all(|c| c.kind == CornerKind::TangentCut));
        for corner in &smoothed.corners {
            assert_on_circle(corner);
        }
        assert_eq!(smoothed.points.first(), Some(&(0.0, 0.0)));
        assert_eq!(smoothed.points.last(), Some(&(300.0, 30.0)));
        assert_eq!(smoothed.points.len(), 6);
    }

    #[test]
    fn sharp_corner_becomes_arc_with_via_point() {
        let path = path_through(&[(0.0, 0.0), (100.0, 0.0), (10.0, 20.0)]);
        let config = SmoothingConfig {
            margin_m: 0.0,
            ..SmoothingConfig::default()
        };
        let smoothed = smooth_path(&path, &config, 20.0, 10.0);
        assert_eq!(smoothed.corners.len(), 1);
        let corner = &smoothed.corners[0];
        assert_eq!(corner.kind, CornerKind::Arc);
        assert_on_circle(corner);
        assert_eq!(smoothed.points.len(), 5);
        assert_eq!(smoothed.points[2], (100.0, 0.0));
    }

    #[test]
    fn short_leg_keeps_corner_with_warning() {
        let path = path_through(&[(0.0, 0.0), (3.0, 0.0), (3.0, 50.0)]);
        let smoothed = smooth_path(&path, &SmoothingConfig::default(), 20.0, 10.0);
        assert_eq!(smoothed.points, path.points);
        assert!(matches!(
            smoothed.warnings.as_slice(),
            [SmoothingWarning::ManeuverInfeasible { index: 1, .. }]
        ));
    }

    #[test]
    fn straight_run_is_untouched() {
        let path = path_through(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]);
        let smoothed = smooth_path(&path, &SmoothingConfig::default(), 20.0, 10.0);
        assert_eq!(smoothed.points, path.points);
        assert!(smoothed.corners.is_empty());
    }

    #[test]
    fn every_smoothed_greedy_corner_respects_the_radius() {
        let polygon = [(0.0, 0.0), (600.0, 0.0), (600.0, 400.0), (0.0, 400.0)];
        let candidates = candidate_grid(&polygon, &[], 100.0, 1.0, Some(0.0));
        let config = CoverageConfig {
            scan_radius_px: 100.0,
            scan_accuracy: 1.0,
            ..CoverageConfig::default()
        };
        let path = GreedyCoverage.plan(&CoverageProblem {
            candidates: &candidates,
            start: (0.0, 0.0),
            heading: std::f64::consts::FRAC_PI_4,
            priority_zones: &[],
            config: &config,
        });
        let smoothed = smooth_path(&path, &SmoothingConfig::default(), config.velocity_mps(), 10.0);
        assert!(!smoothed.corners.is_empty());
        for corner in &smoothed.corners {
            assert_on_circle(corner);
        }
    }
}
