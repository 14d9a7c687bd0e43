//! Request and response models shared by the server and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assembler::DetectionStats;
use crate::spatial::haversine_distance;
use crate::survey::{SurveyConfig, SurveyPlan};

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn to_tuple(self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Largest input spread accepted by `validate`, in meters.
pub const DEFAULT_MAX_EXTENT_M: f64 = 20_000.0;

/// Largest great-circle distance between any two points, in meters.
pub fn extent_m(points: &[LatLon]) -> f64 {
    let mut extent: f64 = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            extent = extent.max(haversine_distance(a.lat, a.lon, b.lat, b.lon));
        }
    }
    extent
}

fn validate_points(points: &[LatLon], max_extent_m: f64, errors: &mut Vec<String>) {
    if points.is_empty() {
        errors.push("at least one point is required".to_string());
    }
    let before = errors.len();
    for (i, p) in points.iter().enumerate() {
        if !p.lat.is_finite() || !p.lon.is_finite() {
            errors.push(format!("point {i} is not a finite coordinate"));
        } else if p.lat.abs() > 90.0 || p.lon.abs() > 180.0 {
            errors.push(format!("point {i} ({}, {}) is out of range", p.lat, p.lon));
        }
    }
    if errors.len() == before {
        let extent = extent_m(points);
        if extent > max_extent_m {
            errors.push(format!(
                "points span {extent:.0} m, more than the {max_extent_m:.0} m limit"
            ));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDetectionRequest {
    pub points: Vec<LatLon>,
}

impl AreaDetectionRequest {
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        self.validate_within(DEFAULT_MAX_EXTENT_M)
    }

    pub fn validate_within(&self, max_extent_m: f64) -> Vec<String> {
        let mut errors = Vec::new();
        validate_points(&self.points, max_extent_m, &mut errors);
        errors
    }

    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| p.to_tuple()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDetectionResponse {
    pub ok: bool,
    pub boundary: Vec<LatLon>,
    #[serde(default)]
    pub obstacles: Vec<Vec<LatLon>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DetectionStats>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AreaDetectionResponse {
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            boundary: Vec::new(),
            obstacles: Vec::new(),
            stats: None,
            errors,
            generated_at: Utc::now(),
        }
    }
}

/// Path planning request. Unset tuning fields keep the server defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathPlanRequest {
    pub points: Vec<LatLon>,
    pub velocity_kmh: f64,
    pub travel_time_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predator_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bank_angle_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_margin_m: Option<f64>,
}

impl PathPlanRequest {
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        self.validate_within(DEFAULT_MAX_EXTENT_M)
    }

    /// Like `validate`, with the caller's limit on how far apart points may be.
    pub fn validate_within(&self, max_extent_m: f64) -> Vec<String> {
        let mut errors = Vec::new();
        validate_points(&self.points, max_extent_m, &mut errors);
        if !(self.velocity_kmh.is_finite() && self.velocity_kmh > 0.0) {
            errors.push(format!("velocity_kmh must be positive, got {}", self.velocity_kmh));
        }
        if !(self.travel_time_min.is_finite() && self.travel_time_min > 0.0) {
            errors.push(format!(
                "travel_time_min must be positive, got {}",
                self.travel_time_min
            ));
        }
        if let Some(angle) = self.max_bank_angle_deg {
            if !(angle > 0.0 && angle < 90.0) {
                errors.push(format!("max_bank_angle_deg must be within (0, 90), got {angle}"));
            }
        }
        errors
    }

    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| p.to_tuple()).collect()
    }

    /// Overlay the request's flight parameters on `base`.
    pub fn apply_to(&self, mut base: SurveyConfig) -> SurveyConfig {
        let coverage = &mut base.coverage;
        coverage.velocity_kmh = self.velocity_kmh;
        coverage.travel_time_min = self.travel_time_min;
        if let Some(radius_m) = self.scan_radius_m {
            coverage.scan_radius_px = radius_m / coverage.resolution_m;
        }
        if let Some(v) = self.scan_accuracy {
            coverage.scan_accuracy = v;
        }
        if let Some(v) = self.distance_weight {
            coverage.distance_weight = v;
        }
        if let Some(v) = self.turn_weight {
            coverage.turn_weight = v;
        }
        if let Some(v) = self.predator_weight {
            coverage.predator_weight = v;
        }
        if let Some(v) = self.priority_multiplier {
            coverage.priority_multiplier = v;
        }
        if let Some(deg) = self.max_bank_angle_deg {
            base.smoothing.bank_angle_rad = deg.to_radians();
        }
        if let Some(margin) = self.smoothing_margin_m {
            base.smoothing.margin_m = margin;
        }
        base
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPlanResponse {
    pub ok: bool,
    pub path: Vec<LatLon>,
    #[serde(default)]
    pub raw_path: Vec<LatLon>,
    #[serde(default)]
    pub boundary: Vec<LatLon>,
    pub travel_time_min: f64,
    pub length_m: f64,
    pub max_bank_angle_deg: f64,
    pub candidates: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl PathPlanResponse {
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            path: Vec::new(),
            raw_path: Vec::new(),
            boundary: Vec::new(),
            travel_time_min: 0.0,
            length_m: 0.0,
            max_bank_angle_deg: 0.0,
            candidates: 0,
            warnings: Vec::new(),
            errors,
            generated_at: Utc::now(),
        }
    }

    /// Wrap a plan; an empty plan is reported as `ok: false`.
    pub fn from_plan(plan: SurveyPlan) -> Self {
        let to_points = |coords: &[(f64, f64)]| -> Vec<LatLon> {
            coords.iter().copied().map(LatLon::from).collect()
        };
        let mut errors = Vec::new();
        if plan.is_empty() {
            errors.push(if plan.boundary.is_empty() {
                "no area detected around the input points".to_string()
            } else {
                "no waypoints fit inside the detected area".to_string()
            });
        }
        Self {
            ok: !plan.is_empty(),
            path: to_points(&plan.path),
            raw_path: to_points(&plan.raw_path),
            boundary: to_points(&plan.boundary),
            travel_time_min: plan.travel_time_min,
            length_m: plan.length_m,
            max_bank_angle_deg: plan.max_bank_angle_rad.to_degrees(),
            candidates: plan.candidates,
            warnings: plan.warnings.iter().map(|w| w.to_string()).collect(),
            errors,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub raster_source: String,
}
