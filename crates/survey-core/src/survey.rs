//! End-to-end pipeline: geographic points in, survey area and flight path out.

use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembled::AssembledRaster;
use crate::assembler::{order_counter_clockwise, AreaAssembler, AreaDetectionConfig, DetectionStats};
use crate::contour::{BorderFollower, ContourSet, ContourTracer};
use crate::coverage::{
    max_bank_angle, CoverageConfig, CoveragePlanner, GreedyCoverage, SmoothingConfig,
    SmoothingWarning,
};
use crate::error::PlannerError;
use crate::geo_point::GeoPoint;
use crate::projection::LocalProjection;
use crate::source::RasterSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub area: AreaDetectionConfig,
    pub coverage: CoverageConfig,
    pub smoothing: SmoothingConfig,
    /// Heading at the start point, radians in raster space.
    pub starting_direction_rad: f64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let area = AreaDetectionConfig::default();
        let coverage = CoverageConfig {
            scan_radius_px: 2000.0 / area.resolution_m,
            resolution_m: area.resolution_m,
            ..CoverageConfig::default()
        };
        Self {
            area,
            coverage,
            smoothing: SmoothingConfig::default(),
            starting_direction_rad: FRAC_PI_4,
        }
    }
}

impl SurveyConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        self.area.validate()?;
        self.coverage.validate()?;
        self.smoothing.validate()?;
        if (self.area.resolution_m - self.coverage.resolution_m).abs() > 1e-9 {
            return Err(PlannerError::InvalidConfig(format!(
                "coverage resolution {} differs from area resolution {}",
                self.coverage.resolution_m, self.area.resolution_m
            )));
        }
        Ok(())
    }

    /// Set the raster resolution for area detection and coverage together,
    /// keeping the scan radius fixed in meters.
    pub fn with_resolution(mut self, resolution_m: f64) -> Self {
        let scan_radius_m = self.coverage.scan_radius_px * self.coverage.resolution_m;
        self.area.resolution_m = resolution_m;
        self.coverage.resolution_m = resolution_m;
        self.coverage.scan_radius_px = scan_radius_m / resolution_m;
        self
    }
}

/// Detected area of one run, with everything needed to plan on it.
pub struct AreaDetection {
    pub projection: LocalProjection,
    pub points: Vec<GeoPoint>,
    pub stats: DetectionStats,
    pub raster: AssembledRaster,
    pub contours: ContourSet,
    /// Index of the outer boundary in `contours`.
    pub outer: Option<usize>,
}

impl AreaDetection {
    pub fn has_area(&self) -> bool {
        self.outer.is_some()
    }

    /// Outer boundary in raster pixels.
    pub fn boundary_pixels(&self) -> Vec<(f64, f64)> {
        self.outer
            .map(|i| self.contours.contours[i].to_f64())
            .unwrap_or_default()
    }

    /// Holes of the outer boundary in raster pixels.
    pub fn obstacle_pixels(&self) -> Vec<Vec<(f64, f64)>> {
        match self.outer {
            Some(i) => self.contours.holes_of(i).map(|c| c.to_f64()).collect(),
            None => Vec::new(),
        }
    }

    pub fn boundary(&self) -> Result<Vec<(f64, f64)>, PlannerError> {
        self.raster.to_geo(&self.boundary_pixels(), &self.projection)
    }

    pub fn obstacles(&self) -> Result<Vec<Vec<(f64, f64)>>, PlannerError> {
        self.obstacle_pixels()
            .iter()
            .map(|o| self.raster.to_geo(o, &self.projection))
            .collect()
    }
}

/// Flight plan in geographic coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyPlan {
    /// Smoothed path as `(lat, lon)`; starts and ends at the first input point.
    pub path: Vec<(f64, f64)>,
    /// Greedy path before smoothing.
    pub raw_path: Vec<(f64, f64)>,
    pub boundary: Vec<(f64, f64)>,
    pub travel_time_min: f64,
    pub length_m: f64,
    pub max_bank_angle_rad: f64,
    pub candidates: usize,
    pub warnings: Vec<SmoothingWarning>,
}

impl SurveyPlan {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Runs area detection and coverage planning against one raster source.
pub struct SurveyPlanner<'a> {
    config: SurveyConfig,
    source: &'a dyn RasterSource,
    tracer: Box<dyn ContourTracer + 'a>,
}

impl<'a> SurveyPlanner<'a> {
    pub fn new(config: SurveyConfig, source: &'a dyn RasterSource) -> Self {
        Self {
            config,
            source,
            tracer: Box::new(BorderFollower),
        }
    }

    pub fn with_tracer(mut self, tracer: impl ContourTracer + 'a) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Detect the area enclosing `coordinates` (`(lat, lon)` pairs).
    pub fn detect_area(&self, coordinates: &[(f64, f64)]) -> Result<AreaDetection, PlannerError> {
        self.config.validate()?;
        let projection = LocalProjection::centered_on(coordinates).ok_or(
            PlannerError::NotEnoughPoints {
                required: 1,
                actual: 0,
            },
        )?;
        let points: Vec<GeoPoint> = coordinates
            .iter()
            .map(|(lat, lon)| GeoPoint::new(*lat, *lon))
            .collect();

        let mut assembler =
            AreaAssembler::for_points(self.config.area.clone(), &projection, self.source, &points)?;
        let stats = assembler.detect_area(&points)?;
        let raster = assembler.assemble()?;
        let contours = raster.boundary(self.tracer.as_ref());
        let outer = contours.outer_index();
        if outer.is_none() {
            warn!(points = points.len(), "No area detected around input points");
        }

        Ok(AreaDetection {
            projection,
            points,
            stats,
            raster,
            contours,
            outer,
        })
    }

    /// Detect the area and plan a coverage flight over it.
    ///
    /// The first coordinate is the start and return point; the polygon of all
    /// coordinates is the priority zone. An empty plan means there was no area
    /// or no waypoint to fly to.
    pub fn plan(&self, coordinates: &[(f64, f64)]) -> Result<SurveyPlan, PlannerError> {
        let detection = self.detect_area(coordinates)?;
        self.plan_on(&detection)
    }

    /// Plan a coverage flight over an already detected area.
    pub fn plan_on(&self, detection: &AreaDetection) -> Result<SurveyPlan, PlannerError> {
        let raster = &detection.raster;
        let projection = &detection.projection;
        let start_point = detection.points.first().ok_or(PlannerError::MissingStart)?;
        if !detection.has_area() {
            return Ok(SurveyPlan::default());
        }
        let start = raster.global_pixel(start_point, projection)?;

        let ordered = order_counter_clockwise(&detection.points, projection)?;
        let priority_zone = ordered
            .iter()
            .map(|p| raster.global_pixel(p, projection).map(|(x, y)| (x as f64, y as f64)))
            .collect::<Result<Vec<_>, _>>()?;

        let planner = CoveragePlanner::new(self.config.coverage.clone())
            .with_algorithm(GreedyCoverage)
            .with_start((start.0 as f64, start.1 as f64), self.config.starting_direction_rad)
            .with_priority_zone(priority_zone)
            .with_smoothing(self.config.smoothing.clone());

        let outcome = planner.plan(&detection.boundary_pixels(), &detection.obstacle_pixels())?;
        if !outcome.has_path() {
            info!("Nothing to plan inside the detected area");
            return Ok(SurveyPlan {
                boundary: detection.boundary()?,
                ..SurveyPlan::default()
            });
        }

        let smoothed = outcome.smoothed.unwrap_or_default();
        let resolution = self.config.coverage.resolution_m;
        let plan = SurveyPlan {
            path: raster.to_geo(&smoothed.points, projection)?,
            raw_path: raster.to_geo(&outcome.path.points, projection)?,
            boundary: detection.boundary()?,
            travel_time_min: outcome.path.travel_time_min,
            length_m: outcome.path.length_m(resolution),
            max_bank_angle_rad: max_bank_angle(
                &smoothed.points,
                self.config.coverage.velocity_mps(),
                resolution,
            ),
            candidates: outcome.candidates,
            warnings: smoothed.warnings,
        };
        info!(
            waypoints = plan.path.len(),
            minutes = plan.travel_time_min,
            length_m = plan.length_m,
            warnings = plan.warnings.len(),
            "Survey plan ready"
        );
        Ok(plan)
    }
}
