//! Multi-point region growing across a dynamically grown tile grid.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembled::AssembledRaster;
use crate::error::PlannerError;
use crate::geo_point::GeoPoint;
use crate::projection::Projection;
use crate::raster::Raster;
use crate::source::RasterSource;
use crate::spatial::{centroid, point_in_polygon};
use crate::tile::{Connectivity, TileKey, TileLattice, BACKGROUND};
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaDetectionConfig {
    /// Side of a tile in pixels.
    pub patch_size: usize,
    /// Meters per pixel.
    pub resolution_m: f64,
    /// Lattice step for extra seeds inside the input polygon.
    pub seed_spacing_m: f64,
    pub densify_seeds: bool,
    pub connectivity: Connectivity,
    pub lower_threshold: f32,
    pub upper_threshold: f32,
    pub close_kernel: usize,
    pub binarize_threshold: f32,
}

impl Default for AreaDetectionConfig {
    fn default() -> Self {
        Self {
            patch_size: 255,
            resolution_m: 10.0,
            seed_spacing_m: 100.0,
            densify_seeds: true,
            connectivity: Connectivity::Eight,
            lower_threshold: 0.0,
            upper_threshold: 1.0,
            close_kernel: 7,
            binarize_threshold: 0.0,
        }
    }
}

impl AreaDetectionConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.patch_size < 3 {
            return Err(PlannerError::InvalidConfig(format!(
                "patch_size must be at least 3, got {}",
                self.patch_size
            )));
        }
        if !(self.resolution_m.is_finite() && self.resolution_m > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "resolution_m must be positive, got {}",
                self.resolution_m
            )));
        }
        if self.densify_seeds && !(self.seed_spacing_m.is_finite() && self.seed_spacing_m > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "seed_spacing_m must be positive, got {}",
                self.seed_spacing_m
            )));
        }
        if self.lower_threshold >= self.upper_threshold {
            return Err(PlannerError::InvalidConfig(
                "lower_threshold must be below upper_threshold".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters for one [`AreaAssembler::detect_area`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub seeds: usize,
    pub filled_pixels: usize,
    pub tiles: usize,
}

/// Owns the tile grid for one planning run and grows the detected area in it.
pub struct AreaAssembler<'a> {
    config: AreaDetectionConfig,
    grid: TileGrid<'a>,
}

impl<'a> AreaAssembler<'a> {
    /// Assembler whose origin tile is centered on `center_m`.
    pub fn new(
        config: AreaDetectionConfig,
        projection: &'a dyn Projection,
        source: &'a dyn RasterSource,
        center_m: (f64, f64),
    ) -> Result<Self, PlannerError> {
        config.validate()?;
        let lattice = TileLattice::new(center_m, config.patch_size, config.resolution_m);
        let grid = TileGrid::new(lattice, projection, source)?;
        Ok(Self { config, grid })
    }

    /// Assembler whose origin tile is centered on the centroid of `points`.
    pub fn for_points(
        config: AreaDetectionConfig,
        projection: &'a dyn Projection,
        source: &'a dyn RasterSource,
        points: &[GeoPoint],
    ) -> Result<Self, PlannerError> {
        let center = seed_centroid(points, projection)?;
        Self::new(config, projection, source, center)
    }

    pub fn config(&self) -> &AreaDetectionConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid<'a> {
        &self.grid
    }

    pub fn lattice(&self) -> &TileLattice {
        self.grid.lattice()
    }

    /// Fill the region around every point and propagate it across tiles.
    pub fn detect_area(&mut self, points: &[GeoPoint]) -> Result<DetectionStats, PlannerError> {
        if points.is_empty() {
            return Err(PlannerError::NotEnoughPoints {
                required: 1,
                actual: 0,
            });
        }
        let projection = self.grid.projection();
        let ordered = order_counter_clockwise(points, projection)?;
        let extra = if ordered.len() > 2 && self.config.densify_seeds {
            densify(&ordered, self.config.seed_spacing_m, projection)?
        } else {
            Vec::new()
        };
        debug!(
            ordered = ordered.len(),
            extra = extra.len(),
            "Seed order resolved"
        );

        let mut stats = DetectionStats {
            seeds: ordered.len() + extra.len(),
            ..DetectionStats::default()
        };
        for seed in ordered.into_iter().chain(&extra) {
            stats.filled_pixels += self.grow_from(seed)?;
        }
        stats.tiles = self.grid.len();

        info!(
            seeds = stats.seeds,
            filled = stats.filled_pixels,
            tiles = stats.tiles,
            "Area detection complete"
        );
        Ok(stats)
    }

    /// Flood fill from one point, then push the fill through tile borders
    /// until no neighbour changes. Returns the number of pixels filled.
    pub fn grow_from(&mut self, point: &GeoPoint) -> Result<usize, PlannerError> {
        let connectivity = self.config.connectivity;
        let patch = self.config.patch_size as i64;
        let (key, (x, y)) = self.grid.locate_point(point)?;

        let mut filled = 0;
        if (0..patch).contains(&x) && (0..patch).contains(&y) {
            if let Some(tile) = self.grid.tile_mut(key) {
                filled += tile.flood_fill(x as usize, y as usize, connectivity);
            }
        }

        let mut pending = VecDeque::from([key]);
        while let Some(current) = pending.pop_front() {
            let borders = match self.grid.tile(current) {
                Some(tile) => tile.border_seeds(),
                None => continue,
            };
            for (direction, pixels) in borders {
                let target = self.lattice().center(current.neighbor(direction));
                let neighbour = self.grid.locate(target)?;
                let Some(tile) = self.grid.tile_mut(neighbour) else {
                    continue;
                };
                let mut changed = 0;
                for (px, py) in pixels {
                    if tile.pixel(px, py) == BACKGROUND {
                        changed += tile.flood_fill(px, py, connectivity);
                    }
                }
                if changed > 0 {
                    filled += changed;
                    pending.push_back(neighbour);
                }
            }
        }
        Ok(filled)
    }

    /// Post-process every tile, pad rows to a rectangle and merge.
    pub fn assemble(mut self) -> Result<AssembledRaster, PlannerError> {
        let config = self.config.clone();
        for tile in self.grid.tiles_mut() {
            let raster = tile.raster_mut();
            raster.apply_two_thresholds(config.lower_threshold, config.upper_threshold);
            raster.apply_morphology_close(config.close_kernel);
            raster.apply_one_threshold(config.binarize_threshold);
        }

        let (min_col, max_col) = self
            .grid
            .rows()
            .map(|(_, range)| range)
            .fold((i32::MAX, i32::MIN), |(lo, hi), (first, last)| {
                (lo.min(first), hi.max(last))
            });
        let padded = self.grid.pad_rows(min_col, max_col)?;
        debug!(padded, min_col, max_col, "Padded rows to common width");

        let rows: Vec<i32> = self.grid.rows().map(|(row, _)| row).collect();
        let min_row = rows.first().copied().unwrap_or(0);
        let patch = self.config.patch_size;
        let col_count = (max_col - min_col + 1) as usize;
        let mut mask = Raster::filled(col_count * patch, rows.len() * patch, 0u8);

        for tile in self.grid.tiles() {
            let TileKey { row, col } = tile.key();
            let offset_x = (col - min_col) as usize * patch;
            let offset_y = (row - min_row) as usize * patch;
            let raster = tile.raster();
            for y in 0..patch {
                for (x, value) in raster.row(y).iter().enumerate() {
                    if *value > 0.0 {
                        mask.set(offset_x + x, offset_y + y, 255);
                    }
                }
            }
        }

        info!(
            rows = rows.len(),
            cols = col_count,
            width = mask.width(),
            height = mask.height(),
            "Merged tiles"
        );
        Ok(AssembledRaster::new(
            mask,
            *self.grid.lattice(),
            TileKey::new(min_row, min_col),
        ))
    }
}

/// Mean of the points in meters, summed in a canonical order so the result
/// does not depend on input order.
pub fn seed_centroid(points: &[GeoPoint], projection: &dyn Projection) -> Result<(f64, f64), PlannerError> {
    let mut meters = points
        .iter()
        .map(|p| p.meters(projection))
        .collect::<Result<Vec<_>, _>>()?;
    meters.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    centroid(&meters).ok_or(PlannerError::NotEnoughPoints {
        required: 1,
        actual: 0,
    })
}

/// Sort points counter-clockwise by their angle around the common centroid.
pub fn order_counter_clockwise<'p>(
    points: &'p [GeoPoint],
    projection: &dyn Projection,
) -> Result<Vec<&'p GeoPoint>, PlannerError> {
    let (cx, cy) = seed_centroid(points, projection)?;
    let mut keyed = points
        .iter()
        .map(|p| {
            let (x, y) = p.meters(projection)?;
            Ok(((y - cy).atan2(x - cx), x, y, p))
        })
        .collect::<Result<Vec<_>, PlannerError>>()?;
    keyed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.total_cmp(&b.2))
    });
    Ok(keyed.into_iter().map(|(_, _, _, p)| p).collect())
}

/// Lattice points spaced `spacing_m` apart inside the polygon of `ordered`.
fn densify(
    ordered: &[&GeoPoint],
    spacing_m: f64,
    projection: &dyn Projection,
) -> Result<Vec<GeoPoint>, PlannerError> {
    let polygon = ordered
        .iter()
        .map(|p| p.meters(projection))
        .collect::<Result<Vec<_>, _>>()?;
    let (min_x, max_x, min_y, max_y) = polygon.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(x0, x1, y0, y1), (x, y)| (x0.min(*x), x1.max(*x), y0.min(*y), y1.max(*y)),
    );

    let nx = ((max_x - min_x) / spacing_m).floor() as usize;
    let ny = ((max_y - min_y) / spacing_m).floor() as usize;
    let mut extra = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            let x = min_x + i as f64 * spacing_m;
            let y = min_y + j as f64 * spacing_m;
            if point_in_polygon((x, y), &polygon) {
                extra.push(GeoPoint::from_meters(x, y, projection)?);
            }
        }
    }
    Ok(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::LocalProjection;
    use crate::source::{BlankRasterSource, FnRasterSource};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn config() -> AreaDetectionConfig {
        AreaDetectionConfig {
            patch_size: 21,
            resolution_m: 10.0,
            close_kernel: 3,
            ..AreaDetectionConfig::default()
        }
    }

    /// Edge ring of radius 300 m around the planar origin.
    fn ring_source() -> FnRasterSource<impl Fn(f64, f64) -> f32> {
        FnRasterSource::new(|x: f64, y: f64| {
            if (x.hypot(y) - 300.0).abs() < 15.0 {
                1.0
            } else {
                0.0
            }
        })
    }

    fn points(projection: &LocalProjection, meters: &[(f64, f64)]) -> Vec<GeoPoint> {
        meters
            .iter()
            .map(|(x, y)| GeoPoint::from_meters(*x, *y, projection).unwrap())
            .collect()
    }

    #[test]
    fn small_quadrilateral_stays_in_one_tile() {
        let projection = LocalProjection::new(54.14, 18.64);
        // Square edge frame 70..=90 m from the origin, inside the origin tile.
        let source = FnRasterSource::new(|x: f64, y: f64| {
            let d = x.abs().max(y.abs());
            if (70.0..=90.0).contains(&d) {
                1.0
            } else {
                0.0
            }
        });
        let seeds = points(&projection, &[(-30.0, -30.0), (30.0, -30.0), (30.0, 30.0), (-30.0, 30.0)]);
        let mut assembler =
            AreaAssembler::for_points(config(), &projection, &source, &seeds).unwrap();
        let stats = assembler.detect_area(&seeds).unwrap();
        assert_eq!(assembler.grid().tiles_created(), 1);
        assert_eq!(stats.filled_pixels, 13 * 13);

        let assembled = assembler.assemble().unwrap();
        assert_eq!(assembled.mask().width(), 21);
        assert_eq!(assembled.mask().height(), 21);
        let white = assembled.mask().as_slice().iter().filter(|v| **v == 255).count();
        assert_eq!(white, 13 * 13);
    }

    #[test]
    fn points_on_the_row_boundary_resolve_to_the_origin_row() {
        let projection = LocalProjection::new(54.14, 18.64);
        let config = AreaDetectionConfig {
            patch_size: 11,
            ..config()
        };
        // Centroid is (0, 50), so both points sit exactly one buffer radius
        // from the origin tile center. Edge frame 140..=160 m around it.
        let source = FnRasterSource::new(|x: f64, y: f64| {
            let d = x.abs().max((y - 50.0).abs());
            if (140.0..=160.0).contains(&d) {
                1.0
            } else {
                0.0
            }
        });
        let seeds = points(&projection, &[(0.0, 0.0), (0.0, 100.0)]);
        let mut assembler =
            AreaAssembler::for_points(config, &projection, &source, &seeds).unwrap();
        let stats = assembler.detect_area(&seeds).unwrap();
        assert!(stats.filled_pixels > 0);

        assert_eq!(seeds[0].cached_pixel(), Some((TileKey::ORIGIN, (5, 10))));
        assert_eq!(seeds[1].cached_pixel(), Some((TileKey::ORIGIN, (5, 0))));
        let rows: Vec<_> = assembler.grid().rows().map(|(row, _)| row).collect();
        assert_eq!(rows, vec![-1, 0, 1]);
    }

    #[test]
    fn fill_crosses_tile_borders_inside_the_ring() {
        let projection = LocalProjection::new(54.14, 18.64);
        let source = ring_source();
        let seeds = points(&projection, &[(0.0, 0.0)]);
        let mut assembler = AreaAssembler::new(config(), &projection, &source, (0.0, 0.0)).unwrap();
        assembler.detect_area(&seeds).unwrap();
        assert!(assembler.grid().len() > 1);

        let assembled = assembler.assemble().unwrap();
        let inside = assembled.pixel_at_meters((220.0, 0.0));
        let outside = assembled.pixel_at_meters((-280.0, 280.0));
        assert_eq!(assembled.mask_value(inside), 255);
        assert_eq!(assembled.mask_value(outside), 0);
    }

    #[test]
    fn regrowing_from_filled_pixels_changes_nothing() {
        let projection = LocalProjection::new(54.14, 18.64);
        let source = ring_source();
        let seeds = points(&projection, &[(0.0, 0.0)]);
        let mut assembler = AreaAssembler::new(config(), &projection, &source, (0.0, 0.0)).unwrap();
        assembler.detect_area(&seeds).unwrap();
        let before: Vec<_> = assembler.grid().tiles().map(|t| t.raster().clone()).collect();

        let again = points(&projection, &[(150.0, 40.0), (-200.0, -90.0)]);
        for point in &again {
            assert_eq!(assembler.grow_from(point).unwrap(), 0);
        }
        let after: Vec<_> = assembler.grid().tiles().map(|t| t.raster().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn result_does_not_depend_on_seed_order() {
        let projection = LocalProjection::new(54.14, 18.64);
        let source = ring_source();
        let base = points(
            &projection,
            &[(-120.0, -80.0), (140.0, -60.0), (100.0, 150.0), (-90.0, 120.0), (10.0, 5.0)],
        );

        let reference = {
            let mut assembler =
                AreaAssembler::for_points(config(), &projection, &source, &base).unwrap();
            assembler.detect_area(&base).unwrap();
            assembler.assemble().unwrap()
        };

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let mut shuffled = base.clone();
            shuffled.shuffle(&mut rng);
            let mut assembler =
                AreaAssembler::for_points(config(), &projection, &source, &shuffled).unwrap();
            assembler.detect_area(&shuffled).unwrap();
            let assembled = assembler.assemble().unwrap();
            assert_eq!(assembled.mask(), reference.mask());
        }
    }

    #[test]
    fn seeds_are_sorted_counter_clockwise() {
        let projection = LocalProjection::new(0.0, 0.0);
        let seeds = points(&projection, &[(0.0, 10.0), (10.0, 0.0), (0.0, -10.0), (-10.0, 0.0)]);
        let ordered = order_counter_clockwise(&seeds, &projection).unwrap();
        let meters: Vec<_> = ordered.iter().map(|p| p.cached_meters().unwrap()).collect();
        assert_eq!(meters, vec![(0.0, -10.0), (10.0, 0.0), (0.0, 10.0), (-10.0, 0.0)]);
    }

    #[test]
    fn densify_fills_polygon_interior() {
        let projection = LocalProjection::new(0.0, 0.0);
        let square = points(&projection, &[(0.0, 0.0), (300.0, 0.0), (300.0, 300.0), (0.0, 300.0)]);
        let ordered = order_counter_clockwise(&square, &projection).unwrap();
        let extra = densify(&ordered, 100.0, &projection).unwrap();
        assert!(!extra.is_empty());
        let polygon: Vec<_> = ordered.iter().map(|p| p.cached_meters().unwrap()).collect();
        for point in &extra {
            assert!(point_in_polygon(point.cached_meters().unwrap(), &polygon));
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let projection = LocalProjection::new(0.0, 0.0);
        let mut assembler =
            AreaAssembler::new(config(), &projection, &BlankRasterSource, (0.0, 0.0)).unwrap();
        assert_eq!(
            assembler.detect_area(&[]).unwrap_err(),
            PlannerError::NotEnoughPoints {
                required: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_fetching() {
        let projection = LocalProjection::new(0.0, 0.0);
        let bad = AreaDetectionConfig {
            resolution_m: 0.0,
            ..config()
        };
        let err = AreaAssembler::new(bad, &projection, &BlankRasterSource, (0.0, 0.0))
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }
}
