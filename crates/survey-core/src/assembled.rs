//! The merged detection raster and its coordinate transforms.

use crate::contour::{ContourSet, ContourTracer};
use crate::error::PlannerError;
use crate::geo_point::GeoPoint;
use crate::projection::Projection;
use crate::raster::Raster;
use crate::tile::{TileKey, TileLattice};

/// Row-aligned concatenation of every tile after post-processing.
///
/// Global pixel `(gx, gy)` belongs to tile
/// `(min_row + gy / patch, min_col + gx / patch)` at local pixel
/// `(gx % patch, gy % patch)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRaster {
    mask: Raster<u8>,
    lattice: TileLattice,
    top_left: TileKey,
}

impl AssembledRaster {
    pub fn new(mask: Raster<u8>, lattice: TileLattice, top_left: TileKey) -> Self {
        Self {
            mask,
            lattice,
            top_left,
        }
    }

    pub fn mask(&self) -> &Raster<u8> {
        &self.mask
    }

    pub fn lattice(&self) -> &TileLattice {
        &self.lattice
    }

    pub fn resolution(&self) -> f64 {
        self.lattice.resolution()
    }

    pub fn row_count(&self) -> usize {
        self.mask.height() / self.lattice.patch_size()
    }

    pub fn col_count(&self) -> usize {
        self.mask.width() / self.lattice.patch_size()
    }

    /// Key of the north-west tile.
    pub fn top_left(&self) -> TileKey {
        self.top_left
    }

    pub fn foreground_pixels(&self) -> usize {
        self.mask.as_slice().iter().filter(|v| **v > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground_pixels() == 0
    }

    /// Mask value at a global pixel; 0 outside the raster.
    pub fn mask_value(&self, pixel: (i64, i64)) -> u8 {
        self.mask.try_get(pixel.0, pixel.1).unwrap_or(0)
    }

    /// Tile and local pixel under a (possibly fractional) global pixel.
    pub fn tile_of(&self, pixel: (f64, f64)) -> (TileKey, (f64, f64)) {
        let patch = self.lattice.patch_size() as f64;
        let col = (pixel.0 / patch).floor();
        let row = (pixel.1 / patch).floor();
        let key = TileKey::new(self.top_left.row + row as i32, self.top_left.col + col as i32);
        (key, (pixel.0 - col * patch, pixel.1 - row * patch))
    }

    /// Global pixel of a local pixel in tile `key`.
    pub fn global_from_local(&self, key: TileKey, local: (i64, i64)) -> (i64, i64) {
        let patch = self.lattice.patch_size() as i64;
        (
            (key.col - self.top_left.col) as i64 * patch + local.0,
            (key.row - self.top_left.row) as i64 * patch + local.1,
        )
    }

    /// Planar coordinates of a global pixel, through the tile that holds it.
    pub fn pixel_to_meters(&self, pixel: (f64, f64)) -> (f64, f64) {
        let (key, local) = self.tile_of(pixel);
        self.lattice.pixel_to_meters(key, local)
    }

    /// Global pixel of a planar point, using the nearest tile center.
    pub fn pixel_at_meters(&self, meters: (f64, f64)) -> (i64, i64) {
        let (ox, oy) = self.lattice.origin();
        let spacing = self.lattice.spacing();
        let key = TileKey::new(
            ((oy - meters.1) / spacing).round() as i32,
            ((meters.0 - ox) / spacing).round() as i32,
        );
        self.global_from_local(key, self.lattice.local_pixel(key, meters))
    }

    /// Global pixel of a geographic point.
    ///
    /// Points located during area detection keep the tile they resolved to;
    /// any other point maps through the nearest tile. No tiles are created.
    pub fn global_pixel(
        &self,
        point: &GeoPoint,
        projection: &dyn Projection,
    ) -> Result<(i64, i64), PlannerError> {
        if let Some((key, local)) = point.cached_pixel() {
            return Ok(self.global_from_local(key, local));
        }
        Ok(self.pixel_at_meters(point.meters(projection)?))
    }

    /// Every row has the same pixel width and the height is a whole number of tiles.
    pub fn is_rectangular(&self) -> bool {
        let patch = self.lattice.patch_size();
        self.mask.width() % patch == 0
            && self.mask.height() % patch == 0
            && self.mask.as_slice().len() == self.mask.width() * self.mask.height()
    }

    pub fn boundary(&self, tracer: &dyn ContourTracer) -> ContourSet {
        tracer.trace(&self.mask)
    }

    /// Convert global pixels to `(lat, lon)`.
    pub fn to_geo(
        &self,
        pixels: &[(f64, f64)],
        projection: &dyn Projection,
    ) -> Result<Vec<(f64, f64)>, PlannerError> {
        pixels
            .iter()
            .map(|p| {
                let (x, y) = self.pixel_to_meters(*p);
                projection.to_degrees(x, y)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{AreaAssembler, AreaDetectionConfig};
    use crate::contour::BorderFollower;
    use crate::projection::LocalProjection;
    use crate::source::FnRasterSource;

    fn config() -> AreaDetectionConfig {
        AreaDetectionConfig {
            patch_size: 21,
            resolution_m: 10.0,
            close_kernel: 3,
            densify_seeds: false,
            ..AreaDetectionConfig::default()
        }
    }

    fn assemble(points_m: &[(f64, f64)]) -> (LocalProjection, Vec<GeoPoint>, AssembledRaster) {
        let projection = LocalProjection::new(54.14, 18.64);
        // Edge box with half-width 340 m centered on the origin.
        let source = FnRasterSource::new(|x: f64, y: f64| {
            let d = x.abs().max(y.abs());
            if (340.0..=360.0).contains(&d) {
                1.0
            } else {
                0.0
            }
        });
        let points: Vec<_> = points_m
            .iter()
            .map(|(x, y)| GeoPoint::from_meters(*x, *y, &projection).unwrap())
            .collect();
        let mut assembler = AreaAssembler::new(config(), &projection, &source, (0.0, 0.0)).unwrap();
        assembler.detect_area(&points).unwrap();
        let assembled = assembler.assemble().unwrap();
        (projection, points, assembled)
    }

    #[test]
    fn merged_raster_is_rectangular() {
        let (_, _, assembled) = assemble(&[(0.0, 0.0), (250.0, -250.0)]);
        assert!(assembled.is_rectangular());
        assert_eq!(assembled.mask().height(), 21 * assembled.row_count());
        assert_eq!(assembled.mask().width(), 21 * assembled.col_count());
        assert!(assembled.row_count() >= 3);
    }

    #[test]
    fn resolved_points_map_to_the_same_global_pixel() {
        let (projection, points, assembled) = assemble(&[(15.0, -25.0), (-230.0, 160.0)]);
        for point in &points {
            let (key, local) = point.cached_pixel().unwrap();
            let direct = assembled.global_from_local(key, local);
            assert_eq!(assembled.global_pixel(point, &projection).unwrap(), direct);
            let meters = point.cached_meters().unwrap();
            assert_eq!(assembled.pixel_at_meters(meters), direct);
            assert_eq!(assembled.mask_value(direct), 255);
        }
    }

    #[test]
    fn pixel_to_meters_inverts_pixel_at_meters() {
        let (_, _, assembled) = assemble(&[(0.0, 0.0)]);
        let pixel = assembled.pixel_at_meters((120.0, -40.0));
        let (x, y) = assembled.pixel_to_meters((pixel.0 as f64, pixel.1 as f64));
        assert!((x - 120.0).abs() < 1e-6);
        assert!((y + 40.0).abs() < 1e-6);
    }

    #[test]
    fn boundary_has_one_outer_contour() {
        let (projection, _, assembled) = assemble(&[(0.0, 0.0)]);
        let contours = assembled.boundary(&BorderFollower);
        let outer = contours.outer_index().unwrap();
        assert!(contours.holes_of(outer).next().is_none());

        let pixels = contours.contours[outer].to_f64();
        let geo = assembled.to_geo(&pixels, &projection).unwrap();
        assert_eq!(geo.len(), pixels.len());
        for (lat, lon) in geo {
            assert!((lat - 54.14).abs() < 0.01);
            assert!((lon - 18.64).abs() < 0.01);
        }
    }
}
