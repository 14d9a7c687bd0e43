//! Edge-strength raster providers.

use crate::error::PlannerError;
use crate::raster::Raster;
use crate::tile::{TileKey, BACKGROUND};

/// Geographic extent requested for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    pub key: TileKey,
    /// Tile center as `(lat, lon)`.
    pub center: (f64, f64),
    /// Tile center in the planar frame.
    pub center_m: (f64, f64),
    pub buffer_radius_m: f64,
    pub patch_size: usize,
    pub resolution_m: f64,
}

impl TileRequest {
    /// Planar coordinates of a pixel of this tile.
    pub fn pixel_meters(&self, x: usize, y: usize) -> (f64, f64) {
        (
            self.center_m.0 - self.buffer_radius_m + x as f64 * self.resolution_m,
            self.center_m.1 + self.buffer_radius_m - y as f64 * self.resolution_m,
        )
    }
}

/// Supplies per-pixel edge strength for a tile.
///
/// The raster must be `patch_size x patch_size`, row 0 on the northern edge.
/// Zero is background; any other value is an edge.
pub trait RasterSource {
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError>;
}

impl<S: RasterSource + ?Sized> RasterSource for &S {
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError> {
        (**self).fetch(request)
    }
}

impl<S: RasterSource + ?Sized> RasterSource for std::sync::Arc<S> {
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError> {
        (**self).fetch(request)
    }
}

/// Source with no edges anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankRasterSource;

impl RasterSource for BlankRasterSource {
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError> {
        Ok(Raster::filled(
            request.patch_size,
            request.patch_size,
            BACKGROUND,
        ))
    }
}

/// Source that evaluates a closure at the planar center of every pixel.
pub struct FnRasterSource<F> {
    edge_at: F,
}

impl<F> FnRasterSource<F>
where
    F: Fn(f64, f64) -> f32,
{
    pub fn new(edge_at: F) -> Self {
        Self { edge_at }
    }
}

impl<F> RasterSource for FnRasterSource<F>
where
    F: Fn(f64, f64) -> f32,
{
    fn fetch(&self, request: &TileRequest) -> Result<Raster<f32>, PlannerError> {
        let size = request.patch_size;
        let mut raster = Raster::filled(size, size, BACKGROUND);
        for y in 0..size {
            for x in 0..size {
                let (mx, my) = request.pixel_meters(x, y);
                raster.set(x, y, (self.edge_at)(mx, my));
            }
        }
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TileRequest {
        TileRequest {
            key: TileKey::ORIGIN,
            center: (0.0, 0.0),
            center_m: (100.0, 200.0),
            buffer_radius_m: 20.0,
            patch_size: 5,
            resolution_m: 10.0,
        }
    }

    #[test]
    fn pixel_meters_start_at_north_west_corner() {
        let req = request();
        assert_eq!(req.pixel_meters(0, 0), (80.0, 220.0));
        assert_eq!(req.pixel_meters(4, 4), (120.0, 180.0));
    }

    #[test]
    fn fn_source_samples_planar_coordinates() {
        let source = FnRasterSource::new(|x, _y| if x >= 110.0 { 1.0 } else { 0.0 });
        let raster = source.fetch(&request()).unwrap();
        assert_eq!(raster.row(0), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    }
}
