//! Geographic point with memoized planar coordinates.

use std::cell::{Cell, OnceCell};

use crate::error::PlannerError;
use crate::projection::Projection;
use crate::tile::TileKey;

/// Geographic coordinate in decimal degrees.
///
/// Degrees never change after construction. Meter coordinates are computed on
/// first request and memoized; a point is therefore tied to the first
/// projection it is used with.
#[derive(Debug, Clone)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
    meters: OnceCell<(f64, f64)>,
    tile_pixel: Cell<Option<(TileKey, (i64, i64))>>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            meters: OnceCell::new(),
            tile_pixel: Cell::new(None),
        }
    }

    /// Build a point from planar coordinates, keeping them as the memoized value.
    pub fn from_meters(x: f64, y: f64, projection: &dyn Projection) -> Result<Self, PlannerError> {
        let (lat, lon) = projection.to_degrees(x, y)?;
        let point = Self::new(lat, lon);
        let _ = point.meters.set((x, y));
        Ok(point)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn degrees(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Planar coordinates, computed once through `projection`.
    pub fn meters(&self, projection: &dyn Projection) -> Result<(f64, f64), PlannerError> {
        if let Some(meters) = self.meters.get() {
            return Ok(*meters);
        }
        let computed = projection.to_meters(self.lat, self.lon)?;
        Ok(*self.meters.get_or_init(|| computed))
    }

    /// Memoized planar coordinates, if they were already computed.
    pub fn cached_meters(&self) -> Option<(f64, f64)> {
        self.meters.get().copied()
    }

    /// Remember the tile and local pixel this point resolved to.
    pub fn remember_pixel(&self, key: TileKey, pixel: (i64, i64)) {
        self.tile_pixel.set(Some((key, pixel)));
    }

    pub fn cached_pixel(&self) -> Option<(TileKey, (i64, i64))> {
        self.tile_pixel.get()
    }
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::LocalProjection;
    use std::cell::Cell as CountCell;

    struct CountingProjection {
        inner: LocalProjection,
        calls: CountCell<usize>,
    }

    impl Projection for CountingProjection {
        fn to_meters(&self, lat: f64, lon: f64) -> Result<(f64, f64), PlannerError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.to_meters(lat, lon)
        }

        fn to_degrees(&self, x: f64, y: f64) -> Result<(f64, f64), PlannerError> {
            self.inner.to_degrees(x, y)
        }
    }

    #[test]
    fn meters_are_memoized() {
        let projection = CountingProjection {
            inner: LocalProjection::new(53.32, 18.45),
            calls: CountCell::new(0),
        };
        let point = GeoPoint::new(53.3244, 18.4553);
        let first = point.meters(&projection).unwrap();
        let second = point.meters(&projection).unwrap();
        assert_eq!(first, second);
        assert_eq!(projection.calls.get(), 1);
    }

    #[test]
    fn from_meters_keeps_exact_planar_coordinates() {
        let projection = LocalProjection::new(53.32, 18.45);
        let point = GeoPoint::from_meters(1270.0, -2540.0, &projection).unwrap();
        assert_eq!(point.cached_meters(), Some((1270.0, -2540.0)));
        assert!(point.lat() < 53.32);
        assert!(point.lon() > 18.45);
    }
}
