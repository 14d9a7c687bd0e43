//! Conversion between geographic degrees and a planar meter frame.

use crate::error::PlannerError;
use crate::spatial::{lat_to_meters, lon_to_meters, meters_to_lat, meters_to_lon};

/// Projection service used by [`GeoPoint`](crate::geo_point::GeoPoint).
///
/// `x` grows east and `y` grows north.
pub trait Projection {
    fn to_meters(&self, lat: f64, lon: f64) -> Result<(f64, f64), PlannerError>;
    fn to_degrees(&self, x: f64, y: f64) -> Result<(f64, f64), PlannerError>;
}

/// East/north tangent-plane projection anchored at a reference coordinate.
///
/// Scale is fixed at the reference latitude, which keeps the forward and
/// inverse transforms exact inverses of each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    ref_lat: f64,
    ref_lon: f64,
}

impl LocalProjection {
    pub fn new(ref_lat: f64, ref_lon: f64) -> Self {
        Self { ref_lat, ref_lon }
    }

    /// Anchor the projection at the mean of `(lat, lon)` pairs.
    pub fn centered_on(coordinates: &[(f64, f64)]) -> Option<Self> {
        if coordinates.is_empty() {
            return None;
        }
        let n = coordinates.len() as f64;
        let (lat_sum, lon_sum) = coordinates
            .iter()
            .fold((0.0, 0.0), |(a, b), (lat, lon)| (a + lat, b + lon));
        Some(Self::new(lat_sum / n, lon_sum / n))
    }

    pub fn reference(&self) -> (f64, f64) {
        (self.ref_lat, self.ref_lon)
    }
}

impl Projection for LocalProjection {
    fn to_meters(&self, lat: f64, lon: f64) -> Result<(f64, f64), PlannerError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 {
            return Err(PlannerError::Projection(format!(
                "invalid coordinate ({lat}, {lon})"
            )));
        }
        let x = lon_to_meters(lon - self.ref_lon, self.ref_lat);
        let y = lat_to_meters(lat - self.ref_lat, self.ref_lat);
        Ok((x, y))
    }

    fn to_degrees(&self, x: f64, y: f64) -> Result<(f64, f64), PlannerError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(PlannerError::Projection(format!(
                "invalid planar coordinate ({x}, {y})"
            )));
        }
        let lat = self.ref_lat + meters_to_lat(y, self.ref_lat);
        let lon = self.ref_lon + meters_to_lon(x, self.ref_lat);
        Ok((lat, lon))
    }
}
