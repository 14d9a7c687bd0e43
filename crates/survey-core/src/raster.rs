//! Row-major raster buffers and the per-tile image passes.

use crate::error::PlannerError;

/// Foreground value written by the threshold passes.
pub const WHITE: f32 = 255.0;
/// Background value written by the threshold passes.
pub const BLACK: f32 = 0.0;

/// Dense row-major raster. Row 0 is the top (northern) edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy> Raster<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing buffer, checking that its length matches the shape.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, PlannerError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(PlannerError::RasterShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    /// Bounds-checked read with signed coordinates.
    #[inline]
    pub fn try_get(&self, x: i64, y: i64) -> Option<T> {
        self.in_bounds(x, y)
            .then(|| self.data[y as usize * self.width + x as usize])
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl Raster<f32> {
    /// Keep pixels strictly between the two thresholds as foreground.
    pub fn apply_two_thresholds(&mut self, lower: f32, upper: f32) {
        for value in self.data_mut() {
            *value = if lower < *value && *value < upper {
                WHITE
            } else {
                BLACK
            };
        }
    }

    /// Binarize: everything above `threshold` becomes foreground.
    pub fn apply_one_threshold(&mut self, threshold: f32) {
        for value in self.data_mut() {
            *value = if *value > threshold { WHITE } else { BLACK };
        }
    }

    /// Morphological close (dilate, then erode) with a square structuring
    /// element of side `kernel_size`.
    ///
    /// Pixels outside the raster never contribute, matching a constant border
    /// that is neutral for both passes.
    pub fn apply_morphology_close(&mut self, kernel_size: usize) {
        if kernel_size <= 1 || self.data.is_empty() {
            return;
        }
        let radius = kernel_size / 2;
        let dilated = self.square_filter(radius, f32::max);
        *self = dilated.square_filter(radius, f32::min);
    }

    fn square_filter(&self, radius: usize, pick: fn(f32, f32) -> f32) -> Raster<f32> {
        // Separable: a square window is a horizontal pass followed by a vertical one.
        let mut horizontal = self.clone();
        for y in 0..self.height {
            let row = self.row(y);
            for x in 0..self.width {
                let lo = x.saturating_sub(radius);
                let hi = (x + radius).min(self.width - 1);
                let value = row[lo..=hi]
                    .iter()
                    .copied()
                    .reduce(pick)
                    .unwrap_or(row[x]);
                horizontal.set(x, y, value);
            }
        }

        let mut out = horizontal.clone();
        for x in 0..self.width {
            for y in 0..self.height {
                let lo = y.saturating_sub(radius);
                let hi = (y + radius).min(self.height - 1);
                let mut value = horizontal.get(x, lo);
                for yy in lo + 1..=hi {
                    value = pick(value, horizontal.get(x, yy));
                }
                out.set(x, y, value);
            }
        }
        out
    }

    /// Convert a binarized raster into an 8-bit mask.
    pub fn to_mask(&self) -> Raster<u8> {
        self.map(|v| if v > 0.0 { 255 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Raster::from_vec(3, 3, vec![0.0_f32; 8]).unwrap_err();
        assert_eq!(
            err,
            PlannerError::RasterShape {
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn two_thresholds_keep_only_the_fill_band() {
        let mut raster = Raster::from_vec(4, 1, vec![0.0, 0.5, 1.0, 255.0]).unwrap();
        raster.apply_two_thresholds(0.0, 1.0);
        assert_eq!(raster.as_slice(), &[BLACK, WHITE, BLACK, BLACK]);
    }

    #[test]
    fn close_fills_single_pixel_gap() {
        let mut raster = Raster::filled(7, 7, WHITE);
        raster.set(3, 3, BLACK);
        raster.apply_morphology_close(3);
        assert_eq!(raster.get(3, 3), WHITE);
    }

    #[test]
    fn close_keeps_isolated_background_edges() {
        // A foreground block away from the border must not grow after close.
        let mut raster = Raster::filled(9, 9, BLACK);
        for y in 3..6 {
            for x in 3..6 {
                raster.set(x, y, WHITE);
            }
        }
        let before = raster.clone();
        raster.apply_morphology_close(3);
        assert_eq!(raster, before);
    }

    #[test]
    fn try_get_is_bounds_checked() {
        let raster = Raster::filled(2, 2, 1u8);
        assert_eq!(raster.try_get(1, 1), Some(1));
        assert_eq!(raster.try_get(-1, 0), None);
        assert_eq!(raster.try_get(2, 0), None);
    }
}
