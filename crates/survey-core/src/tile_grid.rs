//! Sparse, incrementally grown arrangement of tiles.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::PlannerError;
use crate::geo_point::GeoPoint;
use crate::projection::Projection;
use crate::source::{RasterSource, TileRequest};
use crate::tile::{Tile, TileKey, TileLattice};

/// Tiles keyed by `(row, col)`.
///
/// Every row holds a contiguous column range. Rows may differ in length until
/// the assembler pads them during merge.
pub struct TileGrid<'a> {
    lattice: TileLattice,
    projection: &'a dyn Projection,
    source: &'a dyn RasterSource,
    tiles: BTreeMap<TileKey, Tile>,
    rows: BTreeMap<i32, (i32, i32)>,
    tiles_created: usize,
}

impl<'a> TileGrid<'a> {
    /// Create the grid with its origin tile (0, 0) centered on `lattice.origin()`.
    pub fn new(
        lattice: TileLattice,
        projection: &'a dyn Projection,
        source: &'a dyn RasterSource,
    ) -> Result<Self, PlannerError> {
        let mut grid = Self {
            lattice,
            projection,
            source,
            tiles: BTreeMap::new(),
            rows: BTreeMap::new(),
            tiles_created: 0,
        };
        grid.create_tile(TileKey::ORIGIN)?;
        Ok(grid)
    }

    pub fn lattice(&self) -> &TileLattice {
        &self.lattice
    }

    pub fn projection(&self) -> &'a dyn Projection {
        self.projection
    }

    /// Number of tiles fetched so far, the origin tile included.
    pub fn tiles_created(&self) -> usize {
        self.tiles_created
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, key: TileKey) -> Option<&Tile> {
        self.tiles.get(&key)
    }

    pub fn tile_mut(&mut self, key: TileKey) -> Option<&mut Tile> {
        self.tiles.get_mut(&key)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.values_mut()
    }

    /// Inclusive column range of every row, north to south.
    pub fn rows(&self) -> impl Iterator<Item = (i32, (i32, i32))> + '_ {
        self.rows.iter().map(|(row, range)| (*row, *range))
    }

    pub fn row_extent(&self, row: i32) -> Option<(i32, i32)> {
        self.rows.get(&row).copied()
    }

    /// Tile whose buffer contains the planar point, growing the grid one tile
    /// at a time until one does.
    pub fn locate(&mut self, meters: (f64, f64)) -> Result<TileKey, PlannerError> {
        let (x, y) = meters;
        if !x.is_finite() || !y.is_finite() {
            return Err(PlannerError::Projection(format!(
                "cannot locate non-finite point ({x}, {y})"
            )));
        }

        let row = self.resolve_row(y)?;
        let (first, last) = self
            .rows
            .get(&row)
            .copied()
            .ok_or_else(|| PlannerError::InvalidConfig(format!("row {row} vanished")))?;

        for col in first..=last {
            let key = TileKey::new(row, col);
            if self.lattice.contains(key, meters) {
                return Ok(key);
            }
        }

        let grow_west = x < self.lattice.center(TileKey::new(row, first)).0;
        let mut col = if grow_west { first } else { last };
        loop {
            col += if grow_west { -1 } else { 1 };
            let key = TileKey::new(row, col);
            self.create_tile(key)?;
            if self.lattice.contains(key, meters) {
                return Ok(key);
            }
        }
    }

    /// Locate a geographic point and return its local pixel, reusing the
    /// pixel the point already remembers.
    pub fn locate_point(&mut self, point: &GeoPoint) -> Result<(TileKey, (i64, i64)), PlannerError> {
        if let Some(cached) = point.cached_pixel() {
            if self.tiles.contains_key(&cached.0) {
                return Ok(cached);
            }
        }
        let meters = point.meters(self.projection)?;
        let key = self.locate(meters)?;
        let pixel = self.lattice.local_pixel(key, meters);
        point.remember_pixel(key, pixel);
        Ok((key, pixel))
    }

    /// Extend every row with blank tiles so it spans `min_col..=max_col`.
    /// Blank tiles are not fetched from the source. Returns how many were added.
    pub fn pad_rows(&mut self, min_col: i32, max_col: i32) -> Result<usize, PlannerError> {
        let patch_size = self.lattice.patch_size();
        let mut added = 0;
        for (row, range) in self.rows.iter_mut() {
            for col in min_col..=max_col {
                let key = TileKey::new(*row, col);
                if self.tiles.contains_key(&key) {
                    continue;
                }
                let (x, y) = self.lattice.center(key);
                let center = GeoPoint::from_meters(x, y, self.projection)?;
                self.tiles.insert(key, Tile::blank(key, center, patch_size));
                added += 1;
            }
            *range = (range.0.min(min_col), range.1.max(max_col));
        }
        Ok(added)
    }

    fn resolve_row(&mut self, y: f64) -> Result<i32, PlannerError> {
        let mut row = 0;
        loop {
            let step = self.lattice.vertical_step(row, y);
            if step == 0 {
                return Ok(row);
            }
            let next = row + step;
            if !self.rows.contains_key(&next) {
                let (first, _) = self.rows.get(&row).copied().unwrap_or((0, 0));
                self.create_tile(TileKey::new(next, first))?;
            }
            row = next;
        }
    }

    fn create_tile(&mut self, key: TileKey) -> Result<(), PlannerError> {
        let center_m = self.lattice.center(key);
        let center = GeoPoint::from_meters(center_m.0, center_m.1, self.projection)?;
        let patch_size = self.lattice.patch_size();
        let request = TileRequest {
            key,
            center: center.degrees(),
            center_m,
            buffer_radius_m: self.lattice.buffer_radius(),
            patch_size,
            resolution_m: self.lattice.resolution(),
        };
        let raster = self.source.fetch(&request)?;
        if raster.width() != patch_size || raster.height() != patch_size {
            return Err(PlannerError::RasterShape {
                expected: patch_size * patch_size,
                actual: raster.width() * raster.height(),
            });
        }

        self.tiles.insert(key, Tile::new(key, center, raster));
        self.rows
            .entry(key.row)
            .and_modify(|(first, last)| {
                *first = (*first).min(key.col);
                *last = (*last).max(key.col);
            })
            .or_insert((key.col, key.col));
        self.tiles_created += 1;

        debug!(
            row = key.row,
            col = key.col,
            lat = request.center.0,
            lon = request.center.1,
            total = self.tiles_created,
            "Tile created"
        );
        Ok(())
    }
}
