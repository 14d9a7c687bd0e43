//! Square raster tiles and the lattice that positions them in meters.

use serde::{Deserialize, Serialize};

use crate::geo_point::GeoPoint;
use crate::raster::Raster;

/// Pixel value for undetected background.
pub const BACKGROUND: f32 = 0.0;
/// Sentinel written by flood fill; distinct from background and from edge values.
pub const FILLED: f32 = 0.5;

/// Grid index of a tile. Row -1 lies north of row 0, column -1 west of column 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub row: i32,
    pub col: i32,
}

impl TileKey {
    pub const ORIGIN: TileKey = TileKey { row: 0, col: 0 };

    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn neighbor(self, direction: Direction) -> Self {
        let (d_row, d_col) = direction.offset();
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }
}

/// Side of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    /// `(row, col)` offset of the neighbouring tile.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (-1, 0),
            Direction::Bottom => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Pixel neighbourhood used by flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(i64, i64)] {
        const FOUR: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        const EIGHT: [(i64, i64); 8] = [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// Fixed placement of tiles in the planar frame.
///
/// Tile centers sit `2 * buffer_radius` apart, so the last pixel line of a
/// tile and the first pixel line of its neighbour cover the same ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLattice {
    origin: (f64, f64),
    patch_size: usize,
    resolution: f64,
}

impl TileLattice {
    /// `origin` is the center of tile (0, 0) in meters.
    pub fn new(origin: (f64, f64), patch_size: usize, resolution: f64) -> Self {
        Self {
            origin,
            patch_size,
            resolution,
        }
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }

    /// Half-tile distance from a center to the outermost pixel.
    pub fn buffer_radius(&self) -> f64 {
        (self.patch_size as f64 - 1.0) / 2.0 * self.resolution
    }

    /// Distance between the centers of adjacent tiles.
    pub fn spacing(&self) -> f64 {
        2.0 * self.buffer_radius()
    }

    pub fn center(&self, key: TileKey) -> (f64, f64) {
        let spacing = self.spacing();
        (
            self.origin.0 + key.col as f64 * spacing,
            self.origin.1 - key.row as f64 * spacing,
        )
    }

    /// Top-left corner of the tile buffer in meters.
    pub fn buffer_origin(&self, key: TileKey) -> (f64, f64) {
        let (cx, cy) = self.center(key);
        let radius = self.buffer_radius();
        (cx - radius, cy + radius)
    }

    /// Local pixel of a planar point, possibly outside `[0, patch_size)`.
    pub fn local_pixel(&self, key: TileKey, meters: (f64, f64)) -> (i64, i64) {
        let (ox, oy) = self.buffer_origin(key);
        let x = ((meters.0 - ox) / self.resolution).round() as i64;
        let y = ((oy - meters.1) / self.resolution).round() as i64;
        (x, y)
    }

    pub fn contains(&self, key: TileKey, meters: (f64, f64)) -> bool {
        let (x, y) = self.local_pixel(key, meters);
        let size = self.patch_size as i64;
        (0..size).contains(&x) && (0..size).contains(&y)
    }

    /// Planar coordinates of a local pixel.
    pub fn pixel_to_meters(&self, key: TileKey, pixel: (f64, f64)) -> (f64, f64) {
        let (ox, oy) = self.buffer_origin(key);
        (ox + pixel.0 * self.resolution, oy - pixel.1 * self.resolution)
    }

    /// -1 when the point lies more than half a tile north of `row`, 1 when south, else 0.
    pub fn vertical_step(&self, row: i32, y: f64) -> i32 {
        let center_y = self.center(TileKey::new(row, 0)).1;
        let radius = self.buffer_radius();
        let offset = center_y - y;
        if offset < -radius {
            -1
        } else if offset > radius {
            1
        } else {
            0
        }
    }

    /// -1 when the point lies more than half a tile west of `key`, 1 when east, else 0.
    pub fn horizontal_step(&self, key: TileKey, x: f64) -> i32 {
        let center_x = self.center(key).0;
        let radius = self.buffer_radius();
        let offset = x - center_x;
        if offset < -radius {
            -1
        } else if offset > radius {
            1
        } else {
            0
        }
    }
}

/// One square raster fragment of the detection area.
#[derive(Debug, Clone)]
pub struct Tile {
    key: TileKey,
    center: GeoPoint,
    raster: Raster<f32>,
}

impl Tile {
    pub fn new(key: TileKey, center: GeoPoint, raster: Raster<f32>) -> Self {
        Self {
            key,
            center,
            raster,
        }
    }

    /// All-background tile used to pad the merged raster.
    pub fn blank(key: TileKey, center: GeoPoint, patch_size: usize) -> Self {
        Self::new(key, center, Raster::filled(patch_size, patch_size, BACKGROUND))
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn center(&self) -> &GeoPoint {
        &self.center
    }

    pub fn raster(&self) -> &Raster<f32> {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut Raster<f32> {
        &mut self.raster
    }

    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.raster.get(x, y)
    }

    /// Replace the background region connected to `(x, y)` with [`FILLED`].
    ///
    /// Does nothing unless the seed itself is background. Returns the number of
    /// pixels that changed.
    pub fn flood_fill(&mut self, x: usize, y: usize, connectivity: Connectivity) -> usize {
        if x >= self.raster.width() || y >= self.raster.height() {
            return 0;
        }
        if self.raster.get(x, y) != BACKGROUND {
            return 0;
        }

        let mut filled = 0usize;
        let mut stack = vec![(x as i64, y as i64)];
        self.raster.set(x, y, FILLED);
        filled += 1;

        while let Some((cx, cy)) = stack.pop() {
            for (dx, dy) in connectivity.offsets() {
                let (nx, ny) = (cx + dx, cy + dy);
                if self.raster.try_get(nx, ny) == Some(BACKGROUND) {
                    self.raster.set(nx as usize, ny as usize, FILLED);
                    filled += 1;
                    stack.push((nx, ny));
                }
            }
        }
        filled
    }

    /// Filled pixels on each border, translated into seed pixels of the
    /// neighbouring tile on that side.
    pub fn border_seeds(&self) -> Vec<(Direction, Vec<(usize, usize)>)> {
        let size = self.raster.width();
        let last = size - 1;
        let mut top = Vec::new();
        let mut bottom = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();

        for i in 0..size {
            if self.raster.get(i, 0) == FILLED {
                top.push((i, last));
            }
            if self.raster.get(i, last) == FILLED {
                bottom.push((i, 0));
            }
            if self.raster.get(0, i) == FILLED {
                left.push((last, i));
            }
            if self.raster.get(last, i) == FILLED {
                right.push((0, i));
            }
        }

        [
            (Direction::Top, top),
            (Direction::Bottom, bottom),
            (Direction::Left, left),
            (Direction::Right, right),
        ]
        .into_iter()
        .filter(|(_, seeds)| !seeds.is_empty())
        .collect()
    }
}
