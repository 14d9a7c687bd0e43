//! Boundary tracing of binary masks.

use serde::{Deserialize, Serialize};

use crate::raster::Raster;
use crate::spatial::signed_area;

/// Eight neighbours, counter-clockwise on screen (y grows downwards).
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// An ordered closed chain of pixel coordinates `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<(i64, i64)>,
    pub is_hole: bool,
}

impl Contour {
    /// Absolute enclosed area in square pixels.
    pub fn area(&self) -> f64 {
        signed_area(&self.to_f64()).abs()
    }

    pub fn to_f64(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|(x, y)| (*x as f64, *y as f64)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContourNode {
    /// Index of the enclosing contour; `None` for top-level borders.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    pub hierarchy: Vec<ContourNode>,
}

impl ContourSet {
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    /// Largest non-hole contour.
    pub fn outer_index(&self) -> Option<usize> {
        self.contours
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_hole)
            .map(|(i, c)| (i, c.area()))
            .fold(None, |best: Option<(usize, f64)>, (i, area)| match best {
                Some((_, best_area)) if best_area >= area => best,
                _ => Some((i, area)),
            })
            .map(|(i, _)| i)
    }

    /// Holes directly enclosed by contour `index`.
    pub fn holes_of(&self, index: usize) -> impl Iterator<Item = &Contour> + '_ {
        self.contours
            .iter()
            .zip(&self.hierarchy)
            .filter(move |(c, node)| c.is_hole && node.parent == Some(index))
            .map(|(c, _)| c)
    }
}

/// Extracts borders and their nesting from a binary mask.
pub trait ContourTracer {
    fn trace(&self, mask: &Raster<u8>) -> ContourSet;
}

/// Topological border following over 8-connected foreground.
///
/// Finds outer borders and hole borders in raster-scan order, links each to
/// its enclosing border, then collapses straight runs of every chain to their
/// end points.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorderFollower;

struct Labels {
    width: i64,
    cells: Vec<i32>,
}

impl Labels {
    fn from_mask(mask: &Raster<u8>) -> Self {
        // One pixel of zero padding on every side acts as the frame.
        let width = mask.width() as i64 + 2;
        let height = mask.height() as i64 + 2;
        let mut cells = vec![0; (width * height) as usize];
        for y in 0..mask.height() {
            for (x, value) in mask.row(y).iter().enumerate() {
                if *value > 0 {
                    cells[(y as i64 + 1) as usize * width as usize + x + 1] = 1;
                }
            }
        }
        Self { width, cells }
    }

    #[inline]
    fn get(&self, p: (i64, i64)) -> i32 {
        self.cells[(p.1 * self.width + p.0) as usize]
    }

    #[inline]
    fn set(&mut self, p: (i64, i64), value: i32) {
        self.cells[(p.1 * self.width + p.0) as usize] = value;
    }
}

fn direction_to(from: (i64, i64), to: (i64, i64)) -> usize {
    let delta = (to.0 - from.0, to.1 - from.1);
    DIRECTIONS
        .iter()
        .position(|d| *d == delta)
        .unwrap_or(0)
}

fn step(p: (i64, i64), direction: usize) -> (i64, i64) {
    let (dx, dy) = DIRECTIONS[direction];
    (p.0 + dx, p.1 + dy)
}

/// Follow one border starting at `start`, entered from the zero pixel `from`.
fn follow(labels: &mut Labels, start: (i64, i64), from: (i64, i64), nbd: i32) -> Vec<(i64, i64)> {
    let d0 = direction_to(start, from);
    let first = (0..8)
        .map(|k| step(start, (d0 + 8 - k) % 8))
        .find(|p| labels.get(*p) != 0);

    let Some(first) = first else {
        labels.set(start, -nbd);
        return vec![start];
    };

    let mut points = Vec::new();
    let mut previous = first;
    let mut current = start;
    loop {
        points.push(current);

        let back = direction_to(current, previous);
        let mut east_is_zero = false;
        let mut next = previous;
        for k in 1..=8 {
            let direction = (back + k) % 8;
            let candidate = step(current, direction);
            if labels.get(candidate) != 0 {
                next = candidate;
                break;
            }
            if direction == 0 {
                east_is_zero = true;
            }
        }

        if east_is_zero {
            labels.set(current, -nbd);
        } else if labels.get(current) == 1 {
            labels.set(current, nbd);
        }

        if next == start && current == first {
            break;
        }
        previous = current;
        current = next;
    }
    points
}

/// Drop chain points that continue the previous step in the same direction.
fn compress(points: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    let n = points.len();
    if n <= 2 {
        return points;
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let here = points[i];
            let next = points[(i + 1) % n];
            (here.0 - prev.0, here.1 - prev.1) != (next.0 - here.0, next.1 - here.1)
        })
        .map(|i| points[i])
        .collect()
}

impl ContourTracer for BorderFollower {
    fn trace(&self, mask: &Raster<u8>) -> ContourSet {
        let mut labels = Labels::from_mask(mask);
        let width = mask.width() as i64;
        let height = mask.height() as i64;
        let mut set = ContourSet::default();

        // Border number 1 is the frame; traced borders start at 2.
        let mut nbd: i32 = 1;
        for y in 1..=height {
            let mut lnbd: i32 = 1;
            for x in 1..=width {
                let here = (x, y);
                let value = labels.get(here);

                let start = if value == 1 && labels.get((x - 1, y)) == 0 {
                    Some((false, (x - 1, y)))
                } else if value >= 1 && labels.get((x + 1, y)) == 0 {
                    if value > 1 {
                        lnbd = value;
                    }
                    Some((true, (x + 1, y)))
                } else {
                    None
                };

                if let Some((is_hole, from)) = start {
                    nbd += 1;
                    let parent = parent_for(&set, is_hole, lnbd);
                    let chain = follow(&mut labels, here, from, nbd);
                    set.contours.push(Contour {
                        points: compress(chain)
                            .into_iter()
                            .map(|(px, py)| (px - 1, py - 1))
                            .collect(),
                        is_hole,
                    });
                    set.hierarchy.push(ContourNode { parent });
                }

                let value = labels.get(here);
                if value != 0 && value != 1 {
                    lnbd = value.abs();
                }
            }
        }
        set
    }
}

/// Parent of a new border given the last border met on the scan line.
fn parent_for(set: &ContourSet, is_hole: bool, lnbd: i32) -> Option<usize> {
    let last = (lnbd >= 2).then(|| (lnbd - 2) as usize);
    let (last_is_hole, last_parent) = match last {
        Some(i) => (set.contours[i].is_hole, set.hierarchy[i].parent),
        // The frame behaves as a top-level hole.
        None => (true, None),
    };
    if is_hole == last_is_hole {
        last_parent
    } else {
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn mask(rows: &[&str]) -> Raster<u8> {
        let width = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| if c == '#' { 255 } else { 0 }))
            .collect();
        Raster::from_vec(width, rows.len(), data).unwrap()
    }

    #[test]
    fn solid_square_compresses_to_corners() {
        let set = BorderFollower.trace(&mask(&[
            "........",
            "........",
            "..####..",
            "..####..",
            "..####..",
            "..####..",
            "........",
            "........",
        ]));
        assert_eq!(set.len(), 1);
        assert!(!set.contours[0].is_hole);
        assert_eq!(set.hierarchy[0].parent, None);
        let corners: BTreeSet<_> = set.contours[0].points.iter().copied().collect();
        assert_eq!(corners, BTreeSet::from([(2, 2), (5, 2), (5, 5), (2, 5)]));
        assert!((set.contours[0].area() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn hole_is_linked_to_its_outer_border() {
        let set = BorderFollower.trace(&mask(&[
            ".......",
            ".#####.",
            ".#####.",
            ".##.##.",
            ".#####.",
            ".#####.",
            ".......",
        ]));
        assert_eq!(set.len(), 2);
        let outer = set.outer_index().unwrap();
        assert_eq!(outer, 0);
        let holes: Vec<_> = set.holes_of(outer).collect();
        assert_eq!(holes.len(), 1);
        assert!(holes[0].is_hole);
    }

    #[test]
    fn outer_index_prefers_the_largest_blob() {
        let set = BorderFollower.trace(&mask(&[
            "##.......",
            "##.......",
            ".........",
            "...#####.",
            "...#####.",
            "...#####.",
            ".........",
        ]));
        assert_eq!(set.len(), 2);
        let outer = set.outer_index().unwrap();
        let xs: Vec<_> = set.contours[outer].points.iter().map(|p| p.0).collect();
        assert!(xs.contains(&7));
    }

    #[test]
    fn single_pixel_is_one_point_contour() {
        let set = BorderFollower.trace(&mask(&["...", ".#.", "..."]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.contours[0].points, vec![(1, 1)]);
    }

    #[test]
    fn empty_mask_has_no_contours() {
        let set = BorderFollower.trace(&mask(&["...", "..."]));
        assert!(set.is_empty());
        assert_eq!(set.outer_index(), None);
    }
}
