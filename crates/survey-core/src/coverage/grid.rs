use crate::spatial::{centroid, max_vertex_distance, point_in_polygon};

/// Rotation of the candidate lattice: the direction of the first polygon edge,
/// measured from its second vertex to its first.
pub fn grid_rotation(polygon: &[(f64, f64)]) -> f64 {
    match polygon {
        [v0, v1, ..] => (v0.1 - v1.1).atan2(v0.0 - v1.0),
        _ => 0.0,
    }
}

/// Candidate waypoints on a rotated square lattice.
///
/// The lattice spans the polygon's largest vertex distance plus a scan radius
/// on each side, is centered on the mean of the polygon vertices and uses
/// `scan_radius / scan_accuracy` spacing. A point is kept when it lies inside
/// the polygon XOR inside any obstacle.
pub fn candidate_grid(
    polygon: &[(f64, f64)],
    obstacles: &[Vec<(f64, f64)>],
    scan_radius: f64,
    scan_accuracy: f64,
    rotation: Option<f64>,
) -> Vec<(f64, f64)> {
    let Some(target_center) = centroid(polygon) else {
        return Vec::new();
    };
    if polygon.len() < 3 {
        return Vec::new();
    }

    let spacing = scan_radius / scan_accuracy;
    let extent = max_vertex_distance(polygon) + 2.0 * scan_radius;
    let steps = (extent / spacing).ceil() as usize;
    let axis: Vec<f64> = (0..steps)
        .map(|k| -extent / 2.0 + k as f64 * spacing)
        .take_while(|v| *v < extent / 2.0)
        .collect();

    let alpha = rotation.unwrap_or_else(|| grid_rotation(polygon));
    let (sin, cos) = alpha.sin_cos();
    let lattice: Vec<(f64, f64)> = axis
        .iter()
        .flat_map(|y| axis.iter().map(move |x| (*x, *y)))
        .map(|(x, y)| (x * cos - y * sin, x * sin + y * cos))
        .collect();

    let Some(lattice_center) = centroid(&lattice) else {
        return Vec::new();
    };
    let shift = (
        target_center.0 - lattice_center.0,
        target_center.1 - lattice_center.1,
    );

    lattice
        .into_iter()
        .map(|(x, y)| (x + shift.0, y + shift.1))
        .filter(|p| {
            let in_polygon = point_in_polygon(*p, polygon);
            let in_obstacle = obstacles.iter().any(|o| point_in_polygon(*p, o));
            in_polygon ^ in_obstacle
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: (f64, f64), side: f64) -> Vec<(f64, f64)> {
        let (x, y) = origin;
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    #[test]
    fn lattice_spacing_is_radius_over_accuracy() {
        let polygon = square((0.0, 0.0), 510.0);
        let points = candidate_grid(&polygon, &[], 50.0, 2.0, None);
        assert!(!points.is_empty());

        for p in &points {
            assert!(point_in_polygon(*p, &polygon));
        }
        // Every pair of points sits on the same 25 px lattice.
        let first = points[0];
        for p in &points {
            for d in [p.0 - first.0, p.1 - first.1] {
                let steps = d / 25.0;
                assert!((steps - steps.round()).abs() < 1e-6, "offset {d}");
            }
        }
        // The lattice is centered on the polygon, so a 510 px side holds 21 columns.
        let row: Vec<_> = points.iter().filter(|p| (p.1 - first.1).abs() < 1e-6).collect();
        assert_eq!(row.len(), 21);
    }

    #[test]
    fn first_edge_sets_rotation() {
        let polygon = [(10.0, 10.0), (0.0, 0.0), (10.0, -10.0)];
        assert!((grid_rotation(&polygon) - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn obstacles_use_symmetric_difference() {
        let polygon = square((0.0, 0.0), 100.0);
        let inner = square((40.0, 40.0), 20.0);
        // Straddles the right edge of the polygon.
        let straddling = square((90.0, 40.0), 40.0);
        let points = candidate_grid(&polygon, &[inner.clone(), straddling.clone()], 10.0, 1.0, Some(0.0));

        assert!(points.iter().all(|p| !point_in_polygon(*p, &inner)));
        let outside_kept = points
            .iter()
            .filter(|p| !point_in_polygon(**p, &polygon))
            .count();
        assert!(outside_kept > 0);
        assert!(points
            .iter()
            .filter(|p| !point_in_polygon(**p, &polygon))
            .all(|p| point_in_polygon(*p, &straddling)));
    }

    #[test]
    fn degenerate_polygon_yields_nothing() {
        assert!(candidate_grid(&[(0.0, 0.0), (1.0, 1.0)], &[], 10.0, 2.0, None).is_empty());
        assert!(candidate_grid(&[], &[], 10.0, 2.0, None).is_empty());
    }
}
