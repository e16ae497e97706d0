//! Region outlines: Moore-neighbor boundary tracing and convex hulls
//!
//! Contour points are pixel centers in (x = column, y = row) order, so
//! downstream polygon operations work in plain pixel space.

use geo::{ConvexHull, LineString, MultiPoint, Point, Polygon};
use ndarray::Array2;

/// Clockwise Moore neighborhood in image coordinates (row grows down):
/// E, SE, S, SW, W, NW, N, NE
const MOORE: [(isize, isize); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

fn at(mask: &Array2<bool>, r: isize, c: isize) -> bool {
    let (rows, cols) = mask.dim();
    r >= 0 && c >= 0 && r < rows as isize && c < cols as isize && mask[[r as usize, c as usize]]
}

/// Trace the outer boundary of the first region found in the mask.
///
/// Returns pixel-center points (x, y) in clockwise order, or None when the
/// mask is empty or degenerate (fewer than 3 boundary points).
pub fn trace_outline(mask: &Array2<bool>) -> Option<Vec<(f64, f64)>> {
    let (rows, cols) = mask.dim();

    // first foreground pixel in scan order: its W and N neighbors are background
    let mut start = None;
    'scan: for r in 0..rows {
        for c in 0..cols {
            if mask[[r, c]] {
                start = Some((r as isize, c as isize));
                break 'scan;
            }
        }
    }
    let (sr, sc) = start?;

    let mut contour: Vec<(isize, isize)> = vec![(sr, sc)];
    let mut current = (sr, sc);
    // entered the start pixel from its west background neighbor
    let mut backtrack = (sr, sc - 1);
    let max_steps = 8 * rows * cols;

    for _ in 0..max_steps {
        // index of the backtrack cell around the current pixel
        let rel = (backtrack.0 - current.0, backtrack.1 - current.1);
        let back_idx = MOORE.iter().position(|&d| d == rel).unwrap_or(4);

        let mut found = None;
        for step in 1..=8 {
            let idx = (back_idx + step) % 8;
            let (dr, dc) = MOORE[idx];
            let candidate = (current.0 + dr, current.1 + dc);
            if at(mask, candidate.0, candidate.1) {
                // backtrack becomes the last background cell checked
                let prev_idx = (back_idx + step - 1) % 8;
                let (pr, pc) = MOORE[prev_idx];
                backtrack = (current.0 + pr, current.1 + pc);
                found = Some(candidate);
                break;
            }
        }

        match found {
            None => break, // isolated pixel
            Some(next) => {
                if next == (sr, sc) && contour.len() > 1 {
                    break;
                }
                contour.push(next);
                current = next;
            }
        }
    }

    // drop consecutive duplicates that tracing can produce on spurs
    contour.dedup();
    if contour.len() < 3 {
        return None;
    }
    Some(
        contour
            .into_iter()
            .map(|(r, c)| (c as f64, r as f64))
            .collect(),
    )
}

/// Trace the outline of one labeled region
pub fn region_outline(labels: &Array2<i32>, label: i32) -> Option<Vec<(f64, f64)>> {
    let mask = labels.map(|&l| l == label);
    trace_outline(&mask)
}

/// Build the outline of a pixel set (offsetting through its bounding box)
pub fn component_outline(
    pixels: &[(usize, usize)],
    shape: (usize, usize),
) -> Option<Vec<(f64, f64)>> {
    if pixels.is_empty() {
        return None;
    }
    let (rows, cols) = shape;
    let mut mask = Array2::<bool>::from_elem((rows, cols), false);
    for &(r, c) in pixels {
        mask[[r, c]] = true;
    }
    trace_outline(&mask)
}

/// Close an outline into a polygon
pub fn outline_to_polygon(points: &[(f64, f64)]) -> Option<Polygon<f64>> {
    if points.len() < 3 {
        return None;
    }
    let mut ring: Vec<(f64, f64)> = points.to_vec();
    if ring.first() != ring.last() {
        let first = ring[0];
        ring.push(first);
    }
    Some(Polygon::new(LineString::from(ring), vec![]))
}

/// Convex hull of a pixel set
pub fn convex_hull_polygon(pixels: &[(usize, usize)]) -> Option<Polygon<f64>> {
    if pixels.len() < 3 {
        return None;
    }
    let points: Vec<Point<f64>> = pixels
        .iter()
        .map(|&(r, c)| Point::new(c as f64, r as f64))
        .collect();
    let hull = MultiPoint::from(points).convex_hull();
    if hull.exterior().0.len() < 4 {
        return None;
    }
    Some(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn mask_square(rows: usize, cols: usize, r0: usize, c0: usize, size: usize) -> Array2<bool> {
        let mut mask = Array2::from_elem((rows, cols), false);
        for r in r0..r0 + size {
            for c in c0..c0 + size {
                mask[[r, c]] = true;
            }
        }
        mask
    }

    #[test]
    fn square_outline_is_closed_and_has_right_area() {
        let mask = mask_square(12, 12, 2, 3, 6);
        let outline = trace_outline(&mask).unwrap();
        let polygon = outline_to_polygon(&outline).unwrap();
        // pixel-center outline of a 6x6 block spans 5x5 units
        let area = polygon.unsigned_area();
        assert!(
            (area - 25.0).abs() < 1e-6,
            "expected 25 square units, got {}",
            area
        );
        let ring = polygon.exterior();
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn isolated_pixel_yields_no_outline() {
        let mut mask = Array2::from_elem((5, 5), false);
        mask[[2, 2]] = true;
        assert!(trace_outline(&mask).is_none());
    }

    #[test]
    fn outline_stays_on_region_boundary() {
        let mask = mask_square(10, 10, 1, 1, 4);
        let outline = trace_outline(&mask).unwrap();
        for (x, y) in outline {
            assert!(mask[[y as usize, x as usize]], "({}, {}) off region", x, y);
        }
    }

    #[test]
    fn convex_hull_of_l_shape_covers_corners() {
        let mut pixels = Vec::new();
        for c in 0..6 {
            pixels.push((0usize, c as usize));
        }
        for r in 0..6 {
            pixels.push((r as usize, 0usize));
        }
        let hull = convex_hull_polygon(&pixels).unwrap();
        let area = hull.unsigned_area();
        // hull of the L is the triangle (0,0)-(5,0)-(0,5)
        assert!((area - 12.5).abs() < 1e-6, "got {}", area);
    }
}
