//! Canny-style edge detection
//!
//! Sobel gradients, non-maximum suppression along the quantized gradient
//! direction, and double-threshold hysteresis. Thresholds are fractions of
//! the maximum gradient magnitude so they behave the same regardless of
//! the input value range.

use ndarray::Array2;
use std::collections::VecDeque;

use super::raster::Grid;

/// Sobel gradient magnitude and direction (radians)
pub fn sobel_gradients(grid: &Grid) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = grid.shape();
    let mut magnitude = Array2::<f64>::zeros((rows, cols));
    let mut direction = Array2::<f64>::zeros((rows, cols));

    let at = |r: isize, c: isize| -> f64 {
        let rr = r.clamp(0, rows as isize - 1) as usize;
        let cc = c.clamp(0, cols as isize - 1) as usize;
        let v = grid.get(rr, cc);
        if v.is_finite() {
            v
        } else {
            0.0
        }
    };

    for r in 0..rows as isize {
        for c in 0..cols as isize {
            let gx = -at(r - 1, c - 1) - 2.0 * at(r, c - 1) - at(r + 1, c - 1)
                + at(r - 1, c + 1)
                + 2.0 * at(r, c + 1)
                + at(r + 1, c + 1);
            let gy = -at(r - 1, c - 1) - 2.0 * at(r - 1, c) - at(r - 1, c + 1)
                + at(r + 1, c - 1)
                + 2.0 * at(r + 1, c)
                + at(r + 1, c + 1);
            magnitude[[r as usize, c as usize]] = (gx * gx + gy * gy).sqrt();
            direction[[r as usize, c as usize]] = gy.atan2(gx);
        }
    }

    (magnitude, direction)
}

/// Quantize a gradient direction into one of 4 sectors and return the
/// neighbor offsets perpendicular to the edge (along the gradient).
fn sector_offsets(angle: f64) -> [(isize, isize); 2] {
    let degrees = angle.to_degrees().rem_euclid(180.0);
    if !(22.5..157.5).contains(&degrees) {
        [(0, -1), (0, 1)] // horizontal gradient
    } else if degrees < 67.5 {
        [(-1, 1), (1, -1)] // diagonal /
    } else if degrees < 112.5 {
        [(-1, 0), (1, 0)] // vertical gradient
    } else {
        [(-1, -1), (1, 1)] // diagonal \
    }
}

/// Canny edge detection.
///
/// `low_fraction` and `high_fraction` are fractions of the maximum
/// gradient magnitude. Returns the binary edge mask and the gradient
/// magnitude (reused as the watershed flooding priority).
pub fn canny(grid: &Grid, low_fraction: f64, high_fraction: f64) -> (Array2<bool>, Array2<f64>) {
    let (rows, cols) = grid.shape();
    let (magnitude, direction) = sobel_gradients(grid);

    let max_mag = magnitude.iter().cloned().fold(0.0_f64, f64::max);
    if max_mag <= f64::EPSILON {
        return (Array2::from_elem((rows, cols), false), magnitude);
    }
    let low = low_fraction * max_mag;
    let high = high_fraction * max_mag;

    // non-maximum suppression
    let mut thinned = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let m = magnitude[[r, c]];
            if m < low {
                continue;
            }
            let mut is_max = true;
            for (dr, dc) in sector_offsets(direction[[r, c]]) {
                let nr = r as isize + dr;
                let nc = c as isize + dc;
                if nr >= 0 && nc >= 0 && nr < rows as isize && nc < cols as isize {
                    if magnitude[[nr as usize, nc as usize]] > m {
                        is_max = false;
                        break;
                    }
                }
            }
            if is_max {
                thinned[[r, c]] = m;
            }
        }
    }

    // hysteresis: strong edges seed a BFS through weak edges
    let mut edges = Array2::from_elem((rows, cols), false);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    for r in 0..rows {
        for c in 0..cols {
            if thinned[[r, c]] >= high {
                edges[[r, c]] = true;
                queue.push_back((r, c));
            }
        }
    }
    while let Some((r, c)) = queue.pop_front() {
        for dr in -1isize..=1 {
            for dc in -1isize..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let nr = r as isize + dr;
                let nc = c as isize + dc;
                if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                    continue;
                }
                let (nr, nc) = (nr as usize, nc as usize);
                if !edges[[nr, nc]] && thinned[[nr, nc]] >= low {
                    edges[[nr, nc]] = true;
                    queue.push_back((nr, nc));
                }
            }
        }
    }

    (edges, magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid split into a dark left half and bright right half
    fn step_grid(rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::zeros(rows, cols);
        for r in 0..rows {
            for c in cols / 2..cols {
                grid.set(r, c, 100.0);
            }
        }
        grid
    }

    #[test]
    fn step_edge_is_detected_at_boundary() {
        let grid = step_grid(10, 10);
        let (edges, _) = canny(&grid, 0.1, 0.3);
        // edge pixels cluster around the step column
        let edge_count: usize = edges.iter().filter(|&&e| e).count();
        assert!(edge_count >= 10, "expected a vertical edge, got {}", edge_count);
        let mut off_boundary = 0;
        for r in 0..10 {
            for c in 0..10 {
                if edges[[r, c]] && !(3..=6).contains(&c) {
                    off_boundary += 1;
                }
            }
        }
        assert_eq!(off_boundary, 0, "edges detected away from the step");
    }

    #[test]
    fn flat_grid_has_no_edges() {
        let grid = Grid::from_rows(vec![vec![42.0; 8]; 8]).unwrap();
        let (edges, _) = canny(&grid, 0.1, 0.3);
        assert!(edges.iter().all(|&e| !e));
    }
}
