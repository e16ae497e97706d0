//! Separable gaussian smoothing

use ndarray::Array2;

use super::raster::Grid;

/// Gaussian kernel for the given sigma, radius 3*sigma
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (sigma * 3.0).ceil().max(1.0) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in 0..=(2 * radius) {
        let d = i as f64 - radius as f64;
        kernel.push((-d * d / denom).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Smooth a grid with a separable gaussian filter.
///
/// Borders are handled by clamping; non-finite input values are treated
/// as the nearest finite neighbor through the clamp.
pub fn gaussian_blur(grid: &Grid, sigma: f64) -> Grid {
    if sigma <= 0.0 {
        return grid.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let (rows, cols) = grid.shape();

    // horizontal pass
    let mut horizontal = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (i, &w) in kernel.iter().enumerate() {
                let offset = i as isize - radius as isize;
                let cc = (c as isize + offset).clamp(0, cols as isize - 1) as usize;
                let v = grid.get(r, cc);
                acc += w * if v.is_finite() { v } else { 0.0 };
            }
            horizontal[[r, c]] = acc;
        }
    }

    // vertical pass
    let mut output = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (i, &w) in kernel.iter().enumerate() {
                let offset = i as isize - radius as isize;
                let rr = (r as isize + offset).clamp(0, rows as isize - 1) as usize;
                acc += w * horizontal[[rr, c]];
            }
            output[[r, c]] = acc;
        }
    }

    Grid::from_array(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sums_to_one() {
        let kernel = gaussian_kernel(1.4);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn blur_preserves_constant_grid() {
        let grid = Grid::from_rows(vec![vec![5.0; 9]; 9]).unwrap();
        let blurred = gaussian_blur(&grid, 1.0);
        for r in 0..9 {
            for c in 0..9 {
                assert!((blurred.get(r, c) - 5.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn blur_reduces_peak() {
        let mut grid = Grid::zeros(9, 9);
        grid.set(4, 4, 100.0);
        let blurred = gaussian_blur(&grid, 1.0);
        assert!(blurred.get(4, 4) < 100.0);
        assert!(blurred.get(4, 5) > 0.0);
    }
}
