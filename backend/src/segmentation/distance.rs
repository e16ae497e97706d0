//! Chamfer distance transform
//!
//! Two-pass 3-4 chamfer approximation of the euclidean distance from each
//! pixel to the nearest seed pixel. Distances are returned in pixel units.

use ndarray::Array2;

const ORTHOGONAL: f64 = 3.0;
const DIAGONAL: f64 = 4.0;

/// Distance in pixels from every cell to the nearest `true` cell in `seeds`
pub fn chamfer_distance(seeds: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = seeds.dim();
    let mut dist = Array2::<f64>::from_elem((rows, cols), f64::INFINITY);

    for ((r, c), &seed) in seeds.indexed_iter() {
        if seed {
            dist[[r, c]] = 0.0;
        }
    }

    // forward pass: N, NW, NE, W
    for r in 0..rows {
        for c in 0..cols {
            let mut d = dist[[r, c]];
            if r > 0 {
                d = d.min(dist[[r - 1, c]] + ORTHOGONAL);
                if c > 0 {
                    d = d.min(dist[[r - 1, c - 1]] + DIAGONAL);
                }
                if c + 1 < cols {
                    d = d.min(dist[[r - 1, c + 1]] + DIAGONAL);
                }
            }
            if c > 0 {
                d = d.min(dist[[r, c - 1]] + ORTHOGONAL);
            }
            dist[[r, c]] = d;
        }
    }

    // backward pass: S, SE, SW, E
    for r in (0..rows).rev() {
        for c in (0..cols).rev() {
            let mut d = dist[[r, c]];
            if r + 1 < rows {
                d = d.min(dist[[r + 1, c]] + ORTHOGONAL);
                if c > 0 {
                    d = d.min(dist[[r + 1, c - 1]] + DIAGONAL);
                }
                if c + 1 < cols {
                    d = d.min(dist[[r + 1, c + 1]] + DIAGONAL);
                }
            }
            if c + 1 < cols {
                d = d.min(dist[[r, c + 1]] + ORTHOGONAL);
            }
            dist[[r, c]] = d;
        }
    }

    // normalize chamfer weights back to pixel units
    dist.mapv_inplace(|d| if d.is_finite() { d / ORTHOGONAL } else { d });
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_from_single_seed() {
        let mut seeds = Array2::from_elem((7, 7), false);
        seeds[[3, 3]] = true;
        let dist = chamfer_distance(&seeds);
        assert_eq!(dist[[3, 3]], 0.0);
        assert!((dist[[3, 5]] - 2.0).abs() < 1e-9);
        // diagonal distance approximated by 4/3 per step
        assert!((dist[[5, 5]] - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_seeds_yields_infinite_distances() {
        let seeds = Array2::from_elem((3, 3), false);
        let dist = chamfer_distance(&seeds);
        assert!(dist.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn distance_increases_away_from_seed_line() {
        let mut seeds = Array2::from_elem((5, 5), false);
        for r in 0..5 {
            seeds[[r, 0]] = true;
        }
        let dist = chamfer_distance(&seeds);
        for r in 0..5 {
            for c in 1..5 {
                assert!(dist[[r, c]] > dist[[r, c - 1]]);
            }
        }
    }
}
