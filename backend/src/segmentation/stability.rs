//! Stability-based automatic mask proposals
//!
//! Approximates SAM-style automatic mask generation without a neural
//! model: candidate masks are taken at a ladder of intensity thresholds
//! and scored by how stable each connected region stays as the threshold
//! tightens (pixel-set retention between adjacent levels). Regions that
//! survive nearly unchanged across levels are strong field candidates.

use ndarray::Array2;

use super::label::{label_regions, region_sizes};
use super::raster::Grid;

/// A proposed mask: its pixels and the stability score in [0, 1]
pub struct MaskProposal {
    pub pixels: Vec<(usize, usize)>,
    pub stability: f64,
}

/// Parameters for the stability ladder
pub struct StabilityParams {
    pub levels: usize,
    pub threshold_min: f64,
    pub threshold_max: f64,
    pub stability_threshold: f64,
    pub min_area: usize,
    pub max_area: usize,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            levels: 8,
            threshold_min: 0.15,
            threshold_max: 0.85,
            stability_threshold: 0.9,
            min_area: 1000,
            max_area: usize::MAX,
        }
    }
}

/// Generate stable mask proposals from a normalized grid (values in [0, 1])
pub fn stable_masks(grid: &Grid, params: &StabilityParams) -> Vec<MaskProposal> {
    let (rows, cols) = grid.shape();
    if params.levels < 2 {
        return Vec::new();
    }

    let step = (params.threshold_max - params.threshold_min) / (params.levels - 1) as f64;
    let thresholds: Vec<f64> = (0..params.levels)
        .map(|i| params.threshold_min + i as f64 * step)
        .collect();

    // label every level once
    let mut level_labels: Vec<(Array2<i32>, usize)> = Vec::with_capacity(thresholds.len());
    for &t in &thresholds {
        let mask = grid.data().map(|&v| v.is_finite() && v >= t);
        level_labels.push(label_regions(&mask, true));
    }

    // score each component against the next (tighter) level; a component at
    // level i shrinks into zero or more children at level i+1, and its
    // stability is the retained fraction of the largest child
    let mut candidates: Vec<MaskProposal> = Vec::new();
    for i in 0..level_labels.len() - 1 {
        let (labels, count) = &level_labels[i];
        let (next_labels, next_count) = &level_labels[i + 1];
        if *count == 0 {
            continue;
        }
        let sizes = region_sizes(labels, *count);

        // overlap[parent][child] counted sparsely
        let mut overlap: std::collections::HashMap<(i32, i32), usize> =
            std::collections::HashMap::new();
        if *next_count > 0 {
            for ((r, c), &parent) in labels.indexed_iter() {
                if parent > 0 {
                    let child = next_labels[[r, c]];
                    if child > 0 {
                        *overlap.entry((parent, child)).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut best_child: Vec<usize> = vec![0; *count + 1];
        for (&(parent, _), &pixels) in &overlap {
            let slot = &mut best_child[parent as usize];
            if pixels > *slot {
                *slot = pixels;
            }
        }

        for parent in 1..=*count {
            let size = sizes[parent];
            if size < params.min_area || size > params.max_area {
                continue;
            }
            let stability = best_child[parent] as f64 / size as f64;
            if stability < params.stability_threshold {
                continue;
            }
            let mut pixels = Vec::with_capacity(size);
            for ((r, c), &label) in labels.indexed_iter() {
                if label == parent as i32 {
                    pixels.push((r, c));
                }
            }
            candidates.push(MaskProposal { pixels, stability });
        }
    }

    // non-maximum suppression over pixel sets: keep the most stable, then
    // largest, and drop proposals that mostly overlap an accepted one
    candidates.sort_by(|a, b| {
        b.stability
            .total_cmp(&a.stability)
            .then_with(|| b.pixels.len().cmp(&a.pixels.len()))
    });

    let mut claimed = Array2::<bool>::from_elem((rows, cols), false);
    let mut accepted: Vec<MaskProposal> = Vec::new();
    for proposal in candidates {
        let overlap = proposal
            .pixels
            .iter()
            .filter(|&&(r, c)| claimed[[r, c]])
            .count();
        if overlap as f64 / proposal.pixels.len() as f64 > 0.5 {
            continue;
        }
        for &(r, c) in &proposal.pixels {
            claimed[[r, c]] = true;
        }
        accepted.push(proposal);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid with a sharp bright square on a dark background: the square is
    /// identical at every threshold, so its stability is 1.
    fn bright_square_grid() -> Grid {
        let mut grid = Grid::zeros(20, 20);
        for r in 5..15 {
            for c in 5..15 {
                grid.set(r, c, 1.0);
            }
        }
        grid
    }

    #[test]
    fn sharp_region_is_perfectly_stable() {
        let grid = bright_square_grid();
        let params = StabilityParams {
            min_area: 10,
            ..Default::default()
        };
        let masks = stable_masks(&grid, &params);
        assert_eq!(masks.len(), 1);
        assert!((masks[0].stability - 1.0).abs() < 1e-9);
        assert_eq!(masks[0].pixels.len(), 100);
    }

    #[test]
    fn unstable_gradient_produces_no_masks() {
        // smooth ramp: every threshold cuts a different region
        let mut grid = Grid::zeros(20, 20);
        for r in 0..20 {
            for c in 0..20 {
                grid.set(r, c, c as f64 / 19.0);
            }
        }
        let params = StabilityParams {
            min_area: 10,
            stability_threshold: 0.97,
            ..Default::default()
        };
        let masks = stable_masks(&grid, &params);
        assert!(masks.is_empty(), "ramp should not yield stable masks");
    }

    #[test]
    fn min_area_filters_specks() {
        let mut grid = Grid::zeros(10, 10);
        grid.set(2, 2, 1.0); // single bright pixel
        let params = StabilityParams {
            min_area: 4,
            ..Default::default()
        };
        assert!(stable_masks(&grid, &params).is_empty());
    }
}
