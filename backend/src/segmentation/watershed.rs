//! Marker-based watershed segmentation
//!
//! Floods the grid from labeled marker regions in order of ascending
//! priority (gradient magnitude), so region fronts meet along ridges of
//! high gradient. Every cell ends up assigned to a marker basin.

use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const NEIGHBORS_4: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Heap entry ordered as a min-heap on (priority, insertion order).
/// The insertion order keeps flooding deterministic on plateaus.
struct FloodCell {
    priority: f64,
    order: u64,
    row: usize,
    col: usize,
}

impl PartialEq for FloodCell {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for FloodCell {}

impl PartialOrd for FloodCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodCell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Flood the grid from the marker regions.
///
/// `markers` holds positive basin ids on seed cells and 0 elsewhere.
/// Returns a label grid where every cell carries a basin id (0 only when
/// there are no markers at all).
pub fn flood(priority: &Array2<f64>, markers: &Array2<i32>) -> Array2<i32> {
    let (rows, cols) = priority.dim();
    let mut labels = markers.clone();
    let mut heap: BinaryHeap<FloodCell> = BinaryHeap::new();
    let mut order = 0u64;

    for ((r, c), &label) in markers.indexed_iter() {
        if label > 0 {
            heap.push(FloodCell {
                priority: priority[[r, c]],
                order,
                row: r,
                col: c,
            });
            order += 1;
        }
    }

    while let Some(cell) = heap.pop() {
        let label = labels[[cell.row, cell.col]];
        for &(dr, dc) in &NEIGHBORS_4 {
            let nr = cell.row as isize + dr;
            let nc = cell.col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if labels[[nr, nc]] == 0 {
                labels[[nr, nc]] = label;
                heap.push(FloodCell {
                    priority: priority[[nr, nc]],
                    order,
                    row: nr,
                    col: nc,
                });
                order += 1;
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_partitions_whole_grid() {
        let priority = Array2::<f64>::zeros((6, 6));
        let mut markers = Array2::<i32>::zeros((6, 6));
        markers[[1, 1]] = 1;
        markers[[4, 4]] = 2;
        let labels = flood(&priority, &markers);
        assert!(labels.iter().all(|&l| l > 0));
        assert_eq!(labels[[1, 1]], 1);
        assert_eq!(labels[[4, 4]], 2);
    }

    #[test]
    fn flood_respects_gradient_ridge() {
        // high-priority ridge along the middle column keeps basins apart
        let mut priority = Array2::<f64>::zeros((5, 7));
        for r in 0..5 {
            priority[[r, 3]] = 100.0;
        }
        let mut markers = Array2::<i32>::zeros((5, 7));
        markers[[2, 0]] = 1;
        markers[[2, 6]] = 2;
        let labels = flood(&priority, &markers);
        for r in 0..5 {
            for c in 0..3 {
                assert_eq!(labels[[r, c]], 1, "left side at ({}, {})", r, c);
            }
            for c in 4..7 {
                assert_eq!(labels[[r, c]], 2, "right side at ({}, {})", r, c);
            }
        }
    }

    #[test]
    fn no_markers_leaves_grid_unlabeled() {
        let priority = Array2::<f64>::zeros((3, 3));
        let markers = Array2::<i32>::zeros((3, 3));
        let labels = flood(&priority, &markers);
        assert!(labels.iter().all(|&l| l == 0));
    }
}
