//! Connected-component labeling and small-region cleanup

use ndarray::Array2;
use std::collections::VecDeque;

const NEIGHBORS_4: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const NEIGHBORS_8: [(isize, isize); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Label connected components of a binary mask with ids 1..=count.
/// Background stays 0.
pub fn label_regions(mask: &Array2<bool>, eight_connected: bool) -> (Array2<i32>, usize) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<i32>::zeros((rows, cols));
    let neighbors: &[(isize, isize)] = if eight_connected {
        &NEIGHBORS_8
    } else {
        &NEIGHBORS_4
    };

    let mut next_label = 0i32;
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for r in 0..rows {
        for c in 0..cols {
            if !mask[[r, c]] || labels[[r, c]] != 0 {
                continue;
            }
            next_label += 1;
            labels[[r, c]] = next_label;
            queue.push_back((r, c));

            while let Some((qr, qc)) = queue.pop_front() {
                for &(dr, dc) in neighbors {
                    let nr = qr as isize + dr;
                    let nc = qc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                        labels[[nr, nc]] = next_label;
                        queue.push_back((nr, nc));
                    }
                }
            }
        }
    }

    (labels, next_label as usize)
}

/// Pixel count per label id (index 0 unused)
pub fn region_sizes(labels: &Array2<i32>, count: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; count + 1];
    for &label in labels.iter() {
        if label > 0 {
            sizes[label as usize] += 1;
        }
    }
    sizes
}

/// Drop connected regions smaller than `min_size` pixels
pub fn remove_small_objects(mask: &Array2<bool>, min_size: usize) -> Array2<bool> {
    let (labels, count) = label_regions(mask, true);
    let sizes = region_sizes(&labels, count);
    let mut output = mask.clone();
    for ((r, c), &label) in labels.indexed_iter() {
        if label > 0 && sizes[label as usize] < min_size {
            output[[r, c]] = false;
        }
    }
    output
}

/// Fill enclosed background holes of at most `max_size` pixels.
/// Background regions touching the border are kept as background.
pub fn remove_small_holes(mask: &Array2<bool>, max_size: usize) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let complement = mask.map(|&v| !v);
    let (labels, count) = label_regions(&complement, false);
    let sizes = region_sizes(&labels, count);

    let mut touches_border = vec![false; count + 1];
    for r in 0..rows {
        for &c in &[0, cols - 1] {
            let label = labels[[r, c]];
            if label > 0 {
                touches_border[label as usize] = true;
            }
        }
    }
    for c in 0..cols {
        for &r in &[0, rows - 1] {
            let label = labels[[r, c]];
            if label > 0 {
                touches_border[label as usize] = true;
            }
        }
    }

    let mut output = mask.clone();
    for ((r, c), &label) in labels.indexed_iter() {
        if label > 0 && !touches_border[label as usize] && sizes[label as usize] <= max_size {
            output[[r, c]] = true;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&[u8]]) -> Array2<bool> {
        let height = rows.len();
        let width = rows[0].len();
        let mut mask = Array2::from_elem((height, width), false);
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                mask[[r, c]] = v != 0;
            }
        }
        mask
    }

    #[test]
    fn labels_two_separate_regions() {
        let mask = mask_from(&[
            &[1, 1, 0, 0],
            &[1, 0, 0, 1],
            &[0, 0, 1, 1],
        ]);
        let (labels, count) = label_regions(&mask, false);
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0]], labels[[1, 0]]);
        assert_ne!(labels[[0, 0]], labels[[2, 2]]);
    }

    #[test]
    fn diagonal_pixels_merge_with_eight_connectivity() {
        let mask = mask_from(&[&[1, 0], &[0, 1]]);
        let (_, count4) = label_regions(&mask, false);
        let (_, count8) = label_regions(&mask, true);
        assert_eq!(count4, 2);
        assert_eq!(count8, 1);
    }

    #[test]
    fn small_objects_are_removed() {
        let mask = mask_from(&[
            &[1, 0, 0, 0],
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
        ]);
        let cleaned = remove_small_objects(&mask, 2);
        assert!(!cleaned[[0, 0]]);
        assert!(cleaned[[1, 2]]);
    }

    #[test]
    fn enclosed_hole_is_filled_but_border_background_kept() {
        let mask = mask_from(&[
            &[1, 1, 1, 0],
            &[1, 0, 1, 0],
            &[1, 1, 1, 0],
        ]);
        let filled = remove_small_holes(&mask, 4);
        assert!(filled[[1, 1]], "enclosed hole should be filled");
        assert!(!filled[[0, 3]], "border background must stay");
    }
}
