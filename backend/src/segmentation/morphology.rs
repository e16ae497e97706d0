//! Binary morphology with a square structuring element

use ndarray::Array2;

/// Dilate a binary mask with a square element of the given radius
pub fn dilate(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let mut output = Array2::from_elem((rows, cols), false);
    let radius = radius as isize;
    for r in 0..rows as isize {
        for c in 0..cols as isize {
            'window: for dr in -radius..=radius {
                for dc in -radius..=radius {
                    let nr = r + dr;
                    let nc = c + dc;
                    if nr >= 0
                        && nc >= 0
                        && nr < rows as isize
                        && nc < cols as isize
                        && mask[[nr as usize, nc as usize]]
                    {
                        output[[r as usize, c as usize]] = true;
                        break 'window;
                    }
                }
            }
        }
    }
    output
}

/// Erode a binary mask with a square element of the given radius.
/// Pixels outside the grid count as background.
pub fn erode(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let mut output = Array2::from_elem((rows, cols), false);
    let radius = radius as isize;
    for r in 0..rows as isize {
        for c in 0..cols as isize {
            if !mask[[r as usize, c as usize]] {
                continue;
            }
            let mut keep = true;
            'window: for dr in -radius..=radius {
                for dc in -radius..=radius {
                    let nr = r + dr;
                    let nc = c + dc;
                    if nr < 0
                        || nc < 0
                        || nr >= rows as isize
                        || nc >= cols as isize
                        || !mask[[nr as usize, nc as usize]]
                    {
                        keep = false;
                        break 'window;
                    }
                }
            }
            output[[r as usize, c as usize]] = keep;
        }
    }
    output
}

/// Closing: dilation followed by erosion, fills gaps up to the element size
pub fn closing(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    erode(&dilate(mask, radius), radius)
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
    fn dilate_grows_single_pixel() {
        let mask = mask_from(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let dilated = dilate(&mask, 1);
        assert!(dilated.iter().all(|&v| v));
    }

    #[test]
    fn erode_removes_single_pixel() {
        let mask = mask_from(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let eroded = erode(&mask, 1);
        assert!(eroded.iter().all(|&v| !v));
    }

    #[test]
    fn closing_fills_one_pixel_gap() {
        let mask = mask_from(&[
            &[1, 1, 1, 1, 1],
            &[1, 1, 0, 1, 1],
            &[1, 1, 1, 1, 1],
        ]);
        let closed = closing(&mask, 1);
        assert!(closed[[1, 2]], "gap should be filled");
    }
}
