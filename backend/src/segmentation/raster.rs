//! In-memory raster grid and native GeoTIFF decoding
//!
//! Grids hold a single band of f64 intensity values in row-major order,
//! row 0 at the north edge. GeoTIFF decoding is native (no GDAL): the
//! pixel scale and tiepoint tags are honored when present, anything more
//! exotic is ignored and the grid stays in pixel space.

use ndarray::Array2;
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use super::SegmentationError;

/// Geographic extent of a grid (lon/lat bounding box)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Extent {
    /// Map a pixel-space coordinate (x = column, y = row) to [lon, lat].
    /// Row 0 maps to the north edge.
    pub fn pixel_to_lonlat(&self, rows: usize, cols: usize, x: f64, y: f64) -> [f64; 2] {
        let lon = self.west + (x / cols as f64) * (self.east - self.west);
        let lat = self.north - (y / rows as f64) * (self.north - self.south);
        [lon, lat]
    }
}

/// Single-band raster grid
#[derive(Debug, Clone)]
pub struct Grid {
    data: Array2<f64>,
}

impl Grid {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build a grid from row-major values
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, SegmentationError> {
        if rows == 0 || cols == 0 {
            return Err(SegmentationError::EmptyImage);
        }
        let data = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| SegmentationError::InvalidGrid(e.to_string()))?;
        Ok(Self { data })
    }

    /// Build a grid from nested rows (as received in JSON payloads)
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SegmentationError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(SegmentationError::EmptyImage);
        }
        if rows.iter().any(|r| r.len() != width) {
            return Err(SegmentationError::InvalidGrid(
                "rows have inconsistent lengths".to_string(),
            ));
        }
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        Self::from_vec(height, width, values)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[[row, col]] = value;
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Minimum and maximum over finite values
    pub fn min_max(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.data.iter() {
            if v.is_finite() {
                if v < min {
                    min = v;
                }
                if v > max {
                    max = v;
                }
            }
        }
        if min > max {
            (0.0, 0.0)
        } else {
            (min, max)
        }
    }

    /// Rescale finite values to [0, 1]; non-finite values become 0
    pub fn normalized(&self) -> Grid {
        let (min, max) = self.min_max();
        let range = max - min;
        let data = self.data.map(|&v| {
            if !v.is_finite() {
                0.0
            } else if range <= f64::EPSILON {
                0.0
            } else {
                (v - min) / range
            }
        });
        Grid { data }
    }
}

/// Decode a single-band grid from GeoTIFF bytes.
///
/// Multi-sample images are reduced to one band by averaging the samples
/// per pixel. Returns the geographic extent when the pixel-scale and
/// tiepoint tags are both present.
pub fn decode_geotiff(bytes: &[u8]) -> Result<(Grid, Option<Extent>), SegmentationError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| SegmentationError::TiffDecode(e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| SegmentationError::TiffDecode(e.to_string()))?;
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(SegmentationError::EmptyImage);
    }

    let result = decoder
        .read_image()
        .map_err(|e| SegmentationError::TiffDecode(e.to_string()))?;

    let raw: Vec<f64> = match result {
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F64(v) => v,
    };

    let pixel_count = width * height;
    if raw.len() < pixel_count || raw.len() % pixel_count != 0 {
        return Err(SegmentationError::TiffDecode(format!(
            "unexpected sample count {} for {}x{} image",
            raw.len(),
            width,
            height
        )));
    }

    let samples = raw.len() / pixel_count;
    let values: Vec<f64> = if samples == 1 {
        raw
    } else {
        raw.chunks(samples)
            .map(|px| px.iter().sum::<f64>() / samples as f64)
            .collect()
    };

    let extent = read_extent(&mut decoder, width, height);
    let grid = Grid::from_vec(height, width, values)?;
    Ok((grid, extent))
}

/// Extract the extent from GeoTIFF pixel-scale + tiepoint tags
fn read_extent<R>(decoder: &mut Decoder<R>, width: usize, height: usize) -> Option<Extent>
where
    R: std::io::Read + std::io::Seek,
{
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 5 {
        return None;
    }
    // tiepoint: (i, j, k, x, y, z) anchors pixel (i, j) at world (x, y)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(Extent {
        west: origin_x,
        north: origin_y,
        east: origin_x + width as f64 * scale[0],
        south: origin_y - height as f64 * scale[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidGrid(_)));
    }

    #[test]
    fn normalized_spans_unit_interval() {
        let grid = Grid::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap();
        let norm = grid.normalized();
        assert_eq!(norm.get(0, 0), 0.0);
        assert!((norm.get(1, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalized_flat_grid_is_zero() {
        let grid = Grid::from_rows(vec![vec![7.0; 3]; 3]).unwrap();
        let norm = grid.normalized();
        assert_eq!(norm.get(1, 1), 0.0);
    }

    #[test]
    fn extent_maps_corners() {
        let extent = Extent {
            west: -47.0,
            south: -24.0,
            east: -46.0,
            north: -23.0,
        };
        let nw = extent.pixel_to_lonlat(100, 100, 0.0, 0.0);
        assert_eq!(nw, [-47.0, -23.0]);
        let se = extent.pixel_to_lonlat(100, 100, 100.0, 100.0);
        assert_eq!(se, [-46.0, -24.0]);
    }
}
