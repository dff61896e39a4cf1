//! Pixel centroid to actuator-grid quantization

use crate::error::VisionError;
use agribot_core::{Centroid, GridCoordinate};

/// Maps pixel-space centroids onto a `grid_size × grid_size` partition of a
/// square `image_size` frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapper {
    image_size: u32,
    grid_size: u32,
    cell_size: f64,
}

impl GridMapper {
    pub fn new(image_size: u32, grid_size: u32) -> Result<Self, VisionError> {
        if grid_size == 0 {
            return Err(VisionError::PreconditionViolation(
                "grid_size must be positive".to_string(),
            ));
        }
        if image_size == 0 {
            return Err(VisionError::PreconditionViolation(
                "image_size must be positive".to_string(),
            ));
        }
        Ok(Self {
            image_size,
            grid_size,
            cell_size: image_size as f64 / grid_size as f64,
        })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Quantize one centroid. Floor semantics: a point exactly on a cell
    /// edge belongs to the higher cell. Out-of-range input is clamped.
    pub fn cell_of(&self, centroid: Centroid) -> GridCoordinate {
        GridCoordinate::new(self.axis_index(centroid.x), self.axis_index(centroid.y))
    }

    /// Quantize in input order, without deduplication.
    pub fn map(&self, centroids: &[Centroid]) -> Vec<GridCoordinate> {
        centroids.iter().map(|&c| self.cell_of(c)).collect()
    }

    fn axis_index(&self, value: f64) -> u32 {
        let last = (self.grid_size - 1) as f64;
        // NaN compares false everywhere; clamp sends it to 0
        let index = (value / self.cell_size).floor();
        if index.is_nan() || index <= 0.0 {
            0
        } else if index >= last {
            self.grid_size - 1
        } else {
            index as u32
        }
    }
}

/// One-shot form of [`GridMapper::map`].
pub fn map_to_grid(
    centroids: &[Centroid],
    image_size: u32,
    grid_size: u32,
) -> Result<Vec<GridCoordinate>, VisionError> {
    Ok(GridMapper::new(image_size, grid_size)?.map(centroids))
}
