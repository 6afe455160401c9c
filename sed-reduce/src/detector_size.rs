//! Detector dimensions and pixel-grid centre convention

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector frame dimensions in pixels.
///
/// Arrays built from a `DetectorSize` are always shaped `(height, width)`,
/// matching the row-major layout of the image stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectorSize {
    /// Frame width in pixels (number of columns)
    pub width: usize,
    /// Frame height in pixels (number of rows)
    pub height: usize,
}

impl DetectorSize {
    /// Create a new DetectorSize
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Create a DetectorSize from an ndarray `(rows, cols)` shape
    pub fn from_shape(shape: (usize, usize)) -> Self {
        Self {
            width: shape.1,
            height: shape.0,
        }
    }

    /// Shape as `(rows, cols)` for building arrays
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Beam centre pixel `(row, col)`.
    ///
    /// Uses integer division, so for even dimensions the centre is the pixel
    /// just past the geometric midpoint. This matches the detector's
    /// pixel-grid convention and is not configurable.
    pub fn center(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }

    /// Array of `T::default()` with this size
    pub fn empty_array<T>(&self) -> Array2<T>
    where
        T: Clone + Default,
    {
        Array2::default(self.shape())
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl From<(usize, usize)> for DetectorSize {
    /// Build from an ndarray `(rows, cols)` shape
    fn from(shape: (usize, usize)) -> Self {
        Self::from_shape(shape)
    }
}

impl fmt::Display for DetectorSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
