//! Static detector masks
//!
//! Marks dead or shadowed detector pixels by overwriting them with a masking
//! value in every image of a stack. With the default value of `-1` the masked
//! pixels drop out of the azimuthal averaging, which skips negative samples.

use ndarray::{Array2, Array3, Zip};

use crate::detector_size::DetectorSize;
use crate::error::{ReduceError, Result};

/// Per-pixel detector mask; `true` marks a masked pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorMask {
    mask: Array2<bool>,
}

impl DetectorMask {
    /// Mask with no masked pixels
    pub fn none(size: DetectorSize) -> Self {
        Self {
            mask: size.empty_array(),
        }
    }

    /// Wrap an existing `(rows, cols)` boolean array
    pub fn from_array(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// Mask a cross through the detector centre.
    ///
    /// Masks the `2 * half_width` rows and columns around `size.center()`, i.e.
    /// rows `[c_row - half_width, c_row + half_width)` and likewise for
    /// columns, clipped to the detector. This is the seam between the four
    /// sensor tiles of the quad detector; on a 512x512 frame with
    /// `half_width = 1` it covers rows and columns 255 and 256.
    pub fn cross(size: DetectorSize, half_width: usize) -> Self {
        let (center_row, center_col) = size.center();
        let rows = center_row.saturating_sub(half_width)..(center_row + half_width).min(size.height);
        let cols = center_col.saturating_sub(half_width)..(center_col + half_width).min(size.width);

        let mask = Array2::from_shape_fn(size.shape(), |(row, col)| {
            rows.contains(&row) || cols.contains(&col)
        });
        Self { mask }
    }

    /// Detector size covered by the mask
    pub fn size(&self) -> DetectorSize {
        DetectorSize::from_shape(self.mask.dim())
    }

    /// Number of masked pixels per image
    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    /// Whether pixel `(row, col)` is masked, or `None` outside the detector
    pub fn is_masked(&self, row: usize, col: usize) -> Option<bool> {
        self.mask.get((row, col)).copied()
    }

    /// Borrow the underlying boolean array
    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Overwrite masked pixels of every image with `masking_value`.
    ///
    /// # Returns
    /// Total number of samples written across the stack.
    ///
    /// # Errors
    /// [`ReduceError::ShapeMismatch`] when the images are not the size of the
    /// mask. The stack is left untouched in that case.
    pub fn apply(&self, image_stack: &mut Array3<i16>, masking_value: i16) -> Result<usize> {
        let (n_images, height, width) = image_stack.dim();
        let image_size = DetectorSize::from_width_height(width, height);
        if image_size != self.size() {
            return Err(ReduceError::ShapeMismatch(format!(
                "mask is {} but images are {}",
                self.size(),
                image_size
            )));
        }

        for mut image in image_stack.outer_iter_mut() {
            Zip::from(&mut image).and(&self.mask).for_each(|pixel, &masked| {
                if masked {
                    *pixel = masking_value;
                }
            });
        }

        let written = n_images * self.masked_count();
        log::debug!(
            "Masked {} pixels per image across {} images with value {}",
            self.masked_count(),
            n_images,
            masking_value
        );
        Ok(written)
    }
}
