//! Thresholded centre-of-mass for detector image stacks
//!
//! Locates the direct beam in each diffraction image as the intensity-weighted
//! mean pixel position over pixels at or above a threshold.

use ndarray::{Array2, ArrayView, ArrayView1, ArrayView2, Dimension};

use crate::config::CentroidConfig;
use crate::error::Result;
use crate::stack::as_stack;

/// Coordinate value written to both columns when an image has no centroid
pub const NO_CENTROID: f64 = -1.0;

/// Compute the thresholded centre of mass of every image in a stack.
///
/// For each image, pixels with `pixel >= threshold` contribute their value as
/// weight. The comparison is done on the raw `i16` samples. Negative samples
/// are only excluded through the threshold.
///
/// # Arguments
/// * `image_stack` - Dense `(images, rows, cols)` stack in row-major layout
/// * `threshold` - Minimum intensity for a pixel to contribute
///
/// # Returns
/// Array of shape `(images, 2)` holding `(row, col)` per image. Images where
/// the accumulated weight is zero get `(NO_CENTROID, NO_CENTROID)`.
///
/// # Errors
/// Returns an invalid-input error when the stack is not a non-empty,
/// C-contiguous 3D array. Nothing is computed in that case.
pub fn compute_centroids<D>(
    image_stack: ArrayView<i16, D>,
    threshold: i16,
) -> Result<Array2<f64>>
where
    D: Dimension,
{
    let stack = as_stack(image_stack)?;
    let (n_images, height, width) = stack.dim();
    log::debug!(
        "Computing centroids for {} images of {}x{} with threshold {}",
        n_images,
        width,
        height,
        threshold
    );

    let mut centers = Array2::<f64>::zeros((n_images, 2));
    let mut n_empty = 0usize;

    for (image, mut center) in stack.outer_iter().zip(centers.outer_iter_mut()) {
        let (row, col) = match image_centroid(&image, threshold) {
            Some(position) => position,
            None => {
                n_empty += 1;
                (NO_CENTROID, NO_CENTROID)
            }
        };
        center[0] = row;
        center[1] = col;
    }

    if n_empty > 0 {
        log::debug!(
            "{} of {} images had no pixel at or above threshold {}",
            n_empty,
            n_images,
            threshold
        );
    }

    Ok(centers)
}

/// Locate the direct beam in every image using the configured threshold.
pub fn find_beam_centers<D>(
    image_stack: ArrayView<i16, D>,
    config: &CentroidConfig,
) -> Result<Array2<f64>>
where
    D: Dimension,
{
    compute_centroids(image_stack, config.direct_beam_threshold)
}

/// False for rows holding the no-centroid sentinel
pub fn centroid_is_valid(center: ArrayView1<f64>) -> bool {
    !(center[0] == NO_CENTROID && center[1] == NO_CENTROID)
}

/// Weighted centroid of one image, `None` when the total weight is zero
fn image_centroid(image: &ArrayView2<i16>, threshold: i16) -> Option<(f64, f64)> {
    let mut sum_row = 0.0;
    let mut sum_col = 0.0;
    let mut total = 0.0;

    for ((row, col), &pixel) in image.indexed_iter() {
        if pixel < threshold {
            continue;
        }
        let weight = f64::from(pixel);
        sum_row += weight * row as f64;
        sum_col += weight * col as f64;
        total += weight;
    }

    if total == 0.0 {
        return None;
    }

    Some((sum_row / total, sum_col / total))
}
