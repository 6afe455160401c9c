//! Beam-centred trimming of detector images
//!
//! The beam wanders across the detector during a scan. Cropping a fixed
//! square window around each image's beam centre produces a stack in which
//! the beam sits at the window centre, which is the frame the crown
//! integration geometry assumes.

use ndarray::{s, Array3, ArrayView, ArrayView2, Dimension};

use crate::error::{ReduceError, Result};
use crate::stack::as_stack;

/// Crop a `(2r + 1) x (2r + 1)` window around every image's beam centre.
///
/// Centres are `(row, col)` pairs as produced by
/// [`compute_centroids`](crate::image_proc::centroid::compute_centroids) and
/// are truncated to whole pixels. The window for centre `(cr, cc)` covers
/// rows `cr - r ..= cr + r` and columns `cc - r ..= cc + r`, so the beam lands
/// on pixel `(r, r)`, which is also the centre used by the polar geometry.
///
/// # Errors
/// * An invalid-input error for a malformed stack
/// * [`ReduceError::ShapeMismatch`] unless `centers` has shape `(images, 2)`
/// * [`ReduceError::TrimOutOfBounds`] if any window, including one around the
///   no-centroid sentinel, leaves the detector. All windows are checked
///   before anything is copied.
pub fn center_images<D>(
    image_stack: ArrayView<i16, D>,
    centers: ArrayView2<f64>,
    trim_radius: usize,
) -> Result<Array3<i16>>
where
    D: Dimension,
{
    let stack = as_stack(image_stack)?;
    let (n_images, height, width) = stack.dim();

    if centers.dim() != (n_images, 2) {
        return Err(ReduceError::ShapeMismatch(format!(
            "expected beam centres of shape ({}, 2), got {:?}",
            n_images,
            centers.shape()
        )));
    }

    let windows = centers
        .outer_iter()
        .enumerate()
        .map(|(image, center)| {
            trim_window(center[0], center[1], trim_radius, height, width).ok_or(
                ReduceError::TrimOutOfBounds {
                    image,
                    row: center[0],
                    col: center[1],
                    radius: trim_radius,
                    height,
                    width,
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let edge = 2 * trim_radius + 1;
    let mut trimmed = Array3::<i16>::zeros((n_images, edge, edge));

    for ((image, (row0, col0)), mut out) in stack
        .outer_iter()
        .zip(windows)
        .zip(trimmed.outer_iter_mut())
    {
        out.assign(&image.slice(s![row0..row0 + edge, col0..col0 + edge]));
    }

    log::debug!(
        "Trimmed {} images of {}x{} to {}x{} around their beam centres",
        n_images,
        width,
        height,
        edge,
        edge
    );

    Ok(trimmed)
}

/// Top-left corner of the trim window, or `None` if it leaves the detector
fn trim_window(
    row: f64,
    col: f64,
    radius: usize,
    height: usize,
    width: usize,
) -> Option<(usize, usize)> {
    if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
        return None;
    }

    let (row, col) = (row.trunc() as usize, col.trunc() as usize);
    let row0 = row.checked_sub(radius)?;
    let col0 = col.checked_sub(radius)?;
    if row.checked_add(radius)? >= height || col.checked_add(radius)? >= width {
        return None;
    }

    Some((row0, col0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::centroid::{compute_centroids, NO_CENTROID};
    use ndarray::{arr2, Array2};

    #[test]
    fn test_trim_places_beam_at_window_center() {
        let mut stack = Array3::<i16>::zeros((2, 20, 20));
        stack[[0, 5, 7]] = 900;
        stack[[1, 12, 14]] = 900;

        let centers = compute_centroids(stack.view(), 100).unwrap();
        let trimmed = center_images(stack.view(), centers.view(), 3).unwrap();

        assert_eq!(trimmed.dim(), (2, 7, 7));
        assert_eq!(trimmed[[0, 3, 3]], 900);
        assert_eq!(trimmed[[1, 3, 3]], 900);
        assert_eq!(trimmed.iter().filter(|&&v| v != 0).count(), 2);
    }

    #[test]
    fn test_fractional_centers_are_truncated() {
        let stack = Array3::from_shape_fn((1, 10, 10), |(_, r, c)| (r * 10 + c) as i16);
        let centers = arr2(&[[4.9, 5.2]]);
        let trimmed = center_images(stack.view(), centers.view(), 1).unwrap();
        assert_eq!(trimmed[[0, 1, 1]], 45);
        assert_eq!(trimmed[[0, 0, 0]], 34);
        assert_eq!(trimmed[[0, 2, 2]], 56);
    }

    #[test]
    fn test_window_touching_edges_is_allowed() {
        let stack = Array3::<i16>::from_elem((1, 5, 5), 2);
        let centers = arr2(&[[2.0, 2.0]]);
        let trimmed = center_images(stack.view(), centers.view(), 2).unwrap();
        assert_eq!(trimmed.dim(), (1, 5, 5));
    }

    #[test]
    fn test_out_of_bounds_window_is_rejected() {
        let stack = Array3::<i16>::zeros((2, 10, 10));
        let centers = arr2(&[[5.0, 5.0], [8.0, 5.0]]);
        let err = center_images(stack.view(), centers.view(), 2).unwrap_err();
        assert!(matches!(err, ReduceError::TrimOutOfBounds { image: 1, .. }));

        let centers = arr2(&[[1.0, 5.0], [5.0, 5.0]]);
        let err = center_images(stack.view(), centers.view(), 2).unwrap_err();
        assert!(matches!(err, ReduceError::TrimOutOfBounds { image: 0, .. }));
    }

    #[test]
    fn test_sentinel_center_is_rejected() {
        let stack = Array3::<i16>::zeros((1, 10, 10));
        let centers = arr2(&[[NO_CENTROID, NO_CENTROID]]);
        let err = center_images(stack.view(), centers.view(), 0).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_far_away_centers_are_rejected() {
        let stack = Array3::<i16>::zeros((1, 10, 10));
        for center in [[1e30, 5.0], [5.0, 1e30], [f64::MAX, f64::MAX], [5.0, f64::INFINITY]] {
            let centers = arr2(&[center]);
            let err = center_images(stack.view(), centers.view(), 2).unwrap_err();
            assert!(matches!(err, ReduceError::TrimOutOfBounds { image: 0, .. }));
        }

        let centers = arr2(&[[5.0, 5.0]]);
        let err = center_images(stack.view(), centers.view(), usize::MAX).unwrap_err();
        assert!(matches!(err, ReduceError::TrimOutOfBounds { .. }));
    }

    #[test]
    fn test_center_count_must_match_images() {
        let stack = Array3::<i16>::zeros((3, 10, 10));
        let centers = Array2::<f64>::from_elem((2, 2), 5.0);
        assert!(matches!(
            center_images(stack.view(), centers.view(), 1),
            Err(ReduceError::ShapeMismatch(_))
        ));
    }
}
