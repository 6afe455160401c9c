//! Layout validation for caller-owned image stacks.
//!
//! The reductions index pixels assuming a dense `(images, rows, cols)`
//! buffer in row-major order. Anything else is rejected here, before any
//! work is done, rather than silently walked with the wrong strides.
//!
//! Scan-shaped data `(scan_y, scan_x, rows, cols)` is flattened to a plain
//! stack with [`ScanShape::flatten`] and per-image results are folded back
//! onto the scan grid with [`ScanShape::unflatten`].
//!
//! Raw acquisitions are a flat run of frames that include flyback frames
//! between scan lines. [`detect_scan_shape`] picks the frames forming a
//! regular grid from the beam-centre trace.

use ndarray::{
    s, Array1, Array2, Array3, Array4, ArrayView, ArrayView1, ArrayView2, ArrayView3, ArrayView4,
    Axis, Dimension, Ix3, Zip,
};

use crate::error::{ReduceError, Result};

/// Validate an arbitrary-rank view as a dense 3D image stack.
///
/// # Errors
/// * [`ReduceError::WrongRank`] unless the view has exactly 3 axes
/// * [`ReduceError::NonContiguous`] unless the view is in standard (C) layout
/// * [`ReduceError::EmptyDimension`] if any axis has length 0
pub fn as_stack<'a, A, D>(view: ArrayView<'a, A, D>) -> Result<ArrayView3<'a, A>>
where
    D: Dimension,
{
    if view.ndim() != 3 {
        return Err(ReduceError::WrongRank {
            expected: 3,
            actual: view.ndim(),
        });
    }

    if view.shape().contains(&0) {
        return Err(ReduceError::EmptyDimension(view.shape().to_vec()));
    }

    if !view.is_standard_layout() {
        return Err(ReduceError::NonContiguous);
    }

    view.into_dimensionality::<Ix3>()
        .map_err(|e| ReduceError::ShapeMismatch(e.to_string()))
}

/// Dimensions of the real-space scan grid that produced a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanShape {
    /// Scan positions along y
    pub rows: usize,
    /// Scan positions along x
    pub cols: usize,
}

impl ScanShape {
    /// Scan grid of `rows` lines with `cols` positions each
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Scan shape of a 4D `(scan_y, scan_x, rows, cols)` array
    pub fn of<A>(data: &ArrayView4<A>) -> Self {
        let (rows, cols, _, _) = data.dim();
        Self { rows, cols }
    }

    /// Number of detector images in the scan
    pub fn image_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Collapse the scan axes of a 4D array into a single image axis.
    ///
    /// No data is copied; the input must already be C-contiguous.
    pub fn flatten<'a, A>(&self, data: ArrayView4<'a, A>) -> Result<ArrayView3<'a, A>> {
        let (rows, cols, height, width) = data.dim();
        if (rows, cols) != (self.rows, self.cols) {
            return Err(ReduceError::ShapeMismatch(format!(
                "scan is {}x{} but data has {}x{} scan positions",
                self.rows, self.cols, rows, cols
            )));
        }

        if !data.is_standard_layout() {
            return Err(ReduceError::NonContiguous);
        }

        data.into_shape_with_order((self.image_count(), height, width))
            .map_err(|e| ReduceError::ShapeMismatch(e.to_string()))
    }

    /// Reshape a per-image result `(images, k)` into `(scan_y, scan_x, k)`.
    pub fn unflatten<A: Clone>(&self, per_image: Array2<A>) -> Result<Array3<A>> {
        let (images, k) = per_image.dim();
        if images != self.image_count() {
            return Err(ReduceError::ShapeMismatch(format!(
                "expected {} per-image rows for a {}x{} scan, got {}",
                self.image_count(),
                self.rows,
                self.cols,
                images
            )));
        }

        per_image
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((self.rows, self.cols, k))
            .map_err(|e| ReduceError::ShapeMismatch(e.to_string()))
    }
}

/// Beam-centre column gradient above which a frame is treated as flyback
pub const FLYBACK_GRADIENT: f64 = 2.0;

/// Frames of a flat acquisition that form a regular scan grid
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSelection {
    valid_frames: Array1<bool>,
    shape: ScanShape,
}

impl ScanSelection {
    /// Per-frame flag, `true` for frames kept in the grid
    pub fn valid_frames(&self) -> ArrayView1<'_, bool> {
        self.valid_frames.view()
    }

    /// Grid formed by the kept frames
    pub fn shape(&self) -> ScanShape {
        self.shape
    }

    /// Indices of the kept frames in acquisition order
    pub fn frame_indices(&self) -> Vec<usize> {
        self.valid_frames
            .iter()
            .enumerate()
            .filter_map(|(index, &valid)| valid.then_some(index))
            .collect()
    }

    /// Gather the kept frames of a stack into `(scan_y, scan_x, rows, cols)`.
    ///
    /// # Errors
    /// An invalid-input error for a malformed stack, or
    /// [`ReduceError::ShapeMismatch`] if the stack does not hold one image
    /// per frame of the selection.
    pub fn select<A, D>(&self, image_stack: ArrayView<A, D>) -> Result<Array4<A>>
    where
        A: Clone,
        D: Dimension,
    {
        let stack = as_stack(image_stack)?;
        let (n_images, height, width) = stack.dim();
        if n_images != self.valid_frames.len() {
            return Err(ReduceError::ShapeMismatch(format!(
                "selection covers {} frames but the stack has {} images",
                self.valid_frames.len(),
                n_images
            )));
        }

        stack
            .select(Axis(0), &self.frame_indices())
            .into_shape_with_order((self.shape.rows, self.shape.cols, height, width))
            .map_err(|e| ReduceError::ShapeMismatch(e.to_string()))
    }
}

/// Find the frames of a raster scan from the beam-centre trace.
///
/// Frames outside `scan_limits` (first index, one past the last) are
/// dropped, as are frames where the gradient of the beam-centre column
/// exceeds [`FLYBACK_GRADIENT`]. Each remaining run of consecutive frames is
/// one scan line; all lines are cut to the length of the shortest.
///
/// # Arguments
/// * `beam_centers` - `(images, 2)` beam centres as `(row, col)`
/// * `scan_limits` - Half-open frame range holding the scan
///
/// # Errors
/// * [`ReduceError::ShapeMismatch`] unless `beam_centers` is `(images, 2)`
///   with at least two images
/// * [`ReduceError::InvalidScan`] if no frame survives
pub fn detect_scan_shape(
    beam_centers: ArrayView2<f64>,
    scan_limits: (usize, usize),
) -> Result<ScanSelection> {
    let (n_frames, coords) = beam_centers.dim();
    if coords != 2 || n_frames < 2 {
        return Err(ReduceError::ShapeMismatch(format!(
            "beam centres must have shape (images >= 2, 2), got {:?}",
            beam_centers.shape()
        )));
    }

    let first = scan_limits.0.min(n_frames);
    let last = scan_limits.1.min(n_frames);
    if first >= last {
        return Err(ReduceError::InvalidScan(format!(
            "scan limits {:?} select no frame of {}",
            scan_limits, n_frames
        )));
    }

    let mut valid_frames = Array1::from_shape_fn(n_frames, |i| (first..last).contains(&i));
    let slope = gradient(beam_centers.column(1));
    Zip::from(&mut valid_frames)
        .and(&slope)
        .for_each(|valid, &g| *valid &= g <= FLYBACK_GRADIENT);

    let lines = valid_runs(valid_frames.view());
    let line_length = lines
        .iter()
        .map(|&(start, end)| end - start)
        .min()
        .ok_or_else(|| {
            ReduceError::InvalidScan(format!(
                "every frame in {}..{} exceeds the flyback gradient",
                first, last
            ))
        })?;

    for &(start, end) in &lines {
        valid_frames.slice_mut(s![start + line_length..end]).fill(false);
    }

    let shape = ScanShape::new(lines.len(), line_length);
    log::debug!(
        "Scan of {} frames holds {} lines of {} frames",
        n_frames,
        shape.rows,
        shape.cols
    );

    Ok(ScanSelection {
        valid_frames,
        shape,
    })
}

/// Central differences inside, one-sided differences at the ends
fn gradient(values: ArrayView1<f64>) -> Array1<f64> {
    let n = values.len();
    Array1::from_shape_fn(n, |i| match i {
        0 => values[1] - values[0],
        i if i == n - 1 => values[n - 1] - values[n - 2],
        i => 0.5 * (values[i + 1] - values[i - 1]),
    })
}

/// Half-open `(start, end)` ranges of consecutive `true` entries
fn valid_runs(flags: ArrayView1<bool>) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &flag) in flags.iter().enumerate() {
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(begin)) => {
                runs.push((begin, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        runs.push((begin, flags.len()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Beam column trace of a raster: `lines` sweeps of `per_line` frames,
    /// the column stepping down by 5 and jumping back at every flyback
    fn raster_trace(lines: usize, per_line: usize) -> Array2<f64> {
        Array2::from_shape_fn((lines * per_line, 2), |(frame, coord)| match coord {
            0 => 100.0,
            _ => 40.0 - 5.0 * (frame % per_line) as f64,
        })
    }

    #[test]
    fn test_accepts_dense_stack() {
        let data = Array3::<i16>::zeros((2, 3, 4));
        let stack = as_stack(data.view()).unwrap();
        assert_eq!(stack.dim(), (2, 3, 4));
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let image = Array2::<i16>::zeros((4, 4));
        let err = as_stack(image.view()).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::WrongRank {
                expected: 3,
                actual: 2
            }
        ));

        let dynamic = Array::<i16, _>::zeros(IxDyn(&[1, 2, 3, 4]));
        assert!(matches!(
            as_stack(dynamic.view()),
            Err(ReduceError::WrongRank { actual: 4, .. })
        ));
    }

    #[test]
    fn test_accepts_dynamic_rank_three() {
        let dynamic = Array::<i16, _>::zeros(IxDyn(&[2, 2, 2]));
        assert_eq!(as_stack(dynamic.view()).unwrap().dim(), (2, 2, 2));
    }

    #[test]
    fn test_rejects_non_contiguous() {
        let data = Array3::<i16>::zeros((2, 3, 4));
        let transposed = data.view().reversed_axes();
        assert!(matches!(
            as_stack(transposed),
            Err(ReduceError::NonContiguous)
        ));

        let strided = data.slice(ndarray::s![.., .., ..;2]);
        assert!(matches!(as_stack(strided), Err(ReduceError::NonContiguous)));
    }

    #[test]
    fn test_rejects_empty_dimension() {
        let data = Array3::<i16>::zeros((0, 3, 4));
        assert!(matches!(
            as_stack(data.view()),
            Err(ReduceError::EmptyDimension(_))
        ));
    }

    #[test]
    fn test_flatten_scan_keeps_image_order() {
        let data = Array4::from_shape_fn((2, 3, 2, 2), |(y, x, _, _)| (y * 3 + x) as i16);
        let scan = ScanShape::of(&data.view());
        assert_eq!(scan.image_count(), 6);

        let stack = scan.flatten(data.view()).unwrap();
        assert_eq!(stack.dim(), (6, 2, 2));
        for i in 0..6 {
            assert_eq!(stack[[i, 1, 1]], i as i16);
        }
    }

    #[test]
    fn test_flatten_rejects_wrong_scan() {
        let data = Array4::<i16>::zeros((2, 3, 2, 2));
        let scan = ScanShape::new(3, 2);
        assert!(matches!(
            scan.flatten(data.view()),
            Err(ReduceError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_unflatten_per_image_results() {
        let scan = ScanShape::new(2, 2);
        let per_image = Array2::from_shape_fn((4, 3), |(i, k)| (i * 10 + k) as f64);
        let grid = scan.unflatten(per_image).unwrap();
        assert_eq!(grid.dim(), (2, 2, 3));
        assert_eq!(grid[[1, 0, 2]], 22.0);

        let wrong = Array2::<f64>::zeros((5, 3));
        assert!(scan.unflatten(wrong).is_err());
    }

    #[test]
    fn test_unflatten_copies_non_standard_layout() {
        let scan = ScanShape::new(2, 1);
        let per_image = Array2::from_shape_fn((3, 2), |(k, i)| (i * 10 + k) as u8).reversed_axes();
        let grid = scan.unflatten(per_image).unwrap();
        assert_eq!(grid.dim(), (2, 1, 3));
        assert_eq!(grid[[1, 0, 2]], 12);
    }

    #[test]
    fn test_gradient_matches_central_differences() {
        let values = Array1::from(vec![1.0, 2.0, 4.0, 7.0]);
        assert_eq!(gradient(values.view()).to_vec(), vec![1.0, 1.5, 2.5, 3.0]);
    }

    #[test]
    fn test_valid_runs() {
        let flags = Array1::from(vec![true, true, false, true, false, false, true]);
        assert_eq!(valid_runs(flags.view()), vec![(0, 2), (3, 4), (6, 7)]);
        assert!(valid_runs(Array1::from(vec![false, false]).view()).is_empty());
    }

    #[test]
    fn test_detect_scan_drops_flyback_frames() {
        let trace = raster_trace(3, 5);
        let selection = detect_scan_shape(trace.view(), (0, 15)).unwrap();

        // The last frame of each line and the first of the next straddle a
        // flyback jump; the middle line is left with 3 frames.
        assert_eq!(selection.shape(), ScanShape::new(3, 3));
        assert_eq!(selection.frame_indices(), vec![0, 1, 2, 6, 7, 8, 11, 12, 13]);
        assert_eq!(selection.valid_frames().len(), 15);
    }

    #[test]
    fn test_detect_scan_respects_limits() {
        let trace = raster_trace(3, 5);
        let selection = detect_scan_shape(trace.view(), (2, 15)).unwrap();
        assert_eq!(selection.shape(), ScanShape::new(3, 2));
        assert_eq!(selection.frame_indices(), vec![2, 3, 6, 7, 11, 12]);

        // Limits past the end are clipped to the trace
        let clipped = detect_scan_shape(trace.view(), (0, 1000)).unwrap();
        assert_eq!(clipped.shape(), ScanShape::new(3, 3));
    }

    #[test]
    fn test_detect_scan_rejects_bad_input() {
        let trace = raster_trace(2, 4);
        assert!(matches!(
            detect_scan_shape(trace.view(), (5, 5)),
            Err(ReduceError::InvalidScan(_))
        ));

        let wrong = Array2::<f64>::zeros((6, 3));
        assert!(matches!(
            detect_scan_shape(wrong.view(), (0, 6)),
            Err(ReduceError::ShapeMismatch(_))
        ));

        let single = Array2::<f64>::zeros((1, 2));
        assert!(detect_scan_shape(single.view(), (0, 1)).is_err());

        // A trace that only ever jumps forward has no usable frame
        let jumping = Array2::from_shape_fn((6, 2), |(frame, _)| 10.0 * frame as f64);
        let err = detect_scan_shape(jumping.view(), (0, 6)).unwrap_err();
        assert!(matches!(err, ReduceError::InvalidScan(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_selection_gathers_frames_onto_grid() {
        let trace = raster_trace(3, 5);
        let selection = detect_scan_shape(trace.view(), (0, 15)).unwrap();
        let stack = Array3::from_shape_fn((15, 2, 2), |(i, _, _)| i as i16);

        let grid = selection.select(stack.view()).unwrap();
        assert_eq!(grid.dim(), (3, 3, 2, 2));
        assert_eq!(grid[[0, 0, 0, 0]], 0);
        assert_eq!(grid[[1, 0, 1, 1]], 6);
        assert_eq!(grid[[2, 2, 0, 1]], 13);

        let short = Array3::<i16>::zeros((14, 2, 2));
        assert!(matches!(
            selection.select(short.view()),
            Err(ReduceError::ShapeMismatch(_))
        ));
    }
}
