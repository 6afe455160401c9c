//! Polar pixel geometry for azimuthal (crown) integration
//!
//! Every detector pixel is assigned a radial coordinate `q`, an azimuthal
//! angle, a flag telling whether `q` falls inside the integration window and
//! the azimuthal bin it belongs to. The table depends only on the detector
//! size and calibration, so it is built once and shared by all images of a
//! stack.

use ndarray::{Array1, Array2, ArrayView2};

use crate::detector_size::DetectorSize;

/// Per-pixel polar coordinates and bin assignment for one detector size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTable {
    size: DetectorSize,
    num_bins: usize,
    radius: Array2<f64>,
    azimuth: Array2<f64>,
    valid_mask: Array2<bool>,
    bin_index: Array2<usize>,
}

impl GeometryTable {
    /// Detector size the table was built for
    pub fn size(&self) -> DetectorSize {
        self.size
    }

    /// Number of azimuthal bins
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Distance from the beam centre in q units
    pub fn radius(&self) -> ArrayView2<'_, f64> {
        self.radius.view()
    }

    /// Azimuthal angle in degrees, in `[0, 360)`
    pub fn azimuth(&self) -> ArrayView2<'_, f64> {
        self.azimuth.view()
    }

    /// True where `q_min <= radius <= q_max`
    pub fn valid_mask(&self) -> ArrayView2<'_, bool> {
        self.valid_mask.view()
    }

    /// Azimuthal bin in `[0, num_bins - 1]`; only meaningful where valid
    pub fn bin_index(&self) -> ArrayView2<'_, usize> {
        self.bin_index.view()
    }

    /// Number of pixels inside the q window
    pub fn valid_pixel_count(&self) -> usize {
        self.valid_mask.iter().filter(|&&valid| valid).count()
    }

    /// Number of valid pixels falling in each azimuthal bin
    pub fn pixels_per_bin(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_bins];
        for (&valid, &bin) in self.valid_mask.iter().zip(self.bin_index.iter()) {
            if valid {
                counts[bin] += 1;
            }
        }
        counts
    }
}

/// Build the polar geometry table for a detector.
///
/// The beam centre is `size.center()`, i.e. `(height / 2, width / 2)` with
/// integer division. For each pixel with offsets `dy = row - c_row` and
/// `dx = col - c_col`:
///
/// * `radius = sqrt(dy² + dx²) * q_calibration`
/// * `azimuth = atan2(dy, dx)` in degrees, shifted by +360 when negative
/// * `valid = q_min <= radius <= q_max` (closed interval)
/// * `bin = floor(azimuth / (360 / num_bins))`, clamped to `num_bins - 1`
///
/// # Arguments
/// * `size` - Detector dimensions
/// * `num_bins` - Number of equal azimuthal sectors over `[0, 360)`
/// * `q_range` - Inclusive `(q_min, q_max)` integration window
/// * `q_calibration` - q units per pixel
///
/// Requires `num_bins > 0`, `q_min <= q_max` and `q_calibration > 0`. These
/// are not validated beyond debug assertions; see
/// [`IntegrationConfig::validate`](crate::config::IntegrationConfig::validate).
pub fn compute_geometry(
    size: DetectorSize,
    num_bins: usize,
    q_range: (f64, f64),
    q_calibration: f64,
) -> GeometryTable {
    debug_assert!(num_bins > 0, "num_bins must be positive");
    debug_assert!(q_range.0 <= q_range.1, "q_min must not exceed q_max");
    debug_assert!(q_calibration > 0.0, "q_calibration must be positive");

    let (q_min, q_max) = q_range;
    let (center_row, center_col) = size.center();
    let bin_width = 360.0 / num_bins as f64;
    let last_bin = num_bins.saturating_sub(1);

    let mut radius = Array2::<f64>::zeros(size.shape());
    let mut azimuth = Array2::<f64>::zeros(size.shape());
    let mut valid_mask = Array2::from_elem(size.shape(), false);
    let mut bin_index = Array2::<usize>::zeros(size.shape());

    for row in 0..size.height {
        let dy = row as f64 - center_row as f64;
        for col in 0..size.width {
            let dx = col as f64 - center_col as f64;

            let q = (dy * dy + dx * dx).sqrt() * q_calibration;
            let mut phi = dy.atan2(dx).to_degrees();
            if phi < 0.0 {
                phi += 360.0;
            }

            radius[[row, col]] = q;
            azimuth[[row, col]] = phi;

            if q >= q_min && q <= q_max {
                valid_mask[[row, col]] = true;
                bin_index[[row, col]] = ((phi / bin_width).floor() as usize).min(last_bin);
            }
        }
    }

    let table = GeometryTable {
        size,
        num_bins,
        radius,
        azimuth,
        valid_mask,
        bin_index,
    };

    log::debug!(
        "Geometry for {} detector: {} of {} pixels in q range [{}, {}] across {} bins",
        size,
        table.valid_pixel_count(),
        size.pixel_count(),
        q_min,
        q_max,
        num_bins
    );

    table
}

/// Centre angle in degrees of each azimuthal bin.
///
/// Bin `i` spans `[i, i + 1) * 360 / num_bins`, so its centre is
/// `(i + 0.5) * 360 / num_bins`.
pub fn phi_bin_centers(num_bins: usize) -> Array1<f64> {
    let bin_width = 360.0 / num_bins as f64;
    Array1::from_shape_fn(num_bins, |i| (i as f64 + 0.5) * bin_width)
}
