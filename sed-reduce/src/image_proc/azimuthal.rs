//! Azimuthal averaging ("crown integration") of detector image stacks
//!
//! Reduces each diffraction image to the mean intensity per azimuthal sector
//! inside a q window. The per-pixel polar geometry comes from
//! [`compute_geometry`] and is shared by every image of the stack.
//!
//! Negative samples are treated as masked or dead pixels and never
//! contribute. Bins that receive no pixel stay at `0.0`.

use ndarray::{
    Array1, Array2, Array3, ArrayView, ArrayView2, ArrayView4, ArrayViewMut1, Dimension,
};

use crate::config::IntegrationConfig;
use crate::detector_size::DetectorSize;
use crate::error::{ReduceError, Result};
use crate::image_proc::geometry::{compute_geometry, phi_bin_centers, GeometryTable};
use crate::stack::{as_stack, ScanShape};

/// Azimuthal profiles of a stack together with the bin centre angles
#[derive(Debug, Clone, PartialEq)]
pub struct CrownProfile {
    /// Mean intensity, shape `(images, num_bins)`
    pub intensities: Array2<f64>,
    /// Centre angle in degrees of each bin, length `num_bins`
    pub phi: Array1<f64>,
}

/// Azimuthal profiles of a scan together with the bin centre angles
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCrownProfile {
    /// Mean intensity, shape `(scan_y, scan_x, num_bins)`
    pub intensities: Array3<f64>,
    /// Centre angle in degrees of each bin, length `num_bins`
    pub phi: Array1<f64>,
}

/// Compute the mean intensity per azimuthal bin for every image.
///
/// A pixel contributes to `bin_index[row, col]` when it lies in the q window
/// (`valid_mask`) and its sample is non-negative. Bins without contributing
/// pixels are `0.0`.
///
/// # Arguments
/// * `image_stack` - Dense `(images, rows, cols)` stack in row-major layout
/// * `geometry` - Polar geometry built for the stack's `(rows, cols)`
/// * `num_bins` - Number of azimuthal bins; must match the geometry
///
/// # Errors
/// Invalid-input errors for a malformed stack, a geometry built for another
/// detector size or a bin count that disagrees with the geometry. All checks
/// happen before any accumulation.
pub fn compute_azimuthal_profile<D>(
    image_stack: ArrayView<i16, D>,
    geometry: &GeometryTable,
    num_bins: usize,
) -> Result<Array2<f64>>
where
    D: Dimension,
{
    let stack = as_stack(image_stack)?;
    let (n_images, height, width) = stack.dim();

    let image_size = DetectorSize::from_width_height(width, height);
    if geometry.size() != image_size {
        return Err(ReduceError::GeometryMismatch {
            geometry: geometry.size().to_string(),
            images: image_size.to_string(),
        });
    }

    if geometry.num_bins() != num_bins {
        return Err(ReduceError::BinCountMismatch {
            geometry: geometry.num_bins(),
            requested: num_bins,
        });
    }

    log::debug!(
        "Azimuthal averaging of {} images of {} into {} bins",
        n_images,
        image_size,
        num_bins
    );

    let mut profiles = Array2::<f64>::zeros((n_images, num_bins));
    let mut sums = vec![0.0f64; num_bins];
    let mut counts = vec![0u32; num_bins];

    for (image, profile) in stack.outer_iter().zip(profiles.outer_iter_mut()) {
        sums.fill(0.0);
        counts.fill(0);
        accumulate_bins(&image, geometry, &mut sums, &mut counts);
        write_bin_means(&sums, &counts, profile);
    }

    Ok(profiles)
}

/// Sum and count the valid, non-negative pixels of one image per bin
fn accumulate_bins(
    image: &ArrayView2<i16>,
    geometry: &GeometryTable,
    sums: &mut [f64],
    counts: &mut [u32],
) {
    let pixels = image
        .iter()
        .zip(geometry.valid_mask())
        .zip(geometry.bin_index());

    for ((&pixel, &valid), &bin) in pixels {
        if !valid || pixel < 0 {
            continue;
        }
        sums[bin] += f64::from(pixel);
        counts[bin] += 1;
    }
}

fn write_bin_means(sums: &[f64], counts: &[u32], mut profile: ArrayViewMut1<f64>) {
    for ((value, &sum), &count) in profile.iter_mut().zip(sums).zip(counts) {
        *value = if count > 0 { sum / f64::from(count) } else { 0.0 };
    }
}

/// Crown-integrate a stack of beam-centred images.
///
/// Builds the geometry for the stack's detector size from `config`, then
/// averages every image. The geometry is rebuilt on each call; use
/// [`compute_geometry`] and [`compute_azimuthal_profile`] directly to reuse it.
///
/// # Errors
/// [`ReduceError::InvalidConfig`] for unusable integration parameters, or an
/// invalid-input error for a malformed stack.
pub fn crown_integration<D>(
    image_stack: ArrayView<i16, D>,
    config: &IntegrationConfig,
) -> Result<CrownProfile>
where
    D: Dimension,
{
    config.validate()?;
    let stack = as_stack(image_stack)?;
    let (_, height, width) = stack.dim();

    let geometry = compute_geometry(
        DetectorSize::from_width_height(width, height),
        config.num_phi_bins,
        config.q_range,
        config.q_calibration,
    );

    if geometry.valid_pixel_count() == 0 {
        log::warn!(
            "No pixel of the {}x{} detector lies in q range [{}, {}]; all profiles will be zero",
            width,
            height,
            config.q_range.0,
            config.q_range.1
        );
    }

    let intensities = compute_azimuthal_profile(stack, &geometry, config.num_phi_bins)?;

    Ok(CrownProfile {
        intensities,
        phi: phi_bin_centers(config.num_phi_bins),
    })
}

/// Crown-integrate scan-shaped data `(scan_y, scan_x, rows, cols)`.
///
/// The scan axes are flattened into an image stack, integrated, and the
/// profiles reshaped to `(scan_y, scan_x, num_bins)`.
pub fn crown_integration_scan(
    data: ArrayView4<i16>,
    config: &IntegrationConfig,
) -> Result<ScanCrownProfile> {
    let scan = ScanShape::of(&data);
    let stack = scan.flatten(data)?;
    let CrownProfile { intensities, phi } = crown_integration(stack, config)?;

    Ok(ScanCrownProfile {
        intensities: scan.unflatten(intensities)?,
        phi,
    })
}
