//! Preferred orientation from azimuthal profiles
//!
//! Diffraction from aligned fibres is point symmetric, so a crown profile
//! repeats every 180 degrees and the preferred orientation is an angle in
//! `[0, π)` radians. Profiles may carry any number of leading axes (images,
//! or scan rows and columns); the last axis is always the azimuthal bins and
//! the result drops it.

use std::f64::consts::PI;

use ndarray::{Array, ArrayView, ArrayView1, Axis, RemoveAxis};
use rustfft::{num_complex::Complex64, FftPlanner};

use crate::error::{ReduceError, Result};

/// Orientation from the phase of the second Fourier harmonic of each profile.
///
/// For a profile `I_k`, `k = 0..n`, the harmonic is
/// `X_2 = Σ I_k exp(-2πi · 2k / n)` and the orientation is
/// `(-arg(X_2) / 2) mod π`. The angle is measured from the start of bin 0,
/// not from its centre. A profile without two-fold modulation has no
/// meaningful orientation.
///
/// # Errors
/// [`ReduceError::ShapeMismatch`] if the profiles have fewer than 3 bins.
pub fn harmonic_orientation<D>(profiles: ArrayView<f64, D>) -> Result<Array<f64, D::Smaller>>
where
    D: RemoveAxis,
{
    let bins_axis = bins_axis(&profiles)?;
    let num_bins = profiles.len_of(bins_axis);
    if num_bins < 3 {
        return Err(ReduceError::ShapeMismatch(format!(
            "harmonic analysis needs at least 3 azimuthal bins, got {}",
            num_bins
        )));
    }

    let fft = FftPlanner::<f64>::new().plan_fft_forward(num_bins);
    let mut buffer = vec![Complex64::new(0.0, 0.0); num_bins];

    Ok(profiles.map_axis(bins_axis, |profile| {
        for (slot, &value) in buffer.iter_mut().zip(profile.iter()) {
            *slot = Complex64::new(value, 0.0);
        }
        fft.process(&mut buffer);
        let angle = (-0.5 * buffer[2].arg()).rem_euclid(PI);
        // rem_euclid rounds up to exactly π for tiny negative inputs
        if angle < PI {
            angle
        } else {
            0.0
        }
    }))
}

/// Orientation of the brightest bin after folding each profile onto 180 degrees.
///
/// Bins `k` and `k + n/2` are averaged, then the angle `phi[k]` of the
/// largest folded value is returned in radians. Ties go to the first bin.
/// Only meaningful with fine binning.
///
/// # Arguments
/// * `profiles` - Crown profiles with the bins on the last axis
/// * `phi` - Bin centre angles in degrees, one per bin
///
/// # Errors
/// [`ReduceError::ShapeMismatch`] for an odd bin count or a `phi` whose
/// length differs from the number of bins.
pub fn peak_orientation<D>(
    profiles: ArrayView<f64, D>,
    phi: ArrayView1<f64>,
) -> Result<Array<f64, D::Smaller>>
where
    D: RemoveAxis,
{
    let bins_axis = bins_axis(&profiles)?;
    let num_bins = profiles.len_of(bins_axis);
    if num_bins == 0 || num_bins % 2 != 0 {
        return Err(ReduceError::ShapeMismatch(format!(
            "folding a profile needs an even, non-zero bin count, got {}",
            num_bins
        )));
    }
    if phi.len() != num_bins {
        return Err(ReduceError::ShapeMismatch(format!(
            "{} bin angles for {} azimuthal bins",
            phi.len(),
            num_bins
        )));
    }

    let half = num_bins / 2;
    Ok(profiles.map_axis(bins_axis, |profile| {
        let (front, back) = profile.split_at(Axis(0), half);
        let (peak, _) = front.iter().zip(back.iter()).enumerate().fold(
            (0, f64::NEG_INFINITY),
            |(best, best_value), (bin, (&a, &b))| {
                let folded = 0.5 * a + 0.5 * b;
                if folded > best_value {
                    (bin, folded)
                } else {
                    (best, best_value)
                }
            },
        );
        phi[peak].to_radians()
    }))
}

fn bins_axis<D: RemoveAxis>(profiles: &ArrayView<f64, D>) -> Result<Axis> {
    match profiles.ndim() {
        0 => Err(ReduceError::WrongRank {
            expected: 1,
            actual: 0,
        }),
        ndim => Ok(Axis(ndim - 1)),
    }
}
