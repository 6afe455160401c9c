//! Stack reductions for scanning electron diffraction (SED) data.
//!
//! Computes, for every detector image of a stack, the thresholded centre of
//! mass of the direct beam and the azimuthal ("crown") intensity profile
//! inside a q window. Inputs are caller-owned `i16` arrays in
//! `(images, rows, cols)` row-major layout; outputs are freshly allocated
//! `f64` arrays.
//!
//! ```
//! use ndarray::Array3;
//! use sed_reduce::config::IntegrationConfig;
//! use sed_reduce::image_proc::{compute_centroids, crown_integration};
//!
//! let mut stack = Array3::<i16>::zeros((1, 64, 64));
//! stack[[0, 32, 40]] = 500;
//!
//! let centers = compute_centroids(stack.view(), 100).unwrap();
//! assert_eq!(centers.row(0).to_vec(), vec![32.0, 40.0]);
//!
//! let config = IntegrationConfig {
//!     num_phi_bins: 36,
//!     q_range: (5.0, 10.0),
//!     q_calibration: 1.0,
//! };
//! let crown = crown_integration(stack.view(), &config).unwrap();
//! assert_eq!(crown.intensities.dim(), (1, 36));
//! ```

pub mod config;
pub mod detector_size;
pub mod error;
pub mod image_proc;
pub mod stack;

pub use config::ReductionConfig;
pub use detector_size::DetectorSize;
pub use error::{ReduceError, Result};
pub use stack::{detect_scan_shape, ScanSelection, ScanShape};
