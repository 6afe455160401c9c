//! Per-image reductions over SED detector stacks.
//!
//! # Module Organization
//!
//! ## Reductions
//! - **centroid**: thresholded centre of mass, used to locate the direct beam
//! - **geometry**: per-pixel q, azimuth and bin assignment, built once per stack
//! - **azimuthal**: mean intensity per azimuthal bin inside a q window
//! - **orientation**: preferred orientation from a crown profile
//!
//! ## Preparation
//! - **masking**: overwrite dead or shadowed detector pixels
//! - **trim**: crop beam-centred windows so the beam sits on the geometry centre
//!
//! The geometry and the averaging are deliberately separate calls so a
//! geometry table can be built once and reused for every image of a stack.

pub mod azimuthal;
pub mod centroid;
pub mod geometry;
pub mod masking;
pub mod orientation;
pub mod trim;

pub use azimuthal::{
    compute_azimuthal_profile, crown_integration, crown_integration_scan, CrownProfile,
    ScanCrownProfile,
};
pub use centroid::{centroid_is_valid, compute_centroids, find_beam_centers, NO_CENTROID};
pub use geometry::{compute_geometry, phi_bin_centers, GeometryTable};
pub use masking::DetectorMask;
pub use orientation::{harmonic_orientation, peak_orientation};
pub use trim::center_images;
