//! Reduction parameters and their defaults.
//!
//! Groups the scalars the surrounding pipeline hands to the reductions:
//! beam-finding threshold, crown integration calibration, masking value and
//! trim radius. The defaults are the values used for the 512x512 detector of
//! the SED setup. Configurations persist as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReduceError, Result};

/// Direct-beam centroiding parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentroidConfig {
    /// Pixels below this intensity do not contribute to the beam centre
    pub direct_beam_threshold: i16,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self {
            direct_beam_threshold: 100,
        }
    }
}

/// Crown (azimuthal) integration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Number of azimuthal bins over 360 degrees
    pub num_phi_bins: usize,
    /// Inclusive q window `(q_min, q_max)` in nm⁻¹
    pub q_range: (f64, f64),
    /// nm⁻¹ per pixel
    pub q_calibration: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            num_phi_bins: 120,
            q_range: (1.2, 2.7),
            q_calibration: 2.55 / 70.0,
        }
    }
}

impl IntegrationConfig {
    /// Check the parameters the geometry precomputation relies on.
    ///
    /// # Errors
    /// [`ReduceError::InvalidConfig`] when there are no bins, the q window is
    /// inverted or not finite, or the calibration is not a positive number.
    pub fn validate(&self) -> Result<()> {
        if self.num_phi_bins == 0 {
            return Err(ReduceError::InvalidConfig(
                "num_phi_bins must be at least 1".to_string(),
            ));
        }

        let (q_min, q_max) = self.q_range;
        if !q_min.is_finite() || !q_max.is_finite() {
            return Err(ReduceError::InvalidConfig(format!(
                "q_range ({q_min}, {q_max}) must be finite"
            )));
        }
        if q_min > q_max {
            return Err(ReduceError::InvalidConfig(format!(
                "q_range ({q_min}, {q_max}) is inverted"
            )));
        }

        if !(self.q_calibration.is_finite() && self.q_calibration > 0.0) {
            return Err(ReduceError::InvalidConfig(format!(
                "q_calibration {} must be positive",
                self.q_calibration
            )));
        }

        Ok(())
    }
}

/// Detector masking parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Value written into masked pixels. Negative values are skipped by the
    /// azimuthal averaging.
    pub masking_value: i16,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self { masking_value: -1 }
    }
}

/// Beam-centred trimming parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Half-width of the square window kept around each beam centre
    pub trim_radius: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self { trim_radius: 100 }
    }
}

/// Full set of reduction parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub centroid: CentroidConfig,
    pub integration: IntegrationConfig,
    pub masking: MaskingConfig,
    pub trim: TrimConfig,
}

impl ReductionConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file. Missing sections and fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.integration.validate()?;
        log::debug!("Loaded reduction config from {}", path.display());
        Ok(config)
    }
}
