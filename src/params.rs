use serde::{Deserialize, Serialize};

use crate::{DensityProfile, SpiralError};

/// Gyromagnetic ratio of ¹H in Hz/G
pub const GAMMA_1H: f64 = 4257.7478518;

const GAUSS_PER_TESLA: f64 = 1e4;

pub const DEFAULT_READOUT_OS: f64 = 2.0;
pub const DEFAULT_GRADIENT_DELAY: f64 = 0.0;

/// Upper bound on `readout_os`, keeps the design grid proportional to the
/// output buffer.
pub const MAX_READOUT_OS: f64 = 64.0;

/// Imaging and hardware parameters of one spiral readout.
///
/// Lengths, times and gradients are SI: metres, seconds and T/m. The
/// gyromagnetic ratio `larmor_const` is given in Hz/G, as scanner software
/// usually quotes it. k-space positions are measured in cycles per metre, so
/// `dk/dt = gamma() * g`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralParams {
    /// Image matrix size along one dimension
    pub base_resolution: u32,
    /// Number of interleaves that jointly cover k-space
    pub spiral_arms: u32,
    pub field_of_view: f64,
    pub max_grad_ampl: f64,
    /// Time to ramp from zero to `max_grad_ampl`
    pub min_rise_time: f64,
    pub dwell_time: f64,
    /// Design grid is `dwell_time / readout_os`
    pub readout_os: f64,
    /// Positive values sample the waveform later, dropping leading samples
    pub gradient_delay: f64,
    pub larmor_const: f64,
    #[serde(default)]
    pub density: DensityProfile,
}

impl SpiralParams {
    /// Parameters with the default oversampling, no delay, the ¹H gyromagnetic
    /// ratio and uniform density.
    pub fn new(
        base_resolution: u32,
        spiral_arms: u32,
        field_of_view: f64,
        max_grad_ampl: f64,
        min_rise_time: f64,
        dwell_time: f64,
    ) -> Self {
        Self {
            base_resolution,
            spiral_arms,
            field_of_view,
            max_grad_ampl,
            min_rise_time,
            dwell_time,
            readout_os: DEFAULT_READOUT_OS,
            gradient_delay: DEFAULT_GRADIENT_DELAY,
            larmor_const: GAMMA_1H,
            density: DensityProfile::Uniform,
        }
    }

    pub fn with_readout_os(self, readout_os: f64) -> Self {
        Self { readout_os, ..self }
    }

    pub fn with_gradient_delay(self, gradient_delay: f64) -> Self {
        Self {
            gradient_delay,
            ..self
        }
    }

    pub fn with_larmor_const(self, larmor_const: f64) -> Self {
        Self {
            larmor_const,
            ..self
        }
    }

    pub fn with_density(self, density: DensityProfile) -> Self {
        Self { density, ..self }
    }

    /// Check every field. [`synthesize`](crate::synthesize) calls this before
    /// doing any work.
    pub fn validate(&self) -> Result<(), SpiralError> {
        fn invalid(name: &'static str, reason: &'static str) -> SpiralError {
            SpiralError::InvalidParameter { name, reason }
        }
        fn positive(name: &'static str, value: f64) -> Result<(), SpiralError> {
            if !value.is_finite() {
                Err(invalid(name, "must be finite"))
            } else if value <= 0.0 {
                Err(invalid(name, "must be positive"))
            } else {
                Ok(())
            }
        }

        if self.base_resolution == 0 {
            return Err(invalid("base_resolution", "must be positive"));
        }
        if self.spiral_arms == 0 {
            return Err(invalid("spiral_arms", "must be positive"));
        }
        positive("field_of_view", self.field_of_view)?;
        positive("max_grad_ampl", self.max_grad_ampl)?;
        positive("min_rise_time", self.min_rise_time)?;
        positive("dwell_time", self.dwell_time)?;
        positive("readout_os", self.readout_os)?;
        positive("larmor_const", self.larmor_const)?;
        if self.readout_os < 1.0 {
            return Err(invalid("readout_os", "must be at least 1"));
        }
        if self.readout_os > MAX_READOUT_OS {
            return Err(invalid("readout_os", "must not exceed 64"));
        }
        if !self.gradient_delay.is_finite() {
            return Err(invalid("gradient_delay", "must be finite"));
        }
        self.density.validate()
    }

    /// `larmor_const` in Hz/T
    pub fn gamma(&self) -> f64 {
        self.larmor_const * GAUSS_PER_TESLA
    }

    /// Slew-rate ceiling in T/m/s
    pub fn max_slew_rate(&self) -> f64 {
        self.max_grad_ampl / self.min_rise_time
    }

    /// k-space radius in cycles/m needed for `base_resolution` pixels
    pub fn target_radius(&self) -> f64 {
        self.base_resolution as f64 / (2.0 * self.field_of_view)
    }

    /// Step of the internal design grid in seconds
    pub fn design_step(&self) -> f64 {
        self.dwell_time / self.readout_os
    }
}
