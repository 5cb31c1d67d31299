//! Spiral k-space readout gradients for MRI.
//!
//! Given the imaging parameters (matrix size, field of view, number of
//! interleaves) and the gradient hardware limits (amplitude, rise time),
//! [`synthesize`] computes the gradient waveform of one spiral arm, sampled
//! every dwell time. Every sample respects the amplitude limit and every pair
//! of consecutive samples respects the slew-rate limit.
//!
//! The other arms are rotated copies, see [`Waveform::arm`].

mod buffer;
pub mod codec;
mod density;
mod design;
mod error;
pub mod params;
mod resample;
pub mod tool;
pub mod value;

use tracing::debug;

// =====================================
// Public API of spiral_waveform
// =====================================

pub use buffer::{GradientSample, MAX_WAVEFORM_SIZE, Waveform, WaveformBuffer};
pub use density::{DensityProfile, Transition};
pub use error::*;
pub use params::{GAMMA_1H, SpiralParams};
pub use value::{Value, ValueDict};

/// Fill `buffer` with the spiral gradient for `params` and return the number
/// of valid samples.
///
/// Sample `i` is the gradient at `i * dwell_time + gradient_delay` after the
/// start of the ramp, so a positive delay drops leading samples and a negative
/// one pads leading zeros. The waveform ends at the first sample on which the
/// arm reaches `base_resolution / (2 * field_of_view)`.
///
/// On error the buffer is left empty. Errors are
/// - [`SpiralError::InvalidParameter`] / [`SpiralError::InvalidDensity`] for
///   parameters that fail [`SpiralParams::validate`],
/// - [`SpiralError::Infeasible`] when the buffer fills up before the target
///   radius is reached,
/// - [`SpiralError::Degenerate`] when derived limits vanish or overflow,
/// - [`SpiralError::DelayExceedsReadout`] when the delay skips every sample.
///
/// # Examples
/// ```
/// use spiral_waveform::{SpiralParams, WaveformBuffer, synthesize};
///
/// let params = SpiralParams::new(128, 16, 0.24, 24e-3, 6e-4, 4e-6);
/// let mut buffer = WaveformBuffer::new();
/// let len = synthesize(&params, &mut buffer).unwrap();
///
/// assert_eq!(buffer.samples().len(), len);
/// for [gx, gy] in buffer.samples() {
///     assert!(gx.hypot(*gy) <= 24e-3 * (1.0 + 1e-6));
/// }
/// ```
pub fn synthesize(params: &SpiralParams, buffer: &mut WaveformBuffer) -> Result<usize, SpiralError> {
    buffer.clear();
    params.validate()?;

    let capacity = buffer.capacity();
    if params.gradient_delay.abs() > capacity as f64 * params.dwell_time {
        return Err(SpiralError::InvalidParameter {
            name: "gradient_delay",
            reason: "must not exceed the buffer duration",
        });
    }

    let design = design::design(params, capacity)?;
    let count = resample::sample_count(
        design.duration(),
        params.gradient_delay,
        params.dwell_time,
    );
    if count <= 0 {
        return Err(SpiralError::DelayExceedsReadout {
            delay: params.gradient_delay,
            readout: design.duration(),
        });
    }

    let len = count as usize;
    let Some(out) = buffer.storage_mut().get_mut(..len) else {
        return Err(SpiralError::Infeasible {
            capacity,
            reached: design.radius,
            target: params.target_radius(),
        });
    };
    resample::resample(
        &design.nodes,
        design.step,
        params.gradient_delay,
        params.dwell_time,
        out,
    );
    resample::verify(
        out,
        params.max_grad_ampl,
        params.max_slew_rate(),
        params.dwell_time,
    )?;

    buffer.set_len(len);
    debug!(samples = len, capacity, "spiral waveform synthesized");
    Ok(len)
}

/// Like [`synthesize`], with a [`MAX_WAVEFORM_SIZE`] buffer, returning the
/// trimmed waveform.
pub fn spiral_waveform(params: &SpiralParams) -> Result<Waveform, SpiralError> {
    let mut buffer = WaveformBuffer::new();
    synthesize(params, &mut buffer)?;
    Ok(Waveform::new(
        buffer.samples().to_vec(),
        params.dwell_time,
        params.spiral_arms,
        params.gamma(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SpiralParams {
        SpiralParams::new(64, 16, 0.24, 24e-3, 6e-4, 4e-6)
    }

    #[test]
    fn buffer_is_empty_after_failure() {
        let mut buffer = WaveformBuffer::with_capacity(64);
        assert!(matches!(
            synthesize(&params(), &mut buffer),
            Err(SpiralError::Infeasible { capacity: 64, .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn invalid_parameters_leave_previous_output_cleared() {
        let mut buffer = WaveformBuffer::new();
        synthesize(&params(), &mut buffer).unwrap();
        assert!(!buffer.is_empty());

        let bad = params().with_readout_os(0.0);
        assert!(synthesize(&bad, &mut buffer).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn delay_past_readout_is_reported() {
        let waveform = spiral_waveform(&params()).unwrap();
        let delay = waveform.duration() + 10.0 * waveform.dwell_time();
        assert!(matches!(
            spiral_waveform(&params().with_gradient_delay(delay)),
            Err(SpiralError::DelayExceedsReadout { .. })
        ));
    }

    #[test]
    fn delay_longer_than_buffer_is_invalid() {
        let p = params().with_gradient_delay(-1.0);
        assert!(matches!(
            spiral_waveform(&p),
            Err(SpiralError::InvalidParameter {
                name: "gradient_delay",
                ..
            })
        ));
    }

    #[test]
    fn waveform_keeps_acquisition_settings() {
        let waveform = spiral_waveform(&params()).unwrap();
        assert_eq!(waveform.dwell_time(), 4e-6);
        assert_eq!(waveform.spiral_arms(), 16);
        assert!(!waveform.is_empty());
    }
}
