//! Transfer of the design-grid waveform onto the dwell-time grid.
//!
//! The design nodes are read as a piecewise-linear gradient with `g(t) = 0`
//! before the ramp starts. Linear interpolation never leaves the convex hull
//! of neighbouring nodes and never steepens the waveform, so the hardware
//! limits carry over from the design grid to the output.

use num_complex::Complex64;

use crate::{Constraint, GradientSample, SpiralError};

/// Absorbs rounding when the readout ends exactly on a dwell-time boundary
const GRID_EPSILON: f64 = 1e-9;
/// Relative slack allowed when verifying the final waveform
const BOUND_TOLERANCE: f64 = 1e-6;

/// Number of output samples `t_i = i * dwell + delay` with `t_i <= end`.
///
/// Zero or negative when the delay skips past the end of the readout.
pub(crate) fn sample_count(end: f64, delay: f64, dwell: f64) -> i64 {
    ((end - delay) / dwell + GRID_EPSILON).floor() as i64 + 1
}

/// Gradient at time `t` of the piecewise-linear waveform through `nodes`.
fn interpolate(nodes: &[Complex64], step: f64, t: f64) -> Complex64 {
    let pos = t / step;
    if pos <= 0.0 {
        return Complex64::new(0.0, 0.0);
    }
    let last = nodes.len() - 1;
    let index = pos.floor() as usize;
    if index >= last {
        return nodes[last];
    }
    let frac = pos - index as f64;
    nodes[index] * (1.0 - frac) + nodes[index + 1] * frac
}

/// Fill `out` with the waveform sampled at `i * dwell + delay`.
pub(crate) fn resample(
    nodes: &[Complex64],
    step: f64,
    delay: f64,
    dwell: f64,
    out: &mut [GradientSample],
) {
    for (i, sample) in out.iter_mut().enumerate() {
        let g = interpolate(nodes, step, i as f64 * dwell + delay);
        *sample = [g.re, g.im];
    }
}

/// Check amplitude and slew of every sample against the hardware limits.
pub(crate) fn verify(
    samples: &[GradientSample],
    max_ampl: f64,
    max_slew: f64,
    dwell: f64,
) -> Result<(), SpiralError> {
    let ampl_limit = max_ampl * (1.0 + BOUND_TOLERANCE);
    let step_limit = max_slew * dwell * (1.0 + BOUND_TOLERANCE);

    let mut previous = [0.0, 0.0];
    for (index, &sample) in samples.iter().enumerate() {
        if !(sample[0].is_finite() && sample[1].is_finite()) {
            return Err(SpiralError::Degenerate("waveform contains non-finite samples"));
        }
        if sample[0].hypot(sample[1]) > ampl_limit {
            return Err(SpiralError::ConstraintViolation {
                index,
                kind: Constraint::Amplitude,
            });
        }
        if index > 0 && (sample[0] - previous[0]).hypot(sample[1] - previous[1]) > step_limit {
            return Err(SpiralError::ConstraintViolation {
                index,
                kind: Constraint::Slew,
            });
        }
        previous = sample;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp() -> Vec<Complex64> {
        (0..5).map(|i| Complex64::new(i as f64, -(i as f64))).collect()
    }

    #[test]
    fn count_includes_both_ends() {
        assert_eq!(sample_count(10.0, 0.0, 1.0), 11);
        assert_eq!(sample_count(10.0, 2.0, 1.0), 9);
        assert_eq!(sample_count(10.0, -2.0, 1.0), 13);
        assert_eq!(sample_count(10.0, 10.5, 1.0), 0);
        // end not on the grid
        assert_eq!(sample_count(10.5, 0.0, 1.0), 11);
    }

    #[test]
    fn interpolates_between_nodes() {
        let g = interpolate(&ramp(), 2.0, 3.0);
        assert_abs_diff_eq!(g.re, 1.5);
        assert_abs_diff_eq!(g.im, -1.5);
    }

    #[test]
    fn zero_before_ramp_and_held_at_end() {
        assert_eq!(interpolate(&ramp(), 1.0, -0.5), Complex64::new(0.0, 0.0));
        assert_eq!(interpolate(&ramp(), 1.0, 4.0), Complex64::new(4.0, -4.0));
    }

    #[test]
    fn resample_shifts_by_delay() {
        let mut out = [[0.0; 2]; 3];
        resample(&ramp(), 1.0, 1.0, 1.0, &mut out);
        assert_eq!(out, [[1.0, -1.0], [2.0, -2.0], [3.0, -3.0]]);
        resample(&ramp(), 1.0, -1.0, 1.0, &mut out);
        assert_eq!(out, [[0.0, 0.0], [0.0, 0.0], [1.0, -1.0]]);
    }

    #[test]
    fn verify_flags_first_offending_sample() {
        let samples = [[0.0, 0.0], [0.5, 0.0], [1.6, 0.0]];
        assert_eq!(
            verify(&samples, 2.0, 1.0, 1.0),
            Err(SpiralError::ConstraintViolation {
                index: 2,
                kind: Constraint::Slew
            })
        );
        assert_eq!(
            verify(&samples, 1.0, 2.0, 1.0),
            Err(SpiralError::ConstraintViolation {
                index: 2,
                kind: Constraint::Amplitude
            })
        );
        assert_eq!(verify(&samples, 2.0, 2.0, 1.0), Ok(()));
    }

    #[test]
    fn verify_rejects_nan() {
        let samples = [[0.0, f64::NAN]];
        assert!(matches!(
            verify(&samples, 1.0, 1.0, 1.0),
            Err(SpiralError::Degenerate(_))
        ));
    }
}
