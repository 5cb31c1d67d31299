use std::f64::consts::PI;
use std::fmt::Debug;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::SpiralError;

/// Default number of samples a [`WaveformBuffer`] can hold
pub const MAX_WAVEFORM_SIZE: usize = 65536;

/// One gradient sample `[gx, gy]` in T/m
pub type GradientSample = [f64; 2];

/// Pre-allocated output storage with a fixed capacity and a valid length.
///
/// The storage is allocated once; [`synthesize`](crate::synthesize) writes a
/// prefix and sets the length. Only that prefix is readable.
#[derive(Clone)]
pub struct WaveformBuffer {
    storage: Box<[GradientSample]>,
    len: usize,
}

impl WaveformBuffer {
    /// Buffer with [`MAX_WAVEFORM_SIZE`] samples
    pub fn new() -> Self {
        Self::with_capacity(MAX_WAVEFORM_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![[0.0; 2]; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid prefix
    pub fn samples(&self) -> &[GradientSample] {
        &self.storage[..self.len]
    }

    /// Whole storage for writing; the caller commits with [`Self::set_len`].
    pub(crate) fn storage_mut(&mut self) -> &mut [GradientSample] {
        &mut self.storage
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.len = len.min(self.capacity());
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for WaveformBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for WaveformBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WaveformBuffer( <{} of {} samples> )",
            self.len,
            self.capacity()
        )
    }
}

/// A finished spiral readout gradient, trimmed to its valid samples.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<GradientSample>,
    dwell_time: f64,
    spiral_arms: u32,
    /// Hz/T
    gamma: f64,
}

impl Waveform {
    pub(crate) fn new(
        samples: Vec<GradientSample>,
        dwell_time: f64,
        spiral_arms: u32,
        gamma: f64,
    ) -> Self {
        Self {
            samples,
            dwell_time,
            spiral_arms,
            gamma,
        }
    }

    pub fn samples(&self) -> &[GradientSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<GradientSample> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dwell_time(&self) -> f64 {
        self.dwell_time
    }

    pub fn spiral_arms(&self) -> u32 {
        self.spiral_arms
    }

    /// Time from the first to the last sample
    pub fn duration(&self) -> f64 {
        self.samples.len().saturating_sub(1) as f64 * self.dwell_time
    }

    /// k-space position in cycles/m at every sample, starting at the origin.
    ///
    /// The gradient is taken to vary linearly between samples, so each step
    /// adds `γ Δt (g[i-1] + g[i]) / 2`.
    pub fn kspace(&self) -> Vec<[f64; 2]> {
        let scale = 0.5 * self.gamma * self.dwell_time;
        let mut previous = [0.0; 2];
        self.samples
            .iter()
            .scan([0.0; 2], |k, &g| {
                k[0] += scale * (previous[0] + g[0]);
                k[1] += scale * (previous[1] + g[1]);
                previous = g;
                Some(*k)
            })
            .collect()
    }

    /// The `index`-th interleave: this waveform rotated by `2π index / arms`.
    pub fn arm(&self, index: u32) -> Result<Waveform, SpiralError> {
        if index >= self.spiral_arms {
            return Err(SpiralError::InvalidParameter {
                name: "arm",
                reason: "must be smaller than spiral_arms",
            });
        }
        let rotation = Complex64::from_polar(1.0, 2.0 * PI * index as f64 / self.spiral_arms as f64);
        let samples = self
            .samples
            .iter()
            .map(|&[gx, gy]| {
                let g = Complex64::new(gx, gy) * rotation;
                [g.re, g.im]
            })
            .collect();
        Ok(Self {
            samples,
            ..*self
        })
    }
}

impl Debug for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Waveform( <{} samples, dwell {} s, {} arms> )",
            self.samples.len(),
            self.dwell_time,
            self.spiral_arms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn waveform() -> Waveform {
        Waveform::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]], 0.5, 4, 2.0)
    }

    #[test]
    fn buffer_exposes_only_valid_prefix() {
        let mut buffer = WaveformBuffer::with_capacity(8);
        assert_eq!(buffer.capacity(), 8);
        assert!(buffer.is_empty());

        buffer.storage_mut()[..3].copy_from_slice(&[[1.0, 0.0]; 3]);
        buffer.set_len(3);
        assert_eq!(buffer.samples(), &[[1.0, 0.0]; 3]);

        buffer.clear();
        assert!(buffer.samples().is_empty());
        assert_eq!(buffer.capacity(), 8);
    }

    #[test]
    fn default_buffer_has_max_capacity() {
        assert_eq!(WaveformBuffer::default().capacity(), MAX_WAVEFORM_SIZE);
    }

    #[test]
    fn kspace_uses_trapezoid_rule() {
        let k = waveform().kspace();
        // scale = 0.5 * 2.0 * 0.5 = 0.5
        assert_eq!(k[0], [0.0, 0.0]);
        assert_abs_diff_eq!(k[1][0], 0.5);
        assert_abs_diff_eq!(k[2][0], 1.5);
        assert_abs_diff_eq!(k[2][1], 0.5);
    }

    #[test]
    fn arm_rotates_by_interleave_angle() {
        let quarter = waveform().arm(1).unwrap();
        assert_abs_diff_eq!(quarter.samples()[1][0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quarter.samples()[1][1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quarter.samples()[2][0], -1.0, epsilon = 1e-12);
        assert_eq!(waveform().arm(0).unwrap(), waveform());
        assert!(waveform().arm(4).is_err());
    }

    #[test]
    fn duration_spans_first_to_last_sample() {
        assert_abs_diff_eq!(waveform().duration(), 1.0);
    }
}
