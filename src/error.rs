use std::fmt;

use thiserror::Error;

/// Reasons why a spiral waveform could not be computed.
///
/// All variants are returned synchronously from [`synthesize`](crate::synthesize);
/// the buffer never holds partial output when one of these is reported.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpiralError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[error("invalid density profile: {0}")]
    InvalidDensity(&'static str),
    #[error(
        "trajectory infeasible: buffer of {capacity} samples exhausted at k = {reached:.3}/m \
         (target {target:.3}/m)"
    )]
    Infeasible {
        capacity: usize,
        reached: f64,
        target: f64,
    },
    #[error("numerical degeneracy: {0}")]
    Degenerate(&'static str),
    #[error("gradient delay of {delay} s exceeds the readout duration of {readout} s")]
    DelayExceedsReadout { delay: f64, readout: f64 },
    #[error("{kind} limit exceeded at sample {index}")]
    ConstraintViolation { index: usize, kind: Constraint },
}

/// Hardware limit checked on the final waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Amplitude,
    Slew,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Amplitude => write!(f, "gradient amplitude"),
            Constraint::Slew => write!(f, "slew rate"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot convert {from} into {into}")]
pub struct ConversionError {
    pub from: &'static str,
    pub into: &'static str,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("missing attribute `{0}`")]
    KeyNotFound(String),
    #[error("attribute `{key}`: {source}")]
    Conversion {
        key: String,
        source: ConversionError,
    },
    #[error("attribute `{key}` out of range: {value}")]
    OutOfRange { key: String, value: i64 },
}

/// Error returned by [`spiral_waveform_tool`](crate::tool::spiral_waveform_tool)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Spiral(#[from] SpiralError),
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("decompression failed: {0}")]
    Decompression(std::io::Error),
}
