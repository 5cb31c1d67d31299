//! Named-attribute entry point, for hosts that pass parameters as a
//! dictionary instead of a typed struct.
//!
//! Input attributes:
//!
//! | key | type | default |
//! |---|---|---|
//! | `base_resolution`, `spiral_arms` | int | required |
//! | `field_of_view`, `max_grad_ampl`, `min_rise_time`, `dwell_time` | float | required |
//! | `readout_os` | float | `2.0` |
//! | `gradient_delay` | float | `0.0` |
//! | `larmor_const` | float | ¹H, `4257.7478518` (Hz/G) |
//! | `vd_inner_cutoff`, `vd_outer_cutoff`, `vd_outer_density` | float | `1.0` |
//! | `vd_type` | str | `"linear"` |
//!
//! Output attributes: `waveform` (list of `[gx, gy]`) and `waveform_length`.

use tracing::{debug, warn};

use crate::{
    DensityProfile, ExtractionError, SpiralParams, ToolError, Transition, ValueDict, params,
};

/// Compute a spiral waveform from named attributes.
///
/// # Examples
/// ```
/// use spiral_waveform::{Value, ValueDict, tool::spiral_waveform_tool};
///
/// let input: ValueDict = [
///     ("base_resolution", Value::Int(64)),
///     ("spiral_arms", Value::Int(16)),
///     ("field_of_view", Value::Float(0.24)),
///     ("max_grad_ampl", Value::Float(24e-3)),
///     ("min_rise_time", Value::Float(6e-4)),
///     ("dwell_time", Value::Float(4e-6)),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut output = spiral_waveform_tool(input).unwrap();
/// let length: i64 = output.pop("waveform_length").unwrap();
/// assert!(length > 0);
/// ```
pub fn spiral_waveform_tool(mut input: ValueDict) -> Result<ValueDict, ToolError> {
    let params = params_from_attributes(&mut input)?;
    if !input.is_empty() {
        let unused: Vec<&str> = input.keys().collect();
        warn!(?unused, "ignoring unknown attributes");
    }

    let waveform = crate::spiral_waveform(&params)?;
    debug!(samples = waveform.len(), "spiral waveform tool finished");

    let mut output = ValueDict::default();
    output.insert("waveform_length", waveform.len() as i64);
    output.insert("waveform", waveform.into_samples());
    Ok(output)
}

/// Pop every spiral attribute out of `input`, leaving unknown keys behind.
pub fn params_from_attributes(input: &mut ValueDict) -> Result<SpiralParams, ToolError> {
    let base_resolution = pop_count(input, "base_resolution")?;
    let spiral_arms = pop_count(input, "spiral_arms")?;
    let field_of_view: f64 = input.pop("field_of_view")?;
    let max_grad_ampl: f64 = input.pop("max_grad_ampl")?;
    let min_rise_time: f64 = input.pop("min_rise_time")?;
    let dwell_time: f64 = input.pop("dwell_time")?;
    let readout_os = input.pop_or("readout_os", params::DEFAULT_READOUT_OS)?;
    let gradient_delay = input.pop_or("gradient_delay", params::DEFAULT_GRADIENT_DELAY)?;
    let larmor_const = input.pop_or("larmor_const", params::GAMMA_1H)?;

    let inner_cutoff = input.pop_or("vd_inner_cutoff", 1.0)?;
    let outer_cutoff = input.pop_or("vd_outer_cutoff", 1.0)?;
    let outer_density = input.pop_or("vd_outer_density", 1.0)?;
    let transition: Transition = input
        .pop_or("vd_type", Transition::default().to_string())?
        .parse()?;

    Ok(SpiralParams {
        base_resolution,
        spiral_arms,
        field_of_view,
        max_grad_ampl,
        min_rise_time,
        dwell_time,
        readout_os,
        gradient_delay,
        larmor_const,
        density: DensityProfile::from_cutoffs(
            inner_cutoff,
            outer_cutoff,
            outer_density,
            transition,
        ),
    })
}

fn pop_count(input: &mut ValueDict, key: &str) -> Result<u32, ExtractionError> {
    let value: i64 = input.pop(key)?;
    u32::try_from(value).map_err(|_| ExtractionError::OutOfRange {
        key: key.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SpiralError, Value, codec};

    fn input() -> ValueDict {
        [
            ("base_resolution", Value::Int(64)),
            ("spiral_arms", Value::Int(16)),
            ("field_of_view", Value::Float(0.24)),
            ("max_grad_ampl", Value::Float(24e-3)),
            ("min_rise_time", Value::Float(6e-4)),
            ("dwell_time", Value::Float(4e-6)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn optional_attributes_take_defaults() {
        let params = params_from_attributes(&mut input()).unwrap();
        assert_eq!(params.readout_os, params::DEFAULT_READOUT_OS);
        assert_eq!(params.gradient_delay, 0.0);
        assert_eq!(params.larmor_const, params::GAMMA_1H);
        assert_eq!(params.density, DensityProfile::Uniform);
    }

    #[test]
    fn variable_density_attributes() {
        let mut input = input();
        input.insert("vd_inner_cutoff", 0.5);
        input.insert("vd_outer_cutoff", 0.8);
        input.insert("vd_outer_density", 0.5);
        input.insert("vd_type", "hanning");
        let params = params_from_attributes(&mut input).unwrap();
        assert_eq!(
            params.density,
            DensityProfile::Variable {
                inner_cutoff: 0.5,
                outer_cutoff: 0.8,
                outer_density: 0.5,
                transition: Transition::Hanning,
            }
        );
        assert!(input.is_empty());
    }

    #[test]
    fn cutoff_beyond_kmax_is_rejected() {
        let mut input = input();
        input.insert("vd_inner_cutoff", 1.5);
        input.insert("vd_outer_cutoff", 1.5);
        input.insert("vd_outer_density", 0.5);
        assert!(matches!(
            spiral_waveform_tool(input),
            Err(ToolError::Spiral(SpiralError::InvalidDensity(_)))
        ));
    }

    #[test]
    fn missing_attribute_is_reported_by_name() {
        let mut input = input();
        input.0.remove("dwell_time");
        assert_eq!(
            spiral_waveform_tool(input),
            Err(ToolError::Extraction(ExtractionError::KeyNotFound(
                "dwell_time".into()
            )))
        );
    }

    #[test]
    fn negative_count_is_out_of_range() {
        let mut input = input();
        input.insert("spiral_arms", -4i64);
        assert!(matches!(
            spiral_waveform_tool(input),
            Err(ToolError::Extraction(ExtractionError::OutOfRange { value: -4, .. }))
        ));
    }

    #[test]
    fn zero_arms_fail_validation() {
        let mut input = input();
        input.insert("spiral_arms", 0i64);
        assert!(matches!(
            spiral_waveform_tool(input),
            Err(ToolError::Spiral(SpiralError::InvalidParameter {
                name: "spiral_arms",
                ..
            }))
        ));
    }

    #[test]
    fn output_survives_encoding() {
        let mut input = input();
        input.insert("unknown", "ignored");
        let output = spiral_waveform_tool(input).unwrap();

        let mut decoded = codec::decode(&codec::encode(&output).unwrap()).unwrap();
        let length: i64 = decoded.pop("waveform_length").unwrap();
        let waveform: Vec<[f64; 2]> = decoded.pop("waveform").unwrap();
        assert_eq!(length as usize, waveform.len());
        assert!(length > 0);
    }
}
