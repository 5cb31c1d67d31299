//! Radial sampling-density profiles.
//!
//! The density `d(x)` scales the field of view that a ring of the spiral has
//! to support at normalized radius `x = |k| / k_max`. With `d = 1` the ring
//! spacing satisfies the Nyquist criterion for the full field of view, smaller
//! values spread the rings further apart and reach `k_max` sooner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SpiralError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DensityProfile {
    /// Nyquist sampling everywhere (Archimedean spiral)
    #[default]
    Uniform,
    /// Full density up to `inner_cutoff`, `outer_density` from `outer_cutoff`
    /// on, with the given transition in between. Cutoffs are fractions of
    /// `k_max`.
    Variable {
        inner_cutoff: f64,
        outer_cutoff: f64,
        outer_density: f64,
        transition: Transition,
    },
}

/// Shape of the density ramp between the inner and outer cutoff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    Linear,
    Quadratic,
    Hanning,
}

impl DensityProfile {
    /// Build a profile from the cutoff triple used by the tool attributes.
    ///
    /// Both cutoffs at `1.0` describe a uniform spiral and collapse to
    /// [`DensityProfile::Uniform`]. Anything else is kept as given and checked
    /// by [`DensityProfile::validate`].
    pub fn from_cutoffs(
        inner_cutoff: f64,
        outer_cutoff: f64,
        outer_density: f64,
        transition: Transition,
    ) -> Self {
        if inner_cutoff == 1.0 && outer_cutoff == 1.0 {
            Self::Uniform
        } else {
            Self::Variable {
                inner_cutoff,
                outer_cutoff,
                outer_density,
                transition,
            }
        }
    }

    pub fn validate(&self) -> Result<(), SpiralError> {
        let Self::Variable {
            inner_cutoff,
            outer_cutoff,
            outer_density,
            ..
        } = *self
        else {
            return Ok(());
        };

        if !(inner_cutoff.is_finite() && outer_cutoff.is_finite() && outer_density.is_finite()) {
            return Err(SpiralError::InvalidDensity("values must be finite"));
        }
        if !(0.0..1.0).contains(&inner_cutoff) {
            return Err(SpiralError::InvalidDensity("inner cutoff must lie in [0, 1)"));
        }
        if !(outer_cutoff > inner_cutoff && outer_cutoff <= 1.0) {
            return Err(SpiralError::InvalidDensity(
                "outer cutoff must lie in (inner cutoff, 1]",
            ));
        }
        if !(outer_density > 0.0 && outer_density <= 1.0) {
            return Err(SpiralError::InvalidDensity("outer density must lie in (0, 1]"));
        }
        Ok(())
    }

    /// Relative density and its derivative with respect to `x`.
    pub(crate) fn at(&self, x: f64) -> (f64, f64) {
        let Self::Variable {
            inner_cutoff,
            outer_cutoff,
            outer_density,
            transition,
        } = *self
        else {
            return (1.0, 0.0);
        };

        let width = outer_cutoff - inner_cutoff;
        let s = (x - inner_cutoff) / width;
        if s <= 0.0 {
            return (1.0, 0.0);
        }
        if s >= 1.0 {
            return (outer_density, 0.0);
        }

        // w falls from 1 to 0 across the transition
        let (w, dw_ds) = match transition {
            Transition::Linear => (1.0 - s, -1.0),
            Transition::Quadratic => (1.0 - s * s, -2.0 * s),
            Transition::Hanning => {
                use std::f64::consts::PI;
                (0.5 * (1.0 + (PI * s).cos()), -0.5 * PI * (PI * s).sin())
            }
        };
        let span = 1.0 - outer_density;
        (outer_density + span * w, span * dw_ds / width)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::Linear => "linear",
            Transition::Quadratic => "quadratic",
            Transition::Hanning => "hanning",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Transition {
    type Err = SpiralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "quadratic" => Ok(Self::Quadratic),
            "hanning" => Ok(Self::Hanning),
            _ => Err(SpiralError::InvalidDensity(
                "transition must be one of linear, quadratic, hanning",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn profile(transition: Transition) -> DensityProfile {
        DensityProfile::Variable {
            inner_cutoff: 0.5,
            outer_cutoff: 0.8,
            outer_density: 0.5,
            transition,
        }
    }

    #[test]
    fn uniform_is_flat() {
        assert_eq!(DensityProfile::Uniform.at(0.0), (1.0, 0.0));
        assert_eq!(DensityProfile::Uniform.at(0.9), (1.0, 0.0));
    }

    #[test]
    fn transitions_are_continuous_at_cutoffs() {
        for transition in [Transition::Linear, Transition::Quadratic, Transition::Hanning] {
            let p = profile(transition);
            assert_abs_diff_eq!(p.at(0.5 + 1e-9).0, 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(p.at(0.8 - 1e-9).0, 0.5, epsilon = 1e-6);
            assert_eq!(p.at(0.3), (1.0, 0.0));
            assert_eq!(p.at(0.95), (0.5, 0.0));
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        for transition in [Transition::Linear, Transition::Quadratic, Transition::Hanning] {
            let p = profile(transition);
            let x = 0.62;
            let h = 1e-6;
            let numeric = (p.at(x + h).0 - p.at(x - h).0) / (2.0 * h);
            assert_abs_diff_eq!(p.at(x).1, numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn defaults_collapse_to_uniform() {
        let p = DensityProfile::from_cutoffs(1.0, 1.0, 1.0, Transition::Linear);
        assert_eq!(p, DensityProfile::Uniform);
        let p = DensityProfile::from_cutoffs(1.0, 1.0, 0.5, Transition::Hanning);
        assert_eq!(p, DensityProfile::Uniform);
    }

    #[test]
    fn out_of_range_cutoffs_are_not_collapsed() {
        for (inner, outer) in [(1.5, 1.5), (1.0, 1.2), (0.5, 1.5)] {
            let p = DensityProfile::from_cutoffs(inner, outer, 0.5, Transition::Linear);
            assert_ne!(p, DensityProfile::Uniform);
            assert!(matches!(p.validate(), Err(SpiralError::InvalidDensity(_))));
        }
    }

    #[test]
    fn rejects_inverted_cutoffs() {
        let p = DensityProfile::Variable {
            inner_cutoff: 0.8,
            outer_cutoff: 0.5,
            outer_density: 0.5,
            transition: Transition::Linear,
        };
        assert!(matches!(p.validate(), Err(SpiralError::InvalidDensity(_))));
        assert!(profile(Transition::Hanning).validate().is_ok());
    }

    #[test]
    fn transition_names_parse() {
        for transition in [Transition::Linear, Transition::Quadratic, Transition::Hanning] {
            assert_eq!(transition.to_string().parse::<Transition>(), Ok(transition));
        }
        assert!("cosine".parse::<Transition>().is_err());
    }
}
