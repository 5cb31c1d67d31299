//! Time-optimal integration of a slew- and amplitude-limited spiral arm.
//!
//! The arm is parameterized by its radius, `k = r e^{iθ(r)}` with
//! `dθ/dr = q(r) = 2π FOV d(r) / arms`, which makes consecutive rings of the
//! interleaved arms `1 / (FOV d(r))` apart. Differentiating in time:
//!
//! ```text
//! k'  = e^{iθ} r' A
//! k'' = e^{iθ} (A r'' + B)
//!
//! A = 1 + i r q
//! B = r'^2 C,  C = i (2q + r q_r) - r q^2
//! ```
//!
//! `|k'| <= v_max` bounds `r'` by `v_max / |A|`, and `|A r'' + B| <= a_max`
//! only has a solution while `r'^2 |Im(conj(A) C)| <= a_max |A|`. The smaller
//! of the two is the velocity ceiling at each radius.
//!
//! A backward pass from the target radius turns the ceiling into a velocity
//! profile that can be followed while braking within the slew limit. The
//! forward pass then accelerates as hard as the slew limit allows and never
//! exceeds that profile.

use std::f64::consts::PI;

use num_complex::Complex64;
use tracing::debug;

use crate::{DensityProfile, SpiralError, SpiralParams, resample};

/// Fraction of the hardware limits used while designing
const DESIGN_MARGIN: f64 = 0.99;
/// Fraction of the design acceleration the backward pass may brake with.
/// The remainder lets the forward pass settle back onto the profile.
const TRACKING_MARGIN: f64 = 0.95;
/// Intervals of the radial grid of the velocity profile
const PROFILE_NODES: usize = 1 << 14;
/// Largest angle in radians advanced by one integration sub-step
const MAX_ANGLE_STEP: f64 = 1e-3;
/// Largest radius advanced by one sub-step, relative to the target radius
const MAX_RADIAL_STEP: f64 = 1.0 / PROFILE_NODES as f64;
const MAX_SUBSTEPS: usize = 1 << 16;

#[derive(Debug, Clone, Copy, Default)]
struct TrajectoryState {
    /// |k| in cycles/m
    radius: f64,
    /// d|k|/dt
    velocity: f64,
    angle: f64,
}

impl TrajectoryState {
    fn is_finite(&self) -> bool {
        self.radius.is_finite() && self.velocity.is_finite() && self.angle.is_finite()
    }
}

/// Gradient samples on the design grid. `nodes[0]` is the start of the ramp
/// at t = 0 and always zero.
#[derive(Debug, Clone)]
pub(crate) struct Design {
    pub nodes: Vec<Complex64>,
    pub step: f64,
    pub radius: f64,
}

impl Design {
    pub fn duration(&self) -> f64 {
        (self.nodes.len() - 1) as f64 * self.step
    }
}

struct Spiral {
    target: f64,
    /// dθ/dr at full density
    ring: f64,
    density: DensityProfile,
    v_max: f64,
    a_max: f64,
    gamma: f64,
}

impl Spiral {
    fn new(params: &SpiralParams) -> Result<Self, SpiralError> {
        let gamma = params.gamma();
        let spiral = Self {
            target: params.target_radius(),
            ring: 2.0 * PI * params.field_of_view / params.spiral_arms as f64,
            density: params.density,
            v_max: DESIGN_MARGIN * gamma * params.max_grad_ampl,
            a_max: DESIGN_MARGIN * gamma * params.max_slew_rate(),
            gamma,
        };

        let derived = [
            (spiral.gamma, "larmor constant is not a normal number"),
            (spiral.target, "target k-space radius is not representable"),
            (spiral.ring, "ring spacing is not representable"),
            (spiral.v_max, "k-space velocity limit vanishes or overflows"),
            (spiral.a_max, "k-space acceleration limit vanishes or overflows"),
            (params.design_step(), "design step vanishes"),
        ];
        for (value, reason) in derived {
            if !value.is_normal() {
                return Err(SpiralError::Degenerate(reason));
            }
        }
        Ok(spiral)
    }

    /// dθ/dr and its derivative with respect to r
    fn q(&self, radius: f64) -> (f64, f64) {
        let (d, dd_dx) = self.density.at(radius / self.target);
        (self.ring * d, self.ring * dd_dx / self.target)
    }

    /// `A` and `C` at `radius`
    fn geometry(&self, radius: f64) -> (Complex64, Complex64) {
        let (q, dq) = self.q(radius);
        (
            Complex64::new(1.0, radius * q),
            Complex64::new(-radius * q * q, 2.0 * q + radius * dq),
        )
    }

    /// Smallest and largest `r''` with `|A r'' + B| <= a_limit`.
    fn accel_range(&self, radius: f64, velocity: f64, a_limit: f64) -> (f64, f64) {
        let (a, c) = self.geometry(radius);
        let b = c * (velocity * velocity);

        let a2 = a.norm_sqr();
        let p = (a.conj() * b).re;
        let disc = p * p - a2 * (b.norm_sqr() - a_limit * a_limit);
        if disc < 0.0 {
            // limit already exceeded by the velocity term, stay as close as possible
            let closest = -p / a2;
            (closest, closest)
        } else {
            let root = disc.sqrt();
            ((-p - root) / a2, (root - p) / a2)
        }
    }

    /// Largest `r'` at `radius` for both the amplitude and the slew limit
    fn ceiling(&self, radius: f64) -> f64 {
        let (a, c) = self.geometry(radius);
        let amplitude = self.v_max / a.norm();
        let cross = (a.conj() * c).im.abs();
        if cross > 0.0 {
            amplitude.min((TRACKING_MARGIN * self.a_max * a.norm() / cross).sqrt())
        } else {
            amplitude
        }
    }

    fn substeps(&self, state: &TrajectoryState, step: f64) -> usize {
        let accel = self
            .accel_range(state.radius, state.velocity, self.a_max)
            .1
            .abs();
        let travel = (state.velocity + accel * step) * step;
        let by_angle = self.ring * travel / MAX_ANGLE_STEP;
        let by_radius = travel / (self.target * MAX_RADIAL_STEP);
        (by_angle.max(by_radius).ceil() as usize).clamp(1, MAX_SUBSTEPS)
    }

    fn advance(&self, profile: &VelocityProfile, state: &mut TrajectoryState, h: f64) {
        let (lo_start, hi_start) = self.accel_range(state.radius, state.velocity, self.a_max);

        // the acceleration must also be admissible where the sub-step ends
        let radius = state.radius + state.velocity * h + 0.5 * hi_start * h * h;
        let velocity = state.velocity + hi_start * h;
        let (lo_end, hi_end) = self.accel_range(radius, velocity, self.a_max);
        let mut lo = lo_start.max(lo_end);
        let mut hi = hi_start.min(hi_end);
        if lo > hi {
            lo = 0.5 * (lo + hi);
            hi = lo;
        }

        let (q0, _) = self.q(state.radius);
        let radius = state.radius + state.velocity * h + 0.5 * hi * h * h;
        let (q1, _) = self.q(radius);
        let limit = self.ceiling(radius).min(profile.at(radius));
        let velocity = (state.velocity + hi * h)
            .min(limit)
            .max(state.velocity + lo * h);

        state.angle += 0.5 * (q0 * state.velocity + q1 * velocity) * h;
        state.radius = radius;
        state.velocity = velocity;
    }

    /// g = k' / γ
    fn gradient(&self, state: &TrajectoryState) -> Complex64 {
        let (q, _) = self.q(state.radius);
        Complex64::new(1.0, state.radius * q)
            * Complex64::from_polar(state.velocity / self.gamma, state.angle)
    }
}

/// Largest `r'` on a radial grid from which the rest of the arm can still be
/// traversed within the limits.
struct VelocityProfile {
    spacing: f64,
    limits: Vec<f64>,
}

impl VelocityProfile {
    /// Integrate backwards from the target radius, braking as hard as
    /// `TRACKING_MARGIN * a_max` allows and never exceeding the ceiling.
    fn new(spiral: &Spiral) -> Self {
        let spacing = spiral.target / PROFILE_NODES as f64;
        let a_limit = TRACKING_MARGIN * spiral.a_max;

        let mut limits = vec![0.0; PROFILE_NODES + 1];
        limits[PROFILE_NODES] = spiral.ceiling(spiral.target);
        for j in (1..=PROFILE_NODES).rev() {
            let outer = j as f64 * spacing;
            let inner = outer - spacing;
            let v = limits[j];
            let step_back = |lo: f64| {
                spiral
                    .ceiling(inner)
                    .min((v * v - 2.0 * lo * spacing).max(0.0).sqrt())
            };

            // braking has to be admissible at both ends of the interval
            let mut lo = spiral.accel_range(outer, v, a_limit).0;
            for _ in 0..2 {
                lo = lo.max(spiral.accel_range(inner, step_back(lo), a_limit).0);
            }
            limits[j - 1] = step_back(lo);
        }
        Self { spacing, limits }
    }

    fn at(&self, radius: f64) -> f64 {
        let pos = radius / self.spacing;
        let last = self.limits.len() - 1;
        let index = pos.floor() as usize;
        if index >= last {
            return self.limits[last];
        }
        let frac = pos - index as f64;
        self.limits[index] * (1.0 - frac) + self.limits[index + 1] * frac
    }
}

/// Integrate one arm until it reaches the target radius.
///
/// Fails with [`SpiralError::Infeasible`] as soon as the next design node would
/// produce more output samples than `capacity`.
pub(crate) fn design(params: &SpiralParams, capacity: usize) -> Result<Design, SpiralError> {
    let spiral = Spiral::new(params)?;
    let step = params.design_step();
    debug!(
        target_radius = spiral.target,
        v_max = spiral.v_max,
        a_max = spiral.a_max,
        step,
        "designing spiral arm"
    );
    let profile = VelocityProfile::new(&spiral);

    let mut state = TrajectoryState::default();
    let mut nodes = vec![Complex64::new(0.0, 0.0)];
    while state.radius < spiral.target {
        let elapsed = nodes.len() as f64 * step;
        let samples = resample::sample_count(elapsed, params.gradient_delay, params.dwell_time);
        if samples > capacity as i64 {
            return Err(SpiralError::Infeasible {
                capacity,
                reached: state.radius,
                target: spiral.target,
            });
        }

        let substeps = spiral.substeps(&state, step);
        let h = step / substeps as f64;
        for _ in 0..substeps {
            spiral.advance(&profile, &mut state, h);
        }
        if !state.is_finite() {
            return Err(SpiralError::Degenerate("trajectory state is not finite"));
        }
        nodes.push(spiral.gradient(&state));
    }

    let design = Design {
        nodes,
        step,
        radius: state.radius,
    };
    debug!(
        nodes = design.nodes.len(),
        duration = design.duration(),
        turns = state.angle / (2.0 * PI),
        "spiral arm reached target radius"
    );
    Ok(design)
}
