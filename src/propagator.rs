//! Model selection and the final short-period stage shared by SGP4 and SDP4.
//!
//! # Architecture
//! `Propagator` picks the near-earth or deep-space model once, from the
//! orbital period, and keeps it in a tagged enum. Each model only advances
//! the mean elements ([`PerturbedElements`]); the Kepler solve, short-period
//! J2 corrections and orientation vectors are common and live here. The
//! result leaves this module already rescaled to km and km/s.
//!
//! Propagation is a pure function of `&self` and the time offset, so batches
//! fan out with rayon without any locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coefficients::PerturbationCoefficients;
use crate::constants::*;
use crate::elements::ElementSet;
use crate::geodetic::GeodeticCoordinates;
use crate::sdp4::{DeepSpacePropagator, ResonanceKind};
use crate::sgp4::NearEarthPropagator;
use crate::solver::{solve_kepler, ConvergencePolicy};
use crate::state::InertialState;
use crate::time::{add_minutes, minutes_between};

/// Propagation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("Elements out of range at {tsince} min: e = {eccentricity}, a = {semi_major_axis} ER")]
    InvalidElements {
        tsince: f64,
        eccentricity: f64,
        semi_major_axis: f64,
    },

    #[error("Satellite decayed at {epoch}: radius {radius_km:.1} km is inside the Earth")]
    Decayed {
        epoch: DateTime<Utc>,
        radius_km: f64,
    },

    #[error("{solver} iteration did not converge within {iterations} iterations")]
    ConvergenceLimitReached {
        solver: &'static str,
        iterations: usize,
    },

    #[error("Time offset {0} min cannot be represented as an instant")]
    TimeOutOfRange(f64),
}

// ── Mean elements after the secular update ──

/// Mean elements at the requested time, as handed from either model to the
/// short-period stage. Angles in radians, distance in Earth radii.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerturbedElements {
    pub inclination: f64,
    pub arg_perigee: f64,
    pub eccentricity: f64,
    pub semi_major_axis: f64,
    /// Mean longitude: M + ω + Ω
    pub mean_longitude: f64,
    pub raan: f64,
    /// Mean motion (rad/min)
    pub mean_motion: f64,
}

// ── Model selection ──

/// Which analytic model an element set is propagated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagatorKind {
    /// SGP4
    NearEarth,
    /// SDP4
    DeepSpace,
}

impl PropagatorKind {
    /// Periods above 225 minutes go to the deep-space model.
    pub fn for_period(period_minutes: f64) -> Self {
        if period_minutes > DEEP_SPACE_PERIOD_MIN {
            PropagatorKind::DeepSpace
        } else {
            PropagatorKind::NearEarth
        }
    }
}

/// Propagator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagatorConfig {
    /// Behaviour when the Kepler solve hits its iteration cap.
    pub convergence: ConvergencePolicy,
    /// Newton iterations allowed per Kepler solve.
    pub kepler_max_iter: usize,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            convergence: ConvergencePolicy::default(),
            kepler_max_iter: KEPLER_MAX_ITER,
        }
    }
}

impl PropagatorConfig {
    pub fn with_convergence(mut self, policy: ConvergencePolicy) -> Self {
        self.convergence = policy;
        self
    }

    pub fn with_kepler_max_iter(mut self, max_iter: usize) -> Self {
        self.kepler_max_iter = max_iter.max(1);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Model {
    NearEarth(NearEarthPropagator),
    DeepSpace(Box<DeepSpacePropagator>),
}

/// SGP4/SDP4 propagator for one element set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Propagator {
    model: Model,
    config: PropagatorConfig,
}

impl Propagator {
    /// Derive coefficients and pick the model from the recovered period.
    pub fn new(elements: ElementSet) -> Self {
        let period = elements.period_minutes();
        let kind = PropagatorKind::for_period(period);
        log::debug!("Selected {:?} model for period {:.3} min", kind, period);

        let model = match kind {
            PropagatorKind::NearEarth => Model::NearEarth(NearEarthPropagator::new(elements)),
            PropagatorKind::DeepSpace => {
                Model::DeepSpace(Box::new(DeepSpacePropagator::new(elements)))
            }
        };

        Propagator {
            model,
            config: PropagatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PropagatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PropagatorConfig {
        &self.config
    }

    pub fn kind(&self) -> PropagatorKind {
        match self.model {
            Model::NearEarth(_) => PropagatorKind::NearEarth,
            Model::DeepSpace(_) => PropagatorKind::DeepSpace,
        }
    }

    pub fn elements(&self) -> &ElementSet {
        match &self.model {
            Model::NearEarth(p) => p.elements(),
            Model::DeepSpace(p) => p.elements(),
        }
    }

    pub fn coefficients(&self) -> &PerturbationCoefficients {
        match &self.model {
            Model::NearEarth(p) => p.coefficients(),
            Model::DeepSpace(p) => p.coefficients(),
        }
    }

    /// Resonance regime of a deep-space orbit, if any.
    pub fn resonance(&self) -> Option<ResonanceKind> {
        match &self.model {
            Model::NearEarth(_) => None,
            Model::DeepSpace(p) => p.resonance(),
        }
    }

    /// Instant `tsince` minutes from epoch. Offsets that are not finite or
    /// fall outside chrono's range are rejected before any model runs.
    fn epoch_at(&self, tsince: f64) -> Result<DateTime<Utc>, PropagationError> {
        add_minutes(&self.elements().epoch(), tsince)
            .ok_or(PropagationError::TimeOutOfRange(tsince))
    }

    /// Mean elements at `tsince` minutes from epoch, before the
    /// short-period corrections.
    pub fn mean_elements(&self, tsince: f64) -> Result<PerturbedElements, PropagationError> {
        self.epoch_at(tsince)?;
        Ok(self.secular_update(tsince))
    }

    fn secular_update(&self, tsince: f64) -> PerturbedElements {
        match &self.model {
            Model::NearEarth(p) => p.secular_update(tsince),
            Model::DeepSpace(p) => p.secular_update(tsince),
        }
    }

    /// Inertial state `tsince` minutes after the element-set epoch
    /// (negative values propagate backwards).
    pub fn propagate(&self, tsince: f64) -> Result<InertialState, PropagationError> {
        let epoch = self.epoch_at(tsince)?;

        let mean = self.secular_update(tsince);
        let state = short_period(&mean, self.coefficients(), tsince, &self.config)?.rescale(epoch);

        let radius_km = state.r_mag();
        if radius_km < XKMPER {
            log::warn!(
                "Satellite decayed at {} ({:+.1} min): radius {:.1} km",
                epoch,
                tsince,
                radius_km
            );
            return Err(PropagationError::Decayed { epoch, radius_km });
        }

        log::trace!(
            "t = {:+.3} min: |r| = {:.3} km, |v| = {:.5} km/s",
            tsince,
            radius_km,
            state.v_mag()
        );
        Ok(state)
    }

    /// Inertial state at an absolute instant.
    pub fn propagate_to(&self, t: DateTime<Utc>) -> Result<InertialState, PropagationError> {
        self.propagate(minutes_between(&self.elements().epoch(), &t))
    }

    /// Sub-satellite point and altitude at an absolute instant.
    pub fn geodetic_at(&self, t: DateTime<Utc>) -> Result<GeodeticCoordinates, PropagationError> {
        Ok(self.propagate_to(t)?.to_geodetic())
    }

    /// Propagate to many offsets (minutes) in parallel. Output order follows
    /// `offsets`; each entry fails or succeeds on its own.
    pub fn propagate_many(&self, offsets: &[f64]) -> Vec<Result<InertialState, PropagationError>> {
        use rayon::prelude::*;

        offsets.par_iter().map(|&t| self.propagate(t)).collect()
    }
}

/// Propagate a whole fleet in parallel over the same time offsets (minutes).
pub fn propagate_fleet(
    satellites: &[(u32, Propagator)],
    offsets: &[f64],
) -> Vec<(u32, Vec<Result<InertialState, PropagationError>>)> {
    use rayon::prelude::*;

    satellites
        .par_iter()
        .map(|(id, prop)| {
            let states = offsets.iter().map(|&t| prop.propagate(t)).collect();
            (*id, states)
        })
        .collect()
}

// ── Short-period stage ──

/// Position (ER) and velocity (ER/min) straight out of the model.
struct UnscaledState {
    r: [f64; 3],
    v: [f64; 3],
}

impl UnscaledState {
    fn rescale(self, epoch: DateTime<Utc>) -> InertialState {
        InertialState {
            r: self.r.map(|x| x * KM_PER_ER),
            v: self.v.map(|x| x * KMS_PER_ER_MIN),
            epoch,
        }
    }
}

/// Long-period periodics, Kepler solve, short-period J2 corrections and
/// orientation vectors. Uses the epoch inclination functions from `c` for
/// both models.
fn short_period(
    m: &PerturbedElements,
    c: &PerturbationCoefficients,
    tsince: f64,
    config: &PropagatorConfig,
) -> Result<UnscaledState, PropagationError> {
    let e = m.eccentricity;
    let a = m.semi_major_axis;
    let invalid = || PropagationError::InvalidElements {
        tsince,
        eccentricity: e,
        semi_major_axis: a,
    };

    if !(e.abs() < 1.0) || !(a > 0.0 && a.is_finite()) {
        return Err(invalid());
    }

    // Long-period periodics
    let beta = (1.0 - e * e).sqrt();
    let axn = e * m.arg_perigee.cos();
    let temp = 1.0 / (a * beta * beta);
    let xll = temp * c.xlcof * axn;
    let aynl = temp * c.aycof;
    let xlt = m.mean_longitude + xll;
    let ayn = e * m.arg_perigee.sin() + aynl;

    let capu = fmod2p(xlt - m.raan);
    let kepler = solve_kepler(capu, axn, ayn, KEPLER_TOLERANCE, config.kepler_max_iter);
    if !kepler.is_converged() {
        match config.convergence {
            ConvergencePolicy::Strict => {
                return Err(PropagationError::ConvergenceLimitReached {
                    solver: "Kepler",
                    iterations: kepler.iterations(),
                });
            }
            ConvergencePolicy::Lenient => log::warn!(
                "Kepler solve hit {} iterations at {:+.3} min; using last iterate",
                kepler.iterations(),
                tsince
            ),
        }
    }
    let k = kepler.into_value();

    // Short-period preliminary quantities
    let elsq = axn * axn + ayn * ayn;
    let temp = 1.0 - elsq;
    if temp <= 0.0 {
        return Err(invalid());
    }
    let pl = a * temp;
    let r = a * (1.0 - k.ecose);
    let temp1 = 1.0 / r;
    let rdot = XKE * a.sqrt() * k.esine * temp1;
    let rfdot = XKE * pl.sqrt() * temp1;
    let temp2 = a * temp1;
    let betal = temp.sqrt();
    let temp3 = 1.0 / (1.0 + betal);
    let cosu = temp2 * (k.cos_epw - axn + ayn * k.esine * temp3);
    let sinu = temp2 * (k.sin_epw - ayn - axn * k.esine * temp3);
    let u = sinu.atan2(cosu);
    let sin2u = 2.0 * sinu * cosu;
    let cos2u = 2.0 * cosu * cosu - 1.0;

    let temp = 1.0 / pl;
    let temp1 = CK2 * temp;
    let temp2 = temp1 * temp;

    // Short-period periodics
    let rk = r * (1.0 - 1.5 * temp2 * betal * c.x3thm1) + 0.5 * temp1 * c.x1mth2 * cos2u;
    let uk = u - 0.25 * temp2 * c.x7thm1 * sin2u;
    let xnodek = m.raan + 1.5 * temp2 * c.cosio * sin2u;
    let xinck = m.inclination + 1.5 * temp2 * c.cosio * c.sinio * cos2u;
    let rdotk = rdot - m.mean_motion * temp1 * c.x1mth2 * sin2u;
    let rfdotk = rfdot + m.mean_motion * temp1 * (c.x1mth2 * cos2u + 1.5 * c.x3thm1);

    // Orientation vectors
    let (sinuk, cosuk) = uk.sin_cos();
    let (sinik, cosik) = xinck.sin_cos();
    let (sinnok, cosnok) = xnodek.sin_cos();
    let xmx = -sinnok * cosik;
    let xmy = cosnok * cosik;
    let ux = xmx * sinuk + cosnok * cosuk;
    let uy = xmy * sinuk + sinnok * cosuk;
    let uz = sinik * sinuk;
    let vx = xmx * cosuk - cosnok * sinuk;
    let vy = xmy * cosuk - sinnok * sinuk;
    let vz = sinik * cosuk;

    Ok(UnscaledState {
        r: [rk * ux, rk * uy, rk * uz],
        v: [
            rdotk * ux + rfdotk * vx,
            rdotk * uy + rfdotk * vy,
            rdotk * uz + rfdotk * vz,
        ],
    })
}
