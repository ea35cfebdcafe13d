//! # orbit-predict
//!
//! Satellite position prediction from NORAD two-line element sets.
//!
//! Parses TLEs, propagates them with SGP4 (near earth) or SDP4 (deep space,
//! periods above 225 minutes), and turns the resulting inertial state into
//! geodetic coordinates or a ground-station look angle.
//!
//! ```
//! use orbit_predict::{GroundStation, Propagator, Tle};
//!
//! let tle = Tle::parse(
//!     "1 88888U          80275.98708465  .00073094  13844-3  66816-4 0    87",
//!     "2 88888  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  1058",
//! )
//! .unwrap();
//! let propagator = Propagator::new(tle.to_element_set().unwrap());
//!
//! let state = propagator.propagate(360.0).unwrap();
//! let look = GroundStation::new(40.0, -105.0, 1600.0).look_angle(&state);
//! assert!((0.0..std::f64::consts::TAU).contains(&look.azimuth));
//! ```

pub mod constants;
pub mod time;
pub mod elements;
pub mod tle;
pub mod coefficients;
pub mod solver;
pub mod sgp4;
pub mod sdp4;
pub mod propagator;
pub mod state;
pub mod geodetic;
pub mod station;

pub use elements::{ElementError, ElementSet, RawElements};
pub use geodetic::GeodeticCoordinates;
pub use propagator::{
    propagate_fleet, PropagationError, Propagator, PropagatorConfig, PropagatorKind,
};
pub use solver::{Convergence, ConvergencePolicy};
pub use state::InertialState;
pub use station::{GroundStation, LookAngle, LookAngleOptions};
pub use tle::{Tle, TleError};

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn orbit_predict(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
