//! Python bindings via PyO3.
//!
//! Instants cross the boundary as minutes since the element-set epoch, and
//! epochs are reported as ISO-8601 strings.
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::elements::{ElementSet, RawElements};
use crate::propagator::{PropagationError, Propagator, PropagatorConfig, PropagatorKind};
use crate::solver::ConvergencePolicy;
use crate::station::{GroundStation, LookAngleOptions};
use crate::time::epoch_from_year_day;
use crate::tle::Tle;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

fn propagation_error(e: PropagationError) -> PyErr {
    pyo3::exceptions::PyRuntimeError::new_err(e.to_string())
}

// ElementSet
#[pyclass(name = "ElementSet")]
#[derive(Clone)]
pub struct PyElementSet {
    inner: ElementSet,
}

#[pymethods]
impl PyElementSet {
    /// Build from mean elements in degrees and rev/day.
    ///
    /// The epoch is a full year plus fractional day of year (1.0 = Jan 1 00:00 UTC).
    #[new]
    #[pyo3(signature = (
        year, day, inclination_deg, raan_deg, eccentricity,
        arg_perigee_deg, mean_anomaly_deg, mean_motion_rev_day, bstar=0.0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        year: i32,
        day: f64,
        inclination_deg: f64,
        raan_deg: f64,
        eccentricity: f64,
        arg_perigee_deg: f64,
        mean_anomaly_deg: f64,
        mean_motion_rev_day: f64,
        bstar: f64,
    ) -> PyResult<Self> {
        let epoch = epoch_from_year_day(year, day)
            .ok_or_else(|| value_error(format!("invalid epoch: year {year}, day {day}")))?;
        let raw = RawElements {
            epoch,
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion_rev_day,
            bstar,
            mean_motion_dot: 0.0,
        };
        ElementSet::new(raw)
            .map(|inner| PyElementSet { inner })
            .map_err(value_error)
    }

    fn perigee_km(&self) -> f64 { self.inner.perigee_km() }
    fn apogee_km(&self) -> f64 { self.inner.apogee_km() }
    fn period_minutes(&self) -> f64 { self.inner.period_minutes() }
    fn is_deep_space(&self) -> bool { self.inner.is_deep_space() }

    #[getter] fn epoch(&self) -> String { self.inner.epoch().to_rfc3339() }
    #[getter] fn eccentricity(&self) -> f64 { self.inner.eccentricity() }
    #[getter] fn bstar(&self) -> f64 { self.inner.bstar() }

    fn __repr__(&self) -> String {
        format!("ElementSet({})", self.inner)
    }
}

// TLE
#[pyclass(name = "TLE")]
#[derive(Clone)]
pub struct PyTle {
    inner: Tle,
}

#[pymethods]
impl PyTle {
    /// Parse a TLE from two lines.
    #[staticmethod]
    fn parse(line1: &str, line2: &str) -> PyResult<Self> {
        Tle::parse(line1, line2)
            .map(|t| PyTle { inner: t })
            .map_err(value_error)
    }

    /// Parse a TLE from three lines (name + line1 + line2).
    #[staticmethod]
    fn parse_3line(name: &str, line1: &str, line2: &str) -> PyResult<Self> {
        Tle::parse_3line(name, line1, line2)
            .map(|t| PyTle { inner: t })
            .map_err(value_error)
    }

    /// Parse a batch of TLEs from a multi-line string.
    #[staticmethod]
    fn parse_batch(text: &str) -> PyResult<Vec<PyTle>> {
        Tle::parse_batch(text)
            .map(|tles| tles.into_iter().map(|t| PyTle { inner: t }).collect())
            .map_err(value_error)
    }

    /// Validated element set.
    fn to_element_set(&self) -> PyResult<PyElementSet> {
        self.inner
            .to_element_set()
            .map(|inner| PyElementSet { inner })
            .map_err(value_error)
    }

    /// Orbital period (minutes).
    fn period_minutes(&self) -> f64 { self.inner.period_minutes() }

    #[getter] fn name(&self) -> Option<String> { self.inner.name.clone() }
    #[getter] fn norad_id(&self) -> u32 { self.inner.norad_id }
    #[getter] fn epoch(&self) -> String { self.inner.epoch.to_rfc3339() }
    #[getter] fn inclination_deg(&self) -> f64 { self.inner.inclination_deg }
    #[getter] fn raan_deg(&self) -> f64 { self.inner.raan_deg }
    #[getter] fn eccentricity(&self) -> f64 { self.inner.eccentricity }
    #[getter] fn arg_perigee_deg(&self) -> f64 { self.inner.arg_perigee_deg }
    #[getter] fn mean_anomaly_deg(&self) -> f64 { self.inner.mean_anomaly_deg }
    #[getter] fn mean_motion(&self) -> f64 { self.inner.mean_motion_rev_day }
    #[getter] fn bstar(&self) -> f64 { self.inner.bstar }
    #[getter] fn epoch_year(&self) -> u16 { self.inner.epoch_year }
    #[getter] fn epoch_day(&self) -> f64 { self.inner.epoch_day }
    #[getter] fn classification(&self) -> char { self.inner.classification }
    #[getter] fn intl_designator(&self) -> String { self.inner.intl_designator.clone() }

    fn __repr__(&self) -> String {
        format!("{}", self.inner)
    }
}

// Propagator
#[pyclass(name = "Propagator")]
pub struct PyPropagator {
    inner: Propagator,
}

#[pymethods]
impl PyPropagator {
    /// Create an SGP4/SDP4 propagator.
    ///
    /// Args:
    ///     elements: ElementSet to propagate
    ///     strict: fail instead of warning when Kepler's equation does not
    ///         converge (default: False)
    #[new]
    #[pyo3(signature = (elements, strict=false))]
    fn new(elements: &PyElementSet, strict: bool) -> Self {
        let policy = if strict {
            ConvergencePolicy::Strict
        } else {
            ConvergencePolicy::Lenient
        };
        let config = PropagatorConfig::default().with_convergence(policy);
        PyPropagator {
            inner: Propagator::new(elements.inner).with_config(config),
        }
    }

    /// "SGP4" or "SDP4".
    fn model(&self) -> &'static str {
        match self.inner.kind() {
            PropagatorKind::NearEarth => "SGP4",
            PropagatorKind::DeepSpace => "SDP4",
        }
    }

    /// State [x, y, z, vx, vy, vz] in km and km/s, `tsince` minutes from epoch.
    fn propagate(&self, tsince: f64) -> PyResult<Vec<f64>> {
        let s = self.inner.propagate(tsince).map_err(propagation_error)?;
        Ok(vec![s.r[0], s.r[1], s.r[2], s.v[0], s.v[1], s.v[2]])
    }

    /// States for many offsets (minutes), computed in parallel.
    fn propagate_many(&self, offsets: Vec<f64>) -> PyResult<Vec<Vec<f64>>> {
        self.inner
            .propagate_many(&offsets)
            .into_iter()
            .map(|r| {
                r.map(|s| vec![s.r[0], s.r[1], s.r[2], s.v[0], s.v[1], s.v[2]])
                    .map_err(propagation_error)
            })
            .collect()
    }

    /// Sub-satellite point as (lat_deg, lon_deg, alt_m).
    fn geodetic(&self, tsince: f64) -> PyResult<(f64, f64, f64)> {
        let geo = self
            .inner
            .propagate(tsince)
            .map_err(propagation_error)?
            .to_geodetic();
        Ok((geo.latitude_deg(), geo.longitude_deg(), geo.altitude_m()))
    }
}

// GroundStation
#[pyclass(name = "GroundStation")]
#[derive(Clone)]
pub struct PyGroundStation {
    inner: GroundStation,
}

#[pymethods]
impl PyGroundStation {
    #[new]
    #[pyo3(signature = (lat_deg, lon_deg, alt_m=0.0, refraction=false))]
    fn new(lat_deg: f64, lon_deg: f64, alt_m: f64, refraction: bool) -> Self {
        let options = LookAngleOptions::default().with_refraction(refraction);
        PyGroundStation {
            inner: GroundStation::new(lat_deg, lon_deg, alt_m).with_options(options),
        }
    }

    /// Look angle to a satellite `tsince` minutes after its epoch.
    fn look_angle(
        &self,
        propagator: &PyPropagator,
        tsince: f64,
        py: Python<'_>,
    ) -> PyResult<Py<PyDict>> {
        let state = propagator.inner.propagate(tsince).map_err(propagation_error)?;
        let look = self.inner.look_angle(&state);
        let dict = PyDict::new(py);
        dict.set_item("azimuth_deg", look.azimuth_deg())?;
        dict.set_item("elevation_deg", look.elevation_deg())?;
        dict.set_item("range_km", look.range_km)?;
        dict.set_item("range_rate_km_s", look.range_rate_km_s)?;
        dict.set_item("visible", look.is_visible())?;
        Ok(dict.unbind())
    }

    #[getter] fn lat_deg(&self) -> f64 { self.inner.location.latitude_deg() }
    #[getter] fn lon_deg(&self) -> f64 { self.inner.location.longitude_deg() }
    #[getter] fn alt_m(&self) -> f64 { self.inner.location.altitude_m() }

    fn __repr__(&self) -> String {
        format!("GroundStation({})", self.inner.location)
    }
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyElementSet>()?;
    m.add_class::<PyTle>()?;
    m.add_class::<PyPropagator>()?;
    m.add_class::<PyGroundStation>()?;
    Ok(())
}
