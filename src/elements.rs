//! NORAD mean element sets.
//!
//! An [`ElementSet`] holds the mean elements of one TLE record converted
//! to radians and radians/minute, validated once at construction, plus the
//! "recovered" (un-Kozai'd) mean motion and semi-major axis that both
//! propagators start from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

/// Element-set validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("Eccentricity must be in [0, 1), got {0}")]
    Eccentricity(f64),

    #[error("Mean motion must be positive, got {0} rev/day")]
    MeanMotion(f64),

    #[error("Field '{field}' is not a finite number: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Invalid epoch: year {year}, day {day}")]
    Epoch { year: i32, day: f64 },
}

/// Raw element values as decoded from a TLE (degrees, revolutions/day).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawElements {
    /// Epoch of the element set.
    pub epoch: DateTime<Utc>,
    /// Inclination (degrees).
    pub inclination_deg: f64,
    /// Right ascension of ascending node (degrees).
    pub raan_deg: f64,
    /// Eccentricity (dimensionless).
    pub eccentricity: f64,
    /// Argument of perigee (degrees).
    pub arg_perigee_deg: f64,
    /// Mean anomaly (degrees).
    pub mean_anomaly_deg: f64,
    /// Mean motion (revolutions per day).
    pub mean_motion_rev_day: f64,
    /// B* drag term (1/Earth radii).
    pub bstar: f64,
    /// First derivative of mean motion / 2 (rev/day²). Not used by SGP4.
    #[serde(default)]
    pub mean_motion_dot: f64,
}

/// A validated mean element set.
///
/// Fields are private so the `0 ≤ e < 1` invariant established by
/// [`ElementSet::new`] cannot be broken afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawElements", into = "RawElements")]
pub struct ElementSet {
    epoch: DateTime<Utc>,
    inclination: f64,
    raan: f64,
    eccentricity: f64,
    arg_perigee: f64,
    mean_anomaly: f64,
    mean_motion: f64,
    bstar: f64,
    mean_motion_dot: f64,
    recovered_mean_motion: f64,
    recovered_semi_major: f64,
}

impl ElementSet {
    /// Validate raw elements and recover the original mean motion and semi-major axis.
    pub fn new(raw: RawElements) -> Result<Self, ElementError> {
        check_finite("inclination", raw.inclination_deg)?;
        check_finite("raan", raw.raan_deg)?;
        check_finite("eccentricity", raw.eccentricity)?;
        check_finite("arg_perigee", raw.arg_perigee_deg)?;
        check_finite("mean_anomaly", raw.mean_anomaly_deg)?;
        check_finite("mean_motion", raw.mean_motion_rev_day)?;
        check_finite("bstar", raw.bstar)?;
        check_finite("mean_motion_dot", raw.mean_motion_dot)?;

        if !(0.0..1.0).contains(&raw.eccentricity) {
            return Err(ElementError::Eccentricity(raw.eccentricity));
        }
        if raw.mean_motion_rev_day <= 0.0 {
            return Err(ElementError::MeanMotion(raw.mean_motion_rev_day));
        }

        let inclination = raw.inclination_deg * DEG2RAD;
        let e = raw.eccentricity;
        let mean_motion = raw.mean_motion_rev_day * TAU / MINUTES_PER_DAY;

        // Remove the first-order J2 secular part folded into the TLE mean motion.
        let a1 = (XKE / mean_motion).powf(2.0 / 3.0);
        let cosio = inclination.cos();
        let temp = 1.5 * CK2 * (3.0 * cosio * cosio - 1.0) / (1.0 - e * e).powf(1.5);
        let delta1 = temp / (a1 * a1);
        let a0 = a1 * (1.0 - delta1 * (1.0 / 3.0 + delta1 * (1.0 + 134.0 / 81.0 * delta1)));
        let delta0 = temp / (a0 * a0);

        Ok(ElementSet {
            epoch: raw.epoch,
            inclination,
            raan: raw.raan_deg * DEG2RAD,
            eccentricity: e,
            arg_perigee: raw.arg_perigee_deg * DEG2RAD,
            mean_anomaly: raw.mean_anomaly_deg * DEG2RAD,
            mean_motion,
            bstar: raw.bstar,
            mean_motion_dot: raw.mean_motion_dot,
            recovered_mean_motion: mean_motion / (1.0 + delta0),
            recovered_semi_major: a0 / (1.0 - delta0),
        })
    }

    /// Epoch of the element set.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Inclination (rad).
    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    /// Right ascension of ascending node (rad).
    pub fn raan(&self) -> f64 {
        self.raan
    }

    /// Eccentricity, always in [0, 1).
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Argument of perigee (rad).
    pub fn arg_perigee(&self) -> f64 {
        self.arg_perigee
    }

    /// Mean anomaly (rad).
    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// Mean motion as given in the TLE (rad/min).
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// B* drag term (1/ER).
    pub fn bstar(&self) -> f64 {
        self.bstar
    }

    /// First derivative of mean motion / 2 (rev/day²).
    pub fn mean_motion_dot(&self) -> f64 {
        self.mean_motion_dot
    }

    /// Recovered mean motion (rad/min).
    pub fn recovered_mean_motion(&self) -> f64 {
        self.recovered_mean_motion
    }

    /// Recovered semi-major axis (ER).
    pub fn semi_major_axis(&self) -> f64 {
        self.recovered_semi_major
    }

    /// Recovered semi-minor axis (ER).
    pub fn semi_minor_axis(&self) -> f64 {
        self.recovered_semi_major * (1.0 - self.eccentricity * self.eccentricity).sqrt()
    }

    /// Perigee altitude above the equatorial radius (km).
    pub fn perigee_km(&self) -> f64 {
        XKMPER * (self.recovered_semi_major * (1.0 - self.eccentricity) - AE)
    }

    /// Apogee altitude above the equatorial radius (km).
    pub fn apogee_km(&self) -> f64 {
        XKMPER * (self.recovered_semi_major * (1.0 + self.eccentricity) - AE)
    }

    /// Geocentric perigee radius (km).
    pub fn perigee_radius_km(&self) -> f64 {
        self.perigee_km() + XKMPER
    }

    /// Geocentric apogee radius (km).
    pub fn apogee_radius_km(&self) -> f64 {
        self.apogee_km() + XKMPER
    }

    /// Orbital period from the recovered mean motion (minutes).
    pub fn period_minutes(&self) -> f64 {
        TAU / self.recovered_mean_motion
    }

    /// Whether the deep-space (SDP4) model applies.
    pub fn is_deep_space(&self) -> bool {
        self.period_minutes() > DEEP_SPACE_PERIOD_MIN
    }
}

impl TryFrom<RawElements> for ElementSet {
    type Error = ElementError;

    fn try_from(raw: RawElements) -> Result<Self, Self::Error> {
        ElementSet::new(raw)
    }
}

impl From<ElementSet> for RawElements {
    fn from(el: ElementSet) -> Self {
        RawElements {
            epoch: el.epoch,
            inclination_deg: el.inclination * RAD2DEG,
            raan_deg: el.raan * RAD2DEG,
            eccentricity: el.eccentricity,
            arg_perigee_deg: el.arg_perigee * RAD2DEG,
            mean_anomaly_deg: el.mean_anomaly * RAD2DEG,
            mean_motion_rev_day: el.mean_motion * MINUTES_PER_DAY / TAU,
            bstar: el.bstar,
            mean_motion_dot: el.mean_motion_dot,
        }
    }
}

impl std::fmt::Display for ElementSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} — {:.1} x {:.1} km, {:.4}° inc, {:.7} ecc, {:.2} min",
            self.epoch.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.perigee_km(),
            self.apogee_km(),
            self.inclination * RAD2DEG,
            self.eccentricity,
            self.period_minutes(),
        )
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ElementError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ElementError::NonFinite { field, value })
    }
}
