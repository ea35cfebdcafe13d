//! Time-stamped inertial (TEME) state vectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::XKMPER;
use crate::geodetic::GeodeticCoordinates;
use crate::solver::Convergence;

/// Cartesian state vector in the inertial frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertialState {
    /// Position (km): [x, y, z]
    pub r: [f64; 3],
    /// Velocity (km/s): [vx, vy, vz]
    pub v: [f64; 3],
    /// Instant the state refers to
    pub epoch: DateTime<Utc>,
}

impl InertialState {
    /// Position magnitude (km).
    pub fn r_mag(&self) -> f64 {
        (self.r[0].powi(2) + self.r[1].powi(2) + self.r[2].powi(2)).sqrt()
    }

    /// Velocity magnitude (km/s).
    pub fn v_mag(&self) -> f64 {
        (self.v[0].powi(2) + self.v[1].powi(2) + self.v[2].powi(2)).sqrt()
    }

    /// Height above a sphere of equatorial radius (km).
    pub fn radial_altitude(&self) -> f64 {
        self.r_mag() - XKMPER
    }

    /// State of a point fixed on the rotating Earth at `geo`, at time `t`.
    pub fn from_geodetic(geo: &GeodeticCoordinates, t: DateTime<Utc>) -> Self {
        let (r, v) = geo.to_inertial(&t);
        InertialState { r, v, epoch: t }
    }

    /// Geodetic coordinates of this position.
    ///
    /// If the latitude refinement hits its iteration cap the last iterate is
    /// returned and a warning is logged; use [`InertialState::try_to_geodetic`]
    /// to inspect the outcome instead.
    pub fn to_geodetic(&self) -> GeodeticCoordinates {
        let result = self.try_to_geodetic();
        if !result.is_converged() {
            log::warn!(
                "Geodetic latitude did not converge after {} iterations at {}",
                result.iterations(),
                self.epoch
            );
        }
        result.into_value()
    }

    /// Geodetic coordinates together with how the latitude refinement ended.
    pub fn try_to_geodetic(&self) -> Convergence<GeodeticCoordinates> {
        GeodeticCoordinates::from_inertial(&self.r, &self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn test_magnitudes() {
        let s = InertialState {
            r: [3.0, 4.0, 12.0],
            v: [1.0, 2.0, 2.0],
            epoch: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        assert_relative_eq!(s.r_mag(), 13.0, epsilon = 1e-12);
        assert_relative_eq!(s.v_mag(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.radial_altitude(), 13.0 - XKMPER, epsilon = 1e-9);
    }

    #[test]
    fn test_geodetic_round_trip() {
        let t = Utc.with_ymd_and_hms(2023, 11, 5, 18, 45, 12).unwrap();
        let site = GeodeticCoordinates::from_degrees(-23.5, 290.0, 2_400.0);
        let s = InertialState::from_geodetic(&site, t);
        assert_eq!(s.epoch, t);

        let back = s.to_geodetic();
        assert_relative_eq!(back.latitude, site.latitude, epsilon = 1e-6);
        assert_relative_eq!(back.longitude, site.longitude, epsilon = 1e-6);
        assert_relative_eq!(back.altitude, site.altitude, epsilon = 1e-6);
        assert!(s.try_to_geodetic().is_converged());
    }

    #[test]
    fn test_site_velocity_is_horizontal() {
        let t = Utc.with_ymd_and_hms(2023, 11, 5, 18, 45, 12).unwrap();
        let site = GeodeticCoordinates::from_degrees(60.0, 10.0, 0.0);
        let s = InertialState::from_geodetic(&site, t);
        assert_eq!(s.v[2], 0.0);
        let radial = s.r[0] * s.v[0] + s.r[1] * s.v[1];
        assert!(radial.abs() < 1e-9);
    }
}
