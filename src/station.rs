//! Ground stations and topocentric look angles.
//!
//! The slant-range vector from the site to the satellite is rotated into
//! the local south/east/zenith frame at the site's local mean sidereal time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::geodetic::GeodeticCoordinates;
use crate::propagator::{PropagationError, Propagator};
use crate::state::InertialState;
use crate::time::lmst;

/// Look-angle options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookAngleOptions {
    /// Add the Meeus atmospheric refraction correction to the elevation.
    pub refraction: bool,
}

impl LookAngleOptions {
    pub fn with_refraction(mut self, refraction: bool) -> Self {
        self.refraction = refraction;
        self
    }
}

/// Direction and distance from a ground station to a satellite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAngle {
    /// Azimuth (rad), clockwise from north, [0, 2π)
    pub azimuth: f64,
    /// Elevation above the local horizontal (rad), [-π/2, π/2]
    pub elevation: f64,
    /// Slant range (km)
    pub range_km: f64,
    /// Range rate (km/s), negative while approaching
    pub range_rate_km_s: f64,
}

impl LookAngle {
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth * RAD2DEG
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation * RAD2DEG
    }

    /// Whether the satellite is above the local horizontal.
    pub fn is_visible(&self) -> bool {
        self.elevation > 0.0
    }
}

impl std::fmt::Display for LookAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "az {:.2}°, el {:.2}°, range {:.1} km, rate {:+.3} km/s",
            self.azimuth_deg(),
            self.elevation_deg(),
            self.range_km,
            self.range_rate_km_s
        )
    }
}

/// An observer fixed to the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub location: GeodeticCoordinates,
    pub options: LookAngleOptions,
}

impl GroundStation {
    /// Station at a geodetic latitude and east longitude (degrees) and
    /// height above the ellipsoid (metres).
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self::at(GeodeticCoordinates::from_degrees(lat_deg, lon_deg, alt_m))
    }

    pub fn at(location: GeodeticCoordinates) -> Self {
        GroundStation {
            location,
            options: LookAngleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LookAngleOptions) -> Self {
        self.options = options;
        self
    }

    /// Inertial position and velocity of the station at `t`.
    pub fn inertial_state_at(&self, t: DateTime<Utc>) -> InertialState {
        InertialState::from_geodetic(&self.location, t)
    }

    /// Look angle to a satellite state, evaluated at the state's epoch.
    pub fn look_angle(&self, sat: &InertialState) -> LookAngle {
        let site = self.inertial_state_at(sat.epoch);

        let rho = [
            sat.r[0] - site.r[0],
            sat.r[1] - site.r[1],
            sat.r[2] - site.r[2],
        ];
        let rho_dot = [
            sat.v[0] - site.v[0],
            sat.v[1] - site.v[1],
            sat.v[2] - site.v[2],
        ];
        let range = (rho[0].powi(2) + rho[1].powi(2) + rho[2].powi(2)).sqrt();

        let theta = lmst(&sat.epoch, self.location.longitude);
        let (sin_lat, cos_lat) = self.location.latitude.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();

        let top_s = sin_lat * cos_theta * rho[0] + sin_lat * sin_theta * rho[1] - cos_lat * rho[2];
        let top_e = -sin_theta * rho[0] + cos_theta * rho[1];
        let top_z = cos_lat * cos_theta * rho[0] + cos_lat * sin_theta * rho[1] + sin_lat * rho[2];

        // atan(-E/S), +π when S > 0, folded into one atan2
        let azimuth = fmod2p(top_e.atan2(-top_s));
        let mut elevation = (top_z / range).clamp(-1.0, 1.0).asin();
        if self.options.refraction {
            elevation = refract(elevation);
        }

        let range_rate = (rho[0] * rho_dot[0] + rho[1] * rho_dot[1] + rho[2] * rho_dot[2]) / range;

        LookAngle {
            azimuth,
            elevation,
            range_km: range,
            range_rate_km_s: range_rate,
        }
    }

    /// Propagate to `t` and return the look angle.
    pub fn look_angle_at(
        &self,
        propagator: &Propagator,
        t: DateTime<Utc>,
    ) -> Result<LookAngle, PropagationError> {
        Ok(self.look_angle(&propagator.propagate_to(t)?))
    }
}

/// Apparent elevation from true elevation (Meeus, Astronomical Algorithms
/// eq. 16.4). Corrections that would push the object below the horizon are
/// dropped.
fn refract(elevation: f64) -> f64 {
    let el_deg = elevation * RAD2DEG;
    let correction_arcmin = 1.02 / ((el_deg + 10.3 / (el_deg + 5.11)) * DEG2RAD).tan();
    let apparent = elevation + correction_arcmin / 60.0 * DEG2RAD;

    if !apparent.is_finite() || apparent < 0.0 {
        elevation
    } else {
        apparent.min(PI / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::tests::raw_88888;
    use crate::elements::ElementSet;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    /// Satellite placed `height` km straight above the station (along the
    /// ellipsoid normal), moving with the given extra radial speed.
    fn overhead(station: &GroundStation, height: f64, radial_km_s: f64) -> InertialState {
        let t = t0();
        let mut above = station.location;
        above.altitude += height;
        let mut s = InertialState::from_geodetic(&above, t);
        let r = s.r_mag();
        for i in 0..3 {
            s.v[i] += radial_km_s * s.r[i] / r;
        }
        s
    }

    #[test]
    fn test_zenith_pass() {
        let gs = GroundStation::new(40.0, -105.0, 1600.0);
        let look = gs.look_angle(&overhead(&gs, 500.0, 0.0));
        assert_relative_eq!(look.elevation, PI / 2.0, epsilon = 1e-6);
        assert_relative_eq!(look.range_km, 500.0, epsilon = 1e-6);
        assert_relative_eq!(look.range_rate_km_s, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_range_rate_sign() {
        let gs = GroundStation::new(-10.0, 20.0, 0.0);
        // Climbing away along the local vertical, radial ≈ normal direction
        let receding = gs.look_angle(&overhead(&gs, 800.0, 1.0));
        assert!(receding.range_rate_km_s > 0.99 && receding.range_rate_km_s < 1.01);
        let approaching = gs.look_angle(&overhead(&gs, 800.0, -1.0));
        assert!(approaching.range_rate_km_s < -0.99);
    }

    #[test]
    fn test_cardinal_azimuths() {
        let gs = GroundStation::new(0.0, 0.0, 0.0);
        let t = t0();
        // Surface points 5° north, east and west of the site
        let surface = |lat: f64, lon: f64| {
            InertialState::from_geodetic(&GeodeticCoordinates::from_degrees(lat, lon, 0.0), t)
        };
        let north = surface(5.0, 0.0);
        let east = surface(0.0, 5.0);
        let west = surface(0.0, -5.0);

        let az_north = gs.look_angle(&north).azimuth_deg();
        assert!(az_north < 1e-6 || az_north > 359.999, "az = {az_north}");
        assert_relative_eq!(gs.look_angle(&east).azimuth_deg(), 90.0, epsilon = 1e-6);
        assert_relative_eq!(gs.look_angle(&west).azimuth_deg(), 270.0, epsilon = 1e-6);
        // Below the horizon: the chord dips under the tangent plane
        assert!(gs.look_angle(&east).elevation < 0.0);
    }

    #[test]
    fn test_refraction_raises_low_elevations() {
        let three_deg = 3.0 * DEG2RAD;
        let apparent = refract(three_deg);
        // About 14 arcminutes at 3°
        assert!(apparent > three_deg);
        assert_relative_eq!((apparent - three_deg) * RAD2DEG * 60.0, 14.0, epsilon = 1.0);

        assert!(refract(PI / 2.0) <= PI / 2.0);
        assert_relative_eq!(refract(PI / 2.0), PI / 2.0, epsilon = 1e-5);
        assert_eq!(refract(-0.5), -0.5);
    }

    #[test]
    fn test_refraction_option_applied() {
        let gs = GroundStation::new(51.5, 0.0, 0.0);
        let t = t0();
        let above = GeodeticCoordinates::from_degrees(55.0, 2.0, 400_000.0);
        let target = InertialState::from_geodetic(&above, t);
        let plain = gs.look_angle(&target);
        let refracted = gs
            .with_options(LookAngleOptions::default().with_refraction(true))
            .look_angle(&target);
        assert!(plain.elevation > 0.0);
        assert!(refracted.elevation > plain.elevation);
        assert_eq!(refracted.azimuth, plain.azimuth);
    }

    #[test]
    fn test_look_angle_ranges_over_a_day() {
        let gs = GroundStation::new(35.0, 139.0, 40.0);
        let prop = Propagator::new(ElementSet::new(raw_88888()).unwrap());
        let epoch = prop.elements().epoch();
        for i in 0..96 {
            let t = crate::time::add_minutes(&epoch, i as f64 * 15.0).unwrap();
            let look = gs.look_angle_at(&prop, t).unwrap();
            assert!((0.0..TAU).contains(&look.azimuth));
            assert!((-PI / 2.0..=PI / 2.0).contains(&look.elevation));
            assert!(look.range_km > 0.0);
        }
    }

    #[test]
    fn test_display() {
        let look = LookAngle {
            azimuth: PI / 2.0,
            elevation: PI / 6.0,
            range_km: 1234.56,
            range_rate_km_s: -1.5,
        };
        assert_eq!(look.to_string(), "az 90.00°, el 30.00°, range 1234.6 km, rate -1.500 km/s");
        assert!(look.is_visible());
    }
}
