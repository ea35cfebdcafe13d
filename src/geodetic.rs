//! Geodetic coordinates on the WGS '72 ellipsoid and their inertial conversions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::solver::Convergence;
use crate::time::gmst;

/// Geodetic latitude, longitude and altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoordinates {
    /// Geodetic latitude (rad), north positive
    pub latitude: f64,
    /// East longitude (rad), [0, 2π)
    pub longitude: f64,
    /// Height above the ellipsoid (km)
    pub altitude: f64,
}

impl GeodeticCoordinates {
    /// Radians and kilometres; longitude is wrapped into [0, 2π).
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        GeodeticCoordinates {
            latitude,
            longitude: fmod2p(longitude),
            altitude,
        }
    }

    /// Degrees and metres, the usual way a site is written down.
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self::new(lat_deg * DEG2RAD, lon_deg * DEG2RAD, alt_m / 1000.0)
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude * RAD2DEG
    }

    /// East longitude in (-180°, 180°].
    pub fn longitude_deg(&self) -> f64 {
        let deg = self.longitude * RAD2DEG;
        if deg > 180.0 { deg - 360.0 } else { deg }
    }

    pub fn altitude_m(&self) -> f64 {
        self.altitude * 1000.0
    }

    /// Inertial position (km) and velocity (km/s) of a point fixed to the
    /// rotating Earth at this location, at time `t`.
    pub fn to_inertial(&self, t: &DateTime<Utc>) -> ([f64; 3], [f64; 3]) {
        let theta = fmod2p(gmst(t) + self.longitude);
        let (sin_lat, cos_lat) = self.latitude.sin_cos();

        let c = 1.0 / (1.0 + FLATTENING * (FLATTENING - 2.0) * sin_lat * sin_lat).sqrt();
        let s = (1.0 - FLATTENING) * (1.0 - FLATTENING) * c;
        let achcp = (XKMPER * c + self.altitude) * cos_lat;

        let r = [
            achcp * theta.cos(),
            achcp * theta.sin(),
            (XKMPER * s + self.altitude) * sin_lat,
        ];
        let v = [
            -EARTH_ROTATION_RAD_S * r[1],
            EARTH_ROTATION_RAD_S * r[0],
            0.0,
        ];
        (r, v)
    }

    /// Geodetic coordinates of an inertial position (km) at time `t`.
    ///
    /// Latitude is refined iteratively until successive values agree to
    /// 1e-7 rad, for at most 10 rounds.
    pub fn from_inertial(r: &[f64; 3], t: &DateTime<Utc>) -> Convergence<GeodeticCoordinates> {
        let [x, y, z] = *r;
        let longitude = fmod2p(y.atan2(x) - gmst(t));
        let r_xy = x.hypot(y);

        refine_latitude(z, r_xy).map(|(latitude, c)| {
            // Height along the normal; measure it against z near the poles, where cos φ → 0
            let (sin_lat, cos_lat) = latitude.sin_cos();
            let altitude = if cos_lat.abs() >= sin_lat.abs() {
                r_xy / cos_lat - XKMPER * c
            } else {
                z / sin_lat - XKMPER * c * (1.0 - E2)
            };
            GeodeticCoordinates {
                latitude,
                longitude,
                altitude,
            }
        })
    }
}

/// Geodetic latitude and the prime-vertical factor `c = 1/√(1 − e²sin²φ)`
/// for a point `z` above the equator and `r_xy` from the polar axis (km).
fn refine_latitude(z: f64, r_xy: f64) -> Convergence<(f64, f64)> {
    let mut latitude = z.atan2(r_xy);
    let mut c = 1.0;

    for iterations in 1..=GEODETIC_MAX_ITER {
        let phi = latitude;
        let sin_phi = phi.sin();
        c = 1.0 / (1.0 - E2 * sin_phi * sin_phi).sqrt();
        latitude = (z + XKMPER * c * E2 * sin_phi).atan2(r_xy);
        if (latitude - phi).abs() <= GEODETIC_TOLERANCE {
            return Convergence::Converged {
                value: (latitude, c),
                iterations,
            };
        }
    }

    Convergence::IterationLimit {
        value: (latitude, c),
        iterations: GEODETIC_MAX_ITER,
    }
}

impl std::fmt::Display for GeodeticCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lat {:.4}°, lon {:.4}°, alt {:.1} m",
            self.latitude_deg(),
            self.longitude_deg(),
            self.altitude_m()
        )
    }
}
